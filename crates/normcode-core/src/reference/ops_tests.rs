use std::convert::Infallible;

use super::*;

fn num(n: i64) -> Element {
    Element::literal(n)
}

fn line(axis: &str, values: &[i64]) -> Reference {
    Reference::from_elements(axis, values.iter().copied().map(num).collect()).unwrap()
}

mod append {
    use super::*;

    #[test]
    fn shared_axis_grows() {
        let a = line("x", &[1, 2]);
        let b = line("x", &[3]);
        let out = a.append(&b, "x").unwrap();
        assert_eq!(out.shape(), &[3]);
        assert_eq!(out.elements(), &[num(1), num(2), num(3)]);
    }

    #[test]
    fn shared_axis_aligns_other_axes() {
        // target: rows x cols [[1,2],[3,4]]; other: one extra row [5,6]
        let target = Reference::new(
            vec!["row".into(), "col".into()],
            vec![2, 2],
            vec![num(1), num(2), num(3), num(4)],
        )
        .unwrap();
        let other = Reference::new(
            vec!["row".into(), "col".into()],
            vec![1, 2],
            vec![num(5), num(6)],
        )
        .unwrap();
        let out = target.append(&other, "row").unwrap();
        assert_eq!(out.shape(), &[3, 2]);
        assert_eq!(out.get(&[("row", 2), ("col", 1)]).unwrap(), &num(6));
    }

    #[test]
    fn target_only_broadcasts_one_slab() {
        let target = line("x", &[1, 2]);
        let other = Reference::singleton(num(9));
        let out = target.append(&other, "x").unwrap();
        assert_eq!(out.shape(), &[3]);
        assert_eq!(out.elements(), &[num(1), num(2), num(9)]);
    }

    #[test]
    fn fresh_axis_is_created() {
        let target = Reference::singleton(num(1));
        let other = Reference::singleton(num(2));
        let out = target.append(&other, "steps").unwrap();
        assert_eq!(out.axes()[0], "steps");
        assert_eq!(out.shape(), &[2, 1]);
        assert_eq!(out.get(&[("steps", 0)]).unwrap(), &num(1));
        assert_eq!(out.get(&[("steps", 1)]).unwrap(), &num(2));
    }

    #[test]
    fn foreign_axis_rejected() {
        let target = line("x", &[1]);
        let other = line("y", &[2]);
        assert!(matches!(
            target.append(&other, "x"),
            Err(ReferenceError::AxisMismatch(_))
        ));
    }

    #[test]
    fn skip_elements_are_carried() {
        let target = line("x", &[1]);
        let other = Reference::from_elements("x", vec![Element::Skip]).unwrap();
        let out = target.append(&other, "x").unwrap();
        assert_eq!(out.elements(), &[num(1), Element::Skip]);
    }
}

mod cross_product {
    use super::*;

    #[test]
    fn disjoint_axes_form_the_product() {
        let a = line("x", &[1, 2]);
        let b = line("y", &[10, 20, 30]);
        let out = cross_product(&[&a, &b]).unwrap();
        assert_eq!(out.axes(), &["x".to_string(), "y".to_string()]);
        assert_eq!(out.shape(), &[2, 3]);
        assert_eq!(
            out.get(&[("x", 1), ("y", 2)]).unwrap(),
            &Element::Tuple(vec![num(2), num(30)])
        );
    }

    #[test]
    fn shared_axes_align() {
        let a = line("x", &[1, 2]);
        let b = line("x", &[10, 20]);
        let out = cross_product(&[&a, &b]).unwrap();
        assert_eq!(out.shape(), &[2]);
        assert_eq!(
            out.elements(),
            &[
                Element::Tuple(vec![num(1), num(10)]),
                Element::Tuple(vec![num(2), num(20)]),
            ]
        );
    }

    #[test]
    fn shared_axis_size_conflict() {
        let a = line("x", &[1, 2]);
        let b = line("x", &[1, 2, 3]);
        assert!(matches!(
            cross_product(&[&a, &b]),
            Err(ReferenceError::AxisMismatch(_))
        ));
    }

    #[test]
    fn skip_wins_the_position() {
        let a = Reference::from_elements("x", vec![num(1), Element::Skip]).unwrap();
        let b = line("x", &[10, 20]);
        let out = cross_product(&[&a, &b]).unwrap();
        assert_eq!(out.elements()[0], Element::Tuple(vec![num(1), num(10)]));
        assert_eq!(out.elements()[1], Element::Skip);
    }
}

mod join {
    use super::*;

    #[test]
    fn stacks_along_new_axis() {
        let a = Reference::singleton(num(1));
        let b = Reference::singleton(num(2));
        let out = join(&[&a, &b], "combined").unwrap();
        assert_eq!(out.axes(), &["combined".to_string(), NONE_AXIS.to_string()]);
        assert_eq!(out.shape(), &[2, 1]);
        assert_eq!(out.get(&[("combined", 1)]).unwrap(), &num(2));
    }

    #[test]
    fn rejects_mismatched_frames() {
        let a = line("x", &[1, 2]);
        let b = line("y", &[1, 2]);
        assert!(matches!(
            join(&[&a, &b], "z"),
            Err(ReferenceError::AxisMismatch(_))
        ));
    }

    #[test]
    fn rejects_existing_axis() {
        let a = line("x", &[1]);
        let b = line("x", &[2]);
        assert!(matches!(
            join(&[&a, &b], "x"),
            Err(ReferenceError::AxisMismatch(_))
        ));
    }
}

mod cross_action {
    use super::*;

    fn double(f: &Element, v: &Element) -> Result<ActionOutput, Infallible> {
        let _ = f;
        let n = v.as_concrete().unwrap().as_i64().unwrap();
        Ok(ActionOutput::One(num(n * 2)))
    }

    #[test]
    fn applies_over_the_union() {
        let funcs = Reference::singleton(Element::str("double"));
        let vals = line("x", &[1, 2, 3]);
        let out = cross_action(&funcs, &vals, None, double).unwrap();
        assert_eq!(out.axis_size("x"), Some(3));
        assert_eq!(out.get(&[("x", 2)]).unwrap(), &num(6));
    }

    #[test]
    fn skip_input_skips_output_without_applying() {
        let funcs = Reference::singleton(Element::str("double"));
        let vals = Reference::from_elements("x", vec![num(1), Element::Skip]).unwrap();
        let mut calls = 0;
        let out = cross_action(&funcs, &vals, None, |f, v| {
            calls += 1;
            double(f, v)
        })
        .unwrap();
        assert_eq!(calls, 1);
        assert_eq!(out.get(&[("x", 1)]).unwrap(), &Element::Skip);
    }

    #[test]
    fn list_output_spreads_along_result_axis() {
        let funcs = Reference::singleton(Element::str("split"));
        let vals = line("x", &[12, 34]);
        let out = cross_action(&funcs, &vals, Some("digits"), |_, v| {
            let n = v.as_concrete().unwrap().as_i64().unwrap();
            Ok::<_, Infallible>(ActionOutput::Many(vec![num(n / 10), num(n % 10)]))
        })
        .unwrap();
        assert_eq!(out.axes()[0], "digits");
        assert_eq!(out.shape(), &[2, 2]);
        assert_eq!(out.get(&[("digits", 0), ("x", 1)]).unwrap(), &num(3));
        assert_eq!(out.get(&[("digits", 1), ("x", 1)]).unwrap(), &num(4));
    }

    #[test]
    fn ragged_lists_are_rejected() {
        let funcs = Reference::singleton(Element::str("split"));
        let vals = line("x", &[1, 23]);
        let res = cross_action(&funcs, &vals, Some("digits"), |_, v| {
            let s = v.as_concrete().unwrap().as_i64().unwrap().to_string();
            Ok::<_, Infallible>(ActionOutput::Many(
                s.chars().map(|c| Element::str(c.to_string())).collect(),
            ))
        });
        assert!(matches!(
            res,
            Err(ActionError::Reference(ReferenceError::Shape(_)))
        ));
    }

    #[test]
    fn apply_errors_surface() {
        let funcs = Reference::singleton(Element::str("fail"));
        let vals = line("x", &[1]);
        let res = cross_action(&funcs, &vals, None, |_, _| {
            Err::<ActionOutput, String>("faculty unavailable".to_string())
        });
        match res {
            Err(ActionError::Apply(msg)) => assert_eq!(msg, "faculty unavailable"),
            other => panic!("expected apply error, got {other:?}"),
        }
    }
}

mod element_action {
    use super::*;

    #[test]
    fn sums_aligned_references() {
        let a = line("x", &[1, 2]);
        let b = line("x", &[10, 20]);
        let out = element_action(&[&a, &b], |elems| {
            let total: i64 = elems
                .iter()
                .map(|e| e.as_concrete().unwrap().as_i64().unwrap())
                .sum();
            Ok::<_, Infallible>(num(total))
        })
        .unwrap();
        assert_eq!(out.elements(), &[num(11), num(22)]);
    }

    #[test]
    fn index_awareness_sees_coordinates() {
        let a = line("x", &[0, 0, 0]);
        let out = element_action_indexed(&[&a], |_, coords| {
            let (axis, ix) = coords[0];
            assert_eq!(axis, "x");
            Ok::<_, Infallible>(num(ix as i64))
        })
        .unwrap();
        assert_eq!(out.elements(), &[num(0), num(1), num(2)]);
    }

    #[test]
    fn skip_propagates_totally() {
        let a = Reference::from_elements("x", vec![Element::Skip, num(2)]).unwrap();
        let b = line("x", &[1, 1]);
        let out = element_action(&[&a, &b], |_| Ok::<_, Infallible>(num(0))).unwrap();
        assert_eq!(out.elements()[0], Element::Skip);
        assert_eq!(out.elements()[1], num(0));
    }

    #[test]
    fn broadcast_across_disjoint_axes() {
        let a = line("x", &[1, 2]);
        let b = line("y", &[10, 20]);
        let out = element_action(&[&a, &b], |elems| {
            let x = elems[0].as_concrete().unwrap().as_i64().unwrap();
            let y = elems[1].as_concrete().unwrap().as_i64().unwrap();
            Ok::<_, Infallible>(num(x + y))
        })
        .unwrap();
        assert_eq!(out.shape(), &[2, 2]);
        assert_eq!(out.get(&[("x", 1), ("y", 0)]).unwrap(), &num(12));
    }
}
