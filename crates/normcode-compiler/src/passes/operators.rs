//! Functional-concept surface forms.
//!
//! Syntactic operators (`$`, `&`, `@`, `*`) take precedence over semantic
//! ones (`::(...)`, `::<...>`) when classifying a functional concept.

use normcode_core::{SequenceKind, TimingMarker};

/// Parsed head of a functional concept text.
#[derive(Debug, Clone, PartialEq)]
pub enum OperatorHead {
    /// `::(instruction with <:{N}> placeholders)`
    Imperative { instruction: String },
    /// `::<assertion>`
    Judgement { assertion: String },
    /// `$=`, `$%`, `$.`, `$+`, `$-`
    Assign { marker: char, payload: String },
    /// `&[#]` with optional inline `%>[...]`, `%+(...)`, `%-[...]`
    Grouping { payload: String },
    /// `@:'(cond)`, `@:!(cond)`, `@.(cond)`
    Timing { marker: TimingMarker, condition: String },
    /// `*every(base)`
    Looping { base: String, payload: String },
}

impl OperatorHead {
    pub fn sequence_kind(&self) -> SequenceKind {
        match self {
            OperatorHead::Imperative { .. } => SequenceKind::Imperative,
            OperatorHead::Judgement { .. } => SequenceKind::Judgement,
            OperatorHead::Assign { .. } => SequenceKind::Assigning,
            OperatorHead::Grouping { .. } => SequenceKind::Grouping,
            OperatorHead::Timing { .. } => SequenceKind::Timing,
            OperatorHead::Looping { .. } => SequenceKind::Looping,
        }
    }
}

/// Classify a functional concept text. `None` means the text is not a
/// recognizable operator.
pub fn classify(text: &str) -> Option<OperatorHead> {
    let text = text.trim();

    if let Some(rest) = text.strip_prefix('$') {
        let marker = rest.chars().next()?;
        if !matches!(marker, '=' | '%' | '.' | '+' | '-') {
            return None;
        }
        return Some(OperatorHead::Assign {
            marker,
            payload: rest[marker.len_utf8()..].trim().to_string(),
        });
    }

    if let Some(rest) = text.strip_prefix('&') {
        return Some(OperatorHead::Grouping {
            payload: rest.trim().to_string(),
        });
    }

    if let Some(rest) = text.strip_prefix('@') {
        let (marker, rest) = if let Some(r) = rest.strip_prefix(":'") {
            (TimingMarker::If, r)
        } else if let Some(r) = rest.strip_prefix(":!") {
            (TimingMarker::IfNot, r)
        } else if let Some(r) = rest.strip_prefix('.') {
            (TimingMarker::After, r)
        } else {
            return None;
        };
        let condition = parens_payload(rest)?;
        return Some(OperatorHead::Timing {
            marker,
            condition: condition.to_string(),
        });
    }

    if let Some(rest) = text.strip_prefix("*every") {
        let base = parens_payload(rest)?;
        let close = rest.find(')').expect("parens_payload found one");
        return Some(OperatorHead::Looping {
            base: base.to_string(),
            payload: rest[close + 1..].trim().to_string(),
        });
    }

    if let Some(rest) = text.strip_prefix("::") {
        if rest.starts_with('(') && rest.ends_with(')') {
            return Some(OperatorHead::Imperative {
                instruction: rest[1..rest.len() - 1].to_string(),
            });
        }
        if rest.starts_with('<') && rest.ends_with('>') {
            return Some(OperatorHead::Judgement {
                assertion: rest[1..rest.len() - 1].to_string(),
            });
        }
    }

    None
}

/// The content of the first `(...)` group. Conditions and loop bases are
/// plain concept names, so the first close paren terminates the group.
fn parens_payload(text: &str) -> Option<&str> {
    let text = text.trim_start();
    let rest = text.strip_prefix('(')?;
    let close = rest.find(')')?;
    Some(&rest[..close])
}

/// Pull an inline `%>[a, b]` source list out of an operator payload.
pub fn inline_source_list(payload: &str) -> Option<Vec<String>> {
    let start = payload.find("%>[")?;
    let rest = &payload[start + 3..];
    let end = rest.find(']')?;
    Some(split_list(&rest[..end]))
}

/// Pull a single inline `%>(x)` source.
pub fn inline_source_single(payload: &str) -> Option<String> {
    let start = payload.find("%>(")?;
    let rest = &payload[start + 3..];
    let end = rest.find(')')?;
    Some(rest[..end].trim().to_string())
}

/// Pull an inline `%+(axis)` created axis.
pub fn inline_create_axis(payload: &str) -> Option<String> {
    let start = payload.find("%+(")?;
    let rest = &payload[start + 3..];
    let end = rest.find(')')?;
    Some(rest[..end].trim().to_string())
}

/// Pull an inline `%-[a, b]` collapse list.
pub fn inline_collapse_axes(payload: &str) -> Option<Vec<String>> {
    let start = payload.find("%-[")?;
    let rest = &payload[start + 3..];
    let end = rest.find(']')?;
    Some(split_list(&rest[..end]))
}

/// Pull an inline `%<[a, b]` assign-source list (for `$.`).
pub fn inline_assign_sources(payload: &str) -> Option<Vec<String>> {
    let start = payload.find("%<[")?;
    let rest = &payload[start + 3..];
    let end = rest.find(']')?;
    Some(split_list(&rest[..end]))
}

fn split_list(text: &str) -> Vec<String> {
    text.split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

#[cfg(test)]
mod operators_tests {
    use super::*;

    #[test]
    fn classifies_semantic_operators() {
        assert_eq!(
            classify("::(add <:{1}> and <:{2}>)"),
            Some(OperatorHead::Imperative {
                instruction: "add <:{1}> and <:{2}>".into()
            })
        );
        assert_eq!(
            classify("::<all digits valid>"),
            Some(OperatorHead::Judgement {
                assertion: "all digits valid".into()
            })
        );
    }

    #[test]
    fn classifies_assigning_markers() {
        for marker in ['=', '%', '.', '+', '-'] {
            let text = format!("${marker}");
            match classify(&text) {
                Some(OperatorHead::Assign { marker: m, .. }) => assert_eq!(m, marker),
                other => panic!("expected assign for {text}, got {other:?}"),
            }
        }
        assert_eq!(classify("$?"), None);
    }

    #[test]
    fn classifies_grouping_with_payload() {
        let head = classify("&[#] %>[{a},{b}] %+(combined)").unwrap();
        match head {
            OperatorHead::Grouping { payload } => {
                assert_eq!(inline_source_list(&payload), Some(vec!["{a}".into(), "{b}".into()]));
                assert_eq!(inline_create_axis(&payload), Some("combined".into()));
                assert_eq!(inline_collapse_axes(&payload), None);
            }
            other => panic!("expected grouping, got {other:?}"),
        }
    }

    #[test]
    fn classifies_timing_forms() {
        assert_eq!(
            classify("@:'(<cond>)"),
            Some(OperatorHead::Timing {
                marker: normcode_core::TimingMarker::If,
                condition: "<cond>".into()
            })
        );
        assert_eq!(
            classify("@:!(<cond>)"),
            Some(OperatorHead::Timing {
                marker: normcode_core::TimingMarker::IfNot,
                condition: "<cond>".into()
            })
        );
        assert_eq!(
            classify("@.({dep})"),
            Some(OperatorHead::Timing {
                marker: normcode_core::TimingMarker::After,
                condition: "{dep}".into()
            })
        );
    }

    #[test]
    fn classifies_looping() {
        let head = classify("*every({number pair}) %+(digit position)").unwrap();
        match head {
            OperatorHead::Looping { base, payload } => {
                assert_eq!(base, "{number pair}");
                assert_eq!(inline_create_axis(&payload), Some("digit position".into()));
            }
            other => panic!("expected looping, got {other:?}"),
        }
    }

    #[test]
    fn syntactic_operators_take_precedence() {
        // `$.` even though a `::(...)` could be embedded in the payload.
        match classify("$. %>(::(x))") {
            Some(OperatorHead::Assign { marker: '.', .. }) => {}
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn unknown_text_is_not_an_operator() {
        assert_eq!(classify("{just a name}"), None);
    }
}
