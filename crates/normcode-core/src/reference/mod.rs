//! Named-axis tensors bound to concepts at runtime.
//!
//! A [`Reference`] is a dense row-major tensor whose axes are named and
//! whose elements are tagged ([`Element`]): concrete values, un-transmuted
//! perceptual signs, or the `SKIP` sentinel. Every operation is total and
//! propagates SKIP explicitly.
//!
//! Invariants, checked by every constructor:
//! - axis names are unique within a Reference
//! - `axes.len() == shape.len()`
//! - every shape entry is strictly positive
//! - `elements.len()` equals the product of the shape

mod ops;

#[cfg(test)]
mod ops_tests;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::element::Element;

pub use ops::{ActionError, ActionOutput, cross_action, cross_product, element_action,
    element_action_indexed, join};

/// The degenerate axis carried by singleton References, shape `(1,)`.
pub const NONE_AXIS: &str = "_none_axis";

/// Errors from reference algebra operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ReferenceError {
    #[error("shape error: {0}")]
    Shape(String),
    #[error("axis mismatch: {0}")]
    AxisMismatch(String),
    #[error("unknown axis `{0}`")]
    UnknownAxis(String),
    #[error("index {index} out of range for axis `{axis}` (size {size})")]
    OutOfRange {
        axis: String,
        index: usize,
        size: usize,
    },
}

/// A named-axis tensor of [`Element`]s.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reference {
    axes: Vec<String>,
    shape: Vec<usize>,
    elements: Vec<Element>,
}

impl Reference {
    /// Build a Reference, validating all structural invariants.
    pub fn new(
        axes: Vec<String>,
        shape: Vec<usize>,
        elements: Vec<Element>,
    ) -> Result<Self, ReferenceError> {
        if axes.len() != shape.len() {
            return Err(ReferenceError::Shape(format!(
                "{} axes but {} shape entries",
                axes.len(),
                shape.len()
            )));
        }
        for (i, a) in axes.iter().enumerate() {
            if axes[..i].contains(a) {
                return Err(ReferenceError::AxisMismatch(format!(
                    "duplicate axis `{a}`"
                )));
            }
        }
        if shape.iter().any(|&d| d == 0) {
            return Err(ReferenceError::Shape(
                "shape entries must be strictly positive".to_string(),
            ));
        }
        let expected: usize = shape.iter().product();
        if elements.len() != expected {
            return Err(ReferenceError::Shape(format!(
                "shape {shape:?} holds {expected} elements, got {}",
                elements.len()
            )));
        }
        Ok(Self {
            axes,
            shape,
            elements,
        })
    }

    /// A `(1,)` Reference on `_none_axis` holding one element.
    pub fn singleton(element: Element) -> Self {
        Self {
            axes: vec![NONE_AXIS.to_string()],
            shape: vec![1],
            elements: vec![element],
        }
    }

    /// A 1-D Reference along `axis`.
    pub fn from_elements(
        axis: impl Into<String>,
        elements: Vec<Element>,
    ) -> Result<Self, ReferenceError> {
        let len = elements.len();
        Self::new(vec![axis.into()], vec![len], elements)
    }

    /// A Reference of the given frame with every position set to `fill`.
    pub fn filled(
        axes: Vec<String>,
        shape: Vec<usize>,
        fill: Element,
    ) -> Result<Self, ReferenceError> {
        let count = shape.iter().product();
        Self::new(axes, shape, vec![fill; count])
    }

    pub fn axes(&self) -> &[String] {
        &self.axes
    }

    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    pub fn elements(&self) -> &[Element] {
        &self.elements
    }

    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    pub fn has_axis(&self, axis: &str) -> bool {
        self.axes.iter().any(|a| a == axis)
    }

    pub fn axis_position(&self, axis: &str) -> Option<usize> {
        self.axes.iter().position(|a| a == axis)
    }

    pub fn axis_size(&self, axis: &str) -> Option<usize> {
        self.axis_position(axis).map(|i| self.shape[i])
    }

    /// Row-major offset of a full index vector.
    fn offset(&self, index: &[usize]) -> usize {
        let mut offset = 0;
        for (i, &ix) in index.iter().enumerate() {
            offset = offset * self.shape[i] + ix;
        }
        offset
    }

    /// Resolve a coordinate map to a full index vector.
    ///
    /// Axes missing from `coords` project to index 0; coordinate keys naming
    /// axes this Reference lacks are ignored (broadcast read).
    fn resolve(&self, coords: &[(&str, usize)]) -> Result<Vec<usize>, ReferenceError> {
        let mut index = vec![0; self.axes.len()];
        for (i, axis) in self.axes.iter().enumerate() {
            if let Some(&(_, ix)) = coords.iter().find(|(a, _)| a == axis) {
                if ix >= self.shape[i] {
                    return Err(ReferenceError::OutOfRange {
                        axis: axis.clone(),
                        index: ix,
                        size: self.shape[i],
                    });
                }
                index[i] = ix;
            }
        }
        Ok(index)
    }

    /// Read one element. Missing axes project, extra coordinates broadcast.
    pub fn get(&self, coords: &[(&str, usize)]) -> Result<&Element, ReferenceError> {
        let index = self.resolve(coords)?;
        Ok(&self.elements[self.offset(&index)])
    }

    /// Write one element. The shape must already accommodate the index.
    pub fn set(
        &mut self,
        element: Element,
        coords: &[(&str, usize)],
    ) -> Result<(), ReferenceError> {
        for (axis, _) in coords {
            if !self.has_axis(axis) {
                return Err(ReferenceError::UnknownAxis((*axis).to_string()));
            }
        }
        let index = self.resolve(coords)?;
        let offset = self.offset(&index);
        self.elements[offset] = element;
        Ok(())
    }

    /// Restrict to the listed axes.
    ///
    /// Collapsed axes must have size 1. Zero axes to keep yields a `(1,)`
    /// singleton on `_none_axis` holding the whole tensor as nested JSON.
    pub fn slice(&self, axes_to_keep: &[&str]) -> Result<Reference, ReferenceError> {
        for axis in axes_to_keep {
            if !self.has_axis(axis) {
                return Err(ReferenceError::UnknownAxis((*axis).to_string()));
            }
        }
        if axes_to_keep.is_empty() {
            return Ok(Reference::singleton(Element::Concrete(self.to_nested_json())));
        }

        let mut kept_axes = Vec::new();
        let mut kept_shape = Vec::new();
        for (i, axis) in self.axes.iter().enumerate() {
            if axes_to_keep.contains(&axis.as_str()) {
                kept_axes.push(axis.clone());
                kept_shape.push(self.shape[i]);
            } else if self.shape[i] != 1 {
                return Err(ReferenceError::Shape(format!(
                    "cannot collapse axis `{axis}` of size {}",
                    self.shape[i]
                )));
            }
        }

        let mut elements = Vec::with_capacity(kept_shape.iter().product());
        for index in IndexIter::new(&kept_shape) {
            let coords: Vec<(&str, usize)> = kept_axes
                .iter()
                .map(String::as_str)
                .zip(index.iter().copied())
                .collect();
            elements.push(self.get(&coords)?.clone());
        }
        Reference::new(kept_axes, kept_shape, elements)
    }

    /// Append `other` along `by_axis`. See the module docs of [`ops`] for
    /// the three patterns (shared axis, broadcast slab, fresh axis).
    pub fn append(&self, other: &Reference, by_axis: &str) -> Result<Reference, ReferenceError> {
        ops::append(self, other, by_axis)
    }

    /// Nested-JSON rendering, outermost axis first.
    pub fn to_nested_json(&self) -> Value {
        fn build(r: &Reference, axis: usize, prefix: &mut Vec<usize>) -> Value {
            if axis == r.shape.len() {
                return r.elements[r.offset(prefix)].to_json();
            }
            let mut items = Vec::with_capacity(r.shape[axis]);
            for i in 0..r.shape[axis] {
                prefix.push(i);
                items.push(build(r, axis + 1, prefix));
                prefix.pop();
            }
            Value::Array(items)
        }
        build(self, 0, &mut Vec::new())
    }

    /// Iterate (full index vector, element) in row-major order.
    pub fn iter_indexed(&self) -> impl Iterator<Item = (Vec<usize>, &Element)> {
        IndexIter::new(&self.shape)
            .map(|index| {
                let offset = self.offset(&index);
                (index, &self.elements[offset])
            })
    }

    /// True when any element is SKIP.
    pub fn has_skip(&self) -> bool {
        self.elements.iter().any(Element::is_skip)
    }
}

/// Row-major odometer over a shape.
pub(crate) struct IndexIter {
    shape: Vec<usize>,
    next: Option<Vec<usize>>,
}

impl IndexIter {
    pub(crate) fn new(shape: &[usize]) -> Self {
        let next = if shape.iter().any(|&d| d == 0) {
            None
        } else {
            Some(vec![0; shape.len()])
        };
        Self {
            shape: shape.to_vec(),
            next,
        }
    }
}

impl Iterator for IndexIter {
    type Item = Vec<usize>;

    fn next(&mut self) -> Option<Vec<usize>> {
        let current = self.next.clone()?;
        // Advance the odometer, rightmost digit fastest.
        let mut index = current.clone();
        let mut done = true;
        for i in (0..index.len()).rev() {
            index[i] += 1;
            if index[i] < self.shape[i] {
                done = false;
                break;
            }
            index[i] = 0;
        }
        self.next = if done || index.is_empty() { None } else { Some(index) };
        Some(current)
    }
}
