//! Tagged tensor elements.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::sign::PerceptualSign;

/// One position in a [`crate::Reference`].
///
/// `Skip` is the absence sentinel every algebra operation propagates.
/// `Tuple` holds grouped elements (from `cross_product`), keeping contained
/// signs un-transmuted until MVP.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "data", rename_all = "snake_case")]
pub enum Element {
    Skip,
    Sign(PerceptualSign),
    Concrete(Value),
    Tuple(Vec<Element>),
}

impl Element {
    pub fn literal(value: impl Into<Value>) -> Self {
        Element::Concrete(value.into())
    }

    pub fn str(value: impl Into<String>) -> Self {
        Element::Concrete(Value::String(value.into()))
    }

    pub fn is_skip(&self) -> bool {
        matches!(self, Element::Skip)
    }

    pub fn as_concrete(&self) -> Option<&Value> {
        match self {
            Element::Concrete(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        self.as_concrete().and_then(Value::as_str)
    }

    pub fn as_sign(&self) -> Option<&PerceptualSign> {
        match self {
            Element::Sign(s) => Some(s),
            _ => None,
        }
    }

    /// Truthiness per timing/judgement gates: `true`, `"True"`, `"true"`,
    /// or a `truth_value` sign reading `True`. `None` when the element does
    /// not carry a boolean reading at all.
    pub fn truthiness(&self) -> Option<bool> {
        match self {
            Element::Concrete(Value::Bool(b)) => Some(*b),
            Element::Concrete(Value::String(s)) => match s.as_str() {
                "True" | "true" => Some(true),
                "False" | "false" => Some(false),
                _ => None,
            },
            Element::Sign(sign) if sign.norm() == crate::sign::norm::TRUTH_VALUE => {
                match sign.signifier() {
                    "True" | "true" => Some(true),
                    "False" | "false" => Some(false),
                    _ => None,
                }
            }
            _ => None,
        }
    }

    /// Render for nested-JSON views: signs as canonical strings, SKIP as null.
    pub fn to_json(&self) -> Value {
        match self {
            Element::Skip => Value::Null,
            Element::Sign(sign) => Value::String(sign.to_string()),
            Element::Concrete(v) => v.clone(),
            Element::Tuple(items) => Value::Array(items.iter().map(Element::to_json).collect()),
        }
    }
}

impl From<PerceptualSign> for Element {
    fn from(sign: PerceptualSign) -> Self {
        Element::Sign(sign)
    }
}

impl From<Value> for Element {
    fn from(value: Value) -> Self {
        Element::Concrete(value)
    }
}
