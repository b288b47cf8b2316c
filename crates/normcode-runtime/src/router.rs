//! Body faculties and the perception router.
//!
//! A faculty is a named capability (LLM, filesystem, script executor, user
//! input) exposing affordances addressed as `faculty.affordance`. The
//! router owns the norm -> faculty mapping and is the only path from
//! sequences to I/O. It is read-only after construction; faculties must be
//! individually thread-safe because concurrent runs share them.

use std::collections::HashMap;
use std::sync::Arc;

use serde_json::Value;

use normcode_core::{Element, PerceptualSign};

use crate::cancel::CancelToken;

/// Failure inside one faculty call.
#[derive(Debug, Clone, thiserror::Error)]
pub enum FacultyError {
    #[error("affordance `{0}` is not exposed by this faculty")]
    UnknownAffordance(String),
    #[error("{0}")]
    Failed(String),
    #[error("cancelled")]
    Cancelled,
}

/// Router-level failures, surfaced to the calling sequence.
#[derive(Debug, Clone, thiserror::Error)]
pub enum RouterError {
    #[error("no faculty registered for norm `{0}`")]
    UnknownNorm(String),
    #[error("no faculty named `{0}`")]
    UnknownFaculty(String),
    #[error("faculty call failed: {0}")]
    FacultyFailure(#[source] FacultyError),
}

/// One body faculty: a named set of affordances plus sign materialization.
pub trait BodyFaculty: Send + Sync {
    fn name(&self) -> &str;

    /// Invoke a named affordance.
    fn invoke(
        &self,
        affordance: &str,
        args: &[Value],
        cancel: &CancelToken,
    ) -> Result<Value, FacultyError>;

    /// Materialize a sign routed to this faculty.
    fn materialize(
        &self,
        sign: &PerceptualSign,
        cancel: &CancelToken,
    ) -> Result<Element, FacultyError>;
}

/// The capability struct threaded through every sequence call.
pub struct PerceptionRouter {
    by_norm: HashMap<String, Arc<dyn BodyFaculty>>,
    by_name: HashMap<String, Arc<dyn BodyFaculty>>,
}

/// Builder so the router stays immutable once constructed.
#[derive(Default)]
pub struct RouterBuilder {
    by_norm: HashMap<String, Arc<dyn BodyFaculty>>,
    by_name: HashMap<String, Arc<dyn BodyFaculty>>,
}

impl RouterBuilder {
    /// Register a faculty and route the given norms to it.
    pub fn faculty(mut self, faculty: Arc<dyn BodyFaculty>, norms: &[&str]) -> Self {
        self.by_name
            .insert(faculty.name().to_string(), Arc::clone(&faculty));
        for norm in norms {
            self.by_norm.insert((*norm).to_string(), Arc::clone(&faculty));
        }
        self
    }

    pub fn build(self) -> PerceptionRouter {
        PerceptionRouter {
            by_norm: self.by_norm,
            by_name: self.by_name,
        }
    }
}

impl PerceptionRouter {
    pub fn builder() -> RouterBuilder {
        RouterBuilder::default()
    }

    /// Transmute a sign to a concrete element through its norm's faculty.
    pub fn transmute(
        &self,
        sign: &PerceptualSign,
        cancel: &CancelToken,
    ) -> Result<Element, RouterError> {
        let faculty = self
            .by_norm
            .get(sign.norm())
            .ok_or_else(|| RouterError::UnknownNorm(sign.norm().to_string()))?;
        faculty
            .materialize(sign, cancel)
            .map_err(RouterError::FacultyFailure)
    }

    /// The raw signifier, without invoking any faculty. Paradigms use this
    /// during vertical setup to read paths.
    pub fn strip_sign<'s>(&self, sign: &'s PerceptualSign) -> &'s str {
        sign.signifier()
    }

    /// Invoke `faculty.affordance` by fully qualified name.
    pub fn invoke(
        &self,
        qualified: &str,
        args: &[Value],
        cancel: &CancelToken,
    ) -> Result<Value, RouterError> {
        let (faculty_name, affordance) = qualified
            .split_once('.')
            .ok_or_else(|| RouterError::UnknownFaculty(qualified.to_string()))?;
        let faculty = self
            .by_name
            .get(faculty_name)
            .ok_or_else(|| RouterError::UnknownFaculty(faculty_name.to_string()))?;
        faculty
            .invoke(affordance, args, cancel)
            .map_err(RouterError::FacultyFailure)
    }

    pub fn has_faculty(&self, name: &str) -> bool {
        self.by_name.contains_key(name)
    }

    pub fn has_norm(&self, norm: &str) -> bool {
        self.by_norm.contains_key(norm)
    }
}

/// In-memory faculty for `literal`, `truth_value`, and `in-memory` norms.
///
/// Literal and truth-value signs materialize to their signifier; in-memory
/// signs materialize to values deposited at construction.
pub struct LiteralFaculty {
    slots: HashMap<String, Value>,
}

impl LiteralFaculty {
    pub fn new() -> Self {
        Self {
            slots: HashMap::new(),
        }
    }

    pub fn with_slot(mut self, key: impl Into<String>, value: Value) -> Self {
        self.slots.insert(key.into(), value);
        self
    }
}

impl Default for LiteralFaculty {
    fn default() -> Self {
        Self::new()
    }
}

impl BodyFaculty for LiteralFaculty {
    fn name(&self) -> &str {
        "literal_tool"
    }

    fn invoke(
        &self,
        affordance: &str,
        args: &[Value],
        _cancel: &CancelToken,
    ) -> Result<Value, FacultyError> {
        match affordance {
            // Pass-through used by identity-style compositions.
            "read_now" | "identity" => Ok(args.first().cloned().unwrap_or(Value::Null)),
            other => Err(FacultyError::UnknownAffordance(other.to_string())),
        }
    }

    fn materialize(
        &self,
        sign: &PerceptualSign,
        _cancel: &CancelToken,
    ) -> Result<Element, FacultyError> {
        match sign.norm() {
            normcode_core::sign::norm::LITERAL => Ok(Element::str(sign.signifier())),
            normcode_core::sign::norm::TRUTH_VALUE => Ok(Element::literal(
                sign.signifier() == "True" || sign.signifier() == "true",
            )),
            normcode_core::sign::norm::IN_MEMORY => self
                .slots
                .get(sign.signifier())
                .map(|v| Element::Concrete(v.clone()))
                .ok_or_else(|| {
                    FacultyError::Failed(format!("no in-memory slot `{}`", sign.signifier()))
                }),
            other => Err(FacultyError::Failed(format!(
                "literal faculty cannot materialize norm `{other}`"
            ))),
        }
    }
}

#[cfg(test)]
mod router_tests {
    use super::*;

    fn router() -> PerceptionRouter {
        PerceptionRouter::builder()
            .faculty(
                Arc::new(LiteralFaculty::new().with_slot("slot 4", Value::from(42))),
                &["literal", "truth_value", "in-memory"],
            )
            .build()
    }

    #[test]
    fn transmutes_literals() {
        let router = router();
        let cancel = CancelToken::new();
        let sign = PerceptualSign::new("literal", "123");
        assert_eq!(
            router.transmute(&sign, &cancel).unwrap(),
            Element::str("123")
        );
    }

    #[test]
    fn transmutes_truth_values() {
        let router = router();
        let cancel = CancelToken::new();
        assert_eq!(
            router
                .transmute(&PerceptualSign::truth(true), &cancel)
                .unwrap(),
            Element::literal(true)
        );
        assert_eq!(
            router
                .transmute(&PerceptualSign::truth(false), &cancel)
                .unwrap(),
            Element::literal(false)
        );
    }

    #[test]
    fn transmutes_in_memory_slots() {
        let router = router();
        let cancel = CancelToken::new();
        let sign = PerceptualSign::new("in-memory", "slot 4");
        assert_eq!(
            router.transmute(&sign, &cancel).unwrap(),
            Element::literal(42)
        );
    }

    #[test]
    fn unknown_norm_is_a_router_error() {
        let router = router();
        let cancel = CancelToken::new();
        let sign = PerceptualSign::new("file_location", "x.txt");
        assert!(matches!(
            router.transmute(&sign, &cancel),
            Err(RouterError::UnknownNorm(_))
        ));
    }

    #[test]
    fn strip_sign_never_touches_a_faculty() {
        let router = PerceptionRouter::builder().build();
        let sign = PerceptualSign::new("prompt_location", "prompts/x.md");
        assert_eq!(router.strip_sign(&sign), "prompts/x.md");
    }

    #[test]
    fn qualified_invoke_reaches_the_faculty() {
        let router = router();
        let cancel = CancelToken::new();
        let out = router
            .invoke("literal_tool.identity", &[Value::from("x")], &cancel)
            .unwrap();
        assert_eq!(out, Value::from("x"));
    }

    #[test]
    fn unknown_faculty_is_reported() {
        let router = router();
        let cancel = CancelToken::new();
        assert!(matches!(
            router.invoke("ghost.read", &[], &cancel),
            Err(RouterError::UnknownFaculty(_))
        ));
    }
}
