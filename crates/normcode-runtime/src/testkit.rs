//! Deterministic faculties for tests and examples.

use std::collections::HashMap;

use serde_json::Value;

use normcode_core::{Element, PerceptualSign};

use crate::cancel::CancelToken;
use crate::router::{BodyFaculty, FacultyError};

type Affordance = Box<dyn Fn(&[Value]) -> Result<Value, FacultyError> + Send + Sync>;

/// A faculty whose affordances are plain closures, replayed
/// deterministically. Scenario tests script their bodies with this.
pub struct ScriptedFaculty {
    name: String,
    affordances: HashMap<String, Affordance>,
}

impl ScriptedFaculty {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            affordances: HashMap::new(),
        }
    }

    pub fn affordance(
        mut self,
        name: impl Into<String>,
        f: impl Fn(&[Value]) -> Result<Value, FacultyError> + Send + Sync + 'static,
    ) -> Self {
        self.affordances.insert(name.into(), Box::new(f));
        self
    }
}

impl BodyFaculty for ScriptedFaculty {
    fn name(&self) -> &str {
        &self.name
    }

    fn invoke(
        &self,
        affordance: &str,
        args: &[Value],
        cancel: &CancelToken,
    ) -> Result<Value, FacultyError> {
        if cancel.is_cancelled() {
            return Err(FacultyError::Cancelled);
        }
        let f = self
            .affordances
            .get(affordance)
            .ok_or_else(|| FacultyError::UnknownAffordance(affordance.to_string()))?;
        f(args)
    }

    fn materialize(
        &self,
        sign: &PerceptualSign,
        cancel: &CancelToken,
    ) -> Result<Element, FacultyError> {
        if cancel.is_cancelled() {
            return Err(FacultyError::Cancelled);
        }
        // Scripted bodies materialize signs through a `materialize`
        // affordance when one is registered, else echo the signifier.
        if let Some(f) = self.affordances.get("materialize") {
            return f(&[Value::String(sign.signifier().to_string())])
                .map(Element::Concrete);
        }
        Ok(Element::str(sign.signifier()))
    }
}
