//! Declarative paradigms and their composition engine.
//!
//! A paradigm document names horizontal inputs (`h_*`), optional vertical
//! inputs (`v_*`), composition steps (`c_*`), and an output format (`o_*`).
//! Execution follows `Output = (F_C(F_V(S, V_spec), H_plan))(V_runtime)`:
//!
//! - `F_V` runs during MFP: vertical steps resolve resources (strip the
//!   sign, read the template) and deposit artifacts into the composition
//!   context. All resource reads happen here, never mid-composition.
//! - `F_C` orders the horizontal steps into a single callable.
//! - The callable applies to the values MVP perceived, once per element.
//!
//! The loader is an extension point: any JSON document passing the naming
//! and schema checks participates; there is no built-in registry.

use std::path::Path;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use normcode_core::Reference;

use crate::cancel::CancelToken;
use crate::router::{PerceptionRouter, RouterError};

/// Output suffixes that materialize as perceptual signs.
const SIGN_OUTPUTS: &[&str] = &["Boolean", "FileLocation"];

#[derive(Debug, thiserror::Error)]
pub enum ParadigmError {
    #[error("paradigm `{0}` is not loaded")]
    ParadigmNotFound(String),
    #[error("paradigm schema error: {0}")]
    ParadigmSchemaError(String),
    #[error("tool `{0}` is not registered with the body")]
    ToolNotRegistered(String),
    #[error("composition context error: {0}")]
    CompositionContextError(String),
    #[error(transparent)]
    Router(#[from] RouterError),
    #[error("io error reading paradigm: {0}")]
    Io(#[from] std::io::Error),
}

/// Which phase a composition step belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepPhase {
    /// Runs during MFP (setup, resource reads).
    Vertical,
    /// Runs inside the composed callable, once per element.
    #[default]
    Horizontal,
}

/// One composition step: a fully qualified tool plus input references.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompositionStep {
    /// Step name, `c_*`; later steps reference earlier results by it.
    pub step: String,
    /// Fully qualified affordance, `faculty.affordance`. Must match the
    /// body's registry exactly.
    pub tool: String,
    /// Input references: `h_*` positions, `v_*` artifacts, or `c_*`
    /// results of earlier steps.
    #[serde(default)]
    pub inputs: Vec<String>,
    #[serde(default)]
    pub phase: StepPhase,
}

/// A declarative paradigm document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParadigmSpec {
    /// Mechanical name: `[h_...][v_...]-c_...-o_....`
    pub name: String,
    #[serde(default)]
    pub h_inputs: Vec<String>,
    #[serde(default)]
    pub v_inputs: Vec<String>,
    pub composition: Vec<CompositionStep>,
    /// Output format, `o_*`. Anything that is not a sign output must start
    /// with `Literal`.
    pub output: String,
}

impl ParadigmSpec {
    /// Schema and naming checks.
    pub fn validate(&self) -> Result<(), ParadigmError> {
        if !self.name.contains("-c_") || !self.name.contains("-o_") {
            return Err(ParadigmError::ParadigmSchemaError(format!(
                "paradigm name `{}` does not follow `[h_...][v_...]-c_...-o_...`",
                self.name
            )));
        }
        let Some(suffix) = self.output.strip_prefix("o_") else {
            return Err(ParadigmError::ParadigmSchemaError(format!(
                "output `{}` must start with `o_`",
                self.output
            )));
        };
        if !SIGN_OUTPUTS.contains(&suffix) && !suffix.starts_with("Literal") {
            return Err(ParadigmError::ParadigmSchemaError(format!(
                "non-sign output `{}` must start with `Literal`",
                self.output
            )));
        }
        if self.composition.is_empty() {
            return Err(ParadigmError::ParadigmSchemaError(
                "paradigm has no composition steps".to_string(),
            ));
        }
        for step in &self.composition {
            if !step.step.starts_with("c_") {
                return Err(ParadigmError::ParadigmSchemaError(format!(
                    "step `{}` must be named `c_*`",
                    step.step
                )));
            }
            if !step.tool.contains('.') {
                return Err(ParadigmError::ParadigmSchemaError(format!(
                    "tool `{}` is not fully qualified (`faculty.affordance`)",
                    step.tool
                )));
            }
        }
        Ok(())
    }

    /// Does the output materialize as a list (one axis per element)?
    pub fn is_list_output(&self) -> bool {
        self.output == "o_ListLiteral"
    }

    pub fn is_boolean_output(&self) -> bool {
        self.output == "o_Boolean"
    }
}

/// Loaded paradigms, keyed by name.
#[derive(Default)]
pub struct ParadigmLibrary {
    specs: IndexMap<String, ParadigmSpec>,
}

impl ParadigmLibrary {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, spec: ParadigmSpec) -> Result<(), ParadigmError> {
        spec.validate()?;
        self.specs.insert(spec.name.clone(), spec);
        Ok(())
    }

    /// Load every `*.json` document in a directory.
    pub fn from_dir(dir: &Path) -> Result<Self, ParadigmError> {
        let mut library = Self::new();
        for entry in std::fs::read_dir(dir)? {
            let path = entry?.path();
            if path.extension().is_some_and(|e| e == "json") {
                let text = std::fs::read_to_string(&path)?;
                let spec: ParadigmSpec = serde_json::from_str(&text)
                    .map_err(|e| ParadigmError::ParadigmSchemaError(e.to_string()))?;
                library.insert(spec)?;
            }
        }
        Ok(library)
    }

    pub fn get(&self, name: &str) -> Result<&ParadigmSpec, ParadigmError> {
        self.specs
            .get(name)
            .ok_or_else(|| ParadigmError::ParadigmNotFound(name.to_string()))
    }

    pub fn len(&self) -> usize {
        self.specs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.specs.is_empty()
    }
}

/// The callable produced by MFP: vertical artifacts plus the ordered
/// horizontal plan.
pub struct ComposedFunction {
    paradigm: String,
    output: String,
    h_inputs: Vec<String>,
    context: IndexMap<String, Value>,
    horizontal: Vec<CompositionStep>,
}

impl ComposedFunction {
    pub fn paradigm(&self) -> &str {
        &self.paradigm
    }

    pub fn is_list_output(&self) -> bool {
        self.output == "o_ListLiteral"
    }

    pub fn is_boolean_output(&self) -> bool {
        self.output == "o_Boolean"
    }

    /// Apply the composed function to one tuple of horizontal values,
    /// bound to the paradigm's `h_*` names by position.
    pub fn apply(
        &self,
        args: &[Value],
        router: &PerceptionRouter,
        cancel: &CancelToken,
    ) -> Result<Value, ParadigmError> {
        let mut context = self.context.clone();
        for (name, value) in self.h_inputs.iter().zip(args) {
            context.insert(name.clone(), value.clone());
        }

        let mut last = Value::Null;
        for step in &self.horizontal {
            let inputs = resolve_inputs(&context, step)?;
            last = router.invoke(&step.tool, &inputs, cancel)?;
            context.insert(step.step.clone(), last.clone());
        }
        Ok(last)
    }
}

/// MFP: run vertical setup and compose the callable.
///
/// `vertical_state` is the function concept's Reference; its first element
/// must be a sign whose stripped signifier seeds every `v_*` input.
pub fn prepare(
    spec: &ParadigmSpec,
    vertical_state: Option<&Reference>,
    router: &PerceptionRouter,
    cancel: &CancelToken,
) -> Result<ComposedFunction, ParadigmError> {
    // The tool registry is checked up front so a missing faculty fails in
    // MFP rather than mid-composition.
    for step in &spec.composition {
        let faculty = step.tool.split('.').next().unwrap_or(&step.tool);
        if !router.has_faculty(faculty) {
            return Err(ParadigmError::ToolNotRegistered(step.tool.clone()));
        }
    }

    let mut context: IndexMap<String, Value> = IndexMap::new();
    if !spec.v_inputs.is_empty() {
        let sign = vertical_state
            .and_then(|r| r.elements().first())
            .and_then(|e| e.as_sign())
            .ok_or_else(|| {
                ParadigmError::CompositionContextError(format!(
                    "paradigm `{}` needs a vertical sign but none is bound",
                    spec.name
                ))
            })?;
        let path = router.strip_sign(sign);
        for v in &spec.v_inputs {
            context.insert(v.clone(), Value::String(path.to_string()));
        }
    }

    let mut horizontal = Vec::new();
    for step in &spec.composition {
        match step.phase {
            StepPhase::Vertical => {
                let inputs = resolve_inputs(&context, step)?;
                let out = router.invoke(&step.tool, &inputs, cancel)?;
                context.insert(step.step.clone(), out);
            }
            StepPhase::Horizontal => horizontal.push(step.clone()),
        }
    }

    Ok(ComposedFunction {
        paradigm: spec.name.clone(),
        output: spec.output.clone(),
        h_inputs: spec.h_inputs.clone(),
        context,
        horizontal,
    })
}

fn resolve_inputs(
    context: &IndexMap<String, Value>,
    step: &CompositionStep,
) -> Result<Vec<Value>, ParadigmError> {
    step.inputs
        .iter()
        .map(|name| {
            context.get(name).cloned().ok_or_else(|| {
                ParadigmError::CompositionContextError(format!(
                    "step `{}` references `{name}`, which is not in the composition context",
                    step.step
                ))
            })
        })
        .collect()
}

