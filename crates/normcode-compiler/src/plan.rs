//! Staged compilation facade.
//!
//! ```
//! use normcode_compiler::PlanBuilder;
//!
//! let compiled = PlanBuilder::new(
//!     ":<: {result}\n    <= $=\n    <- {x} | %{literal}: 5\n",
//! )
//! .validate_provisions(false)
//! .compile()
//! .expect("plan compiles");
//! assert_eq!(compiled.inference_repo.len(), 1);
//! ```
//!
//! Each stage owns the tree and hands it to the next; diagnostics
//! accumulate across stages and turn fatal only at activation.

use std::path::{Path, PathBuf};

use normcode_core::{ConceptRepo, InferenceRepo};

use crate::diagnostics::Diagnostics;
use crate::emit::{self, EmitMode};
use crate::parser::{Parser, PlanTree};
use crate::passes::{self, ActivateOptions};
use crate::{Error, Result};

/// Knobs for the whole pipeline.
#[derive(Debug, Clone)]
pub struct CompileConfig {
    pub parse_fuel: u32,
    pub max_depth: usize,
    pub validate_provisions: bool,
    pub base_dir: Option<PathBuf>,
}

impl Default for CompileConfig {
    fn default() -> Self {
        Self {
            parse_fuel: 1_000_000,
            max_depth: 256,
            validate_provisions: true,
            base_dir: None,
        }
    }
}

/// Entry point of the staged pipeline.
pub struct PlanBuilder {
    source: String,
    config: CompileConfig,
}

impl PlanBuilder {
    pub fn new(source: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            config: CompileConfig::default(),
        }
    }

    pub fn with_parse_fuel(mut self, fuel: u32) -> Self {
        self.config.parse_fuel = fuel;
        self
    }

    pub fn with_max_depth(mut self, depth: usize) -> Self {
        self.config.max_depth = depth;
        self
    }

    pub fn validate_provisions(mut self, value: bool) -> Self {
        self.config.validate_provisions = value;
        self
    }

    pub fn base_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.base_dir = Some(dir.into());
        self
    }

    /// Pass 1: parse the draft and check the bottom-up discipline.
    pub fn parse(self) -> Result<PlanParsed> {
        let outcome = Parser::new(&self.source)
            .with_fuel(self.config.parse_fuel)
            .with_max_depth(self.config.max_depth)
            .parse()?;
        let mut diagnostics = outcome.diagnostics;
        passes::check_draft(&outcome.tree, &mut diagnostics);
        Ok(PlanParsed {
            source: self.source,
            config: self.config,
            tree: outcome.tree,
            diagnostics,
        })
    }

    /// All four passes in one go (the combined workflow).
    pub fn compile(self) -> Result<CompiledPlan> {
        self.parse()?.formalize().post_formalize().activate()
    }
}

macro_rules! stage_accessors {
    () => {
        pub fn tree(&self) -> &PlanTree {
            &self.tree
        }

        pub fn diagnostics(&self) -> &Diagnostics {
            &self.diagnostics
        }

        pub fn is_valid(&self) -> bool {
            !self.diagnostics.has_errors()
        }

        pub fn source(&self) -> &str {
            &self.source
        }

        pub fn dump(&self) -> String {
            emit::dump_tree(&self.tree)
        }
    };
}

/// Output of pass 1.
pub struct PlanParsed {
    source: String,
    config: CompileConfig,
    tree: PlanTree,
    diagnostics: Diagnostics,
}

impl PlanParsed {
    stage_accessors!();

    pub fn emit(&self) -> String {
        emit::emit_text(&self.tree, EmitMode::Draft)
    }

    /// Pass 2: flow indices, sequence kinds, semantic types.
    pub fn formalize(mut self) -> PlanFormalized {
        passes::formalize(&mut self.tree, &mut self.diagnostics);
        PlanFormalized {
            source: self.source,
            config: self.config,
            tree: self.tree,
            diagnostics: self.diagnostics,
        }
    }
}

/// Output of pass 2.
pub struct PlanFormalized {
    source: String,
    config: CompileConfig,
    tree: PlanTree,
    diagnostics: Diagnostics,
}

impl PlanFormalized {
    stage_accessors!();

    pub fn emit(&self) -> String {
        emit::emit_text(&self.tree, EmitMode::Formalized)
    }

    /// Pass 3: composition, provision, and shape annotations.
    pub fn post_formalize(mut self) -> PlanAnnotated {
        passes::post_formalize(&mut self.tree, &mut self.diagnostics);
        PlanAnnotated {
            source: self.source,
            config: self.config,
            tree: self.tree,
            diagnostics: self.diagnostics,
        }
    }
}

/// Output of pass 3.
pub struct PlanAnnotated {
    source: String,
    config: CompileConfig,
    tree: PlanTree,
    diagnostics: Diagnostics,
}

impl PlanAnnotated {
    stage_accessors!();

    pub fn emit(&self) -> String {
        emit::emit_text(&self.tree, EmitMode::PostFormalized)
    }

    /// Pass 4: produce the repositories. Any accumulated error is fatal
    /// here.
    pub fn activate(mut self) -> Result<CompiledPlan> {
        let options = ActivateOptions {
            validate_provisions: self.config.validate_provisions,
            base_dir: self.config.base_dir.clone(),
        };
        let (concept_repo, inference_repo) =
            passes::activate(&self.tree, &mut self.diagnostics, &options);
        if self.diagnostics.has_errors() {
            return Err(Error::CompileFailed(self.diagnostics));
        }
        Ok(CompiledPlan {
            concept_repo,
            inference_repo,
            diagnostics: self.diagnostics,
        })
    }
}

/// The two repositories the runtime consumes.
#[derive(Debug)]
pub struct CompiledPlan {
    pub concept_repo: ConceptRepo,
    pub inference_repo: InferenceRepo,
    /// Warnings that survived compilation.
    pub diagnostics: Diagnostics,
}

impl CompiledPlan {
    /// Write `concept_repo.json` and `inference_repo.json`.
    pub fn save_to_dir(&self, dir: &Path) -> Result<()> {
        std::fs::create_dir_all(dir)?;
        std::fs::write(
            dir.join("concept_repo.json"),
            serde_json::to_string_pretty(&self.concept_repo.to_json_array())
                .expect("repo serializes"),
        )?;
        std::fs::write(
            dir.join("inference_repo.json"),
            serde_json::to_string_pretty(&self.inference_repo.to_json_array())
                .expect("repo serializes"),
        )?;
        Ok(())
    }

    pub fn load_from_dir(dir: &Path) -> Result<Self> {
        let concepts = std::fs::read_to_string(dir.join("concept_repo.json"))?;
        let inferences = std::fs::read_to_string(dir.join("inference_repo.json"))?;
        Ok(Self {
            concept_repo: ConceptRepo::from_json_array(&concepts)?,
            inference_repo: InferenceRepo::from_json_array(&inferences)?,
            diagnostics: Diagnostics::new(),
        })
    }
}
