//! The two compiled artifacts: concept and inference repositories.
//!
//! Both serialize as JSON arrays (`concept_repo.json`,
//! `inference_repo.json`). The concept repository additionally owns the
//! current Reference bindings at runtime; those are not part of the
//! artifact and travel in checkpoint snapshots instead.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::concept::{Concept, ConceptId};
use crate::flow::FlowIndex;
use crate::inference::Inference;
use crate::reference::Reference;

#[derive(Debug, Clone, thiserror::Error)]
pub enum RepoError {
    #[error("duplicate concept id `{0}`")]
    DuplicateConcept(ConceptId),
    #[error("duplicate flow index `{0}`")]
    DuplicateFlowIndex(FlowIndex),
    #[error("unknown concept id `{0}`")]
    UnknownConcept(ConceptId),
    #[error("malformed repository: {0}")]
    Malformed(String),
}

/// Concepts plus their current Reference bindings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConceptRepo {
    concepts: IndexMap<ConceptId, Concept>,
    #[serde(default)]
    bindings: IndexMap<ConceptId, Reference>,
}

impl ConceptRepo {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, concept: Concept) -> Result<(), RepoError> {
        if self.concepts.contains_key(&concept.id) {
            return Err(RepoError::DuplicateConcept(concept.id));
        }
        self.concepts.insert(concept.id.clone(), concept);
        Ok(())
    }

    pub fn get(&self, id: &ConceptId) -> Option<&Concept> {
        self.concepts.get(id)
    }

    pub fn get_mut(&mut self, id: &ConceptId) -> Option<&mut Concept> {
        self.concepts.get_mut(id)
    }

    pub fn contains(&self, id: &ConceptId) -> bool {
        self.concepts.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.concepts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.concepts.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&ConceptId, &Concept)> {
        self.concepts.iter()
    }

    /// Find a concept by its bracketed name.
    pub fn by_name(&self, name: &str) -> Option<&Concept> {
        self.concepts.values().find(|c| c.name == name)
    }

    /// Current Reference bound to a concept, if any.
    pub fn binding(&self, id: &ConceptId) -> Option<&Reference> {
        self.bindings.get(id)
    }

    /// Atomically (re)bind a concept's Reference.
    pub fn bind(&mut self, id: &ConceptId, reference: Reference) -> Result<(), RepoError> {
        if !self.concepts.contains_key(id) {
            return Err(RepoError::UnknownConcept(id.clone()));
        }
        self.bindings.insert(id.clone(), reference);
        Ok(())
    }

    pub fn unbind(&mut self, id: &ConceptId) {
        self.bindings.shift_remove(id);
    }

    pub fn bindings(&self) -> &IndexMap<ConceptId, Reference> {
        &self.bindings
    }

    pub fn replace_bindings(&mut self, bindings: IndexMap<ConceptId, Reference>) {
        self.bindings = bindings;
    }

    /// Seed bindings from `reference_data` of ground concepts.
    pub fn bind_grounds(&mut self) {
        let seeds: Vec<(ConceptId, Reference)> = self
            .concepts
            .values()
            .filter(|c| c.is_ground)
            .filter_map(|c| c.reference_data.clone().map(|r| (c.id.clone(), r)))
            .collect();
        for (id, r) in seeds {
            self.bindings.insert(id, r);
        }
    }

    /// Artifact form: a JSON array of concepts, bindings excluded.
    pub fn to_json_array(&self) -> serde_json::Value {
        serde_json::Value::Array(
            self.concepts
                .values()
                .map(|c| serde_json::to_value(c).expect("concept serializes"))
                .collect(),
        )
    }

    pub fn from_json_array(json: &str) -> Result<Self, RepoError> {
        let concepts: Vec<Concept> =
            serde_json::from_str(json).map_err(|e| RepoError::Malformed(e.to_string()))?;
        let mut repo = Self::new();
        for c in concepts {
            repo.insert(c)?;
        }
        Ok(repo)
    }
}

/// The compiled inferences, iterated in flow-index order.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct InferenceRepo {
    inferences: IndexMap<FlowIndex, Inference>,
}

impl InferenceRepo {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, inference: Inference) -> Result<(), RepoError> {
        if self.inferences.contains_key(&inference.flow_index) {
            return Err(RepoError::DuplicateFlowIndex(inference.flow_index));
        }
        self.inferences
            .insert(inference.flow_index.clone(), inference);
        self.inferences
            .sort_by(|a, _, b, _| a.cmp(b));
        Ok(())
    }

    pub fn get(&self, flow_index: &FlowIndex) -> Option<&Inference> {
        self.inferences.get(flow_index)
    }

    pub fn len(&self) -> usize {
        self.inferences.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inferences.is_empty()
    }

    /// Ascending flow-index order.
    pub fn iter(&self) -> impl Iterator<Item = &Inference> {
        self.inferences.values()
    }

    /// Inferences strictly inside the subtree rooted at `root`.
    pub fn descendants_of<'a>(
        &'a self,
        root: &'a FlowIndex,
    ) -> impl Iterator<Item = &'a Inference> {
        self.inferences
            .values()
            .filter(move |inf| root.is_ancestor_of(&inf.flow_index))
    }

    /// The inference producing `concept`, if any.
    pub fn producer_of(&self, concept: &ConceptId) -> Option<&Inference> {
        self.inferences
            .values()
            .find(|inf| &inf.concept_to_infer == concept)
    }

    /// Inferences consuming `concept` as value or context input.
    pub fn consumers_of<'a>(
        &'a self,
        concept: &'a ConceptId,
    ) -> impl Iterator<Item = &'a Inference> {
        self.inferences.values().filter(move |inf| {
            inf.value_concepts.contains(concept) || inf.context_concepts.contains(concept)
        })
    }

    pub fn to_json_array(&self) -> serde_json::Value {
        serde_json::Value::Array(
            self.inferences
                .values()
                .map(|i| serde_json::to_value(i).expect("inference serializes"))
                .collect(),
        )
    }

    pub fn from_json_array(json: &str) -> Result<Self, RepoError> {
        let inferences: Vec<Inference> =
            serde_json::from_str(json).map_err(|e| RepoError::Malformed(e.to_string()))?;
        let mut repo = Self::new();
        for inf in inferences {
            repo.insert(inf)?;
        }
        Ok(repo)
    }
}
