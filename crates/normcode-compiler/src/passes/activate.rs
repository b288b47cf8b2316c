//! Pass 4 — activation.
//!
//! Consumes the annotated tree and produces the two repositories. This is
//! where working interpretations are built and validated per sequence, and
//! where provision paths are actually checked against the filesystem.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use serde_json::Value;

use normcode_core::{
    AssertionCondition, AssignSpec, AssigningWi, Concept, ConceptId, ConceptRepo, Element,
    ElementType, GroupingMarker, GroupingWi, ImperativeWi, Inference, InferenceRepo, JudgementWi,
    LoopingWi, PerceptualSign, Quantifier, Reference, SemanticKind, SequenceKind, TimingWi,
    ValueSelector, WorkingInterpretation, NONE_AXIS,
};

use crate::diagnostics::{DiagnosticKind, Diagnostics};
use crate::parser::{Clausal, Marker, NodeId, PlanTree};

use super::operators::{self, OperatorHead};
use super::post_formalize::provision_of;

/// Options governing activation.
#[derive(Debug, Clone)]
pub struct ActivateOptions {
    /// Check provisioned paths against the filesystem.
    pub validate_provisions: bool,
    /// Directory provision paths resolve against.
    pub base_dir: Option<PathBuf>,
}

impl Default for ActivateOptions {
    fn default() -> Self {
        Self {
            validate_provisions: true,
            base_dir: None,
        }
    }
}

pub fn activate(
    tree: &PlanTree,
    diagnostics: &mut Diagnostics,
    options: &ActivateOptions,
) -> (ConceptRepo, InferenceRepo) {
    let mut builder = Activation {
        tree,
        diagnostics,
        options,
        value_ids: IndexMap::new(),
        function_ids: IndexMap::new(),
        concepts: ConceptRepo::new(),
        inferences: InferenceRepo::new(),
    };
    builder.run();
    (builder.concepts, builder.inferences)
}

struct Activation<'a> {
    tree: &'a PlanTree,
    diagnostics: &'a mut Diagnostics,
    options: &'a ActivateOptions,
    /// Concept name -> value concept id, in first-appearance order.
    value_ids: IndexMap<String, ConceptId>,
    /// Functional text -> function concept id.
    function_ids: IndexMap<String, ConceptId>,
    concepts: ConceptRepo,
    inferences: InferenceRepo,
}

impl<'a> Activation<'a> {
    fn run(&mut self) {
        self.collect_concepts();
        self.build_inferences();
        if self.options.validate_provisions {
            self.validate_provisions();
        }
    }

    // -- concepts ----------------------------------------------------------

    fn collect_concepts(&mut self) {
        let input_ids: Vec<NodeId> = self.tree.inputs().to_vec();
        for id in input_ids.into_iter().chain(self.tree.walk()) {
            let node = self.tree.node(id);
            if node.marker == Marker::Functional {
                self.intern_function(id);
            } else {
                self.intern_value(id);
            }
        }
    }

    fn intern_value(&mut self, id: NodeId) -> ConceptId {
        let node = self.tree.node(id);
        if let Some(existing) = self.value_ids.get(&node.name) {
            let existing = existing.clone();
            if let Some(concept) = self.concepts.get_mut(&existing) {
                if let Some(flow) = &node.flow_index {
                    if !concept.flow_indices.contains(flow) {
                        concept.flow_indices.push(flow.clone());
                    }
                }
                if node.annotation_value("is_invariant") == Some("true") {
                    concept.is_invariant = true;
                }
            }
            return existing;
        }

        let concept_id = ConceptId::value(self.value_ids.len() + 1);
        self.value_ids
            .insert(node.name.clone(), concept_id.clone());

        let mut concept = Concept::new(
            concept_id.clone(),
            node.name.clone(),
            node.semantic.unwrap_or(SemanticKind::Object),
        );
        concept.is_final = self.tree.root() == Some(id);
        concept.is_ground = node.annotation_value("is_ground") == Some("true")
            || node.marker == Marker::Input;
        concept.is_invariant = node.annotation_value("is_invariant") == Some("true");
        concept.ref_axes = parse_axes(node.annotation_value("ref_axes"));
        concept.ref_shape = parse_shape(node.annotation_value("ref_shape"));
        concept.ref_element_type = parse_element_type(node.annotation_value("ref_element"));
        if let Some(flow) = &node.flow_index {
            concept.flow_indices.push(flow.clone());
        }
        concept.reference_data = self.ground_reference(id);

        self.concepts.insert(concept).expect("fresh id is unique");
        concept_id
    }

    fn intern_function(&mut self, id: NodeId) -> ConceptId {
        let node = self.tree.node(id);
        if let Some(existing) = self.function_ids.get(&node.raw_text) {
            let existing = existing.clone();
            if let Some(concept) = self.concepts.get_mut(&existing) {
                if let Some(flow) = &node.flow_index {
                    if !concept.flow_indices.contains(flow) {
                        concept.flow_indices.push(flow.clone());
                    }
                }
            }
            return existing;
        }

        let concept_id = ConceptId::function(self.function_ids.len() + 1);
        self.function_ids
            .insert(node.raw_text.clone(), concept_id.clone());

        let semantic = node.semantic.unwrap_or(SemanticKind::Relation);
        let mut concept = Concept::new(concept_id.clone(), node.raw_text.clone(), semantic);
        concept.ref_element_type = match node.sequence {
            Some(SequenceKind::Imperative) | Some(SequenceKind::Judgement) => ElementType::Paradigm,
            _ => ElementType::Operator,
        };
        if let Some(flow) = &node.flow_index {
            concept.flow_indices.push(flow.clone());
        }
        // The vertical state: a sign pointing at the provisioned template.
        if let Some(path) = node.annotation_value("v_input_provision") {
            let norm = node
                .annotation_value("v_input_norm")
                .unwrap_or("prompt_location");
            concept.reference_data = Some(Reference::singleton(Element::Sign(
                PerceptualSign::new(norm, path),
            )));
        }

        self.concepts.insert(concept).expect("fresh id is unique");
        concept_id
    }

    /// Reference data for a ground concept, from its provision annotation.
    fn ground_reference(&mut self, id: NodeId) -> Option<Reference> {
        let node = self.tree.node(id);
        let (key, value) = provision_of(self.tree, id)?;
        let reference = match key.as_str() {
            "literal" => match serde_json::from_str::<Value>(&value) {
                Ok(Value::Array(items)) => {
                    let axis = node.axis_tag().unwrap_or("items").to_string();
                    let elements = items.into_iter().map(Element::Concrete).collect();
                    match Reference::from_elements(axis, elements) {
                        Ok(r) => r,
                        Err(e) => {
                            self.diagnostics
                                .report(DiagnosticKind::BadAnnotation, node.span)
                                .message(format!("literal list does not form a reference: {e}"))
                                .emit();
                            return None;
                        }
                    }
                }
                // Non-list literals stay raw strings, wrappers included.
                _ => Reference::singleton(Element::str(value)),
            },
            "truth_value" => Reference::singleton(Element::Sign(PerceptualSign::new(
                "truth_value",
                value,
            ))),
            norm => Reference::singleton(Element::Sign(PerceptualSign::new(norm, value))),
        };
        Some(reference)
    }

    // -- inferences --------------------------------------------------------

    fn build_inferences(&mut self) {
        for id in self.tree.walk() {
            if self.tree.node(id).children.is_empty() {
                continue;
            }
            if let Some(inference) = self.build_inference(id) {
                if let Err(e) = self.inferences.insert(inference) {
                    let span = self.tree.node(id).span;
                    self.diagnostics
                        .report(DiagnosticKind::SchemaError, span)
                        .message(e.to_string())
                        .emit();
                }
            }
        }
    }

    fn build_inference(&mut self, id: NodeId) -> Option<Inference> {
        let node = self.tree.node(id);
        let span = node.span;
        let flow_index = node.flow_index.clone()?;

        let func = self.tree.functional_child(id)?;
        let head = operators::classify(&self.tree.node(func).raw_text)?;

        let concept_to_infer = self.intern_value(id);
        let function_concept = self.intern_function(func);

        let value_nodes: Vec<NodeId> = self
            .tree
            .node(id)
            .children
            .iter()
            .copied()
            .filter(|&c| self.tree.node(c).marker == Marker::Value)
            .collect();
        let context_nodes: Vec<NodeId> = self
            .tree
            .node(id)
            .children
            .iter()
            .copied()
            .filter(|&c| self.tree.node(c).marker == Marker::Context)
            .collect();

        let value_concepts: Vec<ConceptId> =
            value_nodes.iter().map(|&v| self.intern_value(v)).collect();
        let context_concepts: Vec<ConceptId> = context_nodes
            .iter()
            .map(|&c| self.intern_value(c))
            .collect();

        let working_interpretation = match head {
            OperatorHead::Imperative { .. } => {
                WorkingInterpretation::Imperative(self.imperative_wi(id, func, &value_nodes)?)
            }
            OperatorHead::Judgement { .. } => {
                let imperative = self.imperative_wi(id, func, &value_nodes)?;
                let assertion_condition =
                    self.assertion_condition(func, &value_concepts, span)?;
                WorkingInterpretation::Judgement(JudgementWi {
                    imperative,
                    assertion_condition,
                })
            }
            OperatorHead::Assign { marker, payload } => WorkingInterpretation::Assigning(
                AssigningWi {
                    spec: self.assign_spec(marker, &payload, id, func, &value_concepts, span)?,
                },
            ),
            OperatorHead::Grouping { payload } => WorkingInterpretation::Grouping(
                self.grouping_wi(&payload, func, &value_nodes, &value_concepts)?,
            ),
            OperatorHead::Timing { marker, condition } => {
                let condition = self.lookup_concept(&condition, span)?;
                WorkingInterpretation::Timing(TimingWi { marker, condition })
            }
            OperatorHead::Looping { base, payload } => WorkingInterpretation::Looping(
                self.looping_wi(id, func, &base, &payload, &flow_index, &context_concepts, &value_concepts, span)?,
            ),
        };

        Some(Inference {
            flow_index,
            concept_to_infer,
            function_concept,
            value_concepts,
            context_concepts,
            working_interpretation,
        })
    }

    fn imperative_wi(
        &mut self,
        parent: NodeId,
        func: NodeId,
        value_nodes: &[NodeId],
    ) -> Option<ImperativeWi> {
        let func_node = self.tree.node(func);
        let span = func_node.span;

        let Some(paradigm) = func_node.annotation_value("norm_input").map(String::from) else {
            self.diagnostics
                .report(DiagnosticKind::SchemaError, span)
                .message("imperative operator lacks a paradigm (`%{norm_input}`)")
                .emit();
            return None;
        };
        let body_faculty = func_node
            .annotation_value("body_faculty")
            .unwrap_or("llm")
            .to_string();

        // Explicit `%{value_order}` overrides the inferred order.
        let value_order = if let Some(raw) = func_node.annotation_value("value_order") {
            let names: Vec<String> = serde_json::from_str(raw).unwrap_or_default();
            if names.is_empty() {
                self.diagnostics
                    .report(DiagnosticKind::SchemaError, span)
                    .message("`%{value_order}` must be a JSON array of concept names")
                    .emit();
                return None;
            }
            let mut order = Vec::with_capacity(names.len());
            for name in names {
                order.push(self.lookup_concept(&name, span)?);
            }
            order
        } else {
            super::formalize::operand_order(self.tree, parent)
                .into_iter()
                .filter(|id| self.tree.node(*id).marker == Marker::Value)
                .map(|id| self.intern_value(id))
                .collect()
        };

        let mut value_selectors = IndexMap::new();
        for &value_node in value_nodes {
            let node = self.tree.node(value_node);
            if let Some(raw) = node.annotation_value("selector").map(String::from) {
                let concept = self.intern_value(value_node);
                match parse_selector(&raw) {
                    Some(selector) => {
                        value_selectors.insert(concept, selector);
                    }
                    None => {
                        self.diagnostics
                            .report(DiagnosticKind::BadAnnotation, node.span)
                            .message(format!("cannot parse value selector `{raw}`"))
                            .emit();
                    }
                }
            }
        }

        Some(ImperativeWi {
            paradigm,
            body_faculty,
            value_order,
            value_selectors,
            create_axis_on_list_output: func_node
                .annotation_value("create_axis_on_list_output")
                .map(String::from),
        })
    }

    fn assertion_condition(
        &mut self,
        func: NodeId,
        value_concepts: &[ConceptId],
        span: crate::span::Span,
    ) -> Option<AssertionCondition> {
        let func_node = self.tree.node(func);
        let quantifier = match func_node.annotation_value("quantifier").unwrap_or("all") {
            "all" => Quantifier::All,
            "any" => Quantifier::Any,
            "for-each" => Quantifier::ForEach,
            other => {
                self.diagnostics
                    .report(DiagnosticKind::SchemaError, span)
                    .message(format!("unknown quantifier `{other}`"))
                    .emit();
                return None;
            }
        };
        let target = match func_node.annotation_value("assertion_target") {
            Some(name) => self.lookup_concept(name, span)?,
            None => match value_concepts.first() {
                Some(first) => first.clone(),
                None => {
                    self.diagnostics
                        .report(DiagnosticKind::SchemaError, span)
                        .message("judgement needs a value concept to assert over")
                        .emit();
                    return None;
                }
            },
        };
        let expected = func_node.annotation_value("expected") != Some("false");
        Some(AssertionCondition {
            quantifier,
            target,
            expected,
        })
    }

    #[allow(clippy::too_many_arguments)]
    fn assign_spec(
        &mut self,
        marker: char,
        payload: &str,
        parent: NodeId,
        func: NodeId,
        value_concepts: &[ConceptId],
        span: crate::span::Span,
    ) -> Option<AssignSpec> {
        let func_node = self.tree.node(func);
        match marker {
            '=' => {
                if value_concepts.len() != 1 {
                    self.diagnostics
                        .report(DiagnosticKind::SchemaError, span)
                        .message(format!(
                            "`$=` aliases exactly one source, found {}",
                            value_concepts.len()
                        ))
                        .emit();
                    return None;
                }
                Some(AssignSpec::Alias)
            }
            '%' => {
                // Inline face tags win; `%{face_value}` is the annotation form.
                let faces: Vec<String> = func_node
                    .clausal
                    .iter()
                    .filter_map(|c| match c {
                        Clausal::FaceTag(v) => Some(v.clone()),
                        _ => None,
                    })
                    .collect();
                let face_value = if !faces.is_empty() {
                    if faces.len() == 1 {
                        Value::String(faces[0].clone())
                    } else {
                        Value::Array(faces.into_iter().map(Value::String).collect())
                    }
                } else if let Some(raw) = func_node.annotation_value("face_value") {
                    serde_json::from_str(raw).unwrap_or(Value::String(raw.to_string()))
                } else {
                    self.diagnostics
                        .report(DiagnosticKind::SchemaError, span)
                        .message("`$%` needs a face value (`<$(x)%>` or `%{face_value}`)")
                        .emit();
                    return None;
                };
                let axis_names = match func_node.annotation_value("axis_names") {
                    Some(raw) => serde_json::from_str(raw).unwrap_or_default(),
                    None => {
                        let axis = self
                            .tree
                            .node(parent)
                            .axis_tag()
                            .or(func_node.axis_tag())
                            .unwrap_or(NONE_AXIS);
                        vec![axis.to_string()]
                    }
                };
                Some(AssignSpec::Abstraction {
                    face_value,
                    axis_names,
                })
            }
            '.' => {
                // Priority: `%{assign_sources}` > inline `%<[...]` > `%>(X)`.
                let names: Vec<String> = if let Some(raw) =
                    func_node.annotation_value("assign_sources")
                {
                    serde_json::from_str(raw).unwrap_or_default()
                } else if let Some(list) = operators::inline_assign_sources(payload) {
                    list
                } else if let Some(single) = operators::inline_source_single(payload) {
                    vec![single]
                } else {
                    Vec::new()
                };
                let assign_sources = if names.is_empty() {
                    value_concepts.to_vec()
                } else {
                    let mut ids = Vec::with_capacity(names.len());
                    for name in &names {
                        ids.push(self.lookup_concept(name, span)?);
                    }
                    ids
                };
                if assign_sources.is_empty() {
                    self.diagnostics
                        .report(DiagnosticKind::SchemaError, span)
                        .message("`$.` needs at least one source")
                        .emit();
                    return None;
                }
                Some(AssignSpec::SourceSelection { assign_sources })
            }
            '+' => {
                let assign_source = match func_node.annotation_value("assign_source") {
                    Some(name) => self.lookup_concept(name, span)?,
                    None => match value_concepts.first() {
                        Some(first) => first.clone(),
                        None => {
                            self.diagnostics
                                .report(DiagnosticKind::SchemaError, span)
                                .message("`$+` needs a source value concept")
                                .emit();
                            return None;
                        }
                    },
                };
                let assign_destination = match func_node.annotation_value("assign_destination") {
                    Some(name) => self.lookup_concept(name, span)?,
                    None => self.intern_value(parent),
                };
                let by_axes = operators::inline_collapse_axes(payload)
                    .or_else(|| {
                        func_node
                            .annotation_value("by_axes")
                            .and_then(|raw| serde_json::from_str(raw).ok())
                    })
                    .unwrap_or_else(|| vec![NONE_AXIS.to_string()]);
                Some(AssignSpec::Extension {
                    assign_source,
                    assign_destination,
                    by_axes,
                })
            }
            '-' => {
                let Some(raw) = func_node.annotation_value("selector") else {
                    self.diagnostics
                        .report(DiagnosticKind::SchemaError, span)
                        .message("`$-` needs a structural selector (`%{selector}`)")
                        .emit();
                    return None;
                };
                match serde_json::from_str::<IndexMap<String, usize>>(raw) {
                    Ok(selector) => Some(AssignSpec::Selection { selector }),
                    Err(_) => {
                        self.diagnostics
                            .report(DiagnosticKind::BadAnnotation, span)
                            .message("`%{selector}` must be a JSON object of axis -> index")
                            .emit();
                        None
                    }
                }
            }
            _ => None,
        }
    }

    fn grouping_wi(
        &mut self,
        payload: &str,
        func: NodeId,
        value_nodes: &[NodeId],
        value_concepts: &[ConceptId],
    ) -> Option<GroupingWi> {
        let func_node = self.tree.node(func);
        let span = func_node.span;

        let sources: Vec<ConceptId> = match operators::inline_source_list(payload) {
            Some(names) => {
                let mut ids = Vec::with_capacity(names.len());
                for name in &names {
                    ids.push(self.lookup_concept(name, span)?);
                }
                ids
            }
            None => value_concepts.to_vec(),
        };
        if sources.is_empty() {
            self.diagnostics
                .report(DiagnosticKind::SchemaError, span)
                .message("grouping needs at least one source")
                .emit();
            return None;
        }

        let create_axis = operators::inline_create_axis(payload)
            .or_else(|| func_node.annotation_value("create_axis").map(String::from));

        // Collapse priority: per-concept > functional `%{by_axes}` >
        // inline `%-[...]` > `_none_axis`.
        let functional_by_axes: Option<Vec<Vec<String>>> = func_node
            .annotation_value("by_axes")
            .and_then(|raw| serde_json::from_str(raw).ok());
        let inline = operators::inline_collapse_axes(payload);
        let by_axes: Vec<Vec<String>> = sources
            .iter()
            .enumerate()
            .map(|(i, source)| {
                if let Some(node) = value_nodes.iter().find(|&&v| {
                    self.value_ids.get(&self.tree.node(v).name) == Some(source)
                }) {
                    if let Some(raw) = self.tree.node(*node).annotation_value("collapse_in_grouping")
                    {
                        if let Ok(axes) = serde_json::from_str::<Vec<String>>(raw) {
                            return axes;
                        }
                    }
                }
                if let Some(lists) = &functional_by_axes {
                    if let Some(axes) = lists.get(i) {
                        return axes.clone();
                    }
                }
                if let Some(axes) = &inline {
                    return axes.clone();
                }
                vec![NONE_AXIS.to_string()]
            })
            .collect();

        let marker = if create_axis.is_some() {
            GroupingMarker::Across
        } else {
            GroupingMarker::In
        };

        Some(GroupingWi {
            marker,
            sources,
            create_axis,
            by_axes,
        })
    }

    #[allow(clippy::too_many_arguments)]
    fn looping_wi(
        &mut self,
        parent: NodeId,
        func: NodeId,
        base: &str,
        payload: &str,
        flow_index: &normcode_core::FlowIndex,
        context_concepts: &[ConceptId],
        value_concepts: &[ConceptId],
        span: crate::span::Span,
    ) -> Option<LoopingWi> {
        let func_node = self.tree.node(func);

        let loop_base = self.lookup_concept(base, span)?;
        let current_loop_base = match context_concepts.first() {
            Some(c) => c.clone(),
            None => {
                self.diagnostics
                    .report(DiagnosticKind::SchemaError, span)
                    .message("looping needs a `<*` context concept for the current element")
                    .emit();
                return None;
            }
        };
        let group_base = operators::inline_create_axis(payload)
            .or_else(|| func_node.annotation_value("group_base").map(String::from))
            .unwrap_or_else(|| "loop".to_string());

        // Concepts read across iterations: `*N` clausal markers anywhere in
        // the loop subtree.
        let mut in_loop = IndexMap::new();
        let mut stack = vec![parent];
        while let Some(id) = stack.pop() {
            for &child in &self.tree.node(id).children {
                stack.push(child);
                let node = self.tree.node(child);
                if node.marker == Marker::Functional {
                    continue;
                }
                if let Some(offset) = node.loop_offset() {
                    let concept = self.intern_value(child);
                    in_loop.entry(concept).or_insert(offset);
                }
            }
        }

        let wi_concept = match func_node.annotation_value("loop_output") {
            Some(name) => self.lookup_concept(name, span)?,
            None => match value_concepts.first() {
                Some(first) => first.clone(),
                None => {
                    self.diagnostics
                        .report(DiagnosticKind::SchemaError, span)
                        .message("looping needs a value child producing the per-iteration output")
                        .emit();
                    return None;
                }
            },
        };

        Some(LoopingWi {
            loop_index: flow_index.to_string(),
            loop_base,
            current_loop_base,
            group_base,
            in_loop,
            concept_to_infer: wi_concept,
        })
    }

    // -- shared helpers ----------------------------------------------------

    /// Resolve a concept name used in an operator or annotation.
    fn lookup_concept(
        &mut self,
        name: &str,
        span: crate::span::Span,
    ) -> Option<ConceptId> {
        let name = name.trim();
        if let Some(id) = self.value_ids.get(name) {
            return Some(id.clone());
        }
        self.diagnostics
            .report(DiagnosticKind::SchemaError, span)
            .message(format!("`{name}` does not name a concept in this plan"))
            .emit();
        None
    }

    fn validate_provisions(&mut self) {
        let mut checked: HashMap<String, bool> = HashMap::new();
        let ids: Vec<NodeId> = self
            .tree
            .inputs()
            .to_vec()
            .into_iter()
            .chain(self.tree.walk())
            .collect();
        for id in ids {
            let node = self.tree.node(id);
            let mut paths: Vec<String> = Vec::new();
            if let Some((key, value)) = provision_of(self.tree, id) {
                if matches!(
                    key.as_str(),
                    "file_location" | "prompt_location" | "script_location"
                ) {
                    paths.push(value);
                }
            }
            if let Some(path) = node.annotation_value("v_input_provision") {
                paths.push(path.to_string());
            }
            for path in paths {
                let exists = *checked.entry(path.clone()).or_insert_with(|| {
                    let full = match &self.options.base_dir {
                        Some(dir) => dir.join(&path),
                        None => Path::new(&path).to_path_buf(),
                    };
                    full.exists()
                });
                if !exists {
                    self.diagnostics
                        .report(DiagnosticKind::ResourceError, node.span)
                        .message(format!("provisioned path `{path}` does not exist"))
                        .emit();
                }
            }
        }
    }
}

fn parse_axes(raw: Option<&str>) -> Vec<String> {
    let Some(raw) = raw else {
        return Vec::new();
    };
    raw.trim_start_matches('[')
        .trim_end_matches(']')
        .split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

/// Numeric shapes only; symbolic entries (loop lengths) leave the shape
/// unspecified.
fn parse_shape(raw: Option<&str>) -> Vec<usize> {
    let Some(raw) = raw else {
        return Vec::new();
    };
    let entries: Vec<&str> = raw
        .trim_start_matches('(')
        .trim_end_matches(')')
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect();
    let mut shape = Vec::with_capacity(entries.len());
    for entry in entries {
        match entry.parse() {
            Ok(n) => shape.push(n),
            Err(_) => return Vec::new(),
        }
    }
    shape
}

fn parse_element_type(raw: Option<&str>) -> ElementType {
    match raw {
        Some("dict_schema") => ElementType::DictSchema,
        Some("perceptual_sign") => ElementType::PerceptualSign,
        Some("paradigm") => ElementType::Paradigm,
        Some("operator") => ElementType::Operator,
        Some("truth_value") => ElementType::TruthValue,
        _ => ElementType::Primitive,
    }
}

fn parse_selector(raw: &str) -> Option<ValueSelector> {
    match raw {
        "packed" => Some(ValueSelector::Packed),
        "source" => Some(ValueSelector::Source),
        "unpack" => Some(ValueSelector::Unpack),
        _ => {
            if let Some(key) = raw.strip_prefix("key:") {
                return Some(ValueSelector::Key(key.trim().to_string()));
            }
            if let Some(index) = raw.strip_prefix("index:") {
                return index.trim().parse().ok().map(ValueSelector::Index);
            }
            None
        }
    }
}

