//! Line-oriented plan parser.
//!
//! Each line carries: indentation (4 spaces per level), a marker (`:<:`,
//! `:>:`, `<-`, `<=`, `<*`), concept text with optional inline clausal
//! markers, and zero or more trailing `|`-separated annotations.
//!
//! The parser recovers from per-line problems by reporting a diagnostic
//! and moving on; only fuel exhaustion and depth overflow are fatal.

mod tree;


pub use tree::{Annotation, AnnotationKind, Clausal, Marker, NodeId, PlanNode, PlanTree};

use crate::diagnostics::{DiagnosticKind, Diagnostics};
use crate::lexer::{self, TokenKind};
use crate::span::Span;
use crate::{Error, Result};

const DEFAULT_PARSE_FUEL: u32 = 1_000_000;
const DEFAULT_MAX_DEPTH: usize = 256;

#[derive(Debug)]
pub struct ParseOutcome {
    pub tree: PlanTree,
    pub diagnostics: Diagnostics,
}

pub struct Parser<'src> {
    source: &'src str,
    diagnostics: Diagnostics,
    fuel: u32,
    max_depth: usize,
}

impl<'src> Parser<'src> {
    pub fn new(source: &'src str) -> Self {
        Self {
            source,
            diagnostics: Diagnostics::new(),
            fuel: DEFAULT_PARSE_FUEL,
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }

    pub fn with_fuel(mut self, fuel: u32) -> Self {
        self.fuel = fuel;
        self
    }

    pub fn with_max_depth(mut self, depth: usize) -> Self {
        self.max_depth = depth;
        self
    }

    pub fn parse(mut self) -> Result<ParseOutcome> {
        let mut tree = PlanTree::new();
        // (level, id) of the open ancestor chain.
        let mut stack: Vec<(usize, NodeId)> = Vec::new();

        let mut offset = 0;
        for (line_idx, raw_line) in self.source.split_inclusive('\n').enumerate() {
            let line_start = offset;
            offset += raw_line.len();

            let line = raw_line.trim_end_matches(['\n', '\r']);
            if line.trim().is_empty() {
                continue;
            }
            self.consume_fuel(1)?;

            let Some(parsed) = self.parse_line(line, line_start, line_idx + 1) else {
                continue;
            };

            let level = parsed.level;
            if level > self.max_depth {
                return Err(Error::RecursionLimitExceeded);
            }

            match parsed.marker {
                Marker::Input => {
                    if level != 0 {
                        self.diagnostics
                            .report(DiagnosticKind::IndentError, parsed.span)
                            .message("external inputs (`:>:`) must sit at indent 0")
                            .emit();
                    }
                    let id = tree.push(parsed.into_node(None));
                    tree.add_input(id);
                }
                Marker::Root => {
                    if level != 0 {
                        self.diagnostics
                            .report(DiagnosticKind::IndentError, parsed.span)
                            .message("the root line (`:<:`) must sit at indent 0")
                            .emit();
                    }
                    if tree.root().is_some() {
                        self.diagnostics
                            .report(DiagnosticKind::StructureError, parsed.span)
                            .message("plan has more than one root line")
                            .emit();
                        continue;
                    }
                    let id = tree.push(parsed.into_node(None));
                    tree.set_root(id);
                    stack.clear();
                    stack.push((0, id));
                }
                Marker::Value | Marker::Functional | Marker::Context => {
                    if level == 0 {
                        self.diagnostics
                            .report(DiagnosticKind::StructureError, parsed.span)
                            .message("concept line outside the root subtree")
                            .emit();
                        continue;
                    }
                    while let Some(&(l, _)) = stack.last() {
                        if l >= level {
                            stack.pop();
                        } else {
                            break;
                        }
                    }
                    let Some(&(parent_level, parent)) = stack.last() else {
                        self.diagnostics
                            .report(DiagnosticKind::StructureError, parsed.span)
                            .message("concept line before the root line")
                            .emit();
                        continue;
                    };
                    if parent_level != level - 1 {
                        self.diagnostics
                            .report(DiagnosticKind::IndentError, parsed.span)
                            .message(format!(
                                "indent jumps from level {parent_level} to {level}"
                            ))
                            .emit();
                    }
                    let id = tree.push(parsed.into_node(Some(parent)));
                    tree.node_mut(parent).children.push(id);
                    stack.push((level, id));
                }
            }
        }

        if tree.root().is_none() {
            self.diagnostics
                .report(DiagnosticKind::StructureError, Span::empty(self.source.len()))
                .message("plan has no root line (`:<:`)")
                .emit();
        }

        self.check_child_shape(&tree);

        Ok(ParseOutcome {
            tree,
            diagnostics: self.diagnostics,
        })
    }

    fn consume_fuel(&mut self, amount: u32) -> Result<()> {
        if self.fuel < amount {
            return Err(Error::ExecFuelExhausted);
        }
        self.fuel -= amount;
        Ok(())
    }

    /// Every parent's first child must be functional; functional concepts
    /// take no children of their own; one functional per parent.
    fn check_child_shape(&mut self, tree: &PlanTree) {
        for id in tree.iter_ids() {
            let node = tree.node(id);
            if node.marker == Marker::Functional && !node.children.is_empty() {
                let child = tree.node(node.children[0]);
                self.diagnostics
                    .report(DiagnosticKind::StructureError, child.span)
                    .message("value concepts cannot nest under a functional concept")
                    .related_to("functional concept here", node.span)
                    .emit();
            }
            if node.children.is_empty() {
                continue;
            }
            let functional_count = node
                .children
                .iter()
                .filter(|&&c| tree.node(c).marker == Marker::Functional)
                .count();
            let first = tree.node(node.children[0]);
            if first.marker != Marker::Functional {
                self.diagnostics
                    .report(DiagnosticKind::StructureError, first.span)
                    .message("the first child of a concept must be its functional concept (`<=`)")
                    .emit();
            } else if functional_count > 1 {
                self.diagnostics
                    .report(DiagnosticKind::StructureError, node.span)
                    .message("a concept takes exactly one functional child")
                    .emit();
            }
        }
    }

    fn parse_line(&mut self, line: &str, line_start: usize, line_no: usize) -> Option<ParsedLine> {
        let line_span = Span::new(line_start, line_start + line.len());

        let indent_len = line.len() - line.trim_start().len();
        let indent = &line[..indent_len];
        if indent.contains('\t') {
            self.diagnostics
                .report(DiagnosticKind::IndentError, Span::new(line_start, line_start + indent_len))
                .message("tabs are not allowed in indentation")
                .emit();
            return None;
        }
        if indent_len % 4 != 0 {
            self.diagnostics
                .report(DiagnosticKind::IndentError, Span::new(line_start, line_start + indent_len))
                .message(format!(
                    "indentation of {indent_len} spaces is not a multiple of 4"
                ))
                .emit();
        }
        let level = indent_len / 4;

        let rest = &line[indent_len..];
        let (marker, marker_len) = match () {
            _ if rest.starts_with(":<:") => (Marker::Root, 3),
            _ if rest.starts_with(":>:") => (Marker::Input, 3),
            _ if rest.starts_with("<-") => (Marker::Value, 2),
            _ if rest.starts_with("<=") => (Marker::Functional, 2),
            _ if rest.starts_with("<*") => (Marker::Context, 2),
            _ => {
                self.diagnostics
                    .report(
                        DiagnosticKind::UnknownMarker,
                        Span::new(line_start + indent_len, line_start + line.len()),
                    )
                    .message(format!(
                        "expected `:<:`, `:>:`, `<-`, `<=`, or `<*`, found `{}`",
                        rest.split_whitespace().next().unwrap_or("")
                    ))
                    .emit();
                return None;
            }
        };

        let body_start = indent_len + marker_len;
        let body = &line[body_start..];

        // First `|` splits the concept text from annotations.
        let mut segments = body.split('|');
        let text_segment = segments.next().unwrap_or("");
        let text = text_segment.trim();
        let text_offset = line_start + body_start + leading_ws(text_segment);

        let mut annotations = Vec::new();
        let mut seg_offset = body_start + text_segment.len();
        for segment in segments {
            // + 1 skips the `|` itself.
            let seg_start = line_start + seg_offset + 1;
            seg_offset += 1 + segment.len();
            let trimmed = segment.trim();
            let span = Span::new(seg_start + leading_ws(segment), seg_start + leading_ws(segment) + trimmed.len());
            match parse_annotation(trimmed, span) {
                Some(annotation) => {
                    if annotations
                        .iter()
                        .any(|a: &Annotation| a.key == annotation.key)
                    {
                        self.diagnostics
                            .report(DiagnosticKind::DuplicateAnnotation, span)
                            .message(format!("annotation `{}` repeats on this line", annotation.key))
                            .emit();
                    } else {
                        annotations.push(annotation);
                    }
                }
                None => {
                    self.diagnostics
                        .report(DiagnosticKind::BadAnnotation, span)
                        .message(format!("cannot parse annotation `{trimmed}`"))
                        .emit();
                }
            }
        }

        let (name, clausal) = self.analyze_text(text, text_offset);

        Some(ParsedLine {
            marker,
            level,
            line_no,
            raw_text: text.to_string(),
            name,
            clausal,
            annotations,
            span: line_span,
        })
    }

    /// Lex the concept text: check bracket balance, pull out clausal
    /// markers, and derive the clean name.
    fn analyze_text(&mut self, text: &str, text_offset: usize) -> (String, Vec<Clausal>) {
        let tokens = lexer::lex(text);

        let mut open_stack: Vec<(TokenKind, Span)> = Vec::new();
        let mut clausal = Vec::new();
        let mut name = String::new();

        for token in &tokens {
            let slice = lexer::token_text(text, token);
            if token.kind.is_clausal() {
                match token.kind {
                    TokenKind::ValueBinding => {
                        let digits = &slice[3..slice.len() - 2];
                        if let Ok(n) = digits.parse() {
                            clausal.push(Clausal::ValueBinding(n));
                        }
                    }
                    TokenKind::AxisTag => {
                        clausal.push(Clausal::AxisTag(slice[4..slice.len() - 2].to_string()));
                    }
                    TokenKind::FaceTag => {
                        clausal.push(Clausal::FaceTag(slice[3..slice.len() - 3].to_string()));
                    }
                    TokenKind::LoopOffset => {
                        if let Ok(n) = slice[1..].parse() {
                            clausal.push(Clausal::LoopOffset(n));
                        }
                    }
                    _ => unreachable!("is_clausal covers exactly these kinds"),
                }
                continue;
            }

            if token.kind.is_open_bracket() {
                open_stack.push((token.kind, token.span));
            } else if let Some(expected) = token.kind.open_bracket() {
                match open_stack.pop() {
                    Some((open, _)) if open == expected => {}
                    _ => {
                        self.diagnostics
                            .report(
                                DiagnosticKind::UnbalancedBrackets,
                                token.span.offset(text_offset),
                            )
                            .message(format!("unmatched `{slice}`"))
                            .emit();
                    }
                }
            }
            name.push_str(slice);
        }

        if let Some((_, span)) = open_stack.pop() {
            self.diagnostics
                .report(DiagnosticKind::UnbalancedBrackets, span.offset(text_offset))
                .message("bracket is never closed")
                .emit();
        }

        (name.trim().to_string(), clausal)
    }
}

fn leading_ws(s: &str) -> usize {
    s.len() - s.trim_start().len()
}

/// Parse `?{key}: value` / `%{key}: value` / `%{key}`.
fn parse_annotation(text: &str, span: Span) -> Option<Annotation> {
    let kind = if text.starts_with("?{") {
        AnnotationKind::Syntactical
    } else if text.starts_with("%{") {
        AnnotationKind::Referential
    } else {
        return None;
    };

    // Keys may themselves contain braces (`literal<$% x>` does not, but
    // selector keys may quote names), so track depth.
    let bytes = text.as_bytes();
    let mut depth = 0usize;
    let mut key_end = None;
    for (i, &b) in bytes.iter().enumerate().skip(1) {
        match b {
            b'{' => depth += 1,
            b'}' => {
                depth -= 1;
                if depth == 0 {
                    key_end = Some(i);
                    break;
                }
            }
            _ => {}
        }
    }
    let key_end = key_end?;
    let key = text[2..key_end].to_string();
    if key.is_empty() {
        return None;
    }

    let rest = text[key_end + 1..].trim_start();
    let value = if rest.is_empty() {
        String::new()
    } else if let Some(v) = rest.strip_prefix(':') {
        v.trim().to_string()
    } else {
        return None;
    };

    Some(Annotation {
        kind,
        key,
        value,
        span,
    })
}

struct ParsedLine {
    marker: Marker,
    level: usize,
    line_no: usize,
    raw_text: String,
    name: String,
    clausal: Vec<Clausal>,
    annotations: Vec<Annotation>,
    span: Span,
}

impl ParsedLine {
    fn into_node(self, parent: Option<NodeId>) -> PlanNode {
        PlanNode {
            marker: self.marker,
            raw_text: self.raw_text,
            name: self.name,
            clausal: self.clausal,
            annotations: self.annotations,
            span: self.span,
            line: self.line_no,
            level: self.level,
            parent,
            children: Vec::new(),
            flow_index: None,
            sequence: None,
            semantic: None,
        }
    }
}
