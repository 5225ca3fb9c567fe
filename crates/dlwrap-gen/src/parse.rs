//! Line-oriented signature parser.
//!
//! The input is a header-like list of C prototypes, one per line. Parsing is
//! deliberately permissive: anything that does not look like
//! `<ret> <name>(<params>);` is skipped, and the reason is reported instead
//! of failing the run.

use std::fmt;

use dlwrap_config::{log_parse_debug, log_parse_trace, log_parse_warn};
use serde::Serialize;

use crate::classify::{AllocationPrimitives, SymbolClassifier, SymbolKind};

const COMMENT_MARKER: &str = "//";
const INCLUDE_DIRECTIVE: &str = "#include";

/// Classification of one input line
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Line {
    Comment,
    /// Verbatim include directive (line terminator stripped)
    Include(String),
    Declaration(Declaration),
    Ignored(SkipReason),
}

/// Why a line produced no declaration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    /// Not terminated by `;`, so never a candidate
    NotADeclaration,
    MissingOpenParen,
    MissingCloseParen,
    /// Last `)` comes before the first `(`
    UnbalancedParens,
    /// First `;` comes before the last `)`
    TerminatorBeforeClose,
    /// No space or `*` separates the return type from the name
    NoNameBoundary,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            SkipReason::NotADeclaration => "not a declaration",
            SkipReason::MissingOpenParen => "missing '('",
            SkipReason::MissingCloseParen => "missing ')'",
            SkipReason::UnbalancedParens => "')' before '('",
            SkipReason::TerminatorBeforeClose => "';' before ')'",
            SkipReason::NoNameBoundary => "no space or '*' before the function name",
        };
        f.write_str(text)
    }
}

/// One comma-separated parameter fragment
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Param {
    pub raw: String,
    /// Name forwarded to the real function; `None` for `void` and malformed fragments
    pub arg_name: Option<String>,
}

impl Param {
    fn from_fragment(fragment: &str) -> Self {
        let arg_name = match name_boundary(fragment) {
            Some(b) if b > 0 => Some(fragment[b + 1..].to_string()),
            _ => None,
        };
        Self {
            raw: fragment.to_string(),
            arg_name,
        }
    }
}

/// A parsed function prototype
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Declaration {
    /// Everything up to and including the name boundary (`"void *"`, `"int "`)
    pub return_type: String,
    pub name: String,
    /// Verbatim text between the parentheses
    pub raw_params: String,
    pub params: Vec<Param>,
    /// The prototype without its terminating `;`
    pub signature: String,
    pub kind: SymbolKind,
}

impl Declaration {
    /// Literal check: only a return type that trims to exactly `void` counts.
    pub fn returns_void(&self) -> bool {
        self.return_type.trim() == "void"
    }

    /// `"return "` or nothing, prepended to every forwarding call
    pub fn return_prefix(&self) -> &'static str {
        if self.returns_void() {
            ""
        } else {
            "return "
        }
    }

    /// Comma-joined argument names for the forwarding call
    pub fn call_args(&self) -> String {
        let mut out = String::new();
        for name in self.params.iter().filter_map(|p| p.arg_name.as_deref()) {
            if !out.is_empty() {
                out.push_str(", ");
            }
            out.push_str(name);
        }
        out
    }

    pub fn is_allocation_primitive(&self) -> bool {
        self.kind == SymbolKind::AllocationPrimitive
    }
}

/// A declaration candidate that was dropped
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkippedLine {
    /// 1-based
    pub line_no: usize,
    pub reason: SkipReason,
    pub text: String,
}

/// Everything one run extracts from its input
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ShimModel {
    pub includes: Vec<String>,
    pub declarations: Vec<Declaration>,
    pub skipped: Vec<SkippedLine>,
}

pub struct Parser<C = AllocationPrimitives> {
    classifier: C,
}

impl Default for Parser<AllocationPrimitives> {
    fn default() -> Self {
        Self::new(AllocationPrimitives::default())
    }
}

impl<C: SymbolClassifier> Parser<C> {
    pub fn new(classifier: C) -> Self {
        Self { classifier }
    }

    pub fn classifier(&self) -> &C {
        &self.classifier
    }

    /// Classify a single line. A trailing `\n` or `\r\n` is ignored.
    pub fn parse_line(&self, line: &str) -> Line {
        let line = line.trim_end_matches(['\n', '\r']);

        if line.starts_with(COMMENT_MARKER) {
            return Line::Comment;
        }
        if line.starts_with(INCLUDE_DIRECTIVE) {
            return Line::Include(line.to_string());
        }
        if !line.ends_with(';') {
            return Line::Ignored(SkipReason::NotADeclaration);
        }

        match self.parse_declaration(line) {
            Ok(decl) => Line::Declaration(decl),
            Err(reason) => Line::Ignored(reason),
        }
    }

    fn parse_declaration(&self, line: &str) -> Result<Declaration, SkipReason> {
        let open = line.find('(').ok_or(SkipReason::MissingOpenParen)?;
        let close = line.rfind(')').ok_or(SkipReason::MissingCloseParen)?;
        if close < open {
            return Err(SkipReason::UnbalancedParens);
        }
        // ends_with(';') guarantees a terminator exists
        let semi = line.find(';').unwrap_or(line.len());
        if semi < close {
            return Err(SkipReason::TerminatorBeforeClose);
        }

        let head = &line[..open];
        let boundary = name_boundary(head).ok_or(SkipReason::NoNameBoundary)?;
        let name = &head[boundary + 1..];
        let raw_params = &line[open + 1..close];

        Ok(Declaration {
            return_type: head[..=boundary].to_string(),
            name: name.to_string(),
            raw_params: raw_params.to_string(),
            params: raw_params.split(',').map(Param::from_fragment).collect(),
            signature: line[..semi].to_string(),
            kind: self.classifier.classify(name),
        })
    }

    /// Parse a whole input text into a model, recording skipped candidates.
    pub fn parse_source(&self, source: &str) -> ShimModel {
        let mut model = ShimModel::default();

        for (idx, raw) in source.lines().enumerate() {
            let line_no = idx + 1;
            match self.parse_line(raw) {
                Line::Comment => {}
                Line::Include(include) => model.includes.push(include),
                Line::Declaration(decl) => {
                    log_parse_trace!("Parsed declaration", line = line_no, name = decl.name.as_str());
                    model.declarations.push(decl);
                }
                Line::Ignored(SkipReason::NotADeclaration) => {}
                Line::Ignored(reason) => {
                    log_parse_warn!(
                        "Skipped declaration",
                        line = line_no,
                        reason = tracing::field::display(reason),
                        text = raw,
                    );
                    model.skipped.push(SkippedLine {
                        line_no,
                        reason,
                        text: raw.to_string(),
                    });
                }
            }
        }

        log_parse_debug!(
            "Parsed input",
            declarations = model.declarations.len(),
            includes = model.includes.len(),
            skipped = model.skipped.len(),
        );
        model
    }
}

/// Rightmost of the last space and the last `*`
fn name_boundary(text: &str) -> Option<usize> {
    text.rfind(' ').max(text.rfind('*'))
}
