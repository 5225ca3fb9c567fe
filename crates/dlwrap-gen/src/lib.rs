//! # dlwrap-gen
//!
//! Generates C shims that interpose a list of functions in a shared library.
//!
//! Input is a header-like file of prototypes:
//!
//! ```text
//! #include <stdio.h>
//! void *malloc(size_t size);
//! int fclose(FILE *stream);
//! ```
//!
//! Output is one C file with an `#ifdef __APPLE__` section using a dyld
//! interpose table and an `#ifdef __linux__` section using
//! `dlsym(RTLD_NEXT, ...)` lazy resolution.
//!
//! ```ignore
//! let generated = Generator::default().generate(header)?;
//! std::fs::write("shim.c", generated.source())?;
//! ```

use std::path::Path;

use dlwrap_config::{log_emit_info, Config};
use serde::Serialize;

pub mod classify;
pub mod emit;
pub mod error;
pub mod parse;

pub use classify::{AllocationPrimitives, SymbolClassifier, SymbolKind};
pub use emit::{render, EmitOptions, Interpose, LazyBind, RenderedShim, Target};
pub use error::{GenError, Result};
pub use parse::{Declaration, Line, Param, Parser, ShimModel, SkipReason, SkippedLine};

/// Parser + emitter settings for one run
pub struct Generator<C = AllocationPrimitives> {
    parser: Parser<C>,
    options: EmitOptions,
    deny_skipped: bool,
}

impl Default for Generator<AllocationPrimitives> {
    fn default() -> Self {
        Self::new(AllocationPrimitives::default(), EmitOptions::default())
    }
}

impl Generator<AllocationPrimitives> {
    pub fn from_config(config: &Config) -> Self {
        Self::new(
            AllocationPrimitives::new(config.generator.allocation_primitives.iter().cloned()),
            EmitOptions::from(&config.generator),
        )
        .deny_skipped(config.diagnostics.deny_skipped)
    }
}

impl<C: SymbolClassifier> Generator<C> {
    pub fn new(classifier: C, options: EmitOptions) -> Self {
        Self {
            parser: Parser::new(classifier),
            options,
            deny_skipped: false,
        }
    }

    /// Fail instead of warning when a declaration-like line is skipped
    pub fn deny_skipped(mut self, deny: bool) -> Self {
        self.deny_skipped = deny;
        self
    }

    pub fn options(&self) -> &EmitOptions {
        &self.options
    }

    pub fn parser(&self) -> &Parser<C> {
        &self.parser
    }

    pub fn generate(&self, source: &str) -> Result<Generated> {
        let model = self.parser.parse_source(source);

        if self.deny_skipped {
            if let Some(first) = model.skipped.first() {
                return Err(GenError::SkippedLines {
                    count: model.skipped.len(),
                    first: first.clone(),
                });
            }
        }

        let shim = render(&model, &self.options);
        Ok(Generated { model, shim })
    }

    /// Read `input`, generate, write `output`.
    pub fn generate_file(&self, input: &Path, output: &Path) -> Result<GenerationSummary> {
        let source = read_input(input)?;
        let generated = self.generate(&source)?;
        write_output(output, &generated.source())?;

        let summary = generated.summary();
        log_emit_info!(
            "Wrote shim",
            path = tracing::field::display(output.display()),
            declarations = summary.declarations,
            skipped = summary.skipped.len(),
        );
        Ok(summary)
    }
}

/// Parsed model plus its rendering
#[derive(Debug, Clone)]
pub struct Generated {
    pub model: ShimModel,
    pub shim: RenderedShim,
}

impl Generated {
    pub fn source(&self) -> String {
        self.shim.to_source()
    }

    pub fn summary(&self) -> GenerationSummary {
        let allocation_primitives = self
            .model
            .declarations
            .iter()
            .filter(|d| d.is_allocation_primitive())
            .count();
        GenerationSummary {
            declarations: self.model.declarations.len(),
            forwarded: self.model.declarations.len() - allocation_primitives,
            allocation_primitives,
            includes: self.model.includes.len(),
            skipped: self.model.skipped.clone(),
        }
    }
}

/// Counts reported after a run (`dlwrap --summary` prints this as JSON)
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GenerationSummary {
    pub declarations: usize,
    pub forwarded: usize,
    pub allocation_primitives: usize,
    pub includes: usize,
    pub skipped: Vec<SkippedLine>,
}

pub fn read_input(path: &Path) -> Result<String> {
    std::fs::read_to_string(path).map_err(|source| GenError::Read {
        path: path.to_path_buf(),
        source,
    })
}

pub fn write_output(path: &Path, contents: &str) -> Result<()> {
    std::fs::write(path, contents).map_err(|source| GenError::Write {
        path: path.to_path_buf(),
        source,
    })
}
