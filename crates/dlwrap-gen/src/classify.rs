//! Symbol classification.
//!
//! Decides which declared symbols must bypass `dlsym` lazy resolution.
//! `dlsym` may allocate while it resolves, so routing `malloc` and friends
//! through it would recurse forever; those go to `__libc_<name>` instead.

use std::collections::BTreeSet;

use dlwrap_config::DEFAULT_ALLOCATION_PRIMITIVES;
use serde::Serialize;

/// Rendering path selected for a declared symbol
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SymbolKind {
    /// Resolved through `dlsym(RTLD_NEXT, ...)` behind the init guard
    Forwarded,
    /// Forwarded straight to `__libc_<name>`, never guarded
    AllocationPrimitive,
}

pub trait SymbolClassifier {
    fn classify(&self, name: &str) -> SymbolKind;
}

/// Exact-name set of allocation primitives
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AllocationPrimitives {
    names: BTreeSet<String>,
}

impl AllocationPrimitives {
    pub fn new<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            names: names.into_iter().map(Into::into).collect(),
        }
    }

    pub fn with(mut self, name: impl Into<String>) -> Self {
        self.names.insert(name.into());
        self
    }

    pub fn contains(&self, name: &str) -> bool {
        self.names.contains(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.names.iter().map(String::as_str)
    }
}

impl Default for AllocationPrimitives {
    fn default() -> Self {
        Self::new(DEFAULT_ALLOCATION_PRIMITIVES)
    }
}

impl SymbolClassifier for AllocationPrimitives {
    fn classify(&self, name: &str) -> SymbolKind {
        if self.contains(name) {
            SymbolKind::AllocationPrimitive
        } else {
            SymbolKind::Forwarded
        }
    }
}

impl<F> SymbolClassifier for F
where
    F: Fn(&str) -> SymbolKind,
{
    fn classify(&self, name: &str) -> SymbolKind {
        self(name)
    }
}
