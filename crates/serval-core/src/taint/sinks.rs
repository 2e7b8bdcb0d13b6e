//! Taint sinks registry
//!
//! Identifies the library calls whose misuse with untrusted data
//! constitutes a vulnerability, categorized by the class of damage they
//! can do. Defaults are overridable from the policy configuration.

use std::collections::HashMap;

/// What a sink does with its arguments.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SinkKind {
    /// Unbounded or format-driven memory writes (`strcpy`, `sprintf`).
    MemoryWrite,
    /// Shell or process execution (`system`, `execv`).
    CommandExecution,
    /// Format-string interpretation (`printf` family).
    FormatString,
}

impl SinkKind {
    pub fn as_str(self) -> &'static str {
        match self {
            SinkKind::MemoryWrite => "memory_write",
            SinkKind::CommandExecution => "command_execution",
            SinkKind::FormatString => "format_string",
        }
    }
}

const DEFAULT_SINKS: &[(&str, SinkKind)] = &[
    ("strcpy", SinkKind::MemoryWrite),
    ("strcat", SinkKind::MemoryWrite),
    ("sprintf", SinkKind::MemoryWrite),
    ("vsprintf", SinkKind::MemoryWrite),
    ("system", SinkKind::CommandExecution),
    ("popen", SinkKind::CommandExecution),
    ("execl", SinkKind::CommandExecution),
    ("execv", SinkKind::CommandExecution),
    ("printf", SinkKind::FormatString),
    ("fprintf", SinkKind::FormatString),
];

#[derive(Debug, Clone)]
pub struct TaintSinksRegistry {
    by_name: HashMap<String, SinkKind>,
}

impl Default for TaintSinksRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}

impl TaintSinksRegistry {
    pub fn new() -> Self {
        Self {
            by_name: HashMap::new(),
        }
    }

    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        for &(name, kind) in DEFAULT_SINKS {
            registry.register(name, kind);
        }
        registry
    }

    pub fn register(&mut self, name: &str, kind: SinkKind) {
        self.by_name.insert(name.to_string(), kind);
    }

    /// Classifies `name` as a taint sink: exact registry match first, then
    /// substring heuristics for the dangerous families.
    pub fn classify(&self, name: &str) -> Option<SinkKind> {
        if let Some(&kind) = self.by_name.get(name) {
            return Some(kind);
        }
        if name.contains("strcpy") {
            return Some(SinkKind::MemoryWrite);
        }
        if name.contains("system") || name.contains("exec") {
            return Some(SinkKind::CommandExecution);
        }
        None
    }

    pub fn is_sink(&self, name: &str) -> bool {
        self.classify(name).is_some()
    }

    pub fn len(&self) -> usize {
        self.by_name.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_name.is_empty()
    }
}
