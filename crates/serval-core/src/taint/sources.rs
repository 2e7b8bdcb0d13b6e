//! Taint sources registry
//!
//! Identifies the library calls that introduce untrusted data into a
//! program variable. Ships with the hardcoded C defaults and accepts
//! overrides from the policy configuration; a substring heuristic catches
//! common variants (`scanf_s`, `readline`, ...) that are not listed
//! verbatim.

use std::collections::HashMap;

/// How untrusted data entered the program.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SourceKind {
    UserInput,
    Environment,
    Network,
    FileIo,
    Untrusted,
}

impl SourceKind {
    pub fn as_str(self) -> &'static str {
        match self {
            SourceKind::UserInput => "user_input",
            SourceKind::Environment => "environment",
            SourceKind::Network => "network",
            SourceKind::FileIo => "file_io",
            SourceKind::Untrusted => "untrusted",
        }
    }
}

const DEFAULT_SOURCES: &[(&str, SourceKind)] = &[
    ("scanf", SourceKind::UserInput),
    ("fscanf", SourceKind::UserInput),
    ("sscanf", SourceKind::UserInput),
    ("gets", SourceKind::UserInput),
    ("getchar", SourceKind::UserInput),
    ("fgets", SourceKind::FileIo),
    ("fgetc", SourceKind::FileIo),
    ("read", SourceKind::FileIo),
    ("recv", SourceKind::Network),
    ("getenv", SourceKind::Environment),
];

/// Substring fallbacks for functions not listed exactly.
const HEURISTIC_FRAGMENTS: &[&str] = &["scanf", "gets", "read"];

#[derive(Debug, Clone)]
pub struct TaintSourcesRegistry {
    by_name: HashMap<String, SourceKind>,
}

impl Default for TaintSourcesRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}

impl TaintSourcesRegistry {
    pub fn new() -> Self {
        Self {
            by_name: HashMap::new(),
        }
    }

    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        for &(name, kind) in DEFAULT_SOURCES {
            registry.register(name, kind);
        }
        registry
    }

    pub fn register(&mut self, name: &str, kind: SourceKind) {
        self.by_name.insert(name.to_string(), kind);
    }

    /// Classifies `name` as a taint source: exact registry match first,
    /// then the substring heuristic.
    pub fn classify(&self, name: &str) -> Option<SourceKind> {
        if let Some(&kind) = self.by_name.get(name) {
            return Some(kind);
        }
        if HEURISTIC_FRAGMENTS.iter().any(|f| name.contains(f)) {
            return Some(SourceKind::UserInput);
        }
        None
    }

    pub fn is_source(&self, name: &str) -> bool {
        self.classify(name).is_some()
    }

    pub fn len(&self) -> usize {
        self.by_name.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_name.is_empty()
    }
}
