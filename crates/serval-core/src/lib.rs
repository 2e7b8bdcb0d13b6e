//! serval-core: static security analysis for C source code
//!
//! The pipeline: [`parser::ParsedFile`] tokenizes and parses a C subset
//! into an arena-backed [`ast::Ast`]; [`cfg::CfgBuilder`] turns each
//! function body into a control-flow graph; the [`taint`] engine runs a
//! worklist dataflow over it; the [`rules`] registry consumes the combined
//! artifacts and produces [`diagnostic::Diagnostic`]s, which the [`risk`]
//! layer can aggregate into a project score.

pub mod analysis;
pub mod ast;
pub mod cfg;
pub mod config;
pub mod diagnostic;
pub mod disable_comments;
pub mod lexer;
pub mod parser;
pub mod risk;
pub mod rules;
pub mod semantic;
pub mod taint;

pub use analysis::{AnalysisEngine, FileContext};
pub use diagnostic::Diagnostic;
pub use parser::ParsedFile;
