//! Security rules

pub mod banned_functions;
pub mod format_string;
pub mod taint_flow;

pub use banned_functions::BannedFunctions;
pub use format_string::FormatString;
pub use taint_flow::TaintFlowRule;
