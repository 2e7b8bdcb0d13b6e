//! Quality rules

pub mod use_before_init;

pub use use_before_init::UseBeforeInit;
