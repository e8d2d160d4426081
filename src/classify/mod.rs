// src/classify/mod.rs

//! Change classification.
//!
//! Maps a changed path to zero or more job names via an ordered rule list
//! with explicit short-circuit semantics. Classification never fails: a path
//! matching no rule is silently ignored.

pub mod rule;

pub use rule::{CompiledRule, RuleSet};
