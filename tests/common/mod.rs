// tests/common/mod.rs

#![allow(dead_code)]

pub use pipewatch_test_utils::builders;
pub use pipewatch_test_utils::fake_executor;
pub use pipewatch_test_utils::{init_tracing, with_timeout};
