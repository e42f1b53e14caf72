//! Process module - external program execution.
//!
//! Every binary the lifecycle invokes goes through the [`CommandRunner`]
//! trait. [`ExecRunner`] is the implementation used outside of tests.

pub mod backend;
pub mod exec;

#[cfg(test)]
mod exec_tests;

// Re-exports for convenience
pub use backend::{CommandRunner, ExitOutcome, Invocation};
pub use exec::ExecRunner;
