// kubeintent-core/src/tools/mod.rs

//! Process execution for cluster commands.
//!
//! **Important:** the runner does *not* perform safety checks. Callers (the
//! [`crate::orchestrator::Orchestrator`]) run every command through
//! [`crate::safety`] first.

pub mod shell;

pub use shell::{augmented_path, default_extra_paths, execution_mode, run_command, ProcessRunner};
