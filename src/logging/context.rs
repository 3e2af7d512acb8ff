use crate::cli::Command;
use std::env;

/// Execution contexts that influence how logging is routed.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ExecutionContext {
    /// A person reading terminal output.
    Interactive,
    /// Stdout carries JSON for another program; keep the console quiet.
    MachineReadable,
}

impl ExecutionContext {
    /// Returns `true` when console sinks should be disabled.
    pub fn disables_console(self) -> bool {
        matches!(self, ExecutionContext::MachineReadable)
    }
}

/// Derive the active execution context from a parsed CLI command plus overrides.
pub fn detect_context(command: &Command) -> ExecutionContext {
    if quiet_override_enabled() || command.emits_json() {
        ExecutionContext::MachineReadable
    } else {
        ExecutionContext::Interactive
    }
}

fn quiet_override_enabled() -> bool {
    env::var("FLOWGUARD_QUIET")
        .map(|value| value.trim() == "1")
        .unwrap_or(false)
}
