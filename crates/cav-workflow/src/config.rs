//! Configuration bundle for the workflow.

use std::time::Duration;

/// Tunables for the orchestrator and readiness gate.
///
/// Deployment-specific identifiers (the host-instructions parameter name)
/// live here rather than in the components, so the core contract stays free
/// of concrete bus names.
#[derive(Debug, Clone)]
pub struct WorkflowConfig {
    /// Maximum readiness poll attempts before giving up.
    pub ready_max_attempts: u32,
    /// Fixed delay between readiness poll attempts.
    pub ready_retry_delay: Duration,
    /// Parameter holding operator instructions appended when guidance becomes
    /// ready to engage.
    pub host_instructions_param: String,
}

impl Default for WorkflowConfig {
    fn default() -> Self {
        Self {
            ready_max_attempts: 10,
            ready_retry_delay: Duration::from_secs(3),
            host_instructions_param: "/ui/host_instructions".to_string(),
        }
    }
}
