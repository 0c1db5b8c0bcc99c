use std::time::Duration;

/// Tunables of the orchestration loop.
#[derive(Debug, Clone)]
pub struct OrchestratorSettings {
    /// Job (workflow) dispatched once per period.
    pub job_name: String,
    /// Delay between wake-ups while a job is being tracked.
    pub poll_interval: Duration,
    /// Delay between a dispatch and the first discovery attempt.
    pub discovery_delay: Duration,
    /// Delay between listing attempts within one discovery pass.
    pub discovery_interval: Duration,
    /// Listing attempts per discovery pass.
    pub discovery_attempts: u32,
    /// Discovery passes allowed before the period fails.
    pub max_recovery_attempts: u32,
    /// Budget measured from `triggered_at` before a job is declared stuck.
    pub max_job_duration: Duration,
    /// Page size of the run listing used by discovery.
    pub run_list_limit: u32,
}

impl Default for OrchestratorSettings {
    fn default() -> Self {
        Self {
            job_name: "process-period.yml".to_string(),
            poll_interval: Duration::from_secs(60),
            discovery_delay: Duration::from_secs(5),
            discovery_interval: Duration::from_secs(5),
            discovery_attempts: 6,
            max_recovery_attempts: 10,
            max_job_duration: Duration::from_secs(6 * 3600),
            run_list_limit: 10,
        }
    }
}
