#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    pub api_base_url: String,
    pub poll_interval_secs: u64,
    pub request_timeout_secs: u64,
    pub user_agent: String,
    /// Optional deadline after which the CLI abandons a job that has not
    /// resolved. Unset means poll until the job reaches a terminal status.
    pub max_wait_secs: Option<u64>,
    pub log_level: String,
}
