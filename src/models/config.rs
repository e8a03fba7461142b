use std::collections::HashMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    /// Directory that generated artifacts are written to. Defaults to the
    /// platform data dir when unset.
    #[serde(default)]
    pub output_dir: Option<PathBuf>,
    /// PNG overlay composited onto every generated image. Missing file
    /// degrades to pass-through.
    #[serde(default)]
    pub watermark_path: Option<PathBuf>,
    /// Base URL of the external generation API.
    #[serde(default = "default_generation_url")]
    pub generation_url: String,
    #[serde(default = "default_rate_limit_max")]
    pub rate_limit_max: usize,
    #[serde(default = "default_rate_limit_window_secs")]
    pub rate_limit_window_secs: u64,
    #[serde(default = "default_max_concurrency")]
    pub max_concurrency: usize,
    #[serde(default = "default_starts_per_bucket")]
    pub starts_per_bucket: u32,
    #[serde(default = "default_bucket_millis")]
    pub bucket_millis: u64,
    #[serde(default = "default_backlog_threshold")]
    pub backlog_threshold: usize,
    #[serde(default = "default_max_upload_bytes")]
    pub max_upload_bytes: usize,
    #[serde(default = "default_session_sweep_secs")]
    pub session_sweep_secs: u64,
    #[serde(default = "default_session_retention_secs")]
    pub session_retention_secs: u64,
    #[serde(default = "default_artifact_max_age_secs")]
    pub artifact_max_age_secs: u64,
    #[serde(default = "default_recent_sessions")]
    pub recent_sessions: usize,
    /// Kiosk allow-list: kiosk id -> priority tier. Jobs from kiosks not
    /// in this map run at priority 0 and are not tracked in stats.
    #[serde(default)]
    pub kiosks: HashMap<String, u8>,
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8490
}

fn default_generation_url() -> String {
    "https://api.example.com/v1/images/edits".to_string()
}

fn default_rate_limit_max() -> usize {
    5
}

fn default_rate_limit_window_secs() -> u64 {
    60
}

fn default_max_concurrency() -> usize {
    2
}

fn default_starts_per_bucket() -> u32 {
    3
}

fn default_bucket_millis() -> u64 {
    1000
}

fn default_backlog_threshold() -> usize {
    10
}

fn default_max_upload_bytes() -> usize {
    10 * 1024 * 1024 // 10MB
}

fn default_session_sweep_secs() -> u64 {
    30 * 60
}

fn default_session_retention_secs() -> u64 {
    60 * 60
}

fn default_artifact_max_age_secs() -> u64 {
    4 * 60 * 60
}

fn default_recent_sessions() -> usize {
    20
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            output_dir: None,
            watermark_path: None,
            generation_url: default_generation_url(),
            rate_limit_max: default_rate_limit_max(),
            rate_limit_window_secs: default_rate_limit_window_secs(),
            max_concurrency: default_max_concurrency(),
            starts_per_bucket: default_starts_per_bucket(),
            bucket_millis: default_bucket_millis(),
            backlog_threshold: default_backlog_threshold(),
            max_upload_bytes: default_max_upload_bytes(),
            session_sweep_secs: default_session_sweep_secs(),
            session_retention_secs: default_session_retention_secs(),
            artifact_max_age_secs: default_artifact_max_age_secs(),
            recent_sessions: default_recent_sessions(),
            kiosks: HashMap::new(),
        }
    }
}
