// src/config.rs

use clap::Parser;
use std::{path::PathBuf, time::Duration};

pub const DEFAULT_API_BASE: &str = "https://open.feishu.cn/open-apis/";

/// Run configuration, built once at start-up from flags or the environment.
#[derive(Parser, Debug, Clone)]
#[command(name = "coverage-sync", about = "Sync a coverage export into a remote table")]
pub struct SyncConfig {
    /// Tab-delimited coverage export to import
    #[arg(long, env = "CSV_FILE_PATH")]
    pub csv_path: PathBuf,

    #[arg(long, env = "FEISHU_APP_ID")]
    pub app_id: String,

    #[arg(long, env = "FEISHU_APP_SECRET", hide_env_values = true)]
    pub app_secret: String,

    /// Table application token
    #[arg(long, env = "BITABLE_APP_TOKEN")]
    pub app_token: String,

    #[arg(long, env = "BITABLE_TABLE_ID")]
    pub table_id: String,

    /// Chat to post the run summary card to
    #[arg(long, env = "TARGET_CHAT_ID")]
    pub chat_id: Option<String>,

    /// Email address to post the run summary card to
    #[arg(long, env = "NOTIFICATION_EMAIL")]
    pub email: Option<String>,

    /// Link shown on the summary card
    #[arg(long, env = "BITABLE_URL")]
    pub table_url: Option<String>,

    /// Run-count state file
    #[arg(long, env = "SCHEDULE_STATE_PATH", default_value = "schedule_state.json")]
    pub schedule_state: PathBuf,

    #[arg(long, env = "API_BASE", default_value = DEFAULT_API_BASE)]
    pub api_base: String,

    #[arg(long, default_value_t = 15)]
    pub batch_size: usize,

    #[arg(long, default_value_t = 500)]
    pub page_size: usize,

    /// Pause between upload batches
    #[arg(long, default_value_t = 1000)]
    pub batch_pause_ms: u64,

    /// Timeout for table requests
    #[arg(long, default_value_t = 30)]
    pub request_timeout_secs: u64,
}

impl SyncConfig {
    pub fn batch_pause(&self) -> Duration {
        Duration::from_millis(self.batch_pause_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Knobs the sync routine itself needs.
    pub fn sync_options(&self) -> SyncOptions {
        SyncOptions {
            batch_size: self.batch_size.max(1),
            page_size: self.page_size.max(1),
            batch_pause: self.batch_pause(),
        }
    }
}

/// Tunables for one run of the sync routine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyncOptions {
    pub batch_size: usize,
    pub page_size: usize,
    pub batch_pause: Duration,
}

impl Default for SyncOptions {
    fn default() -> Self {
        Self {
            batch_size: 15,
            page_size: 500,
            batch_pause: Duration::from_secs(1),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flags_override_defaults() {
        let cfg = SyncConfig::try_parse_from([
            "coverage-sync",
            "--csv-path",
            "export.csv",
            "--app-id",
            "cli_a",
            "--app-secret",
            "s3cret",
            "--app-token",
            "bascn",
            "--table-id",
            "tbl1",
            "--batch-size",
            "0",
            "--batch-pause-ms",
            "250",
        ])
        .unwrap();

        let opts = cfg.sync_options();
        assert_eq!(opts.batch_size, 1);
        assert_eq!(opts.page_size, 500);
        assert_eq!(opts.batch_pause, Duration::from_millis(250));
        assert_eq!(cfg.request_timeout(), Duration::from_secs(30));
        assert!(cfg.chat_id.is_none() || std::env::var("TARGET_CHAT_ID").is_ok());
    }
}
