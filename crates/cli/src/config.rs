//! Runtime configuration: flags with environment fallbacks.

use std::time::Duration;

use anyhow::bail;
use clap::Args;

use nbaflow_retry::{BatchConfig, RetryPolicy, RetryStrategy};
use nbaflow_stats::client::{
    DEFAULT_HEADSHOT_URL, DEFAULT_STATS_BASE_URL, PLAYER_ID_PLACEHOLDER,
};
use nbaflow_stats::{CollectConfig, StatsConfig};

/// Reprocessing passes grow the timeout faster than in-unit retries.
const REPROCESS_TIMEOUT_INCREMENT: Duration = Duration::from_secs(10);

#[derive(Debug, Clone, Args)]
pub struct AppConfig {
    /// Initial timeout of every request, in seconds
    #[arg(long, env = "NBAFLOW_TIMEOUT_SECS", default_value_t = 30, global = true)]
    pub timeout_secs: u64,

    /// Timeouts tolerated by single lookups before giving up (unbounded if unset)
    #[arg(long, env = "NBAFLOW_MAX_ATTEMPTS", global = true)]
    pub max_attempts: Option<u32>,

    /// Attempts per unit in the batch pass, before reprocessing takes over
    #[arg(long, env = "NBAFLOW_BATCH_ATTEMPTS", default_value_t = 1, global = true)]
    pub batch_attempts: u32,

    /// Seconds added to a request's timeout after each timeout
    #[arg(long, env = "NBAFLOW_TIMEOUT_INCREMENT_SECS", default_value_t = 5, global = true)]
    pub timeout_increment_secs: u64,

    /// Pause between attempts, in seconds
    #[arg(long, env = "NBAFLOW_RETRY_DELAY_SECS", default_value_t = 3, global = true)]
    pub retry_delay_secs: u64,

    /// Warn every N failed attempts of one request (0 disables)
    #[arg(long, env = "NBAFLOW_VERBOSITY", default_value_t = 5, global = true)]
    pub verbosity: u32,

    /// Reprocessing passes over failed requests (unbounded if unset, 0 disables)
    #[arg(long, env = "NBAFLOW_REPROCESS_PASSES", global = true)]
    pub reprocess_passes: Option<u32>,

    #[arg(
        long,
        env = "NBAFLOW_STATS_BASE_URL",
        default_value = DEFAULT_STATS_BASE_URL,
        global = true
    )]
    pub stats_base_url: String,

    /// Headshot URL template containing `<player_id>`
    #[arg(
        long,
        env = "NBAFLOW_HEADSHOT_URL",
        default_value = DEFAULT_HEADSHOT_URL,
        global = true
    )]
    pub headshot_url: String,
}

impl AppConfig {
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.timeout_secs == 0 {
            bail!("timeout must be at least one second");
        }
        if self.max_attempts == Some(0) {
            bail!("max attempts must be at least 1 (leave unset for unbounded)");
        }
        if self.batch_attempts == 0 {
            bail!("batch attempts must be at least 1");
        }
        let url = &self.stats_base_url;
        if !url.starts_with("http://") && !url.starts_with("https://") {
            bail!("stats base url must be http(s): {}", self.stats_base_url);
        }
        if !self.headshot_url.contains(PLAYER_ID_PLACEHOLDER) {
            bail!(
                "headshot url must contain {PLAYER_ID_PLACEHOLDER}: {}",
                self.headshot_url
            );
        }
        Ok(())
    }

    fn strategy(&self) -> RetryStrategy {
        match self.max_attempts {
            Some(max) => RetryStrategy::Bounded(max),
            None => RetryStrategy::Unbounded,
        }
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            strategy: self.strategy(),
            timeout_increment: Duration::from_secs(self.timeout_increment_secs),
            inter_attempt_delay: Duration::from_secs(self.retry_delay_secs),
            verbosity_threshold: self.verbosity,
        }
    }

    pub fn reprocess_policy(&self) -> Option<RetryPolicy> {
        let strategy = match self.reprocess_passes {
            Some(0) => return None,
            Some(passes) => RetryStrategy::Bounded(passes),
            None => RetryStrategy::Unbounded,
        };
        Some(RetryPolicy {
            strategy,
            timeout_increment: REPROCESS_TIMEOUT_INCREMENT,
            ..self.retry_policy()
        })
    }

    pub fn collect_config(&self) -> CollectConfig {
        CollectConfig {
            timeout: Duration::from_secs(self.timeout_secs),
            single: self.retry_policy(),
            batch: BatchConfig {
                policy: RetryPolicy {
                    strategy: RetryStrategy::Bounded(self.batch_attempts),
                    ..self.retry_policy()
                },
                reprocess: self.reprocess_policy(),
            },
        }
    }

    pub fn stats_config(&self) -> StatsConfig {
        StatsConfig::default()
            .with_base_url(self.stats_base_url.as_str())
            .with_headshot_url(self.headshot_url.as_str())
    }
}
