/// 指数バックオフ+ジッター付き再試行ロジック。
///
/// エラーメッセージのパターン照合で一時的な失敗のみを再試行します。
use std::future::Future;
use std::time::Duration;

use anyhow::{anyhow, Result};
use rand::Rng;

/// 再試行戦略の設定。
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// 最大試行回数（初回を含む）
    pub max_attempts: usize,
    /// 初回の遅延時間
    pub initial_delay: Duration,
    /// 最大遅延時間
    pub max_delay: Duration,
    /// バックオフ係数
    pub backoff_factor: f64,
    /// 1試行あたりのタイムアウト
    pub attempt_timeout: Duration,
    /// 再試行可能と判定する部分文字列（大文字小文字を区別しない）
    pub retryable_patterns: Vec<String>,
}

fn base_patterns() -> Vec<String> {
    [
        "timeout",
        "connection reset",
        "rate limit",
        "connection refused",
        "socket hang up",
        // covers 5xx status codes mentioned in error messages
        "5",
    ]
    .iter()
    .map(ToString::to_string)
    .collect()
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(5),
            backoff_factor: 2.0,
            attempt_timeout: Duration::from_secs(30),
            retryable_patterns: base_patterns(),
        }
    }
}

impl RetryConfig {
    /// Preset for scrape endpoints that sometimes answer with an HTML error
    /// page instead of JSON.
    #[must_use]
    pub fn fast() -> Self {
        let mut patterns = base_patterns();
        patterns.push("invalid character".to_string());
        patterns.push("<".to_string());
        Self {
            max_attempts: 5,
            initial_delay: Duration::from_secs(5),
            max_delay: Duration::from_secs(30),
            backoff_factor: 2.0,
            attempt_timeout: Duration::from_secs(30),
            retryable_patterns: patterns,
        }
    }

    /// 指定された失敗回数に対する待機時間を計算する（ジッター込み）。
    ///
    /// `attempt` は直前に失敗した試行の番号（1始まり）。
    #[must_use]
    pub fn delay_after_attempt(&self, attempt: usize) -> Duration {
        let backoff =
            self.initial_delay.as_millis() as f64 * self.backoff_factor.powi(attempt as i32 - 1);
        let capped = backoff.min(self.max_delay.as_millis() as f64) as u64;

        let jitter_range = capped / 10;
        let jitter = if jitter_range > 0 {
            rand::thread_rng().gen_range(0..jitter_range)
        } else {
            0
        };

        Duration::from_millis(capped + jitter)
    }
}

/// エラーが再試行可能かどうかを判定する。
#[must_use]
pub fn is_retryable_error(error: &anyhow::Error, patterns: &[String]) -> bool {
    let message = format!("{error:#}").to_lowercase();
    patterns
        .iter()
        .any(|pattern| message.contains(&pattern.to_lowercase()))
}

/// Run `operation` under the retry policy.
///
/// Each attempt runs with its own deadline. The delay between attempts is
/// `min(initial × factor^(i−1), max)` plus uniform jitter in `[0, delay/10]`.
/// The last attempt's error is returned verbatim so callers can still
/// classify it. No sleep is scheduled before the first attempt or after the
/// last one.
pub async fn with_retry<T, F, Fut>(config: &RetryConfig, mut operation: F) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let mut last_error = anyhow!("retry configured with zero attempts");

    for attempt in 1..=config.max_attempts {
        let outcome = tokio::time::timeout(config.attempt_timeout, operation()).await;

        let error = match outcome {
            Ok(Ok(value)) => return Ok(value),
            Ok(Err(error)) => error,
            Err(_) => anyhow!(
                "attempt timeout after {}s",
                config.attempt_timeout.as_secs()
            ),
        };

        if attempt == config.max_attempts {
            return Err(error);
        }

        if !is_retryable_error(&error, &config.retryable_patterns) {
            return Err(error);
        }

        let delay = config.delay_after_attempt(attempt);
        tracing::debug!(
            attempt,
            delay_ms = delay.as_millis() as u64,
            error = %error,
            "retrying after transient failure"
        );
        last_error = error;
        tokio::time::sleep(delay).await;
    }

    Err(last_error)
}
