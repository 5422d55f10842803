//! 通用重试策略
//!
//! 所有外部调用都通过 [`retry_with_backoff`] 包一层，不在调用点各写一遍。

use std::future::Future;
use std::time::Duration;
use tracing::warn;

use crate::config::Config;
use crate::error::{is_quota_text, is_rate_limit_text, LlmError};

/// 指数退避参数
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetryPolicy {
    /// 最多尝试次数（含第一次）
    pub max_attempts: u32,
    /// 第一次重试前的等待
    pub initial_delay: Duration,
    /// 每次重试后等待时间的倍数
    pub multiplier: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_delay: Duration::from_millis(2000),
            multiplier: 2.0,
        }
    }
}

impl RetryPolicy {
    pub fn from_config(config: &Config) -> Self {
        Self {
            max_attempts: config.retry_max_attempts.max(1),
            initial_delay: Duration::from_millis(config.retry_initial_delay_ms),
            multiplier: config.retry_backoff_multiplier.max(1.0),
        }
    }

    /// 第 `retry` 次重试（从 1 开始）前的等待时间
    pub fn delay_for_retry(&self, retry: u32) -> Duration {
        let factor = self.multiplier.powi(retry.saturating_sub(1) as i32);
        self.initial_delay.mul_f64(factor)
    }
}

/// 错误分类结果
#[derive(Debug)]
pub enum RetryDecision<E> {
    /// 可重试
    Retry,
    /// 立即失败，原样返回
    Fail,
    /// 立即失败，换成给定的错误
    FailWith(E),
}

/// 按策略重试异步调用
///
/// - `classify` 决定每个错误是重试、直接失败还是替换后失败
/// - 重试次数用完后，把最后一个错误交给 `on_exhausted` 做最终转换
pub async fn retry_with_backoff<T, E, Op, Fut, C, X>(
    policy: &RetryPolicy,
    mut classify: C,
    mut on_exhausted: X,
    mut op: Op,
) -> Result<T, E>
where
    Op: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    C: FnMut(&E) -> RetryDecision<E>,
    X: FnMut(E) -> E,
    E: std::fmt::Display,
{
    let max_attempts = policy.max_attempts.max(1);
    let mut attempt = 1;

    loop {
        let err = match op().await {
            Ok(value) => return Ok(value),
            Err(err) => err,
        };

        match classify(&err) {
            RetryDecision::Fail => return Err(err),
            RetryDecision::FailWith(replacement) => return Err(replacement),
            RetryDecision::Retry if attempt >= max_attempts => return Err(on_exhausted(err)),
            RetryDecision::Retry => {
                let delay = policy.delay_for_retry(attempt);
                warn!(
                    "⏳ 触发限流，{:?} 后重试 (第 {}/{} 次): {}",
                    delay, attempt, max_attempts, err
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
        }
    }
}

/// LLM 调用的错误分类
///
/// 限流 / 过载 / 配额 → 重试；模型不存在 → 直接失败；其他 → 直接失败。
pub fn classify_llm_error(err: &LlmError) -> RetryDecision<LlmError> {
    match err {
        LlmError::QuotaExceeded { .. } | LlmError::RateLimited { .. } => RetryDecision::Retry,
        LlmError::ApiCallFailed { model, message } => {
            let lower = message.to_lowercase();
            if lower.contains("404") || lower.contains("not found") {
                RetryDecision::FailWith(LlmError::ModelNotFound {
                    model: model.clone(),
                })
            } else if is_quota_text(&lower) || is_rate_limit_text(&lower) {
                RetryDecision::Retry
            } else {
                RetryDecision::Fail
            }
        }
        _ => RetryDecision::Fail,
    }
}

/// 重试用完后的最终错误：带配额字样的归为配额耗尽，其余归为限流
pub fn exhausted_llm_error(err: LlmError) -> LlmError {
    match err {
        LlmError::ApiCallFailed { model, message } | LlmError::RateLimited { model, message }
            if is_quota_text(&message.to_lowercase()) =>
        {
            LlmError::QuotaExceeded { model, message }
        }
        LlmError::ApiCallFailed { model, message } => LlmError::RateLimited { model, message },
        other => other,
    }
}

/// LLM 调用的标准重试
pub async fn retry_llm_call<T, Op, Fut>(policy: &RetryPolicy, op: Op) -> Result<T, LlmError>
where
    Op: FnMut() -> Fut,
    Fut: Future<Output = Result<T, LlmError>>,
{
    retry_with_backoff(policy, classify_llm_error, exhausted_llm_error, op).await
}
