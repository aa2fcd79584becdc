//! Readiness polling for remotely processed resources.
//!
//! Uploaded media and long-running operations are processed asynchronously by
//! the service and cannot be referenced until they reach a usable state. A
//! [`ReadinessPoller`] re-fetches such a resource until it is ready, failed,
//! cancelled, or out of budget. It never hands back a resource that is still
//! pending.

use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

use futures_util::future::BoxFuture;
use tokio_util::sync::CancellationToken;

use crate::error::{Error, Result};

/// 远端资源的处理状态。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    /// 仍在处理中，暂不可用。
    Pending,
    /// 已就绪，可以使用。
    Ready,
    /// 处理失败（终态）。
    Failed,
}

/// 可观察处理状态的资源。
pub trait Readiness {
    /// 当前状态；无法识别时返回 `None`（见 [`UnknownStatusPolicy`]）。
    fn status(&self) -> Option<Status>;

    /// 失败原因（服务端提供）。
    fn failure_message(&self) -> Option<String> {
        None
    }

    /// 资源名称，用于日志字段与错误信息。
    fn resource_name(&self) -> Option<&str> {
        None
    }
}

/// 缺失或无法识别的状态的处理策略。
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum UnknownStatusPolicy {
    /// 视为 PENDING，继续轮询。
    #[default]
    TreatAsPending,
    /// 立即返回 [`Error::UnknownStatus`]。
    Fail,
}

/// 每次 PENDING 轮询时传给进度回调的快照。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollProgress {
    /// 即将开始的等待序号（从 1 开始）。
    pub attempt: u32,
    /// 自首次查询起的耗时。
    pub elapsed: Duration,
}

/// 进度回调。
pub type ProgressFn = Arc<dyn Fn(&PollProgress) + Send + Sync>;

/// 轮询配置。
#[derive(Clone)]
pub struct PollConfig {
    /// 轮询间隔。
    pub interval: Duration,
    /// 最大重试次数（不含首次查询）；`None` 表示不限制。
    pub max_attempts: Option<u32>,
    /// 总等待时长上限（从首次查询起算）；`None` 表示不限制。
    pub max_elapsed: Option<Duration>,
    /// 进度回调，每次 PENDING 后、等待前调用。
    pub on_progress: Option<ProgressFn>,
    /// 未知状态的处理策略。
    pub unknown_status: UnknownStatusPolicy,
    /// 取消令牌；触发后立即停止轮询。
    pub cancellation: Option<CancellationToken>,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(2),
            max_attempts: None,
            max_elapsed: Some(Duration::from_secs(300)),
            on_progress: None,
            unknown_status: UnknownStatusPolicy::default(),
            cancellation: None,
        }
    }
}

impl fmt::Debug for PollConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PollConfig")
            .field("interval", &self.interval)
            .field("max_attempts", &self.max_attempts)
            .field("max_elapsed", &self.max_elapsed)
            .field("on_progress", &self.on_progress.as_ref().map(|_| "Fn"))
            .field("unknown_status", &self.unknown_status)
            .field("cancellation", &self.cancellation)
            .finish()
    }
}

impl PollConfig {
    /// 设置轮询间隔。
    #[must_use]
    pub const fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// 设置最大重试次数（不含首次查询）。
    #[must_use]
    pub const fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = Some(max_attempts);
        self
    }

    /// 设置总等待时长上限；`None` 表示不限制。
    #[must_use]
    pub const fn with_max_elapsed(mut self, max_elapsed: Option<Duration>) -> Self {
        self.max_elapsed = max_elapsed;
        self
    }

    /// 设置进度回调。
    #[must_use]
    pub fn with_progress(mut self, f: impl Fn(&PollProgress) + Send + Sync + 'static) -> Self {
        self.on_progress = Some(Arc::new(f));
        self
    }

    /// 设置未知状态的处理策略。
    #[must_use]
    pub const fn with_unknown_status(mut self, policy: UnknownStatusPolicy) -> Self {
        self.unknown_status = policy;
        self
    }

    /// 设置取消令牌。
    #[must_use]
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = Some(token);
        self
    }
}

/// 轮询使用的时钟。
pub trait Clock: Send + Sync {
    /// 当前时间。
    fn now(&self) -> Instant;
    /// 等待指定时长。
    fn sleep(&self, duration: Duration) -> BoxFuture<'static, ()>;
}

/// 基于 tokio 定时器的默认时钟。
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioClock;

impl Clock for TokioClock {
    fn now(&self) -> Instant {
        Instant::now()
    }

    fn sleep(&self, duration: Duration) -> BoxFuture<'static, ()> {
        Box::pin(tokio::time::sleep(duration))
    }
}

/// 资源就绪轮询器。
#[derive(Debug, Clone)]
pub struct ReadinessPoller<C = TokioClock> {
    config: PollConfig,
    clock: C,
}

impl ReadinessPoller<TokioClock> {
    /// 创建轮询器（tokio 时钟）。
    #[must_use]
    pub fn new(config: PollConfig) -> Self {
        Self {
            config,
            clock: TokioClock,
        }
    }
}

impl Default for ReadinessPoller<TokioClock> {
    fn default() -> Self {
        Self::new(PollConfig::default())
    }
}

impl<C: Clock> ReadinessPoller<C> {
    /// 替换时钟（测试中注入手动时钟）。
    #[must_use]
    pub fn with_clock<D: Clock>(self, clock: D) -> ReadinessPoller<D> {
        ReadinessPoller {
            config: self.config,
            clock,
        }
    }

    /// 当前轮询配置。
    #[must_use]
    pub const fn config(&self) -> &PollConfig {
        &self.config
    }

    /// 轮询直到资源就绪。
    ///
    /// 立即调用一次 `fetch`，之后每个间隔调用一次；就绪时原样返回资源。
    ///
    /// # Errors
    /// - [`Error::ProcessingFailed`]：资源进入失败状态。
    /// - [`Error::Timeout`]：仍为 PENDING 时次数或时长预算耗尽。
    /// - [`Error::TransientQuery`]：可重试的查询错误之后预算耗尽。
    /// - [`Error::Cancelled`]：取消令牌被触发。
    /// - [`Error::UnknownStatus`]：[`UnknownStatusPolicy::Fail`] 下遇到未知状态。
    /// - `fetch` 返回的不可重试错误，原样返回。
    pub async fn wait_until_ready<R, F, Fut>(&self, mut fetch: F) -> Result<R>
    where
        R: Readiness,
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<R>>,
    {
        let start = self.clock.now();
        let mut attempts: u32 = 0;
        loop {
            self.ensure_not_cancelled()?;

            let query_error = match fetch().await {
                Ok(resource) => match self.classify(&resource)? {
                    Status::Ready => {
                        tracing::debug!(
                            resource = resource.resource_name().unwrap_or_default(),
                            attempts,
                            "resource ready"
                        );
                        return Ok(resource);
                    }
                    Status::Failed => {
                        let message = resource
                            .failure_message()
                            .unwrap_or_else(|| "resource processing failed".into());
                        tracing::warn!(
                            resource = resource.resource_name().unwrap_or_default(),
                            %message,
                            "resource processing failed"
                        );
                        return Err(Error::ProcessingFailed { message });
                    }
                    Status::Pending => None,
                },
                Err(err) if err.is_transient() => {
                    tracing::warn!(attempt = attempts, error = %err, "status query failed, retrying");
                    Some(err)
                }
                Err(err) => return Err(err),
            };

            let elapsed = self.clock.now().saturating_duration_since(start);
            if self.budget_exhausted(attempts, elapsed) {
                let queries = attempts.saturating_add(1);
                return Err(match query_error {
                    Some(source) => Error::TransientQuery {
                        attempts: queries,
                        source: Box::new(source),
                    },
                    None => Error::Timeout {
                        message: format!(
                            "resource still pending after {queries} queries ({} ms)",
                            elapsed.as_millis()
                        ),
                    },
                });
            }

            if query_error.is_none() {
                if let Some(on_progress) = &self.config.on_progress {
                    on_progress(&PollProgress {
                        attempt: attempts.saturating_add(1),
                        elapsed,
                    });
                }
            }
            tracing::debug!(
                attempt = attempts.saturating_add(1),
                elapsed_ms = saturating_millis(elapsed),
                "resource pending"
            );

            self.pause(self.next_delay(elapsed)).await?;
            attempts = attempts.saturating_add(1);
        }
    }

    fn classify<R: Readiness>(&self, resource: &R) -> Result<Status> {
        match (resource.status(), self.config.unknown_status) {
            (Some(status), _) => Ok(status),
            (None, UnknownStatusPolicy::TreatAsPending) => Ok(Status::Pending),
            (None, UnknownStatusPolicy::Fail) => Err(Error::UnknownStatus {
                message: format!(
                    "{} reported no recognizable status",
                    resource.resource_name().unwrap_or("resource")
                ),
            }),
        }
    }

    fn budget_exhausted(&self, attempts: u32, elapsed: Duration) -> bool {
        self.config.max_attempts.is_some_and(|max| attempts >= max)
            || self.config.max_elapsed.is_some_and(|max| elapsed >= max)
    }

    // Never sleep past the elapsed deadline; the final check happens on it.
    fn next_delay(&self, elapsed: Duration) -> Duration {
        match self.config.max_elapsed {
            Some(max) => self.config.interval.min(max.saturating_sub(elapsed)),
            None => self.config.interval,
        }
    }

    fn ensure_not_cancelled(&self) -> Result<()> {
        match &self.config.cancellation {
            Some(token) if token.is_cancelled() => Err(Error::Cancelled),
            _ => Ok(()),
        }
    }

    async fn pause(&self, delay: Duration) -> Result<()> {
        let sleep = self.clock.sleep(delay);
        match &self.config.cancellation {
            Some(token) => tokio::select! {
                biased;
                () = token.cancelled() => Err(Error::Cancelled),
                () = sleep => Ok(()),
            },
            None => {
                sleep.await;
                Ok(())
            }
        }
    }
}

fn saturating_millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

/// 轮询直到资源就绪（使用 tokio 时钟）。
///
/// # Errors
/// 见 [`ReadinessPoller::wait_until_ready`]。
pub async fn wait_until_ready<R, F, Fut>(fetch: F, config: PollConfig) -> Result<R>
where
    R: Readiness,
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<R>>,
{
    ReadinessPoller::new(config).wait_until_ready(fetch).await
}
