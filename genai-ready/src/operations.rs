//! Operations API surface.

use std::sync::Arc;

use genai_ready_types::operations::Operation;

use crate::client::ClientInner;
use crate::error::{Error, Result};
use crate::poll::{Clock, PollConfig, Readiness, ReadinessPoller, Status};

#[derive(Clone)]
pub struct Operations {
    pub(crate) inner: Arc<ClientInner>,
}

impl Operations {
    pub(crate) fn new(inner: Arc<ClientInner>) -> Self {
        Self { inner }
    }

    /// 获取操作状态。
    pub async fn get(&self, name: impl AsRef<str>) -> Result<Operation> {
        let name = normalize_operation_name(name.as_ref())?;
        let url = build_operation_url(&self.inner, &name);
        let response = self.inner.send_checked(self.inner.http.get(url)).await?;
        Ok(response.json::<Operation>().await?)
    }

    /// 等待操作完成（轮询）。
    pub async fn wait(&self, operation: Operation, config: PollConfig) -> Result<Operation> {
        self.wait_with(operation, &ReadinessPoller::new(config))
            .await
    }

    /// 等待操作完成（自定义轮询器）。
    ///
    /// An operation that is already done is checked without a request.
    pub async fn wait_with<C: Clock>(
        &self,
        operation: Operation,
        poller: &ReadinessPoller<C>,
    ) -> Result<Operation> {
        let name = operation.name.clone().ok_or_else(|| Error::InvalidConfig {
            message: "Operation name is empty".into(),
        })?;
        let name = name.as_str();
        let mut seed = Some(operation).filter(|op| op.done.unwrap_or(false));
        poller
            .wait_until_ready(|| {
                let seed = seed.take();
                async move {
                    match seed {
                        Some(op) => Ok(op),
                        None => self.get(name).await,
                    }
                }
            })
            .await
    }
}

impl Readiness for Operation {
    // An absent `done` means the operation is still running.
    fn status(&self) -> Option<Status> {
        match (self.done.unwrap_or(false), self.error.is_some()) {
            (false, _) => Some(Status::Pending),
            (true, true) => Some(Status::Failed),
            (true, false) => Some(Status::Ready),
        }
    }

    fn failure_message(&self) -> Option<String> {
        let error = self.error.as_ref()?;
        Some(match (&error.code, &error.message) {
            (Some(code), Some(message)) => format!("{message} (code {code})"),
            (None, Some(message)) => message.clone(),
            (Some(code), None) => format!("Operation failed with code {code}"),
            (None, None) => "Operation failed".to_string(),
        })
    }

    fn resource_name(&self) -> Option<&str> {
        self.name.as_deref()
    }
}

fn normalize_operation_name(name: &str) -> Result<String> {
    if name.is_empty() {
        return Err(Error::InvalidConfig {
            message: "Operation name is empty".into(),
        });
    }
    if name.starts_with("operations/") || name.starts_with("models/") {
        Ok(name.to_string())
    } else {
        Ok(format!("operations/{name}"))
    }
}

fn build_operation_url(inner: &ClientInner, name: &str) -> String {
    let base = &inner.api_client.base_url;
    let version = &inner.api_client.api_version;
    format!("{base}{version}/{name}")
}
