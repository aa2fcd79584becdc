//! Files API surface.

use std::path::Path;
use std::sync::Arc;

use genai_ready_types::enums::FileState;
use genai_ready_types::files::{File, ListFilesConfig, ListFilesResponse, UploadFileConfig};
use serde_json::Value;
use tokio::io::AsyncReadExt;

use crate::client::ClientInner;
use crate::error::{Error, Result};
use crate::poll::{Clock, PollConfig, Readiness, ReadinessPoller, Status};

const CHUNK_SIZE: usize = 8 * 1024 * 1024;

#[derive(Clone)]
pub struct Files {
    pub(crate) inner: Arc<ClientInner>,
}

impl Files {
    pub(crate) fn new(inner: Arc<ClientInner>) -> Self {
        Self { inner }
    }

    /// 上传文件（直接上传字节数据）。
    pub async fn upload(&self, data: Vec<u8>, mime_type: impl Into<String>) -> Result<File> {
        let config = UploadFileConfig {
            mime_type: Some(mime_type.into()),
            ..UploadFileConfig::default()
        };
        self.upload_with_config(data, config).await
    }

    /// 上传文件（自定义配置）。
    pub async fn upload_with_config(
        &self,
        data: Vec<u8>,
        config: UploadFileConfig,
    ) -> Result<File> {
        let mime_type = config
            .mime_type
            .clone()
            .ok_or_else(|| Error::InvalidConfig {
                message: "mime_type is required when uploading raw bytes".into(),
            })?;
        let size_bytes = data.len() as u64;
        let file = build_upload_file(config, size_bytes, &mime_type);
        let upload_url = self
            .start_resumable_upload(file, size_bytes, &mime_type, None)
            .await?;
        self.upload_bytes(&upload_url, &data).await
    }

    /// 从文件路径上传。
    pub async fn upload_from_path(&self, path: impl AsRef<Path>) -> Result<File> {
        self.upload_from_path_with_config(path, UploadFileConfig::default())
            .await
    }

    /// 从文件路径上传（自定义配置）。
    pub async fn upload_from_path_with_config(
        &self,
        path: impl AsRef<Path>,
        mut config: UploadFileConfig,
    ) -> Result<File> {
        let path = path.as_ref();
        let metadata = tokio::fs::metadata(path).await?;
        if !metadata.is_file() {
            return Err(Error::InvalidConfig {
                message: format!("{} is not a valid file path", path.display()),
            });
        }

        let size_bytes = metadata.len();
        let mime_type = if let Some(value) = config.mime_type.take() {
            value
        } else {
            mime_guess::from_path(path)
                .first_or_octet_stream()
                .essence_str()
                .to_string()
        };

        let file_name = path.file_name().and_then(|name| name.to_str());
        let file = build_upload_file(config, size_bytes, &mime_type);
        let upload_url = self
            .start_resumable_upload(file, size_bytes, &mime_type, file_name)
            .await?;
        let mut file_handle = tokio::fs::File::open(path).await?;
        self.upload_reader(&upload_url, &mut file_handle, size_bytes)
            .await
    }

    /// 列出文件。
    pub async fn list(&self) -> Result<ListFilesResponse> {
        self.list_with_config(ListFilesConfig::default()).await
    }

    /// 列出文件（自定义配置）。
    pub async fn list_with_config(&self, config: ListFilesConfig) -> Result<ListFilesResponse> {
        let url = build_files_list_url(&self.inner, &config)?;
        let response = self.inner.send_checked(self.inner.http.get(url)).await?;
        Ok(response.json::<ListFilesResponse>().await?)
    }

    /// 列出所有文件（自动翻页）。
    pub async fn all(&self) -> Result<Vec<File>> {
        self.all_with_config(ListFilesConfig::default()).await
    }

    /// 列出所有文件（带配置，自动翻页）。
    pub async fn all_with_config(&self, mut config: ListFilesConfig) -> Result<Vec<File>> {
        let mut files = Vec::new();
        loop {
            let response = self.list_with_config(config.clone()).await?;
            if let Some(items) = response.files {
                files.extend(items);
            }
            match response.next_page_token {
                Some(token) if !token.is_empty() => {
                    config.page_token = Some(token);
                }
                _ => break,
            }
        }
        Ok(files)
    }

    /// 获取文件元数据。
    pub async fn get(&self, name_or_uri: impl AsRef<str>) -> Result<File> {
        let file_name = normalize_file_name(name_or_uri.as_ref())?;
        let url = build_file_url(&self.inner, &file_name);
        let response = self.inner.send_checked(self.inner.http.get(url)).await?;
        Ok(response.json::<File>().await?)
    }

    /// 删除文件。
    pub async fn delete(&self, name_or_uri: impl AsRef<str>) -> Result<()> {
        let file_name = normalize_file_name(name_or_uri.as_ref())?;
        let url = build_file_url(&self.inner, &file_name);
        self.inner
            .send_checked(self.inner.http.delete(url))
            .await?;
        Ok(())
    }

    /// 轮询直到文件状态变为 ACTIVE。
    pub async fn wait_for_active(
        &self,
        name_or_uri: impl AsRef<str>,
        config: PollConfig,
    ) -> Result<File> {
        self.wait_for_active_with(name_or_uri, &ReadinessPoller::new(config))
            .await
    }

    /// 轮询直到文件状态变为 ACTIVE（自定义轮询器）。
    pub async fn wait_for_active_with<C: Clock>(
        &self,
        name_or_uri: impl AsRef<str>,
        poller: &ReadinessPoller<C>,
    ) -> Result<File> {
        let file_name = normalize_file_name(name_or_uri.as_ref())?;
        let file_name = file_name.as_str();
        tracing::debug!(file = file_name, "waiting for file to become ACTIVE");
        poller.wait_until_ready(|| self.get(file_name)).await
    }

    async fn start_resumable_upload(
        &self,
        file: File,
        size_bytes: u64,
        mime_type: &str,
        file_name: Option<&str>,
    ) -> Result<String> {
        let url = build_files_upload_url(&self.inner);
        let mut request = self
            .inner
            .http
            .post(url)
            .header("X-Goog-Upload-Protocol", "resumable")
            .header("X-Goog-Upload-Command", "start")
            .header(
                "X-Goog-Upload-Header-Content-Length",
                size_bytes.to_string(),
            )
            .header("X-Goog-Upload-Header-Content-Type", mime_type);

        if let Some(file_name) = file_name {
            request = request.header("X-Goog-Upload-File-Name", file_name);
        }

        let body = serde_json::json!({ "file": file });
        let response = self.inner.send_checked(request.json(&body)).await?;

        let upload_url = response
            .headers()
            .get("x-goog-upload-url")
            .and_then(|value| value.to_str().ok())
            .ok_or_else(|| Error::Parse {
                message: "Missing x-goog-upload-url header".into(),
            })?;

        Ok(upload_url.to_string())
    }

    async fn upload_bytes(&self, upload_url: &str, data: &[u8]) -> Result<File> {
        if data.is_empty() {
            let (status, file) = self.send_upload_chunk(upload_url, &[], 0, true).await?;
            return finalize_upload(&status, file);
        }

        let mut offset: usize = 0;
        while offset < data.len() {
            let end = (offset + CHUNK_SIZE).min(data.len());
            let finalize = end == data.len();
            let (status, file) = self
                .send_upload_chunk(upload_url, &data[offset..end], offset as u64, finalize)
                .await?;

            if finalize {
                return finalize_upload(&status, file);
            }
            ensure_upload_active(&status)?;
            offset = end;
        }

        Err(Error::Parse {
            message: "Upload finished without final response".into(),
        })
    }

    async fn upload_reader(
        &self,
        upload_url: &str,
        reader: &mut tokio::fs::File,
        total_size: u64,
    ) -> Result<File> {
        if total_size == 0 {
            let (status, file) = self.send_upload_chunk(upload_url, &[], 0, true).await?;
            return finalize_upload(&status, file);
        }

        let mut offset: u64 = 0;
        let mut buffer = vec![0u8; CHUNK_SIZE];
        while offset < total_size {
            let read_bytes = reader.read(&mut buffer).await?;
            if read_bytes == 0 {
                return Err(Error::Parse {
                    message: "Unexpected EOF while uploading file".into(),
                });
            }

            let finalize = offset + read_bytes as u64 >= total_size;
            let (status, file) = self
                .send_upload_chunk(upload_url, &buffer[..read_bytes], offset, finalize)
                .await?;

            if finalize {
                return finalize_upload(&status, file);
            }
            ensure_upload_active(&status)?;
            offset += read_bytes as u64;
        }

        Err(Error::Parse {
            message: "Upload finished without final response".into(),
        })
    }

    async fn send_upload_chunk(
        &self,
        upload_url: &str,
        chunk: &[u8],
        offset: u64,
        finalize: bool,
    ) -> Result<(String, Option<File>)> {
        let command = if finalize {
            "upload, finalize"
        } else {
            "upload"
        };
        let request = self
            .inner
            .http
            .post(upload_url)
            .header("X-Goog-Upload-Command", command)
            .header("X-Goog-Upload-Offset", offset.to_string())
            .header("Content-Length", chunk.len().to_string())
            .body(chunk.to_vec());
        let response = self.inner.send_checked(request).await?;

        let upload_status = response
            .headers()
            .get("x-goog-upload-status")
            .and_then(|value| value.to_str().ok())
            .ok_or_else(|| Error::Parse {
                message: "Missing x-goog-upload-status header".into(),
            })?
            .to_string();

        let body = response.bytes().await?;
        if body.is_empty() {
            return Ok((upload_status, None));
        }

        let value: Value = serde_json::from_slice(&body)?;
        let file_value = value.get("file").cloned().unwrap_or(value);
        let file: File = serde_json::from_value(file_value)?;

        Ok((upload_status, Some(file)))
    }
}

impl Readiness for File {
    fn status(&self) -> Option<Status> {
        match self.state? {
            FileState::Active => Some(Status::Ready),
            FileState::Failed => Some(Status::Failed),
            FileState::Processing => Some(Status::Pending),
            FileState::StateUnspecified => None,
        }
    }

    fn failure_message(&self) -> Option<String> {
        let message = self.error.as_ref().and_then(|status| status.message.clone());
        Some(message.unwrap_or_else(|| {
            format!(
                "File {} processing failed",
                self.name.as_deref().unwrap_or("<unnamed>")
            )
        }))
    }

    fn resource_name(&self) -> Option<&str> {
        self.name.as_deref()
    }
}

fn ensure_upload_active(status: &str) -> Result<()> {
    if status != "active" {
        return Err(Error::Parse {
            message: format!("Unexpected upload status: {status}"),
        });
    }
    Ok(())
}

fn finalize_upload(status: &str, file: Option<File>) -> Result<File> {
    if status != "final" {
        return Err(Error::Parse {
            message: format!("Upload finalize failed: {status}"),
        });
    }
    file.ok_or_else(|| Error::Parse {
        message: "Upload completed but response body was empty".into(),
    })
}

fn build_upload_file(config: UploadFileConfig, size_bytes: u64, mime_type: &str) -> File {
    File {
        name: config.name.as_deref().map(normalize_upload_name),
        display_name: config.display_name,
        mime_type: Some(mime_type.to_string()),
        size_bytes: Some(size_bytes.to_string()),
        ..File::default()
    }
}

fn normalize_upload_name(name: &str) -> String {
    if name.starts_with("files/") {
        name.to_string()
    } else {
        format!("files/{name}")
    }
}

fn normalize_file_name(value: &str) -> Result<String> {
    if value.starts_with("http://") || value.starts_with("https://") {
        let marker = "files/";
        let start = value.find(marker).ok_or_else(|| Error::InvalidConfig {
            message: format!("Could not find 'files/' in URI: {value}"),
        })?;
        let suffix = &value[start + marker.len()..];
        let name: String = suffix
            .chars()
            .take_while(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || *c == '-')
            .collect();
        if name.is_empty() {
            return Err(Error::InvalidConfig {
                message: format!("Could not extract file name from URI: {value}"),
            });
        }
        Ok(name)
    } else if let Some(name) = value.strip_prefix("files/") {
        Ok(name.to_string())
    } else if value.is_empty() {
        Err(Error::InvalidConfig {
            message: "File name is empty".into(),
        })
    } else {
        Ok(value.to_string())
    }
}

fn build_files_upload_url(inner: &ClientInner) -> String {
    let base = &inner.api_client.base_url;
    let version = &inner.api_client.api_version;
    format!("{base}upload/{version}/files")
}

fn build_files_list_url(inner: &ClientInner, config: &ListFilesConfig) -> Result<String> {
    let base = &inner.api_client.base_url;
    let version = &inner.api_client.api_version;
    let url = format!("{base}{version}/files");
    add_list_query_params(url, config)
}

fn build_file_url(inner: &ClientInner, name: &str) -> String {
    let base = &inner.api_client.base_url;
    let version = &inner.api_client.api_version;
    format!("{base}{version}/files/{name}")
}

fn add_list_query_params(url: String, config: &ListFilesConfig) -> Result<String> {
    let mut url = reqwest::Url::parse(&url).map_err(|err| Error::InvalidConfig {
        message: err.to_string(),
    })?;
    {
        let mut pairs = url.query_pairs_mut();
        if let Some(page_size) = config.page_size {
            pairs.append_pair("pageSize", &page_size.to_string());
        }
        if let Some(page_token) = &config.page_token {
            pairs.append_pair("pageToken", page_token);
        }
    }
    Ok(url.to_string())
}
