//! Client for the remote image generation service.
//!
//! # API
//!
//! `POST {base}/generate/` with a multipart body:
//! - `file`  - the video, streamed
//! - `style` - one of the fixed styles, or empty
//! - `color` - free text
//!
//! A 2xx response carries the image bytes. Anything else is a failure.

use async_trait::async_trait;
use bytes::Bytes;
use futures::{Stream, StreamExt};
use reqwest::header::CONTENT_TYPE;
use reqwest::multipart::{Form, Part};
use std::io;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::io::ReaderStream;
use tracing::{debug, info};
use url::Url;

use crate::error::SubmitError;
use crate::events::{EventSink, SessionEvent};
use crate::form::GenerationParameters;
use crate::selector::{FileSource, SelectedFile};

/// Upload chunk size; one progress event is emitted per chunk.
pub const UPLOAD_CHUNK_SIZE: usize = 64 * 1024;

/// Raw image as it came back from the service.
#[derive(Debug, Clone, PartialEq)]
pub struct GeneratedImage {
    pub data: Bytes,
    pub content_type: Option<String>,
}

#[async_trait]
pub trait GenerationService: Send + Sync {
    /// Send one generation request and wait for the image.
    async fn generate(
        &self,
        file: &SelectedFile,
        parameters: &GenerationParameters,
        events: Arc<dyn EventSink>,
    ) -> Result<GeneratedImage, SubmitError>;
}

#[derive(Debug, thiserror::Error)]
pub enum ClientSetupError {
    #[error("invalid service URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
    #[error("failed to build HTTP client: {0}")]
    Http(#[from] reqwest::Error),
}

#[derive(Debug, Clone)]
pub struct HttpGenerationClient {
    endpoint: Url,
    http_client: reqwest::Client,
}

impl HttpGenerationClient {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, ClientSetupError> {
        let http_client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            endpoint: generate_endpoint(base_url)?,
            http_client,
        })
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }
}

/// `base` joined with `generate/`, keeping any path prefix on `base`.
pub fn generate_endpoint(base_url: &str) -> Result<Url, url::ParseError> {
    let mut base = Url::parse(base_url)?;
    if !base.path().ends_with('/') {
        let path = format!("{}/", base.path());
        base.set_path(&path);
    }
    base.join("generate/")
}

/// Body for the `file` part, reporting how much the transport has pulled so far.
///
/// Disk files are read chunk by chunk as the request goes out.
async fn upload_body(source: &FileSource, events: Arc<dyn EventSink>) -> Result<reqwest::Body, SubmitError> {
    let total_size = source.len();
    events.emit(SessionEvent::upload_progress(0, total_size));

    match source {
        FileSource::Memory(data) => {
            let chunks: Vec<io::Result<Bytes>> = (0..data.len())
                .step_by(UPLOAD_CHUNK_SIZE)
                .map(|start| Ok(data.slice(start..(start + UPLOAD_CHUNK_SIZE).min(data.len()))))
                .collect();
            let stream = with_progress(futures::stream::iter(chunks), total_size, events);
            Ok(reqwest::Body::wrap_stream(stream))
        }
        FileSource::Disk { path, .. } => {
            let file = tokio::fs::File::open(path)
                .await
                .map_err(|e| SubmitError::Upload(format!("cannot open {}: {e}", path.display())))?;
            let stream = with_progress(
                ReaderStream::with_capacity(file, UPLOAD_CHUNK_SIZE),
                total_size,
                events,
            );
            Ok(reqwest::Body::wrap_stream(stream))
        }
    }
}

fn with_progress<S>(
    stream: S,
    total_size: u64,
    events: Arc<dyn EventSink>,
) -> impl Stream<Item = io::Result<Bytes>> + Send + 'static
where
    S: Stream<Item = io::Result<Bytes>> + Send + 'static,
{
    let mut uploaded = 0u64;
    stream.map(move |chunk| {
        if let Ok(bytes) = &chunk {
            uploaded += bytes.len() as u64;
            events.emit(SessionEvent::upload_progress(uploaded, total_size));
        }
        chunk
    })
}

#[async_trait]
impl GenerationService for HttpGenerationClient {
    async fn generate(
        &self,
        file: &SelectedFile,
        parameters: &GenerationParameters,
        events: Arc<dyn EventSink>,
    ) -> Result<GeneratedImage, SubmitError> {
        let body = upload_body(&file.source, events).await?;
        let file_part = Part::stream_with_length(body, file.size())
            .file_name(file.name.clone())
            .mime_str(&file.content_type)
            .map_err(|e| {
                SubmitError::Upload(format!("invalid media type {:?}: {e}", file.content_type))
            })?;

        let form = Form::new()
            .part("file", file_part)
            .text("style", parameters.style_field())
            .text("color", parameters.color.clone());

        info!(
            endpoint = %self.endpoint,
            file = %file.name,
            bytes = file.size(),
            style = parameters.style_field(),
            "Sending generation request"
        );

        let response = self
            .http_client
            .post(self.endpoint.clone())
            .multipart(form)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(SubmitError::ServiceError {
                status: status.as_u16(),
                reason: status.canonical_reason().unwrap_or("unknown").to_string(),
            });
        }

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .map(str::to_string);
        let data = response.bytes().await?;
        debug!(bytes = data.len(), content_type = ?content_type, "Generation response received");

        Ok(GeneratedImage { data, content_type })
    }
}
