//! Session state shared between the submission controller and the views.
//!
//! The controller is the only writer. Views take snapshots and render them.

use bytes::Bytes;
use parking_lot::RwLock;
use std::fmt;
use std::io::Write;
use std::path::Path;
use std::sync::Arc;
use tempfile::TempPath;

use crate::generator::GeneratedImage;

/// File name prefix of staged images in the temp dir. The webview's asset scope matches on it.
pub const DISPLAY_FILE_PREFIX: &str = "clipthumb-";

/// Local, renderable copy of a generated image.
///
/// Backed by a temporary file that is deleted when the reference is dropped.
pub struct DisplayReference {
    path: TempPath,
}

impl DisplayReference {
    fn create(data: &[u8], extension: &str) -> std::io::Result<Self> {
        let mut file = tempfile::Builder::new()
            .prefix(DISPLAY_FILE_PREFIX)
            .suffix(&format!(".{extension}"))
            .tempfile()?;
        file.write_all(data)?;
        file.flush()?;
        Ok(Self {
            path: file.into_temp_path(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl fmt::Debug for DisplayReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("DisplayReference")
            .field(&self.path.display())
            .finish()
    }
}

/// The image returned by a successful generation request.
pub struct GenerationResult {
    pub binary_data: Bytes,
    pub content_type: Option<String>,
    display_reference: DisplayReference,
}

impl GenerationResult {
    /// Stage the returned bytes on disk so the view has something to point at.
    pub fn stage(image: GeneratedImage) -> std::io::Result<Self> {
        let extension = extension_for(image.content_type.as_deref());
        let display_reference = DisplayReference::create(&image.data, extension)?;
        Ok(Self {
            binary_data: image.data,
            content_type: image.content_type,
            display_reference,
        })
    }

    pub fn display_reference(&self) -> &DisplayReference {
        &self.display_reference
    }
}

impl fmt::Debug for GenerationResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GenerationResult")
            .field("bytes", &self.binary_data.len())
            .field("content_type", &self.content_type)
            .field("display_reference", &self.display_reference)
            .finish()
    }
}

fn extension_for(content_type: Option<&str>) -> &'static str {
    let essence = content_type
        .and_then(|ct| ct.split(';').next())
        .map(str::trim)
        .unwrap_or_default();
    match essence {
        "image/png" => "png",
        "image/webp" => "webp",
        "image/gif" => "gif",
        _ => "jpg",
    }
}

#[derive(Debug, Clone, Default)]
pub struct SessionState {
    pub is_loading: bool,
    pub current_result: Option<Arc<GenerationResult>>,
    pub last_error: Option<String>,
}

/// Cloneable handle to the session state.
#[derive(Debug, Clone, Default)]
pub struct SharedState {
    inner: Arc<RwLock<SessionState>>,
}

impl SharedState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_loading(&self) -> bool {
        self.inner.read().is_loading
    }

    pub fn current_result(&self) -> Option<Arc<GenerationResult>> {
        self.inner.read().current_result.clone()
    }

    pub fn last_error(&self) -> Option<String> {
        self.inner.read().last_error.clone()
    }

    pub fn snapshot(&self) -> SessionState {
        self.inner.read().clone()
    }

    /// Mark a submission as in flight and clear the previous error.
    ///
    /// Returns `None` when another submission already holds the flag.
    pub fn begin_loading(&self) -> Option<LoadingGuard> {
        let mut state = self.inner.write();
        if state.is_loading {
            return None;
        }
        state.is_loading = true;
        state.last_error = None;
        Some(LoadingGuard {
            state: self.clone(),
            armed: true,
        })
    }

    /// Publish a new result. The superseded result is released once its last holder drops it.
    pub fn complete_with_result(&self, result: GenerationResult) {
        let mut state = self.inner.write();
        state.current_result = Some(Arc::new(result));
        state.is_loading = false;
    }

    /// Record a failure. Whatever image was displayed stays displayed.
    pub fn complete_with_error(&self, message: impl Into<String>) {
        let mut state = self.inner.write();
        state.last_error = Some(message.into());
        state.is_loading = false;
    }

    pub fn clear_error(&self) {
        self.inner.write().last_error = None;
    }

    fn end_loading(&self) {
        self.inner.write().is_loading = false;
    }
}

/// Holds the loading flag for one submission and releases it on every exit path.
#[must_use = "dropping the guard immediately clears the loading flag"]
#[derive(Debug)]
pub struct LoadingGuard {
    state: SharedState,
    armed: bool,
}

impl LoadingGuard {
    pub fn finish_with_result(mut self, result: GenerationResult) {
        self.armed = false;
        self.state.complete_with_result(result);
    }

    pub fn finish_with_error(mut self, message: impl Into<String>) {
        self.armed = false;
        self.state.complete_with_error(message);
    }
}

impl Drop for LoadingGuard {
    fn drop(&mut self) {
        if self.armed {
            self.state.end_loading();
        }
    }
}
