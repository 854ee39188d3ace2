//! What the result pane shows, and the click-to-download action.

use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

use crate::state::{SessionState, SharedState};

pub const LOADING_MESSAGE: &str =
    "Generating image in progress... this may take up to few minutes.";

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ResultView {
    Loading { message: String },
    Placeholder,
    Image {
        path: PathBuf,
        content_type: Option<String>,
    },
}

impl ResultView {
    /// The progress indicator wins over an older image while a request is in flight.
    pub fn render(state: &SessionState) -> Self {
        if state.is_loading {
            return ResultView::Loading {
                message: LOADING_MESSAGE.to_string(),
            };
        }
        match &state.current_result {
            Some(result) => ResultView::Image {
                path: result.display_reference().path().to_path_buf(),
                content_type: result.content_type.clone(),
            },
            None => ResultView::Placeholder,
        }
    }
}

#[derive(Debug, thiserror::Error)]
#[error("failed to save image to {path:?}: {source}")]
pub struct DownloadError {
    pub path: PathBuf,
    #[source]
    pub source: std::io::Error,
}

/// Write the current image to `dir/filename`.
///
/// Returns `Ok(None)` without touching the filesystem when there is no image.
pub fn download(
    state: &SharedState,
    dir: &Path,
    filename: &str,
) -> Result<Option<PathBuf>, DownloadError> {
    let Some(result) = state.current_result() else {
        return Ok(None);
    };

    let target = dir.join(filename);
    fs::create_dir_all(dir).map_err(|source| DownloadError {
        path: dir.to_path_buf(),
        source,
    })?;
    fs::write(&target, &result.binary_data).map_err(|source| DownloadError {
        path: target.clone(),
        source,
    })?;

    info!(path = %target.display(), bytes = result.binary_data.len(), "Image saved");
    Ok(Some(target))
}
