//! Drop zone model: holds the single video waiting to be submitted.

use bytes::Bytes;
use std::io;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Where a file's bytes live.
///
/// Files picked from disk stay on disk and are streamed at upload time.
#[derive(Debug, Clone, PartialEq)]
pub enum FileSource {
    Memory(Bytes),
    Disk { path: PathBuf, size: u64 },
}

impl FileSource {
    pub fn len(&self) -> u64 {
        match self {
            FileSource::Memory(data) => data.len() as u64,
            FileSource::Disk { size, .. } => *size,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// A file offered by drag-and-drop or the picker, before the type filter runs.
#[derive(Debug, Clone)]
pub struct CandidateFile {
    pub name: String,
    pub content_type: String,
    pub source: FileSource,
}

impl CandidateFile {
    pub fn new(name: impl Into<String>, content_type: impl Into<String>, data: impl Into<Bytes>) -> Self {
        Self {
            name: name.into(),
            content_type: content_type.into(),
            source: FileSource::Memory(data.into()),
        }
    }

    /// Reference a file on disk, guessing its media type from the extension.
    ///
    /// Only the metadata is read.
    pub async fn from_path(path: &Path) -> io::Result<Self> {
        let metadata = tokio::fs::metadata(path).await?;
        if !metadata.is_file() {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("{} is not a file", path.display()),
            ));
        }
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "upload".to_string());
        Ok(Self {
            content_type: content_type_for_path(path).to_string(),
            name,
            source: FileSource::Disk {
                path: path.to_path_buf(),
                size: metadata.len(),
            },
        })
    }
}

pub fn content_type_for_path(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_ascii_lowercase);
    match ext.as_deref() {
        Some("mp4" | "m4v") => "video/mp4",
        Some("mkv") => "video/x-matroska",
        Some("webm") => "video/webm",
        Some("mov") => "video/quicktime",
        Some("avi") => "video/x-msvideo",
        Some("flv") => "video/x-flv",
        Some("wmv") => "video/x-ms-wmv",
        _ => "application/octet-stream",
    }
}

/// The accepted file, tagged with the selection it came from.
#[derive(Debug, Clone)]
pub struct SelectedFile {
    id: u64,
    pub name: String,
    pub content_type: String,
    pub source: FileSource,
}

impl SelectedFile {
    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn size(&self) -> u64 {
        self.source.len()
    }
}

/// Media types accepted by the drop zone, e.g. `video/mp4` or `video/*`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaFilter {
    patterns: Vec<String>,
}

impl MediaFilter {
    pub fn parse(accept: &str) -> Self {
        let patterns = accept
            .split(',')
            .map(|p| p.trim().to_ascii_lowercase())
            .filter(|p| !p.is_empty())
            .collect();
        Self { patterns }
    }

    pub fn matches(&self, content_type: &str) -> bool {
        let essence = content_type
            .split(';')
            .next()
            .unwrap_or_default()
            .trim()
            .to_ascii_lowercase();
        self.patterns.iter().any(|pattern| match pattern.strip_suffix("/*") {
            Some(top) => essence
                .split_once('/')
                .is_some_and(|(kind, sub)| kind == top && !sub.is_empty()),
            None => *pattern == essence,
        })
    }
}

impl Default for MediaFilter {
    fn default() -> Self {
        Self::parse("video/mp4")
    }
}

#[derive(Debug, Default)]
pub struct FileSelector {
    filter: MediaFilter,
    pending: Option<SelectedFile>,
    selections: u64,
}

impl FileSelector {
    pub fn new(filter: MediaFilter) -> Self {
        Self {
            filter,
            pending: None,
            selections: 0,
        }
    }

    pub fn accepts(&self, content_type: &str) -> bool {
        self.filter.matches(content_type)
    }

    /// Take `candidate` as the pending file, replacing any earlier one.
    ///
    /// Candidates of the wrong media type are dropped without touching the
    /// pending file, the same way the drop zone never reports them.
    pub fn select_file(&mut self, candidate: CandidateFile) -> Option<&SelectedFile> {
        if !self.filter.matches(&candidate.content_type) {
            debug!(
                name = %candidate.name,
                content_type = %candidate.content_type,
                "Ignoring file with unaccepted media type"
            );
            return None;
        }

        self.selections += 1;
        debug!(name = %candidate.name, bytes = candidate.source.len(), "File selected");
        self.pending = Some(SelectedFile {
            id: self.selections,
            name: candidate.name,
            content_type: candidate.content_type,
            source: candidate.source,
        });
        self.pending.as_ref()
    }

    pub fn current(&self) -> Option<&SelectedFile> {
        self.pending.as_ref()
    }

    pub fn has_file(&self) -> bool {
        self.pending.is_some()
    }

    pub fn clear(&mut self) {
        self.pending = None;
    }

    /// Clear the pending file only if it is still selection `id`.
    ///
    /// Returns whether anything was cleared.
    pub fn clear_if(&mut self, id: u64) -> bool {
        if self.pending.as_ref().is_some_and(|f| f.id == id) {
            self.pending = None;
            true
        } else {
            false
        }
    }
}
