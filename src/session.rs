//! One application session: settings, drop zone, form, controller and state, wired together.

use parking_lot::{Mutex, RwLock};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, info};

use crate::config::Settings;
use crate::controller::SubmissionController;
use crate::error::SubmitError;
use crate::events::EventSink;
use crate::form::{ParameterForm, Style};
use crate::generator::{ClientSetupError, GenerationService, HttpGenerationClient};
use crate::selector::{content_type_for_path, CandidateFile, FileSelector, MediaFilter};
use crate::state::SharedState;
use crate::view::{self, DownloadError, ResultView};

/// Everything a frontend needs to draw the page.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionSnapshot {
    pub ready: bool,
    pub is_loading: bool,
    pub file_name: Option<String>,
    pub file_size: Option<u64>,
    pub style: Option<Style>,
    pub color: String,
    pub submit_enabled: bool,
    pub last_error: Option<String>,
    pub view: ResultView,
}

pub struct Session {
    settings: RwLock<Settings>,
    state: SharedState,
    selector: Mutex<FileSelector>,
    form: ParameterForm,
    controller: SubmissionController,
    ready: AtomicBool,
}

impl Session {
    pub fn new(
        settings: Settings,
        service: Arc<dyn GenerationService>,
        events: Arc<dyn EventSink>,
    ) -> Self {
        let state = SharedState::new();
        let selector = FileSelector::new(MediaFilter::parse(&settings.accept));
        Self {
            controller: SubmissionController::new(state.clone(), service, events),
            settings: RwLock::new(settings),
            state,
            selector: Mutex::new(selector),
            form: ParameterForm::new(),
            ready: AtomicBool::new(false),
        }
    }

    /// Session talking HTTP to `settings.api_base_url`.
    pub fn connect(settings: Settings, events: Arc<dyn EventSink>) -> Result<Self, ClientSetupError> {
        let client = HttpGenerationClient::new(&settings.api_base_url, settings.request_timeout())?;
        info!(endpoint = %client.endpoint(), "Generation service configured");
        Ok(Self::new(settings, Arc::new(client), events))
    }

    /// Wait out the configured startup delay, then open the drop zone.
    pub async fn initialize(&self) {
        let delay = self.settings.read().startup_delay();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        self.ready.store(true, Ordering::SeqCst);
        debug!(?delay, "Session ready");
    }

    pub fn is_ready(&self) -> bool {
        self.ready.load(Ordering::SeqCst)
    }

    pub fn state(&self) -> &SharedState {
        &self.state
    }

    pub fn form(&self) -> &ParameterForm {
        &self.form
    }

    pub fn settings(&self) -> Settings {
        self.settings.read().clone()
    }

    pub fn set_download_dir(&self, dir: PathBuf) -> Settings {
        let mut settings = self.settings.write();
        settings.download_dir = Some(dir);
        settings.clone()
    }

    /// Offer a file to the drop zone. Returns the accepted file's name.
    pub fn select_file(&self, candidate: CandidateFile) -> Option<String> {
        self.selector
            .lock()
            .select_file(candidate)
            .map(|file| file.name.clone())
    }

    /// Offer a file on disk. Paths the filter rejects are never opened.
    pub async fn select_path(&self, path: &Path) -> std::io::Result<Option<String>> {
        let content_type = content_type_for_path(path);
        let accepted = self.selector.lock().accepts(content_type);
        if !accepted {
            debug!(path = %path.display(), content_type, "Ignoring path with unaccepted media type");
            return Ok(None);
        }

        let candidate = CandidateFile::from_path(path).await?;
        Ok(self.select_file(candidate))
    }

    pub fn set_parameters(&self, style: Option<Style>, color: impl Into<String>) {
        self.form.set_style(style);
        self.form.set_color(color);
    }

    /// Submit the pending file with the form's values; the form resets on success.
    pub async fn submit(&self) -> Result<(), SubmitError> {
        self.form
            .submit(|parameters| self.controller.submit(&self.selector, parameters))
            .await
    }

    pub fn cancel(&self) -> bool {
        self.controller.cancel()
    }

    /// Save the current image to the configured download folder.
    pub fn download(&self) -> Result<Option<PathBuf>, DownloadError> {
        let (dir, filename) = {
            let settings = self.settings.read();
            (
                settings.resolved_download_dir(),
                settings.download_filename.clone(),
            )
        };
        view::download(&self.state, &dir, &filename)
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        let state = self.state.snapshot();
        let (file_name, file_size) = match self.selector.lock().current() {
            Some(file) => (Some(file.name.clone()), Some(file.size())),
            None => (None, None),
        };
        let parameters = self.form.parameters();

        SessionSnapshot {
            ready: self.is_ready(),
            is_loading: state.is_loading,
            submit_enabled: self.form.is_submit_enabled(file_name.is_some()) && !state.is_loading,
            file_name,
            file_size,
            style: parameters.style,
            color: parameters.color,
            last_error: state.last_error.clone(),
            view: ResultView::render(&state),
        }
    }
}
