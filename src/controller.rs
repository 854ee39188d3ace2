use parking_lot::Mutex;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::error::{SubmitError, GENERATION_FAILED_MESSAGE, MISSING_FILE_MESSAGE};
use crate::events::{EventSink, SessionEvent};
use crate::form::GenerationParameters;
use crate::generator::GenerationService;
use crate::selector::FileSelector;
use crate::state::{GenerationResult, LoadingGuard, SharedState};

/// Runs one generation request at a time and publishes the outcome to the session state.
pub struct SubmissionController {
    state: SharedState,
    service: Arc<dyn GenerationService>,
    events: Arc<dyn EventSink>,
    in_flight: Mutex<Option<CancellationToken>>,
}

impl SubmissionController {
    pub fn new(
        state: SharedState,
        service: Arc<dyn GenerationService>,
        events: Arc<dyn EventSink>,
    ) -> Self {
        Self {
            state,
            service,
            events,
            in_flight: Mutex::new(None),
        }
    }

    pub fn state(&self) -> &SharedState {
        &self.state
    }

    /// Submit the selector's pending file with `parameters`.
    ///
    /// Every failure except `Busy` and `Cancelled` is also written to
    /// `last_error`. On success the submitted file is cleared from the
    /// selector, unless the user picked a different file meanwhile.
    pub async fn submit(
        &self,
        selector: &Mutex<FileSelector>,
        parameters: GenerationParameters,
    ) -> Result<(), SubmitError> {
        if self.state.is_loading() {
            warn!("Generation already in flight, rejecting submit");
            return Err(SubmitError::Busy);
        }

        let Some(file) = selector.lock().current().cloned() else {
            warn!("Submit without a selected file");
            self.state.complete_with_error(MISSING_FILE_MESSAGE);
            self.events.emit(SessionEvent::Error {
                message: MISSING_FILE_MESSAGE.to_string(),
            });
            self.publish_state();
            return Err(SubmitError::MissingFile);
        };

        let Some(loading) = self.state.begin_loading() else {
            warn!("Generation already in flight, rejecting submit");
            return Err(SubmitError::Busy);
        };
        let cancel = CancellationToken::new();
        *self.in_flight.lock() = Some(cancel.clone());
        let mut submission = Submission {
            controller: self,
            loading: Some(loading),
        };
        self.publish_state();

        let outcome = tokio::select! {
            _ = cancel.cancelled() => Err(SubmitError::Cancelled),
            outcome = self.service.generate(&file, &parameters, Arc::clone(&self.events)) => outcome,
        };

        let outcome = outcome.and_then(|image| {
            GenerationResult::stage(image).map_err(|e| SubmitError::Storage(e.to_string()))
        });

        match outcome {
            Ok(result) => {
                let display_path = result.display_reference().path().display().to_string();
                info!(
                    file = %file.name,
                    bytes = result.binary_data.len(),
                    display = %display_path,
                    "Generation complete"
                );
                submission.finish_with_result(result);
                selector.lock().clear_if(file.id());
                self.events
                    .emit(SessionEvent::GenerationComplete { display_path });
                Ok(())
            }
            Err(SubmitError::Cancelled) => {
                info!(file = %file.name, "Generation cancelled");
                Err(SubmitError::Cancelled)
            }
            Err(err) => {
                error!(error = %err, file = %file.name, "Generation failed");
                let message = err.user_message().unwrap_or(GENERATION_FAILED_MESSAGE);
                submission.finish_with_error(message);
                self.events.emit(SessionEvent::Error {
                    message: message.to_string(),
                });
                Err(err)
            }
        }
    }

    /// Cancel the in-flight submission, if any.
    pub fn cancel(&self) -> bool {
        match self.in_flight.lock().as_ref() {
            Some(token) => {
                token.cancel();
                true
            }
            None => false,
        }
    }

    fn release_token(&self) {
        self.in_flight.lock().take();
    }

    fn publish_state(&self) {
        let snapshot = self.state.snapshot();
        self.events.emit(SessionEvent::StateChanged {
            is_loading: snapshot.is_loading,
            has_result: snapshot.current_result.is_some(),
            last_error: snapshot.last_error,
        });
    }
}

/// One admitted submission.
///
/// Dropping it on any exit path, including a panic in the service or an
/// abandoned `submit` future, releases the loading flag and publishes the
/// final state.
struct Submission<'a> {
    controller: &'a SubmissionController,
    loading: Option<LoadingGuard>,
}

impl Submission<'_> {
    fn finish_with_result(&mut self, result: GenerationResult) {
        self.controller.release_token();
        if let Some(loading) = self.loading.take() {
            loading.finish_with_result(result);
        }
    }

    fn finish_with_error(&mut self, message: &str) {
        self.controller.release_token();
        if let Some(loading) = self.loading.take() {
            loading.finish_with_error(message);
        }
    }
}

impl Drop for Submission<'_> {
    fn drop(&mut self) {
        // The token must go before the flag, while no other submission can be admitted.
        if let Some(loading) = self.loading.take() {
            self.controller.release_token();
            drop(loading);
        }
        self.controller.publish_state();
    }
}
