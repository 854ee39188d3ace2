//! Video-to-thumbnail client: pick a clip, choose a style and color, send
//! it to the generation service and show the image that comes back.

pub mod config;
pub mod controller;
pub mod error;
pub mod events;
pub mod form;
pub mod generator;
pub mod selector;
pub mod session;
pub mod state;
pub mod view;

#[cfg(feature = "desktop")]
pub mod commands;

pub use config::Settings;
pub use controller::SubmissionController;
pub use error::SubmitError;
pub use events::{EventSink, NullSink, SessionEvent};
pub use form::{GenerationParameters, ParameterForm, Style};
pub use generator::{GeneratedImage, GenerationService, HttpGenerationClient};
pub use selector::{CandidateFile, FileSelector, FileSource, MediaFilter, SelectedFile};
pub use session::{Session, SessionSnapshot};
pub use state::{GenerationResult, SessionState, SharedState};
pub use view::ResultView;
