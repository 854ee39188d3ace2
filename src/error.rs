//! Submission failures and the text users see for them.

pub const MISSING_FILE_MESSAGE: &str = "Please add a file before submitting.";
pub const GENERATION_FAILED_MESSAGE: &str =
    "Something went wrong while generating the image. Please try again.";

#[derive(Debug, thiserror::Error)]
pub enum SubmitError {
    /// No file was selected; the backend was never contacted.
    #[error("no file selected")]
    MissingFile,

    #[error("request failed: {0}")]
    NetworkFailure(String),

    #[error("service returned {status}: {reason}")]
    ServiceError { status: u16, reason: String },

    /// The selected file could not be turned into a request body.
    #[error("failed to prepare upload: {0}")]
    Upload(String),

    /// The returned image could not be staged for display.
    #[error("failed to stage generated image: {0}")]
    Storage(String),

    #[error("a generation request is already in flight")]
    Busy,

    #[error("generation cancelled")]
    Cancelled,
}

impl SubmitError {
    /// Message surfaced through `SessionState::last_error`.
    ///
    /// `Busy` and `Cancelled` leave the error slot alone and have no message.
    pub fn user_message(&self) -> Option<&'static str> {
        match self {
            Self::MissingFile => Some(MISSING_FILE_MESSAGE),
            Self::NetworkFailure(_)
            | Self::ServiceError { .. }
            | Self::Upload(_)
            | Self::Storage(_) => {
                Some(GENERATION_FAILED_MESSAGE)
            }
            Self::Busy | Self::Cancelled => None,
        }
    }
}

impl From<reqwest::Error> for SubmitError {
    fn from(err: reqwest::Error) -> Self {
        match err.status() {
            Some(status) => Self::ServiceError {
                status: status.as_u16(),
                reason: status.canonical_reason().unwrap_or("unknown").to_string(),
            },
            None => Self::NetworkFailure(err.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn network_and_service_failures_look_the_same_to_users() {
        let network = SubmitError::NetworkFailure("dns error".into());
        let service = SubmitError::ServiceError {
            status: 500,
            reason: "Internal Server Error".into(),
        };
        assert_eq!(network.user_message(), service.user_message());
        assert_eq!(network.user_message(), Some(GENERATION_FAILED_MESSAGE));
    }

    #[test]
    fn detail_stays_out_of_user_message() {
        let err = SubmitError::ServiceError {
            status: 502,
            reason: "Bad Gateway".into(),
        };
        assert!(err.to_string().contains("502"));
        assert!(!err.user_message().unwrap_or_default().contains("502"));
    }

    #[test]
    fn local_upload_problem_is_not_a_network_failure() {
        let err = SubmitError::Upload("invalid media type".into());
        assert!(!matches!(err, SubmitError::NetworkFailure(_)));
        assert_eq!(err.user_message(), Some(GENERATION_FAILED_MESSAGE));
    }

    #[test]
    fn busy_and_cancelled_have_no_message() {
        assert_eq!(SubmitError::Busy.user_message(), None);
        assert_eq!(SubmitError::Cancelled.user_message(), None);
        assert_eq!(
            SubmitError::MissingFile.user_message(),
            Some("Please add a file before submitting.")
        );
    }
}
