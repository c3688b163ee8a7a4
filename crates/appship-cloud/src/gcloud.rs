#[derive(Debug, thiserror::Error)]
pub enum GcloudError {
    #[error("{program} could not be started; install: https://cloud.google.com/sdk/docs/install")]
    NotFound {
        program: String,
        source: std::io::Error,
    },

    #[error("failed to execute gcloud command `{command}`: {message}")]
    CommandFailed { command: String, message: String },

    #[error("gcloud output was not valid UTF-8")]
    InvalidUtf8 { source: std::string::FromUtf8Error },
}
