/// Classified failure surface of the portrait generation pipeline.
///
/// Every stage maps its local failures into one of these kinds before
/// returning, so callers can route the outcome (re-prompt the user, surface a
/// toast, refund credits) without inspecting message text.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    /// Local precondition failure. No network call was attempted.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Transport-level failure (connection, TLS, request timeout).
    #[error("Network error: {0}")]
    Network(String),

    /// The service returned an error status, an unexpected payload, or a
    /// polling attempt budget was exhausted.
    #[error("API error: {0}")]
    Api(String),

    /// Failure specific to the training archive upload, including non-2xx
    /// responses from the file endpoint.
    #[error("Upload error: {0}")]
    Upload(String),

    /// Archive construction failure.
    #[error("File I/O error: {0}")]
    FileIo(String),
}
