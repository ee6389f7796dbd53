use thiserror::Error;

/// A convenience `Result` alias using [`AutoscribeError`].
pub type AutoscribeResult<T> = Result<T, AutoscribeError>;

/// Top-level error type for the autoscribe pipeline.
///
/// The surface is deliberately small: persistence and image extraction
/// report via booleans and degrade in place, so the only errors that flow
/// through `Result` are host-call failures and the conversions beneath
/// them. Event handling never lets these escape to the host; they are
/// logged at the dispatch boundary and the affected flush is abandoned
/// until the next trigger.
#[derive(Error, Debug)]
pub enum AutoscribeError {
    /// An error from the host's message-retrieval call.
    #[error("Source error: {0}")]
    Source(String),

    /// A JSON serialization or deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// A standard I/O error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn source_error_displays_its_context() {
        let err = AutoscribeError::Source("session endpoint returned 500".to_string());
        assert_eq!(err.to_string(), "Source error: session endpoint returned 500");
    }

    #[test]
    fn io_and_json_errors_convert_via_from() {
        fn fails_io() -> AutoscribeResult<()> {
            Err(std::io::Error::new(std::io::ErrorKind::NotFound, "gone"))?;
            Ok(())
        }
        assert!(matches!(fails_io(), Err(AutoscribeError::Io(_))));

        let json_err = serde_json::from_str::<serde_json::Value>("{nope").unwrap_err();
        assert!(matches!(
            AutoscribeError::from(json_err),
            AutoscribeError::Json(_)
        ));
    }
}
