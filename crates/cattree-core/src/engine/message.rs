use std::fmt;

use crate::error::Result;

/// Tagged outcome of a command, ready to show to a user
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResultMessage {
    Success(String),
    Failure(String),
}

impl ResultMessage {
    /// Turn an engine result into a message.
    ///
    /// Domain errors keep their text; store and filesystem failures are
    /// logged and reported generically.
    pub fn from_result<T: fmt::Display>(result: Result<T>) -> Self {
        match result {
            Ok(value) => Self::Success(value.to_string()),
            Err(e) if e.is_domain() => Self::Failure(format!("Error: {}", e)),
            Err(e) => {
                tracing::error!(error = %e, "command failed");
                Self::Failure(format!("Internal error: {}", e))
            }
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success(_))
    }

    pub fn text(&self) -> &str {
        match self {
            Self::Success(text) | Self::Failure(text) => text,
        }
    }
}

impl fmt::Display for ResultMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.text())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CatTreeError;

    #[test]
    fn success_and_domain_failure() {
        let ok = ResultMessage::from_result(Ok::<_, CatTreeError>("done"));
        assert_eq!(ok, ResultMessage::Success("done".to_string()));

        let err = ResultMessage::from_result::<String>(Err(CatTreeError::EmptyPath));
        assert!(!err.is_success());
        assert_eq!(err.text(), "Error: Category path is empty");
    }

    #[test]
    fn infrastructure_failure_is_generic() {
        let err = ResultMessage::from_result::<String>(Err(CatTreeError::Io(
            std::io::Error::other("disk full"),
        )));
        assert!(err.text().starts_with("Internal error:"));
    }
}
