use thiserror::Error;

#[derive(Debug, Error)]
#[error(transparent)]
pub struct Error(Box<ErrorKind>);

impl Error {
    pub fn kind(&self) -> &ErrorKind {
        self.0.as_ref()
    }

    pub fn into_kind(self) -> ErrorKind {
        *self.0
    }

    pub fn invalid_format(name: impl Into<String>, message: impl Into<String>) -> Error {
        Error(
            ErrorKind::InvalidFormat {
                element: name.into(),
                message: message.into(),
            }
            .into(),
        )
    }

    pub fn invalid_arg(name: impl Into<String>, message: impl Into<String>) -> Error {
        Error(
            ErrorKind::InvalidArgument {
                name: name.into(),
                message: message.into(),
            }
            .into(),
        )
    }

    pub fn invalid_operation(name: impl Into<String>) -> Error {
        Error(ErrorKind::InvalidOperation { name: name.into() }.into())
    }

    /// A broken ordering contract between the merge and its collaborators.
    pub fn invariant(message: impl Into<String>) -> Error {
        Error(
            ErrorKind::InvariantViolation {
                message: message.into(),
            }
            .into(),
        )
    }

    /// Wraps a failure to open or position run `run` at the start of a merge.
    pub fn initialization(run: usize, source: Error) -> Error {
        Error(
            ErrorKind::Initialization {
                run,
                source: Box::new(source),
            }
            .into(),
        )
    }

    pub fn io(context: impl Into<String>, source: std::io::Error) -> Error {
        Error(
            ErrorKind::Io {
                context: context.into(),
                source,
            }
            .into(),
        )
    }

    pub fn is_io(&self) -> bool {
        matches!(self.kind(), ErrorKind::Io { .. })
    }

    pub fn is_invariant_violation(&self) -> bool {
        matches!(self.kind(), ErrorKind::InvariantViolation { .. })
    }

    pub fn is_initialization(&self) -> bool {
        matches!(self.kind(), ErrorKind::Initialization { .. })
    }
}

#[derive(Debug, Error)]
pub enum ErrorKind {
    #[error("invalid argument {name}: {message}")]
    InvalidArgument { name: String, message: String },

    #[error("invalid operation {name}")]
    InvalidOperation { name: String },

    #[error("invalid storage format for '{element}': {message}")]
    InvalidFormat { element: String, message: String },

    #[error("failed to initialize run {run}: {source}")]
    Initialization {
        run: usize,
        #[source]
        source: Box<Error>,
    },

    #[error("invariant violation: {message}")]
    InvariantViolation { message: String },

    #[error("IO error for '{context}': {source}")]
    Io {
        context: String,
        source: std::io::Error,
    },
}

impl From<ErrorKind> for Error {
    fn from(kind: ErrorKind) -> Self {
        Error(kind.into())
    }
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Error::io("", e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_initialization_wraps_source() {
        let inner = Error::io(
            "run-0003.run",
            std::io::Error::from(std::io::ErrorKind::NotFound),
        );
        let err = Error::initialization(3, inner);
        assert!(err.is_initialization());
        let message = err.to_string();
        assert!(message.contains("run 3"), "{message}");
        assert!(message.contains("run-0003.run"), "{message}");

        match err.into_kind() {
            ErrorKind::Initialization { run, source } => {
                assert_eq!(run, 3);
                assert!(source.is_io());
            }
            other => panic!("unexpected kind {other:?}"),
        }
    }

    #[test]
    fn test_io_conversion() {
        let err: Error = std::io::Error::from(std::io::ErrorKind::UnexpectedEof).into();
        assert!(err.is_io());
        assert!(!err.is_invariant_violation());
    }
}
