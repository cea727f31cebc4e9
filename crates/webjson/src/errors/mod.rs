use thiserror::Error;

/// Boxed original cause carried by decode/encode failures.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

#[derive(Error, Debug)]
pub enum WebJsonError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Cannot read input: {message}")]
    Decode {
        message: String,
        #[source]
        source: Option<BoxError>,
    },

    #[error("Cannot write output: {message}")]
    Encode {
        message: String,
        #[source]
        source: Option<BoxError>,
    },
}

pub type Result<T> = std::result::Result<T, WebJsonError>;

impl WebJsonError {
    /// A decode failure with no underlying cause, e.g. a missing member
    /// detected by an adapter.
    pub fn decode(message: impl Into<String>) -> Self {
        WebJsonError::Decode {
            message: message.into(),
            source: None,
        }
    }

    /// A decode failure wrapping the original cause.
    pub fn decode_with<E>(message: impl Into<String>, source: E) -> Self
    where
        E: Into<BoxError>,
    {
        WebJsonError::Decode {
            message: message.into(),
            source: Some(source.into()),
        }
    }

    /// An encode failure with no underlying cause.
    pub fn encode(message: impl Into<String>) -> Self {
        WebJsonError::Encode {
            message: message.into(),
            source: None,
        }
    }

    /// An encode failure wrapping the original cause.
    pub fn encode_with<E>(message: impl Into<String>, source: E) -> Self
    where
        E: Into<BoxError>,
    {
        WebJsonError::Encode {
            message: message.into(),
            source: Some(source.into()),
        }
    }

    /// Folds any non-configuration failure into the single decode kind.
    ///
    /// Configuration errors stay as they are: they are programming errors,
    /// not a property of the input.
    pub fn into_decode(self, message: &str) -> Self {
        match self {
            WebJsonError::Config(_) => self,
            WebJsonError::Decode { .. } => self,
            other => WebJsonError::decode_with(message, other),
        }
    }

    /// Returns true for the decode kind.
    pub fn is_decode(&self) -> bool {
        matches!(self, WebJsonError::Decode { .. })
    }

    /// Returns true for configuration errors.
    pub fn is_config(&self) -> bool {
        matches!(self, WebJsonError::Config(_))
    }
}
