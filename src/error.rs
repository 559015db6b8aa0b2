//! Comprehensive error types for the CallAudit application operations.
//!
//! This module defines the `AuditError` enum covering all error conditions
//! that can occur during call auditing: audio decoding and validation,
//! voice-activity detection, remote transcription and embedding services,
//! phrase-store persistence, and general command execution.
//!
//! It also provides helper methods to construct errors and generate
//! user-friendly messages.
use thiserror::Error;

/// Represents all possible errors in the CallAudit application.
///
/// Each variant provides specific context to facilitate debugging and
/// user-friendly reporting.
///
/// # Examples
///
/// ```rust
/// use callaudit::error::{AuditError, AuditResult};
///
/// fn example() -> AuditResult<()> {
///     Err(AuditError::AudioTooShort { duration_ms: 1200 })
/// }
/// ```
///
/// # Exit Codes
///
/// Each error variant maps to an exit code via `AuditError::exit_code`.
#[derive(Error, Debug)]
pub enum AuditError {
    /// I/O operation failed during file system access.
    ///
    /// This variant wraps `std::io::Error` and provides context about
    /// file operations that failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration error due to invalid or missing settings.
    ///
    /// Contains a human-readable message describing the issue.
    #[error("Configuration error: {message}")]
    Config {
        /// Description of the configuration error
        message: String,
    },

    /// Input file rejected before any audio decoding took place.
    ///
    /// Covers unsupported extensions, undersized files and empty paths.
    #[error("Input validation error: {message}")]
    InputValidation {
        /// Description of the validation failure
        message: String,
    },

    /// Audio clip is shorter than the minimum duration for detection.
    #[error("Audio too short: {duration_ms}ms (minimum 3000ms)")]
    AudioTooShort {
        /// Measured clip duration in milliseconds
        duration_ms: u64,
    },

    /// Audio clip never exceeds the minimum peak amplitude.
    #[error("Audio too quiet: peak amplitude {peak} (minimum 500)")]
    AudioTooQuiet {
        /// Maximum absolute sample value observed
        peak: i16,
    },

    /// Audio clip has near-zero variance, e.g. DC offset or a test tone.
    #[error("Audio uniform: sample stdev {stdev:.1} (minimum 100)")]
    AudioUniform {
        /// Sample standard deviation observed
        stdev: f64,
    },

    /// Audio container could not be decoded at all.
    #[error("Audio load error: {message}")]
    AudioLoad {
        /// Description of the decode failure
        message: String,
    },

    /// Audio processing error during resampling or normalization.
    #[error("Audio processing error: {message}")]
    AudioProcessing {
        /// Description of the audio processing error
        message: String,
    },

    /// Internal failure inside the advanced VAD path.
    ///
    /// The VAD engine catches this itself and falls back to simple
    /// energy thresholding; it is never fatal for a file.
    #[error("VAD internal error: {message}")]
    VadInternal {
        /// Description of the VAD failure
        message: String,
    },

    /// The transcription request exceeded its deadline.
    ///
    /// The batch engine translates this into `rebuttal = No` with
    /// `error = "timeout"` rather than an error row.
    #[error("Transcription timeout")]
    TranscriptionTimeout,

    /// Remote transcription failed for a non-timeout reason.
    #[error("Transcription error: {message}")]
    Transcription {
        /// Description of the transcription failure
        message: String,
    },

    /// API request error with specified source.
    #[error("API error [{source:?}]: {message}")]
    Api {
        /// Error message from the API
        message: String,
        /// Source of the API error
        source: ApiErrorSource,
    },

    /// The optional LLM classifier is unreachable; the tier is skipped.
    #[error("Classifier unavailable: {0}")]
    ClassifierUnavailable(String),

    /// Phrase learning store operation failed.
    ///
    /// Learning writes are best-effort: a store failure is logged and
    /// never fails detection.
    #[error("Store error: {message}")]
    Store {
        /// Description of the store failure
        message: String,
    },

    /// A per-file wall-clock deadline expired.
    #[error("Processing timeout after {seconds}s")]
    ProcessingTimeout {
        /// Configured deadline in seconds
        seconds: u64,
    },

    /// Generic command execution error.
    #[error("{0}")]
    CommandExecution(String),

    /// No input path was specified for the operation.
    #[error("No input path specified")]
    NoInputSpecified,

    /// The specified path does not exist on the filesystem.
    #[error("Path not found: {0}")]
    PathNotFound(std::path::PathBuf),

    /// Unable to read the specified directory.
    #[error("Unable to read directory: {path}")]
    DirectoryReadError {
        /// The directory path that could not be read
        path: std::path::PathBuf,
        /// The underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// Unsupported audio file type encountered.
    #[error("Unsupported file type: {0}")]
    UnsupportedFileType(String),

    /// Catch-all error variant wrapping any other failure.
    #[error("Unknown error: {0}")]
    Other(#[from] anyhow::Error),
}

/// API error source enumeration.
///
/// Specifies which remote adapter produced an API error to help with
/// diagnosis and retry policy.
#[derive(Debug, thiserror::Error)]
pub enum ApiErrorSource {
    /// Cloud transcription service
    #[error("Transcriber")]
    Transcriber,
    /// Sentence embedding service
    #[error("Embedder")]
    Embedder,
    /// LLM rebuttal classifier
    #[error("Classifier")]
    Classifier,
}

// Convert reqwest error, distinguishing timeouts from other failures
impl From<reqwest::Error> for AuditError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            AuditError::TranscriptionTimeout
        } else {
            AuditError::Api {
                message: err.to_string(),
                source: ApiErrorSource::Transcriber,
            }
        }
    }
}

// Convert file exploration error to input validation error
impl From<walkdir::Error> for AuditError {
    fn from(err: walkdir::Error) -> Self {
        AuditError::InputValidation {
            message: err.to_string(),
        }
    }
}

// Convert symphonia error to audio load error
impl From<symphonia::core::errors::Error> for AuditError {
    fn from(err: symphonia::core::errors::Error) -> Self {
        AuditError::AudioLoad {
            message: err.to_string(),
        }
    }
}

// Convert config crate error to configuration error
impl From<config::ConfigError> for AuditError {
    fn from(err: config::ConfigError) -> Self {
        match err {
            config::ConfigError::NotFound(path) => AuditError::Config {
                message: format!("Configuration file not found: {}", path),
            },
            config::ConfigError::Message(msg) => AuditError::Config { message: msg },
            _ => AuditError::Config {
                message: format!("Configuration error: {}", err),
            },
        }
    }
}

impl From<serde_json::Error> for AuditError {
    fn from(err: serde_json::Error) -> Self {
        AuditError::Config {
            message: format!("JSON serialization/deserialization error: {}", err),
        }
    }
}

// Convert sqlite error to store error
impl From<rusqlite::Error> for AuditError {
    fn from(err: rusqlite::Error) -> Self {
        AuditError::Store {
            message: err.to_string(),
        }
    }
}

// Convert WAV encoding error to audio processing error
impl From<hound::Error> for AuditError {
    fn from(err: hound::Error) -> Self {
        AuditError::AudioProcessing {
            message: format!("WAV export failed: {}", err),
        }
    }
}

/// Specialized `Result` type for CallAudit operations.
pub type AuditResult<T> = Result<T, AuditError>;

impl AuditError {
    /// Create a configuration error with the given message.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use callaudit::error::AuditError;
    /// let err = AuditError::config("invalid setting");
    /// assert_eq!(err.to_string(), "Configuration error: invalid setting");
    /// ```
    pub fn config<S: Into<String>>(message: S) -> Self {
        AuditError::Config {
            message: message.into(),
        }
    }

    /// Create an input validation error with the given message.
    pub fn input_validation<S: Into<String>>(message: S) -> Self {
        AuditError::InputValidation {
            message: message.into(),
        }
    }

    /// Create an audio load error with the given message.
    pub fn audio_load<S: Into<String>>(message: S) -> Self {
        AuditError::AudioLoad {
            message: message.into(),
        }
    }

    /// Create an audio processing error with the given message.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use callaudit::error::AuditError;
    /// let err = AuditError::audio_processing("resample failed");
    /// assert_eq!(err.to_string(), "Audio processing error: resample failed");
    /// ```
    pub fn audio_processing<S: Into<String>>(message: S) -> Self {
        AuditError::AudioProcessing {
            message: message.into(),
        }
    }

    /// Create a VAD internal error with the given message.
    pub fn vad_internal<S: Into<String>>(message: S) -> Self {
        AuditError::VadInternal {
            message: message.into(),
        }
    }

    /// Create a transcription error with the given message.
    pub fn transcription<S: Into<String>>(message: S) -> Self {
        AuditError::Transcription {
            message: message.into(),
        }
    }

    /// Create a transcriber API error.
    pub fn transcriber_api<T: Into<String>>(message: T) -> Self {
        Self::Api {
            message: message.into(),
            source: ApiErrorSource::Transcriber,
        }
    }

    /// Create an embedder API error.
    pub fn embedder_api<T: Into<String>>(message: T) -> Self {
        Self::Api {
            message: message.into(),
            source: ApiErrorSource::Embedder,
        }
    }

    /// Create a classifier API error.
    pub fn classifier_api<T: Into<String>>(message: T) -> Self {
        Self::Api {
            message: message.into(),
            source: ApiErrorSource::Classifier,
        }
    }

    /// Create a store error with the given message.
    pub fn store<S: Into<String>>(message: S) -> Self {
        AuditError::Store {
            message: message.into(),
        }
    }

    /// Create a batch processing error with the given message.
    pub fn batch_processing(msg: String) -> Self {
        AuditError::CommandExecution(format!("Batch processing error: {}", msg))
    }

    /// Whether this error represents a wall-clock or network timeout.
    pub fn is_timeout(&self) -> bool {
        matches!(
            self,
            AuditError::TranscriptionTimeout | AuditError::ProcessingTimeout { .. }
        )
    }

    /// Return the corresponding exit code for this error variant.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use callaudit::error::AuditError;
    /// assert_eq!(AuditError::config("x").exit_code(), 2);
    /// ```
    pub fn exit_code(&self) -> i32 {
        match self {
            AuditError::Io(_) => 1,
            AuditError::Config { .. } => 2,
            AuditError::Api { .. } => 3,
            AuditError::Transcription { .. } | AuditError::TranscriptionTimeout => 3,
            AuditError::ClassifierUnavailable(_) => 3,
            AuditError::AudioTooShort { .. }
            | AuditError::AudioTooQuiet { .. }
            | AuditError::AudioUniform { .. }
            | AuditError::AudioLoad { .. }
            | AuditError::AudioProcessing { .. }
            | AuditError::VadInternal { .. } => 5,
            AuditError::InputValidation { .. } | AuditError::UnsupportedFileType(_) => 6,
            AuditError::Store { .. } => 7,
            _ => 1,
        }
    }

    /// Return a user-friendly error message with suggested remedies.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use callaudit::error::AuditError;
    /// let msg = AuditError::config("missing key").user_friendly_message();
    /// assert!(msg.contains("Configuration error:"));
    /// ```
    pub fn user_friendly_message(&self) -> String {
        match self {
            AuditError::Io(e) => format!("File operation error: {}", e),
            AuditError::Config { message } => format!(
                "Configuration error: {}\nHint: run 'callaudit config --help' for details",
                message
            ),
            AuditError::Api { message, source } => format!(
                "API error ({:?}): {}\nHint: check network connection and API key settings",
                source, message
            ),
            AuditError::Transcription { message } => format!(
                "Transcription error: {}\nHint: check network connection and transcriber API key",
                message
            ),
            AuditError::TranscriptionTimeout => {
                "Transcription timed out\nHint: increase transcriber.request_timeout_seconds"
                    .to_string()
            }
            AuditError::AudioLoad { message } | AuditError::AudioProcessing { message } => format!(
                "Audio processing error: {}\nHint: ensure media file integrity and support",
                message
            ),
            AuditError::InputValidation { message } => format!(
                "Input validation error: {}\nHint: verify file paths and supported formats",
                message
            ),
            AuditError::Store { message } => format!(
                "Phrase store error: {}\nHint: check the learning store path and permissions",
                message
            ),
            AuditError::CommandExecution(msg) => msg.clone(),
            AuditError::Other(err) => {
                format!("Unknown error: {}\nHint: please report this issue", err)
            }
            _ => format!("Error: {}", self),
        }
    }
}
