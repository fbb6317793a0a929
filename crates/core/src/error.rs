/// Domain errors raised while loading, validating or updating settings.
///
/// Every variant that concerns a single setting carries its canonical key so
/// callers can report exactly which entry was rejected.
#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("Missing required setting: {0}")]
    MissingSetting(String),

    #[error("Invalid value for {key}: expected {expected}, got {value:?}")]
    InvalidSetting {
        key: String,
        expected: &'static str,
        value: String,
    },

    #[error("Unknown setting: {0}")]
    UnknownSetting(String),

    #[error("Validation failed for {key}: {message}")]
    Validation { key: String, message: String },

    #[error("Parse error on line {line}: {message}")]
    Parse { line: usize, message: String },
}

impl CoreError {
    /// The setting key this error refers to, if any.
    pub fn key(&self) -> Option<&str> {
        match self {
            CoreError::MissingSetting(key) | CoreError::UnknownSetting(key) => Some(key),
            CoreError::InvalidSetting { key, .. } | CoreError::Validation { key, .. } => Some(key),
            CoreError::Parse { .. } => None,
        }
    }
}
