use thiserror::Error;

pub type SfsResult<T> = Result<T, SfsError>;

/// Every failure a securefs operation can report.
///
/// Authentication failures deliberately carry no detail: an unknown user, a
/// wrong password, and a corrupted private index all look the same.
#[derive(Debug, Error)]
pub enum SfsError {
    #[error("invalid input: {0}")]
    Validation(String),

    #[error("account already exists: {0}")]
    DuplicateAccount(String),

    #[error("authentication failed")]
    Authentication,

    #[error("not found: {0}")]
    NotFound(String),

    #[error("integrity check failed: {0}")]
    Integrity(String),

    #[error("malformed share token: {0}")]
    MalformedToken(String),

    #[error("share token signature is invalid")]
    InvalidCapability,

    #[error("share token refers to a file that no longer exists: {0}")]
    DanglingCapability(String),

    #[error("share token was issued before the file key was rotated")]
    RevokedCapability,

    #[error("storage error: {0}")]
    Storage(String),

    #[error("crypto error: {0}")]
    Crypto(String),

    #[error("config error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl SfsError {
    /// Process exit code for this error kind, as documented in the CLI help.
    pub fn exit_code(&self) -> i32 {
        match self {
            SfsError::Validation(_) => 10,
            SfsError::DuplicateAccount(_) => 11,
            SfsError::Authentication => 12,
            SfsError::NotFound(_) => 13,
            SfsError::Integrity(_) => 14,
            SfsError::MalformedToken(_) => 15,
            SfsError::InvalidCapability => 16,
            SfsError::DanglingCapability(_) => 17,
            SfsError::RevokedCapability => 18,
            SfsError::Storage(_) | SfsError::Io(_) | SfsError::Serialization(_) => 19,
            SfsError::Crypto(_) => 20,
            SfsError::Config(_) => 1,
        }
    }

    /// True for the kinds that mean "a share token was rejected".
    pub fn is_capability_error(&self) -> bool {
        matches!(
            self,
            SfsError::MalformedToken(_)
                | SfsError::InvalidCapability
                | SfsError::DanglingCapability(_)
                | SfsError::RevokedCapability
        )
    }
}
