//! Common error types for OpenCDN.
//!
//! Every failure carries a human readable context string for logs. What a
//! client gets to see is decided by [`ErrorKind`]: a stable numeric id, a
//! name, a fixed description and the HTTP status class.

use thiserror::Error;

/// Top-level error type for OpenCDN operations.
#[derive(Debug, Error)]
pub enum Error {
    /// A required field is missing or a value is malformed.
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// A filename, key or group name contains a disallowed character or a
    /// parent-directory sequence.
    #[error("Invalid address: {0}")]
    InvalidAddress(String),

    /// The file suffix is blacklisted, not whitelisted or missing.
    #[error("Invalid file suffix: {0}")]
    InvalidSuffix(String),

    /// Object, group, namespace or file is absent.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Ownership secret mismatch or missing ownership digest.
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// Object exceeds the configured maximum size.
    #[error("Too large: {0}")]
    TooLarge(String),

    /// Filename or group namespace already occupied.
    #[error("Already exists: {0}")]
    AlreadyExists(String),

    /// Hashed address already occupied by another object.
    #[error("Address collision: {0}")]
    AddressCollision(String),

    /// The operation needs an authentication token and none was supplied.
    #[error("Authentication token required")]
    TokenRequired,

    /// The supplied authentication token is unknown.
    #[error("Invalid authentication token")]
    InvalidToken,

    /// The public key identifier is not configured.
    #[error("Key not found: {0}")]
    KeyNotFound(String),

    /// Stored ciphertext could not be decoded with the supplied key.
    #[error("Decode error: {0}")]
    Decode(String),

    /// Cryptographic operation failed.
    #[error("Cryptographic error: {0}")]
    Crypto(String),

    /// Storage operation failed.
    #[error("Storage error: {0}")]
    Storage(String),

    /// I/O operation failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization or deserialization failed.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Configuration is invalid.
    #[error("Configuration error: {0}")]
    Config(String),
}

impl Error {
    /// Classify this error for the outside world.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::BadRequest(_) => ErrorKind::BadRequest,
            Error::InvalidAddress(_) => ErrorKind::InvalidAddress,
            Error::InvalidSuffix(_) => ErrorKind::InvalidSuffix,
            Error::NotFound(_) => ErrorKind::NotFound,
            Error::Forbidden(_) => ErrorKind::Forbidden,
            Error::TooLarge(_) => ErrorKind::TooLarge,
            Error::AlreadyExists(_) => ErrorKind::AlreadyExists,
            Error::AddressCollision(_) => ErrorKind::AddressCollision,
            Error::TokenRequired => ErrorKind::TokenRequired,
            Error::InvalidToken => ErrorKind::InvalidToken,
            Error::KeyNotFound(_) => ErrorKind::KeyNotFound,
            Error::Decode(_)
            | Error::Crypto(_)
            | Error::Storage(_)
            | Error::Io(_)
            | Error::Serialization(_)
            | Error::Config(_) => ErrorKind::Internal,
        }
    }

    /// Whether this error is an unexpected internal failure.
    pub fn is_internal(&self) -> bool {
        self.kind() == ErrorKind::Internal
    }
}

/// Externally visible error class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    BadRequest,
    InvalidAddress,
    InvalidSuffix,
    NotFound,
    Forbidden,
    TooLarge,
    AlreadyExists,
    AddressCollision,
    TokenRequired,
    InvalidToken,
    KeyNotFound,
    Internal,
}

impl ErrorKind {
    /// Stable numeric identifier.
    pub fn id(&self) -> u32 {
        match self {
            ErrorKind::BadRequest => 1,
            ErrorKind::InvalidAddress => 2,
            ErrorKind::InvalidSuffix => 3,
            ErrorKind::NotFound => 4,
            ErrorKind::Forbidden => 5,
            ErrorKind::TooLarge => 6,
            ErrorKind::AlreadyExists => 7,
            ErrorKind::AddressCollision => 8,
            ErrorKind::TokenRequired => 9,
            ErrorKind::InvalidToken => 10,
            ErrorKind::KeyNotFound => 11,
            ErrorKind::Internal => 12,
        }
    }

    /// Stable machine readable name.
    pub fn name(&self) -> &'static str {
        match self {
            ErrorKind::BadRequest => "bad_request",
            ErrorKind::InvalidAddress => "invalid_address",
            ErrorKind::InvalidSuffix => "invalid_file_suffix",
            ErrorKind::NotFound => "not_found",
            ErrorKind::Forbidden => "access_denied",
            ErrorKind::TooLarge => "too_large",
            ErrorKind::AlreadyExists => "already_exists",
            ErrorKind::AddressCollision => "address_collision",
            ErrorKind::TokenRequired => "authentication_token_required",
            ErrorKind::InvalidToken => "invalid_authentication_token",
            ErrorKind::KeyNotFound => "key_not_found",
            ErrorKind::Internal => "internal_server_error",
        }
    }

    /// Fixed description shown to clients.
    pub fn description(&self) -> &'static str {
        match self {
            ErrorKind::BadRequest => "The request is missing a required field or is malformed.",
            ErrorKind::InvalidAddress => {
                "The filename, key or group name contains disallowed characters."
            }
            ErrorKind::InvalidSuffix => {
                "The file suffix is blacklisted, not whitelisted or does not exist."
            }
            ErrorKind::NotFound => "The requested resource does not exist.",
            ErrorKind::Forbidden => "You do not have access to the requested resource.",
            ErrorKind::TooLarge => "The file exceeds the maximum allowed size.",
            ErrorKind::AlreadyExists => "The resource already exists.",
            ErrorKind::AddressCollision => "The storage address is already occupied.",
            ErrorKind::TokenRequired => {
                "This action requires 'authentication_token' to be set to a valid token."
            }
            ErrorKind::InvalidToken => "The authentication token is invalid.",
            ErrorKind::KeyNotFound => "No key with this key identifier is configured.",
            ErrorKind::Internal => "An unknown error occurred while answering the request.",
        }
    }

    /// HTTP status code for this class.
    pub fn http_status(&self) -> u16 {
        match self {
            ErrorKind::BadRequest => 400,
            ErrorKind::InvalidAddress => 403,
            ErrorKind::InvalidSuffix => 403,
            ErrorKind::NotFound => 404,
            ErrorKind::Forbidden => 403,
            ErrorKind::TooLarge => 413,
            ErrorKind::AlreadyExists => 409,
            ErrorKind::AddressCollision => 409,
            ErrorKind::TokenRequired => 401,
            ErrorKind::InvalidToken => 403,
            ErrorKind::KeyNotFound => 404,
            ErrorKind::Internal => 500,
        }
    }
}

/// Result type alias using the common Error.
pub type Result<T> = std::result::Result<T, Error>;
