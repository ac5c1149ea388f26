use std::fmt;
use std::error::Error;

/// Result type for overlay networking operations
pub type Result<T> = std::result::Result<T, NetworkError>;

/// Overlay networking errors
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NetworkError {
    /// Address error
    AddressError(String),

    /// A bounded sequence is already full
    CapacityExceeded {
        /// What was being appended
        what: String,
        /// Maximum number of elements
        capacity: usize,
    },
}

impl fmt::Display for NetworkError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NetworkError::AddressError(msg) => write!(f, "Address error: {}", msg),
            NetworkError::CapacityExceeded { what, capacity } => {
                write!(f, "Capacity exceeded: at most {} {} allowed", capacity, what)
            }
        }
    }
}

impl Error for NetworkError {}

impl From<std::net::AddrParseError> for NetworkError {
    fn from(err: std::net::AddrParseError) -> Self {
        NetworkError::AddressError(err.to_string())
    }
}
