//! Delivery of controller responses

use std::fmt;

use mesh_crypto::Address;
use serde::{Deserialize, Serialize};

use crate::network_config::NetworkConfig;

/// Error codes reported to requesting members
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    ObjectNotFound,
    AccessDenied,
    InternalServerError,
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorCode::ObjectNotFound => write!(f, "OBJECT_NOT_FOUND"),
            ErrorCode::AccessDenied => write!(f, "ACCESS_DENIED"),
            ErrorCode::InternalServerError => write!(f, "INTERNAL_SERVER_ERROR"),
        }
    }
}

/// Sends configs and errors back to members
///
/// Delivery is fire-and-forget: retries and failures belong to the
/// implementation.
pub trait Transport: Send + Sync {
    fn send_config(
        &self,
        network_id: u64,
        request_id: u64,
        recipient: Address,
        config: NetworkConfig,
        use_legacy_format: bool,
    );

    fn send_error(
        &self,
        network_id: u64,
        request_id: u64,
        recipient: Address,
        error_code: ErrorCode,
        payload: &[u8],
    );
}
