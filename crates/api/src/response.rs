//! Response envelope types for API handlers.
//!
//! Successful responses use a `{ "data": ... }` envelope.

use serde::Serialize;

/// Standard `{ "data": T }` response envelope.
#[derive(Debug, Serialize)]
pub struct DataResponse<T: Serialize> {
    pub data: T,
}

/// Envelope returned by a settings write.
#[derive(Debug, Serialize)]
pub struct WriteResponse<T: Serialize> {
    pub data: T,
    /// A reboot was scheduled after the write.
    pub rebooting: bool,
}
