//! Pharmacy directory access.
//!
//! The engine depends only on [`CallerDirectory`]; [`DirectoryClient`] is the
//! HTTP implementation and [`mock_server`] provides a local service speaking
//! the same REST contract.

pub mod client;
pub mod mock_server;
pub mod record;
pub mod retry;

pub use client::DirectoryClient;
pub use record::{CallerRecord, HIGH_VOLUME_THRESHOLD, NewPharmacy, normalize_phone, parse_volume};
pub use retry::RetryPolicy;

use async_trait::async_trait;

use crate::error::DirectoryError;

/// Caller identification by phone number.
///
/// `Ok(None)` means the number is unknown. `Err` means the directory could
/// not be consulted at all; the engine moves the call into its error state.
#[async_trait]
pub trait CallerDirectory: Send + Sync {
    async fn lookup(&self, phone: &str) -> Result<Option<CallerRecord>, DirectoryError>;
}
