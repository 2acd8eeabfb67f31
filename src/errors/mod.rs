//! Centralized error handling for the HLS preview service
//!
//! Every failure a request can hit is one of a small, closed set of kinds.
//! Handlers never render raw error chains: each kind maps to exactly one
//! HTTP status and one pre-written hint that the player UI can show as-is.
//!
//! # Error Categories
//!
//! - **Input**: malformed or missing source URL (`InvalidInput`)
//! - **Policy**: source host is on the denylist (`Forbidden`)
//! - **Upstream**: the CDN refused (`AccessDenied`), failed (`UpstreamError`),
//!   was unreachable (`TransportError`) or too slow (`Timeout`)
//! - **Content**: the body is not an HLS playlist (`InvalidPlaylist`)
//!
//! # Usage
//!
//! ```rust
//! use hls_preview::errors::{AppError, AppResult};
//!
//! fn check(url: &str) -> AppResult<()> {
//!     if url.is_empty() {
//!         return Err(AppError::invalid_input("url parameter is required"));
//!     }
//!     Ok(())
//! }
//! ```

pub mod types;

pub use types::*;

/// Convenience type alias for Results using AppError
pub type AppResult<T> = Result<T, AppError>;
