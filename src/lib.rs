//! Preview and download proxy for public HLS streams.
//!
//! - [`playlist`]: pure playlist analysis and reference rewriting
//! - [`services`]: upstream fetching, analysis, streaming proxy, download links
//! - [`web`]: the axum HTTP surface

pub mod config;
pub mod errors;
pub mod playlist;
pub mod services;
pub mod utils;
pub mod web;
