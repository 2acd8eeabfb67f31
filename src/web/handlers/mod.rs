//! HTTP request handlers organized by endpoint
//!
//! Handlers stay thin: extract parameters, call one service, shape the response.

pub mod analyze;
pub mod download;
pub mod health;
pub mod proxy;
pub mod streams;
