pub mod human_format;
pub mod url;

pub use human_format::{format_bytes, format_duration};
pub use url::{UrlError, UrlUtils};
