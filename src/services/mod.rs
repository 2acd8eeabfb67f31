//! Request orchestration: fetching, analysis, proxying and download links
//!
//! Services hold no per-request state and are cheap to clone into handlers.

pub mod analysis;
pub mod download_link;
pub mod fetcher;
pub mod source_policy;
pub mod stream_proxy;
pub mod stream_registry;

pub use analysis::AnalysisService;
pub use download_link::DownloadLinkBuilder;
pub use fetcher::{FetchPurpose, FetchedResponse, PlaylistFetcher};
pub use source_policy::SourcePolicy;
pub use stream_proxy::StreamProxyService;
pub use stream_registry::{EndReason, StreamInfo, StreamLease, StreamRegistry};
