//! Data models shared by the pipeline stages.
//!
//! Provider payloads are normalized into [`PaperRecord`] inside each source
//! client; everything downstream only sees the normalized shape.

mod paper;
mod result;
mod source;

pub use paper::{AuthorName, PaperRecord, UNAVAILABLE, UNTITLED};
pub use paper::{normalize_text, parse_date, parse_download_url};
pub use result::{AggregatedResult, QueryResult};
pub use source::{SourceId, UnknownSource};
