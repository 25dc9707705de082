pub mod document;
pub mod progress;

pub use document::{source_mime, ConversionKind, ConversionMode};
pub use progress::{JobId, ProgressEvent, DONE_STATUS, HEARTBEAT_STATUS};
