pub mod api;
pub mod config;
pub mod convert;
pub mod error;
pub mod logging;
pub mod progress;
pub mod types;
pub mod util;

#[cfg(test)]
pub(crate) mod test_support;

pub use config::Config;
pub use convert::{ConversionOutcome, ConversionRequest, Converter};
pub use error::{ConvertError, ProgressError};
pub use progress::{ProgressSettings, ProgressSource, ProgressTracker, StatusSink};
