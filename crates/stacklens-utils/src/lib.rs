//! # stacklens utilities
//!
//! Logging setup shared by the `stacklens` binary and by applications that
//! embed `stacklens-core` and want its warnings on a standard sink.

pub mod logging;

// Re-export commonly used logging functions for convenience
pub use logging::{init_logging, init_logging_with, LogConfig, LogFormat, LogLevel, LoggingError};
pub use tracing::{debug, error, info, trace, warn};
