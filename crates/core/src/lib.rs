// Core types and traits for the netradio streaming pipeline

pub mod callback;
pub mod config;
pub mod error;
pub mod source;
pub mod state;

// Re-export commonly used types
pub use callback::{StatusNotifier, StatusObserver};
pub use config::{EngineConfig, RecoveryPolicy};
pub use error::{AudioError, Result};
pub use source::StreamSource;
pub use state::{PlayerStatus, StatusContainer};
