//! Dispatcher error types

use std::path::PathBuf;

use contracts::{ContractError, SinkType};
use thiserror::Error;

/// Raised while building the sink set; a running dispatcher never fails
#[derive(Debug, Error)]
pub enum DispatcherError {
    #[error("{sink_type:?} sink '{name}' could not be created")]
    SinkCreation {
        name: String,
        sink_type: SinkType,
        #[source]
        source: ContractError,
    },

    #[error("file sink '{name}' cannot open {}", path.display())]
    FileOpen {
        name: String,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("duplicate sink name '{0}'")]
    DuplicateSink(String),
}
