//! Ingestion 错误类型

use contracts::ContractError;
use thiserror::Error;

/// Ingestion 错误
#[derive(Debug, Error)]
pub enum IngestionError {
    /// 数据源已注册
    #[error("source {source_id} is already registered")]
    AlreadyRegistered {
        /// 数据源 ID
        source_id: String,
    },

    /// 数据源未注册
    #[error("source {source_id} is not registered")]
    UnknownSource {
        /// 数据源 ID
        source_id: String,
    },

    /// 同步器拒绝了该帧
    #[error("frame from {source_id} rejected: {source}")]
    Rejected {
        /// 数据源 ID
        source_id: String,
        #[source]
        source: ContractError,
    },
}

impl IngestionError {
    pub fn rejected(source_id: impl Into<String>, source: ContractError) -> Self {
        Self::Rejected {
            source_id: source_id.into(),
            source,
        }
    }
}

/// Ingestion Result 类型别名
pub type Result<T> = std::result::Result<T, IngestionError>;
