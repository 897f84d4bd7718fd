//! Pipeline 错误类型

use contracts::ContractError;
use dispatcher::DispatcherError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PipelineError {
    /// 组件构建失败 (标定等)
    #[error("pipeline setup failed: {0}")]
    Setup(#[from] ContractError),

    /// Sink 创建失败
    #[error("dispatcher setup failed: {0}")]
    Dispatcher(#[from] DispatcherError),

    /// 消费者任务异常退出
    #[error("consumer task failed: {0}")]
    Consumer(String),
}
