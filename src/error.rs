//! 错误类型
//!
//! 配置错误在仿真开始前直接返回；模块运行期错误由仿真循环捕获并转换为 `Stopped`。

use crate::sim::{SimState, SimTime};
use thiserror::Error;

/// 配置错误：参数缺失/类型不对、模块能力不符。
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("missing simulation parameter `{0}`")]
    MissingParam(String),

    #[error("invalid value `{value}` for parameter `{key}`: {why}")]
    InvalidParam {
        key: String,
        value: String,
        why: String,
    },

    #[error("module `{module}` cannot act as {role}")]
    Capability { module: String, role: &'static str },

    #[error("unknown module kind `{0}`")]
    UnknownModule(String),
}

/// 仿真错误
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SimError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("module `{module}` failed: {message}")]
    Module { module: String, message: String },

    #[error("event at {at:?} is earlier than current time {now:?}")]
    EventInPast { at: SimTime, now: SimTime },

    #[error("no module is routed for destination {0:?}")]
    NoRoute(crate::sim::Destination),

    #[error("invalid state transition {from:?} -> {to:?}")]
    InvalidTransition { from: SimState, to: SimState },

    #[error("simulation already started; reset it first")]
    AlreadyStarted,

    #[error("kernel is not configured")]
    NotConfigured,

    #[error("scenario error: {0}")]
    Scenario(String),

    #[error("io error: {0}")]
    Io(String),
}

impl SimError {
    /// 模块内部错误的便捷构造
    pub fn module(module: impl Into<String>, message: impl Into<String>) -> Self {
        SimError::Module {
            module: module.into(),
            message: message.into(),
        }
    }
}

impl From<std::io::Error> for SimError {
    fn from(e: std::io::Error) -> Self {
        SimError::Io(e.to_string())
    }
}

impl From<serde_json::Error> for SimError {
    fn from(e: serde_json::Error) -> Self {
        SimError::Scenario(e.to_string())
    }
}
