//! 仿真状态机
//!
//! 定义仿真状态、状态转换原因以及合法转换规则。

use crate::error::SimError;
use serde::Serialize;
use std::fmt;

/// 仿真状态。`Stopped` 为终态。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SimState {
    NotStarted,
    Running,
    Step,
    Paused,
    Stopped,
}

impl SimState {
    /// 循环是否可以继续消费事件
    pub fn is_active(self) -> bool {
        matches!(self, SimState::Running | SimState::Step)
    }

    /// 外部请求的转换是否合法
    pub fn can_transition_to(self, to: SimState) -> bool {
        use SimState::*;
        matches!(
            (self, to),
            (NotStarted, Running)
                | (Running, Paused)
                | (Step, Paused)
                | (Running, Step)
                | (Paused, Step)
                | (Paused, Running)
                | (Running, Stopped)
                | (Step, Stopped)
                | (Paused, Stopped)
        )
    }
}

/// 状态转换原因
#[derive(Debug, Clone, PartialEq)]
pub enum Reason {
    /// 外部（用户/其它线程）请求
    UserRequest,
    /// 单步执行完成后自动暂停
    StepCompleted,
    /// 正常结束：达到事件数/时间上限，或事件队列耗尽
    EndOfSimulation,
    /// 处理事件时出错
    Error(SimError),
}

impl Reason {
    pub fn is_error(&self) -> bool {
        matches!(self, Reason::Error(_))
    }
}

impl fmt::Display for Reason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Reason::UserRequest => write!(f, "user request"),
            Reason::StepCompleted => write!(f, "step completed"),
            Reason::EndOfSimulation => write!(f, "end of simulation"),
            Reason::Error(e) => write!(f, "error: {e}"),
        }
    }
}
