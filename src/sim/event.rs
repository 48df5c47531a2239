//! 仿真事件
//!
//! 事件携带时间戳、目标模块标签以及任意负载（由模块自行 downcast）。

use super::time::SimTime;
use serde::{Deserialize, Serialize};
use std::any::Any;
use std::fmt;

/// 事件的目标模块
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Destination {
    Generator,
    Processor,
}

impl Destination {
    pub const ALL: [Destination; 2] = [Destination::Generator, Destination::Processor];

    pub fn as_str(self) -> &'static str {
        match self {
            Destination::Generator => "generator",
            Destination::Processor => "processor",
        }
    }
}

/// 仿真事件。负载使用 `Box<dyn Any + Send>`，由接收模块按需 downcast。
pub struct Event {
    pub time: SimTime,
    pub destination: Destination,
    payload: Box<dyn Any + Send>,
}

impl Event {
    pub fn new<P: Any + Send>(time: SimTime, destination: Destination, payload: P) -> Self {
        Self {
            time,
            destination,
            payload: Box::new(payload),
        }
    }

    /// 不带负载的事件（例如纯定时器）
    pub fn tick(time: SimTime, destination: Destination) -> Self {
        Self::new(time, destination, ())
    }

    /// 以类型 `P` 借用负载；类型不匹配返回 None
    pub fn payload<P: Any>(&self) -> Option<&P> {
        self.payload.downcast_ref::<P>()
    }

    /// 取出负载；类型不匹配时原样返回事件
    pub fn into_payload<P: Any>(self) -> Result<P, Event> {
        let Event {
            time,
            destination,
            payload,
        } = self;
        match payload.downcast::<P>() {
            Ok(p) => Ok(*p),
            Err(payload) => Err(Event {
                time,
                destination,
                payload,
            }),
        }
    }
}

impl fmt::Debug for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Event")
            .field("time", &self.time)
            .field("destination", &self.destination)
            .finish_non_exhaustive()
    }
}

/// 最近一次处理的事件的摘要（负载不可克隆，只保留元信息）
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EventRecord {
    pub time: SimTime,
    pub destination: Destination,
    pub index: u64,
}
