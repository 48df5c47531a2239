//! 仿真核心模块
//!
//! 此模块包含事件驱动仿真的核心组件：仿真时间、事件与事件队列、模块接口、
//! 内核、仿真循环及其状态机、控制句柄与监听器、场景文件。

// 子模块声明
mod control;
mod event;
mod event_queue;
mod kernel;
mod listener;
mod module;
pub mod params;
mod runner;
mod scenario;
mod scheduled_event;
mod state;
mod time;

// 重新导出公共接口
pub use control::SimControl;
pub use event::{Destination, Event, EventRecord};
pub use event_queue::EventQueue;
pub use kernel::{ModuleReport, SimKernel};
pub use listener::{ConsoleListener, Progress, SimListener};
pub use module::{Capability, ModuleContext, SimModule};
pub use params::{ParamMap, SimParams};
pub use runner::{Iteration, SimReport, SimRunner, SimThread};
pub use scenario::{ModuleSpec, ScenarioMeta, ScenarioSpec, ScriptedEventSpec};
pub use state::{Reason, SimState};
pub use time::SimTime;
