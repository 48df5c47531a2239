//! 事件生成器/处理器模块接口
//!
//! 模块在回调期间通过 [`ModuleContext`] 调度新事件，并以 `&mut Network`
//! 的形式借用实时网络；回调返回后借用即结束。

use super::event::{Destination, Event};
use super::event_queue::EventQueue;
use super::params::{ParamMap, SimParams};
use super::time::SimTime;
use crate::error::SimError;
use crate::net::Network;

/// 模块能够承担的角色
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Capability {
    Generator,
    Processor,
    Both,
}

impl Capability {
    pub fn supports(self, dest: Destination) -> bool {
        matches!(
            (self, dest),
            (Capability::Both, _)
                | (Capability::Generator, Destination::Generator)
                | (Capability::Processor, Destination::Processor)
        )
    }
}

/// 模块回调可见的内核能力：读取当前时间、调度新事件
pub struct ModuleContext<'a> {
    queue: &'a mut EventQueue,
}

impl<'a> ModuleContext<'a> {
    pub(crate) fn new(queue: &'a mut EventQueue) -> Self {
        Self { queue }
    }

    pub fn now(&self) -> SimTime {
        self.queue.current_time()
    }

    pub fn processed_count(&self) -> u64 {
        self.queue.processed_count()
    }

    /// 调度新事件。这是新事件进入队列的唯一途径。
    pub fn schedule_event(&mut self, ev: Event) -> Result<(), SimError> {
        self.queue.add_event(ev)
    }
}

/// 事件生成器/处理器
///
/// `initialize` 在每次开始仿真时调用（包括 `reset` 之后的重新开始），
/// 模块应在这里重置自身的内部状态。
pub trait SimModule: Send {
    fn name(&self) -> &str;

    fn capability(&self) -> Capability;

    fn initialize(
        &mut self,
        _ctx: &mut ModuleContext<'_>,
        _net: &mut Network,
        _own: &ParamMap,
        _sim: &SimParams,
        _global: &ParamMap,
    ) -> Result<(), SimError> {
        Ok(())
    }

    fn process_event(
        &mut self,
        ctx: &mut ModuleContext<'_>,
        net: &mut Network,
        event: &Event,
    ) -> Result<(), SimError>;

    /// 过渡期结束时调用（每次运行至多一次）
    fn finish_transitory(&mut self, _now: SimTime) {}

    /// 向 `out` 写入本模块的报告片段，返回片段标题
    fn finish(&mut self, _out: &mut String, _now: SimTime) -> String {
        self.name().to_string()
    }

    /// 组合模块返回其子模块；内核会对子模块同样调用 `initialize`/`finish_transitory`
    fn sub_modules_mut(&mut self) -> Option<&mut Vec<Box<dyn SimModule>>> {
        None
    }
}

/// 先序遍历模块树（自身，然后各子模块）
pub(crate) fn visit_modules(
    module: &mut dyn SimModule,
    f: &mut dyn FnMut(&mut dyn SimModule) -> Result<(), SimError>,
) -> Result<(), SimError> {
    f(&mut *module)?;
    if let Some(children) = module.sub_modules_mut() {
        for child in children.iter_mut() {
            visit_modules(child.as_mut(), f)?;
        }
    }
    Ok(())
}
