//! 脚本生成器
//!
//! 每条脚本动作先以生成器事件的形式到达，生成器再把动作以同一时间转发给处理器，
//! 并调度下一条脚本动作。

use crate::error::SimError;
use crate::net::Network;
use crate::sim::{
    Capability, Destination, Event, ModuleContext, ParamMap, ScriptedEventSpec, SimModule,
    SimParams, SimTime,
};
use std::fmt::Write as _;
use tracing::{debug, trace};

/// 生成器自身事件的负载：脚本下标
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScriptStep(pub usize);

#[derive(Debug, Default)]
pub struct ScriptedGenerator {
    script: Vec<ScriptedEventSpec>,
    emitted: u64,
}

impl ScriptedGenerator {
    pub fn new(mut script: Vec<ScriptedEventSpec>) -> Self {
        // 稳定排序：同一时间的动作保持脚本中的顺序
        script.sort_by(|a, b| a.at.total_cmp(&b.at));
        Self { script, emitted: 0 }
    }

    pub fn emitted(&self) -> u64 {
        self.emitted
    }

    fn schedule_step(&self, ctx: &mut ModuleContext<'_>, idx: usize) -> Result<(), SimError> {
        match self.script.get(idx) {
            Some(entry) => ctx.schedule_event(Event::new(
                SimTime(entry.at),
                Destination::Generator,
                ScriptStep(idx),
            )),
            None => Ok(()),
        }
    }
}

impl SimModule for ScriptedGenerator {
    fn name(&self) -> &str {
        "scripted"
    }

    fn capability(&self) -> Capability {
        Capability::Generator
    }

    fn initialize(
        &mut self,
        ctx: &mut ModuleContext<'_>,
        _net: &mut Network,
        _own: &ParamMap,
        _sim: &SimParams,
        _global: &ParamMap,
    ) -> Result<(), SimError> {
        self.emitted = 0;
        debug!(actions = self.script.len(), "脚本生成器初始化");
        self.schedule_step(ctx, 0)
    }

    fn process_event(
        &mut self,
        ctx: &mut ModuleContext<'_>,
        _net: &mut Network,
        event: &Event,
    ) -> Result<(), SimError> {
        let Some(&ScriptStep(idx)) = event.payload::<ScriptStep>() else {
            trace!("忽略非脚本事件");
            return Ok(());
        };
        let entry = self
            .script
            .get(idx)
            .ok_or_else(|| SimError::module(self.name(), format!("script index {idx} out of range")))?;
        trace!(idx, kind = entry.action.kind(), "转发脚本动作");
        ctx.schedule_event(Event::new(
            event.time,
            Destination::Processor,
            entry.action.clone(),
        ))?;
        self.emitted += 1;
        self.schedule_step(ctx, idx + 1)
    }

    fn finish(&mut self, out: &mut String, _now: SimTime) -> String {
        let _ = writeln!(
            out,
            "emitted {} of {} scripted actions",
            self.emitted,
            self.script.len()
        );
        "Scripted event generator".to_string()
    }
}
