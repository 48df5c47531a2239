//! 事件计数处理器

use crate::error::SimError;
use crate::net::{NetAction, Network};
use crate::sim::{Capability, Event, ModuleContext, SimModule, SimTime};
use std::collections::BTreeMap;
use std::fmt::Write as _;

/// 统计各类网络变更出现的次数；不修改网络
#[derive(Debug, Default)]
pub struct EventLogProcessor {
    counts: BTreeMap<&'static str, u64>,
    other: u64,
    transitory_done_at: Option<SimTime>,
}

impl EventLogProcessor {
    pub fn count(&self, kind: &str) -> u64 {
        self.counts.get(kind).copied().unwrap_or(0)
    }

    pub fn other(&self) -> u64 {
        self.other
    }
}

impl SimModule for EventLogProcessor {
    fn name(&self) -> &str {
        "event_log"
    }

    fn capability(&self) -> Capability {
        Capability::Processor
    }

    fn process_event(
        &mut self,
        _ctx: &mut ModuleContext<'_>,
        _net: &mut Network,
        event: &Event,
    ) -> Result<(), SimError> {
        match event.payload::<NetAction>() {
            Some(action) => *self.counts.entry(action.kind()).or_default() += 1,
            None => self.other += 1,
        }
        Ok(())
    }

    fn finish_transitory(&mut self, now: SimTime) {
        // 过渡期内的计数不计入结果
        self.counts.clear();
        self.other = 0;
        self.transitory_done_at = Some(now);
    }

    fn finish(&mut self, out: &mut String, _now: SimTime) -> String {
        if let Some(t) = self.transitory_done_at {
            let _ = writeln!(out, "counting since {t}");
        }
        for (kind, n) in &self.counts {
            let _ = writeln!(out, "{kind}: {n}");
        }
        if self.other > 0 {
            let _ = writeln!(out, "other: {}", self.other);
        }
        "Event log".to_string()
    }
}
