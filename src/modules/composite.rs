//! 组合模块
//!
//! 按顺序把每个事件交给所有子模块。子模块的 `initialize`/`finish_transitory`
//! 由内核遍历模块树时调用，这里不重复转发。

use crate::error::SimError;
use crate::net::Network;
use crate::sim::{Capability, Event, ModuleContext, SimModule, SimTime};
use std::fmt::Write as _;

pub struct CompositeModule {
    name: String,
    capability: Capability,
    children: Vec<Box<dyn SimModule>>,
}

impl CompositeModule {
    pub fn new(
        name: impl Into<String>,
        capability: Capability,
        children: Vec<Box<dyn SimModule>>,
    ) -> Self {
        Self {
            name: name.into(),
            capability,
            children,
        }
    }
}

impl SimModule for CompositeModule {
    fn name(&self) -> &str {
        &self.name
    }

    fn capability(&self) -> Capability {
        self.capability
    }

    fn process_event(
        &mut self,
        ctx: &mut ModuleContext<'_>,
        net: &mut Network,
        event: &Event,
    ) -> Result<(), SimError> {
        for child in &mut self.children {
            child.process_event(ctx, net, event)?;
        }
        Ok(())
    }

    fn finish(&mut self, out: &mut String, now: SimTime) -> String {
        for child in &mut self.children {
            let mut body = String::new();
            let title = child.finish(&mut body, now);
            let _ = writeln!(out, "[{title}]");
            out.push_str(&body);
        }
        format!("{} ({} modules)", self.name, self.children.len())
    }

    fn sub_modules_mut(&mut self) -> Option<&mut Vec<Box<dyn SimModule>>> {
        Some(&mut self.children)
    }
}
