//! 内置事件生成器/处理器
//!
//! - `scripted`：按场景脚本回放网络变更（生成器）
//! - `shortest_path`：应用变更并按最少跳数重新路由（处理器）
//! - `event_log`：统计各类变更的次数（处理器）
//! - `composite`：把多个子模块组合为一个

mod composite;
mod event_log;
mod scripted;
mod shortest_path;

pub use composite::CompositeModule;
pub use event_log::EventLogProcessor;
pub use scripted::{ScriptStep, ScriptedGenerator};
pub use shortest_path::ShortestPathProcessor;

use crate::error::{ConfigError, SimError};
use crate::sim::{Capability, Destination, ModuleSpec, ScenarioSpec, SimModule};

/// 按类型名构建模块
pub fn build_module(
    spec: &ModuleSpec,
    scenario: &ScenarioSpec,
) -> Result<Box<dyn SimModule>, SimError> {
    let module: Box<dyn SimModule> = match spec.kind.as_str() {
        "scripted" => Box::new(ScriptedGenerator::new(scenario.events.clone())),
        "shortest_path" => Box::new(ShortestPathProcessor::default()),
        "event_log" => Box::new(EventLogProcessor::default()),
        "composite" => {
            let children = spec
                .modules
                .iter()
                .map(|child| build_module(child, scenario))
                .collect::<Result<Vec<_>, _>>()?;
            let supports = |d: Destination| children.iter().all(|c| c.capability().supports(d));
            let capability = match (
                supports(Destination::Generator),
                supports(Destination::Processor),
            ) {
                (true, true) => Capability::Both,
                (true, false) => Capability::Generator,
                (false, true) => Capability::Processor,
                (false, false) => {
                    return Err(ConfigError::Capability {
                        module: "composite".to_string(),
                        role: "a single role (children disagree)",
                    }
                    .into());
                }
            };
            Box::new(CompositeModule::new("composite", capability, children))
        }
        other => return Err(ConfigError::UnknownModule(other.to_string()).into()),
    };
    Ok(module)
}
