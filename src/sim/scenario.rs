//! 场景文件
//!
//! JSON 场景：拓扑、仿真参数、全局参数、生成器/处理器模块描述与脚本事件。

use super::kernel::SimKernel;
use super::listener::SimListener;
use super::params::{ParamMap, SimParams};
use super::runner::SimRunner;
use crate::error::SimError;
use crate::modules::build_module;
use crate::net::{NetAction, Network, TopologySpec};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use std::sync::Arc;
use tracing::info;

pub const SCHEMA_VERSION: u32 = 1;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScenarioSpec {
    pub schema_version: u32,
    #[serde(default)]
    pub meta: Option<ScenarioMeta>,
    pub topology: TopologySpec,
    /// 仿真参数；未给出的键取默认值
    #[serde(default)]
    pub sim_params: BTreeMap<String, Value>,
    #[serde(default)]
    pub global_params: BTreeMap<String, Value>,
    #[serde(default = "ModuleSpec::default_generator")]
    pub generator: ModuleSpec,
    #[serde(default = "ModuleSpec::default_processor")]
    pub processor: ModuleSpec,
    /// 由 `scripted` 生成器按时间回放的网络变更
    #[serde(default)]
    pub events: Vec<ScriptedEventSpec>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScenarioMeta {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}

/// 模块描述；`composite` 类型通过 `modules` 给出子模块
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModuleSpec {
    pub kind: String,
    #[serde(default)]
    pub params: BTreeMap<String, Value>,
    #[serde(default)]
    pub modules: Vec<ModuleSpec>,
}

impl ModuleSpec {
    pub fn new(kind: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            params: BTreeMap::new(),
            modules: Vec::new(),
        }
    }

    fn default_generator() -> Self {
        Self::new("scripted")
    }

    fn default_processor() -> Self {
        Self::new("shortest_path")
    }

    pub fn param_map(&self) -> ParamMap {
        to_param_map(&self.params)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScriptedEventSpec {
    /// 仿真时间（秒）
    pub at: f64,
    pub action: NetAction,
}

fn to_param_map(values: &BTreeMap<String, Value>) -> ParamMap {
    values
        .iter()
        .map(|(k, v)| {
            let s = match v {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            };
            (k.clone(), s)
        })
        .collect()
}

impl ScenarioSpec {
    pub fn from_json_str(raw: &str) -> Result<Self, SimError> {
        let spec: ScenarioSpec = serde_json::from_str(raw)?;
        if spec.schema_version != SCHEMA_VERSION {
            return Err(SimError::Scenario(format!(
                "unsupported schema_version {} (expected {SCHEMA_VERSION})",
                spec.schema_version
            )));
        }
        Ok(spec)
    }

    pub fn from_path(path: &Path) -> Result<Self, SimError> {
        let raw = fs::read_to_string(path)?;
        Self::from_json_str(&raw)
    }

    /// 默认参数表，叠加场景中的参数，再叠加 `overrides`
    pub fn sim_param_map(&self, overrides: &ParamMap) -> ParamMap {
        let mut map = SimParams::default_map();
        map.extend(to_param_map(&self.sim_params));
        map.extend(overrides.iter().map(|(k, v)| (k.clone(), v.clone())));
        map
    }

    pub fn global_param_map(&self) -> ParamMap {
        to_param_map(&self.global_params)
    }

    /// 构建已配置好的内核
    pub fn build_kernel(&self, overrides: &ParamMap) -> Result<SimKernel, SimError> {
        let net = Network::from_spec(&self.topology)?;
        let generator = build_module(&self.generator, self)?;
        let processor = build_module(&self.processor, self)?;

        let mut kernel = SimKernel::new();
        kernel.configure(
            &self.sim_param_map(overrides),
            self.global_param_map(),
            generator,
            self.generator.param_map(),
            processor,
            self.processor.param_map(),
        )?;
        kernel.set_initial_snapshot(net)?;
        info!(
            name = self.meta.as_ref().and_then(|m| m.name.as_deref()).unwrap_or("-"),
            events = self.events.len(),
            "场景加载完成"
        );
        Ok(kernel)
    }

    pub fn build_runner(
        &self,
        overrides: &ParamMap,
        listener: Option<Arc<dyn SimListener>>,
    ) -> Result<SimRunner, SimError> {
        Ok(SimRunner::new(self.build_kernel(overrides)?, listener))
    }
}
