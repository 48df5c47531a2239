//! 仿真内核
//!
//! 持有实时网络、冻结的初始网络、事件队列与按目标路由的模块表；
//! 把每个事件交给对应模块处理，之后触发统计聚合。

use std::collections::BTreeMap;

use super::control::SimControl;
use super::event::{Destination, Event, EventRecord};
use super::event_queue::EventQueue;
use super::module::{ModuleContext, SimModule, visit_modules};
use super::params::{ParamMap, SimParams, precision_factor};
use super::state::SimState;
use super::time::SimTime;
use crate::error::{ConfigError, SimError};
use crate::net::Network;
use crate::stats::{ReportNode, StatisticsAggregator};
use serde::Serialize;
use tracing::{debug, info, warn};

/// 路由表中的一项：模块及其自身参数
struct ModuleSlot {
    module: Box<dyn SimModule>,
    params: ParamMap,
}

/// 模块在仿真结束时给出的报告片段
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ModuleReport {
    pub destination: &'static str,
    pub title: String,
    pub body: String,
}

/// 仿真内核
pub struct SimKernel {
    sim_params: SimParams,
    global: ParamMap,
    precision: f64,
    routes: BTreeMap<Destination, ModuleSlot>,
    queue: EventQueue,
    /// 冻结的初始网络，仅在 NotStarted 时可替换
    initial: Network,
    live: Network,
    stats: Option<StatisticsAggregator>,
    last_event: Option<EventRecord>,
    last_error: Option<SimError>,
    end_time: Option<SimTime>,
    started: bool,
    /// 所属运行器的控制句柄；离开 NotStarted 后拒绝重新配置
    control: Option<SimControl>,
}

impl Default for SimKernel {
    fn default() -> Self {
        Self::new()
    }
}

impl SimKernel {
    pub fn new() -> Self {
        Self {
            sim_params: SimParams::default(),
            global: ParamMap::new(),
            precision: crate::sim::params::DEFAULT_PRECISION_FACTOR,
            routes: BTreeMap::new(),
            queue: EventQueue::new(),
            initial: Network::default(),
            live: Network::default(),
            stats: None,
            last_event: None,
            last_error: None,
            end_time: None,
            started: false,
            control: None,
        }
    }

    /// 配置参数与模块。任何参数缺失/非法、模块能力不符都会直接失败，内核保持原样。
    #[allow(clippy::too_many_arguments)]
    pub fn configure(
        &mut self,
        sim_params: &ParamMap,
        global_params: ParamMap,
        generator: Box<dyn SimModule>,
        generator_params: ParamMap,
        processor: Box<dyn SimModule>,
        processor_params: ParamMap,
    ) -> Result<(), SimError> {
        self.ensure_configurable()?;
        let params = SimParams::from_map(sim_params)?;
        let precision = precision_factor(&global_params)?;
        check_capability(generator.as_ref(), Destination::Generator)?;
        check_capability(processor.as_ref(), Destination::Processor)?;

        info!(
            generator = generator.name(),
            processor = processor.name(),
            ?params,
            "内核配置完成"
        );
        self.sim_params = params;
        self.global = global_params;
        self.precision = precision;
        self.routes.clear();
        self.routes.insert(
            Destination::Generator,
            ModuleSlot {
                module: generator,
                params: generator_params,
            },
        );
        self.routes.insert(
            Destination::Processor,
            ModuleSlot {
                module: processor,
                params: processor_params,
            },
        );
        Ok(())
    }

    /// 设置初始网络：保存一份冻结副本和一份可变的实时副本
    pub fn set_initial_snapshot(&mut self, net: Network) -> Result<(), SimError> {
        self.ensure_configurable()?;
        self.live = net.clone();
        self.initial = net;
        Ok(())
    }

    fn ensure_configurable(&self) -> Result<(), SimError> {
        let left_not_started = self
            .control
            .as_ref()
            .is_some_and(|c| c.state() != SimState::NotStarted);
        if self.started || left_not_started {
            return Err(SimError::AlreadyStarted);
        }
        Ok(())
    }

    pub(crate) fn attach_control(&mut self, control: SimControl) {
        self.control = Some(control);
    }

    /// 初始化所有模块（含组合模块的子模块），并创建统计聚合器
    #[tracing::instrument(skip(self))]
    pub fn initialize(&mut self) -> Result<(), SimError> {
        if self.started {
            return Err(SimError::AlreadyStarted);
        }
        if self.routes.len() != Destination::ALL.len() {
            return Err(SimError::NotConfigured);
        }
        self.started = true;

        let sim_params = &self.sim_params;
        let global = &self.global;
        let live = &mut self.live;
        let mut ctx = ModuleContext::new(&mut self.queue);
        for (dest, slot) in self.routes.iter_mut() {
            let ModuleSlot { module, params } = slot;
            debug!(dest = dest.as_str(), module = module.name(), "初始化模块");
            visit_modules(module.as_mut(), &mut |m| {
                m.initialize(&mut ctx, live, params, sim_params, global)
            })?;
        }

        if !self.sim_params.disable_statistics {
            self.stats = Some(StatisticsAggregator::new(
                self.queue.current_time(),
                &self.live,
                self.precision,
            ));
        }
        info!(
            pending = self.queue.pending_count(),
            statistics = self.stats.is_some(),
            "✅ 内核初始化完成"
        );
        Ok(())
    }

    /// 路由并处理一个事件，之后推进统计
    #[tracing::instrument(skip(self, ev), fields(at = ?ev.time, dest = ev.destination.as_str()))]
    pub fn process_event(&mut self, ev: Event) -> Result<(), SimError> {
        self.last_event = Some(EventRecord {
            time: ev.time,
            destination: ev.destination,
            index: self.queue.processed_count(),
        });

        let result = match self.routes.get_mut(&ev.destination) {
            None => Err(SimError::NoRoute(ev.destination)),
            Some(slot) => {
                let mut ctx = ModuleContext::new(&mut self.queue);
                slot.module.process_event(&mut ctx, &mut self.live, &ev)
            }
        };
        if let Err(e) = result {
            warn!(error = %e, "事件处理失败");
            self.last_error = Some(e.clone());
            return Err(e);
        }

        if let Some(stats) = self.stats.as_mut() {
            stats.compute_next_state(ev.time, &self.live);
        }
        debug!(pending = self.queue.pending_count(), "事件处理完成");
        Ok(())
    }

    /// 从外部（例如启动前）调度事件
    pub fn schedule_event(&mut self, ev: Event) -> Result<(), SimError> {
        self.queue.add_event(ev)
    }

    /// 过渡期结束：通知所有模块，然后丢弃此前的统计
    pub fn finish_transitory(&mut self, time: SimTime) {
        info!(at = ?time, "⏱️  过渡期结束");
        for slot in self.routes.values_mut() {
            // finish_transitory 不会失败
            let _ = visit_modules(slot.module.as_mut(), &mut |m| {
                m.finish_transitory(time);
                Ok(())
            });
        }
        if let Some(stats) = self.stats.as_mut() {
            stats.reset(time, &self.live);
        }
    }

    /// 回到未开始状态：清空队列，从初始网络恢复实时网络，清除错误与统计
    pub fn reset(&mut self) {
        info!("🔄 重置内核");
        self.queue.reset();
        self.live = self.initial.clone();
        self.stats = None;
        self.last_event = None;
        self.last_error = None;
        self.end_time = None;
        self.started = false;
    }

    /// 收集各模块的报告片段
    pub fn finish(&mut self) -> Vec<ModuleReport> {
        let now = self.report_time();
        self.routes
            .iter_mut()
            .map(|(dest, slot)| {
                let mut body = String::new();
                let title = slot.module.finish(&mut body, now);
                ModuleReport {
                    destination: dest.as_str(),
                    title,
                    body,
                }
            })
            .collect()
    }

    /// 统计报告；统计被禁用或没有经过任何时间时返回 None
    pub fn results(&self) -> Option<ReportNode> {
        self.stats
            .as_ref()?
            .get_results(self.report_time(), &self.live)
    }

    /// 报告所用的结束时间：时间上限结束时为上限，否则为最后处理事件的时间
    pub fn report_time(&self) -> SimTime {
        self.end_time.unwrap_or_else(|| self.queue.current_time())
    }

    pub(crate) fn set_end_time(&mut self, t: SimTime) {
        self.end_time = Some(t.max(self.queue.current_time()));
    }

    pub(crate) fn pop_next_event(&mut self) -> Option<Event> {
        self.queue.pop_next_event()
    }

    pub fn params(&self) -> &SimParams {
        &self.sim_params
    }
    pub fn global_params(&self) -> &ParamMap {
        &self.global
    }
    pub fn queue(&self) -> &EventQueue {
        &self.queue
    }
    pub fn network(&self) -> &Network {
        &self.live
    }
    pub fn initial_network(&self) -> &Network {
        &self.initial
    }
    pub fn statistics(&self) -> Option<&StatisticsAggregator> {
        self.stats.as_ref()
    }
    pub fn last_event(&self) -> Option<EventRecord> {
        self.last_event
    }
    pub fn last_error(&self) -> Option<&SimError> {
        self.last_error.as_ref()
    }
    pub fn is_started(&self) -> bool {
        self.started
    }
    pub fn is_configured(&self) -> bool {
        self.routes.len() == Destination::ALL.len()
    }
}

fn check_capability(module: &dyn SimModule, dest: Destination) -> Result<(), ConfigError> {
    if module.capability().supports(dest) {
        Ok(())
    } else {
        Err(ConfigError::Capability {
            module: module.name().to_string(),
            role: dest.as_str(),
        })
    }
}
