//! 最少跳数路由处理器
//!
//! 应用 [`NetAction`] 后重新路由全部业务：在可用（链路及两端节点均 up）的链路上
//! 做 BFS；可达的业务承载全部提供流量，不可达的承载 0。
//! 链路占用量 = 经过该链路的承载流量之和（不考虑容量，超额部分由统计记为超额占用）。

use crate::error::SimError;
use crate::net::{DemandId, LayerId, LinkId, NetAction, Network, NodeId};
use crate::sim::{Capability, Event, ModuleContext, ParamMap, SimModule, SimParams, SimTime};
use std::collections::{BTreeMap, VecDeque};
use std::fmt::Write as _;
use tracing::{debug, trace};

#[derive(Debug, Default)]
pub struct ShortestPathProcessor {
    actions: u64,
    reroutes: u64,
    /// 最近一次路由中不可达的业务数
    unroutable: usize,
}

impl ShortestPathProcessor {
    /// 在 `layer` 上找 `from` 到 `to` 的最少跳数路径（链路序列）
    fn shortest_path(net: &Network, layer: LayerId, from: NodeId, to: NodeId) -> Option<Vec<LinkId>> {
        let node_up = |n: NodeId| net.node(n).is_some_and(|n| n.up);
        if !node_up(from) || !node_up(to) {
            return None;
        }
        if from == to {
            return Some(Vec::new());
        }

        let mut adj: BTreeMap<NodeId, Vec<(LinkId, NodeId)>> = BTreeMap::new();
        for link in net.links_in_layer(layer).filter(|l| net.is_link_usable(l.id)) {
            adj.entry(link.from).or_default().push((link.id, link.to));
        }

        let mut prev: BTreeMap<NodeId, (LinkId, NodeId)> = BTreeMap::new();
        let mut queue = VecDeque::from([from]);
        while let Some(n) = queue.pop_front() {
            if n == to {
                break;
            }
            for &(link, next) in adj.get(&n).map(Vec::as_slice).unwrap_or(&[]) {
                if next == from || prev.contains_key(&next) {
                    continue;
                }
                prev.insert(next, (link, n));
                queue.push_back(next);
            }
        }

        let mut path = Vec::new();
        let mut cur = to;
        while cur != from {
            let &(link, p) = prev.get(&cur)?;
            path.push(link);
            cur = p;
        }
        path.reverse();
        Some(path)
    }

    /// 重新路由所有层的业务并重算链路占用
    pub fn reroute(&mut self, net: &mut Network) {
        let layers: Vec<LayerId> = net.layers().map(|l| l.id).collect();
        let mut unroutable = 0;
        for layer in layers {
            let plans: Vec<(DemandId, f64, Option<Vec<LinkId>>)> = net
                .demands_in_layer(layer)
                .map(|d| {
                    (
                        d.id,
                        d.offered,
                        Self::shortest_path(net, layer, d.ingress, d.egress),
                    )
                })
                .collect();

            for link in net.links_in_layer_mut(layer) {
                link.occupied = 0.0;
            }
            for (demand_id, offered, path) in plans {
                let carried = match &path {
                    Some(links) => {
                        for id in links {
                            if let Some(link) = net.link_mut(*id) {
                                link.occupied += offered;
                            }
                        }
                        offered
                    }
                    None => {
                        unroutable += 1;
                        0.0
                    }
                };
                if let Some(d) = net.demand_mut(demand_id) {
                    d.carried = carried;
                }
            }
        }
        self.reroutes += 1;
        self.unroutable = unroutable;
        trace!(unroutable, "重新路由完成");
    }
}

impl SimModule for ShortestPathProcessor {
    fn name(&self) -> &str {
        "shortest_path"
    }

    fn capability(&self) -> Capability {
        Capability::Processor
    }

    fn initialize(
        &mut self,
        _ctx: &mut ModuleContext<'_>,
        net: &mut Network,
        _own: &ParamMap,
        _sim: &SimParams,
        _global: &ParamMap,
    ) -> Result<(), SimError> {
        *self = Self::default();
        self.reroute(net);
        debug!(unroutable = self.unroutable, "初始路由完成");
        Ok(())
    }

    fn process_event(
        &mut self,
        _ctx: &mut ModuleContext<'_>,
        net: &mut Network,
        event: &Event,
    ) -> Result<(), SimError> {
        let Some(action) = event.payload::<NetAction>() else {
            trace!("忽略非网络变更事件");
            return Ok(());
        };
        action
            .apply(net)
            .map_err(|e| SimError::module(self.name(), e.to_string()))?;
        self.actions += 1;
        self.reroute(net);
        Ok(())
    }

    fn finish(&mut self, out: &mut String, _now: SimTime) -> String {
        let _ = writeln!(out, "actions applied: {}", self.actions);
        let _ = writeln!(out, "reroutes: {}", self.reroutes);
        let _ = writeln!(out, "unroutable demands at end: {}", self.unroutable);
        "Shortest-path event processor".to_string()
    }
}
