//! 增量时间加权统计
//!
//! 在每个统计边界（每个事件处理之后）把上一边界处的快照值按经过时长积分进
//! 各实体的累加器，然后重新读取当前网络作为新的基线。
//!
//! 实体从网络中消失时，先把最后一段区间积分进去，再把其最终的可用性折叠进父聚合
//! （层、网络的“最差”指标），随后永久退役：即使之后复用了同一个 id 也不再跟踪。

use super::accum::{Accumulator, Ratio, TimeShare, Worst, floor_noise, ratio};
use super::report::ReportNode;
use super::sample::{DemandSample, LayerSample, LinkSample, NetworkSample, NodeLayerSample};
use crate::net::{DemandId, LayerId, LinkId, Network, NodeId};
use crate::sim::SimTime;
use std::collections::{BTreeMap, BTreeSet};
use tracing::{debug, trace};

#[derive(Debug, Clone, Default)]
struct NetworkAccum {
    num_layers: Accumulator,
    num_nodes: Accumulator,
    // 已退役实体折叠进来的最差值
    worst_demand_classic: Worst,
    worst_demand_weighted: Worst,
    worst_link_availability: Worst,
    worst_node_availability: Worst,
}

#[derive(Debug, Clone, Default)]
struct LayerAccum {
    num_links: Accumulator,
    num_demands: Accumulator,
    offered: Accumulator,
    carried: Accumulator,
    blocked: Accumulator,
    capacity: Accumulator,
    congestion: Accumulator,
    classic: TimeShare,
    weighted: Ratio,
    worst_demand_classic: Worst,
    worst_demand_weighted: Worst,
    worst_link_availability: Worst,
}

impl LayerAccum {
    fn observe(&mut self, s: &LayerSample, dt: f64) {
        self.num_links.observe(s.num_links, dt);
        self.num_demands.observe(s.num_demands, dt);
        self.offered.observe(s.offered, dt);
        self.carried.observe(s.carried, dt);
        self.blocked.observe(s.blocked, dt);
        self.capacity.observe(s.capacity, dt);
        self.congestion.observe(s.congestion, dt);
        self.classic.observe(s.blocked == 0.0, dt);
        self.weighted.observe(s.carried_capped, s.offered, dt);
    }
}

#[derive(Debug, Clone, Default)]
struct NodeAccum {
    up: TimeShare,
}

#[derive(Debug, Clone, Default)]
struct NodeLayerAccum {
    in_degree: Accumulator,
    out_degree: Accumulator,
    ingress: Accumulator,
    egress: Accumulator,
}

impl NodeLayerAccum {
    fn observe(&mut self, s: &NodeLayerSample, dt: f64) {
        self.in_degree.observe(s.in_degree, dt);
        self.out_degree.observe(s.out_degree, dt);
        self.ingress.observe(s.ingress_traffic, dt);
        self.egress.observe(s.egress_traffic, dt);
    }
}

#[derive(Debug, Clone)]
struct LinkAccum {
    layer: LayerId,
    from: NodeId,
    to: NodeId,
    length: Accumulator,
    capacity: Accumulator,
    occupied: Accumulator,
    utilization: Accumulator,
    oversubscribed: Accumulator,
    oversubscribed_time: f64,
    up: TimeShare,
}

impl LinkAccum {
    fn new(s: &LinkSample) -> Self {
        Self {
            layer: s.layer,
            from: s.from,
            to: s.to,
            length: Accumulator::default(),
            capacity: Accumulator::default(),
            occupied: Accumulator::default(),
            utilization: Accumulator::default(),
            oversubscribed: Accumulator::default(),
            oversubscribed_time: 0.0,
            up: TimeShare::default(),
        }
    }

    fn observe(&mut self, s: &LinkSample, dt: f64) {
        self.length.observe(s.length, dt);
        self.capacity.observe(s.capacity, dt);
        self.occupied.observe(s.occupied, dt);
        self.utilization.observe(s.utilization, dt);
        self.oversubscribed.observe(s.oversubscribed, dt);
        if s.oversubscribed > 0.0 {
            self.oversubscribed_time += dt;
        }
        self.up.observe(s.up, dt);
    }
}

#[derive(Debug, Clone)]
struct DemandAccum {
    layer: LayerId,
    ingress: NodeId,
    egress: NodeId,
    offered: Accumulator,
    carried: Accumulator,
    blocked: Accumulator,
    excess: Accumulator,
    classic: TimeShare,
    weighted: Ratio,
}

impl DemandAccum {
    fn new(s: &DemandSample) -> Self {
        Self {
            layer: s.layer,
            ingress: s.ingress,
            egress: s.egress,
            offered: Accumulator::default(),
            carried: Accumulator::default(),
            blocked: Accumulator::default(),
            excess: Accumulator::default(),
            classic: TimeShare::default(),
            weighted: Ratio::default(),
        }
    }

    fn observe(&mut self, s: &DemandSample, dt: f64) {
        self.offered.observe(s.offered, dt);
        self.carried.observe(s.carried, dt);
        self.blocked.observe(s.blocked, dt);
        self.excess.observe(s.excess, dt);
        self.classic.observe(s.blocked == 0.0, dt);
        self.weighted.observe(s.carried_capped(), s.offered, dt);
    }
}

/// 已退役实体的 id；这些 id 不会再被跟踪
#[derive(Debug, Clone, Default)]
struct Retired {
    layers: BTreeSet<LayerId>,
    nodes: BTreeSet<NodeId>,
    node_layers: BTreeSet<(NodeId, LayerId)>,
    links: BTreeSet<LinkId>,
    demands: BTreeSet<DemandId>,
}

/// 统计聚合器
#[derive(Debug, Clone)]
pub struct StatisticsAggregator {
    precision: f64,
    baseline: NetworkSample,
    last_boundary: SimTime,
    transitory_boundary: SimTime,
    network: NetworkAccum,
    layers: BTreeMap<LayerId, LayerAccum>,
    nodes: BTreeMap<NodeId, NodeAccum>,
    node_layers: BTreeMap<(NodeId, LayerId), NodeLayerAccum>,
    links: BTreeMap<LinkId, LinkAccum>,
    demands: BTreeMap<DemandId, DemandAccum>,
    retired: Retired,
}

impl StatisticsAggregator {
    /// 以 `start` 时刻的网络为基线创建
    pub fn new(start: SimTime, net: &Network, precision: f64) -> Self {
        Self {
            precision,
            baseline: NetworkSample::capture(net, precision),
            last_boundary: start,
            transitory_boundary: start,
            network: NetworkAccum::default(),
            layers: BTreeMap::new(),
            nodes: BTreeMap::new(),
            node_layers: BTreeMap::new(),
            links: BTreeMap::new(),
            demands: BTreeMap::new(),
            retired: Retired::default(),
        }
    }

    pub fn last_boundary(&self) -> SimTime {
        self.last_boundary
    }

    pub fn transitory_boundary(&self) -> SimTime {
        self.transitory_boundary
    }

    pub fn precision(&self) -> f64 {
        self.precision
    }

    /// 丢弃所有累计值，以 `time` 时刻的网络为新基线
    pub fn reset(&mut self, time: SimTime, net: &Network) {
        debug!(at = ?time, "统计重置");
        *self = Self::new(time, net, self.precision);
    }

    /// 推进到 `now`：把上一段区间按基线值积分，再以当前网络作为新基线
    #[tracing::instrument(level = "trace", skip(self, net), fields(last = ?self.last_boundary))]
    pub fn compute_next_state(&mut self, now: SimTime, net: &Network) {
        let dt = now.since(self.last_boundary);
        self.integrate(dt, net);
        self.baseline = NetworkSample::capture(net, self.precision);
        self.last_boundary = self.last_boundary.max(now);
    }

    fn integrate(&mut self, dt: f64, net: &Network) {
        let base = std::mem::take(&mut self.baseline);

        self.network.num_layers.observe(base.num_layers, dt);
        self.network.num_nodes.observe(base.num_nodes, dt);

        // 先处理业务与链路，使其退役时能折叠进所属层
        for (&id, s) in &base.demands {
            if self.retired.demands.contains(&id) {
                continue;
            }
            if dt > 0.0 {
                self.demands
                    .entry(id)
                    .or_insert_with(|| DemandAccum::new(s))
                    .observe(s, dt);
            }
            if !net.has_demand(id) {
                self.retire_demand(id);
            }
        }

        for (&id, s) in &base.links {
            if self.retired.links.contains(&id) {
                continue;
            }
            if dt > 0.0 {
                self.links
                    .entry(id)
                    .or_insert_with(|| LinkAccum::new(s))
                    .observe(s, dt);
            }
            if !net.has_link(id) {
                self.retire_link(id);
            }
        }

        for (&key, s) in &base.node_layers {
            if self.retired.node_layers.contains(&key) {
                continue;
            }
            if dt > 0.0 {
                self.node_layers.entry(key).or_default().observe(s, dt);
            }
            let (node, layer) = key;
            if !net.has_node(node) || !net.has_layer(layer) {
                self.node_layers.remove(&key);
                self.retired.node_layers.insert(key);
            }
        }

        for (&id, s) in &base.nodes {
            if self.retired.nodes.contains(&id) {
                continue;
            }
            if dt > 0.0 {
                self.nodes.entry(id).or_default().up.observe(s.up, dt);
            }
            if !net.has_node(id) {
                self.retire_node(id);
            }
        }

        for (&id, s) in &base.layers {
            if self.retired.layers.contains(&id) {
                continue;
            }
            if dt > 0.0 {
                self.layers.entry(id).or_default().observe(s, dt);
            }
            if !net.has_layer(id) {
                self.layers.remove(&id);
                self.retired.layers.insert(id);
                debug!(layer = id.0, "层已删除，统计退役");
            }
        }

        self.baseline = base;
    }

    fn retire_demand(&mut self, id: DemandId) {
        self.retired.demands.insert(id);
        let Some(acc) = self.demands.remove(&id) else {
            return;
        };
        if acc.classic.total <= 0.0 {
            return;
        }
        let (classic, weighted) = (acc.classic.fraction(), acc.weighted.value());
        trace!(demand = id.0, classic, weighted, "业务已删除，折叠可用性");
        self.network.worst_demand_classic.fold(classic);
        self.network.worst_demand_weighted.fold(weighted);
        if !self.retired.layers.contains(&acc.layer) {
            let layer = self.layers.entry(acc.layer).or_default();
            layer.worst_demand_classic.fold(classic);
            layer.worst_demand_weighted.fold(weighted);
        }
    }

    fn retire_link(&mut self, id: LinkId) {
        self.retired.links.insert(id);
        let Some(acc) = self.links.remove(&id) else {
            return;
        };
        if acc.up.total <= 0.0 {
            return;
        }
        let availability = acc.up.fraction();
        trace!(link = id.0, availability, "链路已删除，折叠可用性");
        self.network.worst_link_availability.fold(availability);
        if !self.retired.layers.contains(&acc.layer) {
            self.layers
                .entry(acc.layer)
                .or_default()
                .worst_link_availability
                .fold(availability);
        }
    }

    fn retire_node(&mut self, id: NodeId) {
        self.retired.nodes.insert(id);
        match self.nodes.remove(&id) {
            Some(acc) if acc.up.total > 0.0 => {
                self.network.worst_node_availability.fold(acc.up.fraction());
            }
            _ => {}
        }
    }

    /// 生成只读报告：在副本上推进到 `time`，不修改持久累加器。
    /// 过渡期结束（或重置）后没有经过任何时间时返回 None。
    pub fn get_results(&self, time: SimTime, net: &Network) -> Option<ReportNode> {
        let measured = time.since(self.transitory_boundary);
        if measured <= 0.0 {
            return None;
        }
        let mut scratch = self.clone();
        scratch.compute_next_state(time, net);
        Some(scratch.build_report(measured, net))
    }

    fn build_report(&self, measured: f64, net: &Network) -> ReportNode {
        let p = self.precision;
        let mut root = ReportNode::new("network");
        root.set_num("measuredTime", measured)
            .set_num("transitoryEndTime", self.transitory_boundary.0);
        put_stats(&mut root, "NumLayers", &self.network.num_layers);
        put_stats(&mut root, "NumNodes", &self.network.num_nodes);

        let mut net_worst_classic = self.network.worst_demand_classic;
        let mut net_worst_weighted = self.network.worst_demand_weighted;
        let mut net_worst_link = self.network.worst_link_availability;
        let mut net_worst_node = self.network.worst_node_availability;
        for n in self.nodes.values().filter(|n| n.up.total > 0.0) {
            net_worst_node.fold(n.up.fraction());
        }

        for (&layer_id, la) in &self.layers {
            let mut layer = ReportNode::new("layer");
            layer.set("id", layer_id.0).set(
                "name",
                net.layer(layer_id).map(|l| l.name.clone()).unwrap_or_default(),
            );
            put_stats(&mut layer, "NumLinks", &la.num_links);
            put_stats(&mut layer, "NumDemands", &la.num_demands);
            put_stats(&mut layer, "TotalOfferedTraffic", &la.offered);
            put_stats(&mut layer, "TotalCarriedTraffic", &la.carried);
            put_stats_floored(&mut layer, "TotalBlockedTraffic", &la.blocked, p);
            put_stats(&mut layer, "TotalCapacity", &la.capacity);
            put_stats_floored(&mut layer, "Congestion", &la.congestion, p);
            layer
                .set_num("availabilityClassic", la.classic.fraction())
                .set_num("availabilityWeighted", la.weighted.value());

            let mut worst_classic = la.worst_demand_classic;
            let mut worst_weighted = la.worst_demand_weighted;
            let mut worst_link = la.worst_link_availability;

            for (&(node_id, _), nl) in self.node_layers.iter().filter(|((_, l), _)| *l == layer_id) {
                let mut node = ReportNode::new("node");
                node.set("id", node_id.0).set(
                    "name",
                    net.node(node_id).map(|n| n.name.clone()).unwrap_or_default(),
                );
                let up = self.nodes.get(&node_id).map(|n| n.up.fraction()).unwrap_or(0.0);
                node.set_num("availability", up)
                    .set_num("upTimePercentage", 100.0 * up);
                put_stats(&mut node, "InDegree", &nl.in_degree);
                put_stats(&mut node, "OutDegree", &nl.out_degree);
                put_stats(&mut node, "IngressTraffic", &nl.ingress);
                put_stats(&mut node, "EgressTraffic", &nl.egress);
                layer.push(node);
            }

            for (&link_id, ka) in self.links.iter().filter(|(_, k)| k.layer == layer_id) {
                let mut link = ReportNode::new("link");
                link.set("id", link_id.0)
                    .set("originNodeId", ka.from.0)
                    .set("destinationNodeId", ka.to.0);
                put_stats(&mut link, "Length", &ka.length);
                put_stats(&mut link, "Capacity", &ka.capacity);
                put_stats(&mut link, "OccupiedCapacity", &ka.occupied);
                put_stats_floored(&mut link, "Utilization", &ka.utilization, p);
                put_stats_floored(&mut link, "OversubscribedCapacity", &ka.oversubscribed, p);
                let observed = ka.utilization.time;
                let availability = ka.up.fraction();
                link.set_num("oversubscribedTime", ka.oversubscribed_time)
                    .set_num(
                        "oversubscribedTimePercentage",
                        100.0 * ratio(ka.oversubscribed_time, observed),
                    )
                    .set_num("availability", availability)
                    .set_num("upTimePercentage", 100.0 * availability);
                if ka.up.total > 0.0 {
                    worst_link.fold(availability);
                    net_worst_link.fold(availability);
                }
                layer.push(link);
            }

            for (&demand_id, da) in self.demands.iter().filter(|(_, d)| d.layer == layer_id) {
                let mut demand = ReportNode::new("demand");
                demand
                    .set("id", demand_id.0)
                    .set("ingressNodeId", da.ingress.0)
                    .set("egressNodeId", da.egress.0);
                put_stats(&mut demand, "OfferedTraffic", &da.offered);
                put_stats(&mut demand, "CarriedTraffic", &da.carried);
                put_stats_floored(&mut demand, "BlockedTraffic", &da.blocked, p);
                put_stats_floored(&mut demand, "ExcessCarriedTraffic", &da.excess, p);
                let (classic, weighted) = (da.classic.fraction(), da.weighted.value());
                demand
                    .set_num("availabilityClassic", classic)
                    .set_num("availabilityWeighted", weighted);
                if da.classic.total > 0.0 {
                    worst_classic.fold(classic);
                    worst_weighted.fold(weighted);
                    net_worst_classic.fold(classic);
                    net_worst_weighted.fold(weighted);
                }
                layer.push(demand);
            }

            layer
                .set_num("worstDemandAvailabilityClassic", worst_classic.value_or_zero())
                .set_num("worstDemandAvailabilityWeighted", worst_weighted.value_or_zero())
                .set_num("worstLinkAvailability", worst_link.value_or_zero());
            root.push(layer);
        }

        root.set_num("worstDemandAvailabilityClassic", net_worst_classic.value_or_zero())
            .set_num("worstDemandAvailabilityWeighted", net_worst_weighted.value_or_zero())
            .set_num("worstLinkAvailability", net_worst_link.value_or_zero())
            .set_num("worstNodeAvailability", net_worst_node.value_or_zero());
        root
    }
}

/// 写入 `avg{name}` / `min{name}` / `max{name}`
fn put_stats(node: &mut ReportNode, name: &str, acc: &Accumulator) {
    node.set_num(format!("avg{name}"), acc.avg())
        .set_num(format!("min{name}"), acc.min_or_zero())
        .set_num(format!("max{name}"), acc.max_or_zero());
}

/// 同 [`put_stats`]，但精度因子以内的噪声记为 0
fn put_stats_floored(node: &mut ReportNode, name: &str, acc: &Accumulator, precision: f64) {
    node.set_num(format!("avg{name}"), floor_noise(acc.avg(), precision))
        .set_num(format!("min{name}"), floor_noise(acc.min_or_zero(), precision))
        .set_num(format!("max{name}"), floor_noise(acc.max_or_zero(), precision));
}
