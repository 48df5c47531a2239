//! 上一统计边界处的网络快照
//!
//! 记录每个被跟踪实体的 id 与瞬时指标值。它描述的是“刚刚过去的这段时间内”
//! 网络的样子，而不是事件发生之后的样子。

use super::accum::floor_noise;
use crate::net::{DemandId, LayerId, LinkId, Network, NodeId};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct LayerSample {
    pub num_links: f64,
    pub num_demands: f64,
    pub offered: f64,
    pub carried: f64,
    /// 各业务 min(承载, 提供) 之和，用于加权可用性
    pub carried_capped: f64,
    pub blocked: f64,
    pub capacity: f64,
    /// 层内最大链路利用率
    pub congestion: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NodeSample {
    pub up: bool,
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct NodeLayerSample {
    pub in_degree: f64,
    pub out_degree: f64,
    pub ingress_traffic: f64,
    pub egress_traffic: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LinkSample {
    pub layer: LayerId,
    pub from: NodeId,
    pub to: NodeId,
    pub length: f64,
    pub capacity: f64,
    pub occupied: f64,
    pub utilization: f64,
    pub oversubscribed: f64,
    pub up: bool,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DemandSample {
    pub layer: LayerId,
    pub ingress: NodeId,
    pub egress: NodeId,
    pub offered: f64,
    pub carried: f64,
    pub blocked: f64,
    pub excess: f64,
}

impl DemandSample {
    /// 计入加权可用性的承载量
    pub fn carried_capped(&self) -> f64 {
        self.carried.min(self.offered)
    }
}

/// 整个网络在某一时刻的指标快照
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NetworkSample {
    pub num_layers: f64,
    pub num_nodes: f64,
    pub layers: BTreeMap<LayerId, LayerSample>,
    pub nodes: BTreeMap<NodeId, NodeSample>,
    pub node_layers: BTreeMap<(NodeId, LayerId), NodeLayerSample>,
    pub links: BTreeMap<LinkId, LinkSample>,
    pub demands: BTreeMap<DemandId, DemandSample>,
}

impl NetworkSample {
    /// 读取当前网络，生成快照。阻塞/超额等量在精度因子以内记为 0。
    pub fn capture(net: &Network, precision: f64) -> Self {
        let mut sample = NetworkSample {
            num_layers: net.num_layers() as f64,
            num_nodes: net.num_nodes() as f64,
            ..Default::default()
        };

        for layer in net.layers() {
            sample.layers.insert(layer.id, LayerSample::default());
            for node in net.nodes() {
                sample
                    .node_layers
                    .insert((node.id, layer.id), NodeLayerSample::default());
            }
        }
        for node in net.nodes() {
            sample.nodes.insert(node.id, NodeSample { up: node.up });
        }

        for link in net.links() {
            let s = LinkSample {
                layer: link.layer,
                from: link.from,
                to: link.to,
                length: link.length_km,
                capacity: link.capacity,
                occupied: link.occupied,
                utilization: floor_noise(link.utilization(), precision),
                oversubscribed: floor_noise(link.oversubscribed(), precision),
                up: link.up,
            };
            if let Some(l) = sample.layers.get_mut(&link.layer) {
                l.num_links += 1.0;
                l.capacity += s.capacity;
                l.congestion = l.congestion.max(s.utilization);
            }
            if let Some(nl) = sample.node_layers.get_mut(&(link.from, link.layer)) {
                nl.out_degree += 1.0;
            }
            if let Some(nl) = sample.node_layers.get_mut(&(link.to, link.layer)) {
                nl.in_degree += 1.0;
            }
            sample.links.insert(link.id, s);
        }

        for demand in net.demands() {
            let s = DemandSample {
                layer: demand.layer,
                ingress: demand.ingress,
                egress: demand.egress,
                offered: demand.offered,
                carried: demand.carried,
                blocked: floor_noise(demand.blocked(), precision),
                excess: floor_noise(demand.excess_carried(), precision),
            };
            if let Some(l) = sample.layers.get_mut(&demand.layer) {
                l.num_demands += 1.0;
                l.offered += s.offered;
                l.carried += s.carried;
                l.carried_capped += s.carried_capped();
                l.blocked += s.blocked;
            }
            if let Some(nl) = sample.node_layers.get_mut(&(demand.ingress, demand.layer)) {
                nl.ingress_traffic += s.offered;
            }
            if let Some(nl) = sample.node_layers.get_mut(&(demand.egress, demand.layer)) {
                nl.egress_traffic += s.offered;
            }
            sample.demands.insert(demand.id, s);
        }

        for l in sample.layers.values_mut() {
            l.blocked = floor_noise(l.blocked, precision);
        }
        sample
    }
}
