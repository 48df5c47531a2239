//! 网络拓扑管理
//!
//! 定义网络快照：层、节点、链路、业务需求的集合。
//! 删除节点/层时会级联删除依附于它的链路与业务需求。

use std::collections::BTreeMap;

use super::demand::Demand;
use super::id::{DemandId, LayerId, LinkId, NodeId};
use super::link::Link;
use super::node::{Layer, Node};
use crate::error::SimError;
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

/// 拓扑描述（用于场景文件），与 [`Network`] 互相转换
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TopologySpec {
    #[serde(default)]
    pub layers: Vec<Layer>,
    #[serde(default)]
    pub nodes: Vec<Node>,
    #[serde(default)]
    pub links: Vec<Link>,
    #[serde(default)]
    pub demands: Vec<Demand>,
}

/// 网络快照
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Network {
    layers: BTreeMap<LayerId, Layer>,
    nodes: BTreeMap<NodeId, Node>,
    links: BTreeMap<LinkId, Link>,
    demands: BTreeMap<DemandId, Demand>,
    next_id: u64,
}

impl Network {
    /// 从拓扑描述构建网络，校验 id 唯一性与引用完整性
    pub fn from_spec(spec: &TopologySpec) -> Result<Self, SimError> {
        let mut net = Network::default();
        for layer in &spec.layers {
            net.insert_layer(layer.clone())?;
        }
        for node in &spec.nodes {
            net.insert_node(node.clone())?;
        }
        for link in &spec.links {
            net.insert_link(link.clone())?;
        }
        for demand in &spec.demands {
            net.insert_demand(demand.clone())?;
        }
        debug!(
            layers = net.layers.len(),
            nodes = net.nodes.len(),
            links = net.links.len(),
            demands = net.demands.len(),
            "从拓扑描述构建网络"
        );
        Ok(net)
    }

    pub fn to_spec(&self) -> TopologySpec {
        TopologySpec {
            layers: self.layers.values().cloned().collect(),
            nodes: self.nodes.values().cloned().collect(),
            links: self.links.values().cloned().collect(),
            demands: self.demands.values().cloned().collect(),
        }
    }

    fn alloc_id(&mut self) -> u64 {
        let id = self.next_id;
        self.next_id = self.next_id.saturating_add(1);
        id
    }

    fn bump_next_id(&mut self, used: u64) {
        self.next_id = self.next_id.max(used.saturating_add(1));
    }

    /// 添加层
    pub fn add_layer(&mut self, name: impl Into<String>) -> LayerId {
        let id = LayerId(self.alloc_id());
        self.layers.insert(
            id,
            Layer {
                id,
                name: name.into(),
            },
        );
        id
    }

    /// 添加节点
    pub fn add_node(&mut self, name: impl Into<String>) -> NodeId {
        let id = NodeId(self.alloc_id());
        self.nodes.insert(id, Node::new(id, name));
        id
    }

    /// 添加单向链路
    pub fn add_link(
        &mut self,
        layer: LayerId,
        from: NodeId,
        to: NodeId,
        capacity: f64,
    ) -> Result<LinkId, SimError> {
        let id = LinkId(self.next_id);
        self.insert_link(Link::new(id, layer, from, to, capacity))?;
        Ok(id)
    }

    /// 添加业务需求
    pub fn add_demand(
        &mut self,
        layer: LayerId,
        ingress: NodeId,
        egress: NodeId,
        offered: f64,
    ) -> Result<DemandId, SimError> {
        let id = DemandId(self.next_id);
        self.insert_demand(Demand::new(id, layer, ingress, egress, offered))?;
        Ok(id)
    }

    pub fn insert_layer(&mut self, layer: Layer) -> Result<(), SimError> {
        if self.layers.contains_key(&layer.id) {
            return Err(SimError::Scenario(format!("duplicate layer id {}", layer.id.0)));
        }
        self.bump_next_id(layer.id.0);
        self.layers.insert(layer.id, layer);
        Ok(())
    }

    pub fn insert_node(&mut self, node: Node) -> Result<(), SimError> {
        if self.nodes.contains_key(&node.id) {
            return Err(SimError::Scenario(format!("duplicate node id {}", node.id.0)));
        }
        self.bump_next_id(node.id.0);
        self.nodes.insert(node.id, node);
        Ok(())
    }

    pub fn insert_link(&mut self, link: Link) -> Result<(), SimError> {
        if self.links.contains_key(&link.id) {
            return Err(SimError::Scenario(format!("duplicate link id {}", link.id.0)));
        }
        self.check_refs(link.layer, &[link.from, link.to])
            .map_err(|e| SimError::Scenario(format!("link {}: {e}", link.id.0)))?;
        self.bump_next_id(link.id.0);
        self.links.insert(link.id, link);
        Ok(())
    }

    pub fn insert_demand(&mut self, demand: Demand) -> Result<(), SimError> {
        if self.demands.contains_key(&demand.id) {
            return Err(SimError::Scenario(format!("duplicate demand id {}", demand.id.0)));
        }
        self.check_refs(demand.layer, &[demand.ingress, demand.egress])
            .map_err(|e| SimError::Scenario(format!("demand {}: {e}", demand.id.0)))?;
        self.bump_next_id(demand.id.0);
        self.demands.insert(demand.id, demand);
        Ok(())
    }

    fn check_refs(&self, layer: LayerId, nodes: &[NodeId]) -> Result<(), String> {
        if !self.layers.contains_key(&layer) {
            return Err(format!("unknown layer {}", layer.0));
        }
        match nodes.iter().find(|n| !self.nodes.contains_key(n)) {
            Some(n) => Err(format!("unknown node {}", n.0)),
            None => Ok(()),
        }
    }

    /// 删除层，同时删除该层的链路与业务需求
    pub fn remove_layer(&mut self, id: LayerId) -> bool {
        if self.layers.remove(&id).is_none() {
            return false;
        }
        self.links.retain(|_, l| l.layer != id);
        self.demands.retain(|_, d| d.layer != id);
        trace!(layer = id.0, "删除层");
        true
    }

    /// 删除节点，同时删除与之相连的链路与业务需求
    pub fn remove_node(&mut self, id: NodeId) -> bool {
        if self.nodes.remove(&id).is_none() {
            return false;
        }
        self.links.retain(|_, l| l.from != id && l.to != id);
        self.demands.retain(|_, d| d.ingress != id && d.egress != id);
        trace!(node = id.0, "删除节点");
        true
    }

    pub fn remove_link(&mut self, id: LinkId) -> bool {
        self.links.remove(&id).is_some()
    }

    pub fn remove_demand(&mut self, id: DemandId) -> bool {
        self.demands.remove(&id).is_some()
    }

    pub fn layer(&self, id: LayerId) -> Option<&Layer> {
        self.layers.get(&id)
    }
    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(&id)
    }
    pub fn node_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        self.nodes.get_mut(&id)
    }
    pub fn link(&self, id: LinkId) -> Option<&Link> {
        self.links.get(&id)
    }
    pub fn link_mut(&mut self, id: LinkId) -> Option<&mut Link> {
        self.links.get_mut(&id)
    }
    pub fn demand(&self, id: DemandId) -> Option<&Demand> {
        self.demands.get(&id)
    }
    pub fn demand_mut(&mut self, id: DemandId) -> Option<&mut Demand> {
        self.demands.get_mut(&id)
    }

    pub fn has_layer(&self, id: LayerId) -> bool {
        self.layers.contains_key(&id)
    }
    pub fn has_node(&self, id: NodeId) -> bool {
        self.nodes.contains_key(&id)
    }
    pub fn has_link(&self, id: LinkId) -> bool {
        self.links.contains_key(&id)
    }
    pub fn has_demand(&self, id: DemandId) -> bool {
        self.demands.contains_key(&id)
    }

    pub fn layers(&self) -> impl Iterator<Item = &Layer> {
        self.layers.values()
    }
    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.nodes.values()
    }
    pub fn links(&self) -> impl Iterator<Item = &Link> {
        self.links.values()
    }
    pub fn demands(&self) -> impl Iterator<Item = &Demand> {
        self.demands.values()
    }

    pub fn num_layers(&self) -> usize {
        self.layers.len()
    }
    pub fn num_nodes(&self) -> usize {
        self.nodes.len()
    }

    pub fn links_in_layer(&self, layer: LayerId) -> impl Iterator<Item = &Link> {
        self.links.values().filter(move |l| l.layer == layer)
    }

    pub fn demands_in_layer(&self, layer: LayerId) -> impl Iterator<Item = &Demand> {
        self.demands.values().filter(move |d| d.layer == layer)
    }

    pub fn links_in_layer_mut(&mut self, layer: LayerId) -> impl Iterator<Item = &mut Link> {
        self.links.values_mut().filter(move |l| l.layer == layer)
    }

    pub fn incoming_links(&self, node: NodeId, layer: LayerId) -> impl Iterator<Item = &Link> {
        self.links_in_layer(layer).filter(move |l| l.to == node)
    }

    pub fn outgoing_links(&self, node: NodeId, layer: LayerId) -> impl Iterator<Item = &Link> {
        self.links_in_layer(layer).filter(move |l| l.from == node)
    }

    pub fn set_node_up(&mut self, id: NodeId, up: bool) -> bool {
        match self.nodes.get_mut(&id) {
            Some(n) => {
                n.up = up;
                true
            }
            None => false,
        }
    }

    pub fn set_link_up(&mut self, id: LinkId, up: bool) -> bool {
        match self.links.get_mut(&id) {
            Some(l) => {
                l.up = up;
                true
            }
            None => false,
        }
    }

    /// 链路本身及两端节点均为 up 时才可承载流量
    pub fn is_link_usable(&self, id: LinkId) -> bool {
        self.links.get(&id).is_some_and(|l| {
            l.up && self.nodes.get(&l.from).is_some_and(|n| n.up)
                && self.nodes.get(&l.to).is_some_and(|n| n.up)
        })
    }
}
