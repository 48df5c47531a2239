//! 网络变更动作
//!
//! 作为事件负载在生成器与处理器之间传递，描述一次对网络的修改。

use super::id::{DemandId, LayerId, LinkId, NodeId};
use super::network::Network;
use crate::error::SimError;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum NetAction {
    SetOfferedTraffic { demand: DemandId, traffic: f64 },
    FailNode { node: NodeId },
    RepairNode { node: NodeId },
    FailLink { link: LinkId },
    RepairLink { link: LinkId },
    SetCapacity { link: LinkId, capacity: f64 },
    AddDemand {
        layer: LayerId,
        ingress: NodeId,
        egress: NodeId,
        offered: f64,
    },
    RemoveDemand { demand: DemandId },
    RemoveLink { link: LinkId },
    RemoveNode { node: NodeId },
}

impl NetAction {
    pub fn kind(&self) -> &'static str {
        match self {
            NetAction::SetOfferedTraffic { .. } => "set_offered_traffic",
            NetAction::FailNode { .. } => "fail_node",
            NetAction::RepairNode { .. } => "repair_node",
            NetAction::FailLink { .. } => "fail_link",
            NetAction::RepairLink { .. } => "repair_link",
            NetAction::SetCapacity { .. } => "set_capacity",
            NetAction::AddDemand { .. } => "add_demand",
            NetAction::RemoveDemand { .. } => "remove_demand",
            NetAction::RemoveLink { .. } => "remove_link",
            NetAction::RemoveNode { .. } => "remove_node",
        }
    }

    /// 把动作应用到网络上。引用不存在的实体视为错误。
    pub fn apply(&self, net: &mut Network) -> Result<(), SimError> {
        let missing = |what: &str, id: u64| SimError::Scenario(format!("{what} {id} does not exist"));
        match *self {
            NetAction::SetOfferedTraffic { demand, traffic } => {
                check_traffic(traffic)?;
                let d = net.demand_mut(demand).ok_or_else(|| missing("demand", demand.0))?;
                d.offered = traffic;
            }
            NetAction::FailNode { node } | NetAction::RepairNode { node } => {
                let up = matches!(self, NetAction::RepairNode { .. });
                if !net.set_node_up(node, up) {
                    return Err(missing("node", node.0));
                }
            }
            NetAction::FailLink { link } | NetAction::RepairLink { link } => {
                let up = matches!(self, NetAction::RepairLink { .. });
                if !net.set_link_up(link, up) {
                    return Err(missing("link", link.0));
                }
            }
            NetAction::SetCapacity { link, capacity } => {
                let l = net.link_mut(link).ok_or_else(|| missing("link", link.0))?;
                l.capacity = capacity.max(0.0);
            }
            NetAction::AddDemand {
                layer,
                ingress,
                egress,
                offered,
            } => {
                check_traffic(offered)?;
                net.add_demand(layer, ingress, egress, offered)?;
            }
            NetAction::RemoveDemand { demand } => {
                if !net.remove_demand(demand) {
                    return Err(missing("demand", demand.0));
                }
            }
            NetAction::RemoveLink { link } => {
                if !net.remove_link(link) {
                    return Err(missing("link", link.0));
                }
            }
            NetAction::RemoveNode { node } => {
                if !net.remove_node(node) {
                    return Err(missing("node", node.0));
                }
            }
        }
        Ok(())
    }
}

/// 提供流量必须是有限的非负数
fn check_traffic(traffic: f64) -> Result<(), SimError> {
    if traffic >= 0.0 && traffic.is_finite() {
        Ok(())
    } else {
        Err(SimError::Scenario(format!("invalid offered traffic {traffic}")))
    }
}
