//! 业务需求

use super::id::{DemandId, LayerId, NodeId};
use serde::{Deserialize, Serialize};

/// 端到端业务需求：入口节点 -> 出口节点，提供流量与实际承载流量
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Demand {
    pub id: DemandId,
    pub layer: LayerId,
    pub ingress: NodeId,
    pub egress: NodeId,
    pub offered: f64,
    #[serde(default)]
    pub carried: f64,
}

impl Demand {
    pub fn new(id: DemandId, layer: LayerId, ingress: NodeId, egress: NodeId, offered: f64) -> Self {
        Self {
            id,
            layer,
            ingress,
            egress,
            offered,
            carried: 0.0,
        }
    }

    /// 阻塞流量（未承载部分），不小于 0
    pub fn blocked(&self) -> f64 {
        (self.offered - self.carried).max(0.0)
    }

    /// 超额承载（承载超过提供流量的部分），不小于 0
    pub fn excess_carried(&self) -> f64 {
        (self.carried - self.offered).max(0.0)
    }
}
