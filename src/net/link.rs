//! 链路类型
//!
//! 定义单向链路及其容量/占用量相关的派生量。

use super::id::{LayerId, LinkId, NodeId};
use super::node::default_up;
use serde::{Deserialize, Serialize};

/// 单向链路
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Link {
    pub id: LinkId,
    pub layer: LayerId,
    pub from: NodeId,
    pub to: NodeId,
    /// 链路长度（km）
    #[serde(default)]
    pub length_km: f64,
    /// 标称容量
    pub capacity: f64,
    /// 已占用容量（由事件处理模块维护）
    #[serde(default)]
    pub occupied: f64,
    #[serde(default = "default_up")]
    pub up: bool,
}

impl Link {
    pub fn new(id: LinkId, layer: LayerId, from: NodeId, to: NodeId, capacity: f64) -> Self {
        Self {
            id,
            layer,
            from,
            to,
            length_km: 0.0,
            capacity,
            occupied: 0.0,
            up: true,
        }
    }

    /// 利用率 = 占用 / 容量；容量为 0 时记为 0
    pub fn utilization(&self) -> f64 {
        if self.capacity > 0.0 {
            self.occupied / self.capacity
        } else {
            0.0
        }
    }

    /// 超额占用量（占用超过容量的部分），不小于 0
    pub fn oversubscribed(&self) -> f64 {
        (self.occupied - self.capacity).max(0.0)
    }
}
