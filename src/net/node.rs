//! 节点与层
//!
//! 节点在所有层之间共享；每条链路/业务需求属于某一层。

use super::id::{LayerId, NodeId};
use serde::{Deserialize, Serialize};

/// 网络层
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Layer {
    pub id: LayerId,
    #[serde(default)]
    pub name: String,
}

/// 网络节点
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    pub id: NodeId,
    #[serde(default)]
    pub name: String,
    #[serde(default = "default_up")]
    pub up: bool,
}

pub(crate) fn default_up() -> bool {
    true
}

impl Node {
    pub fn new(id: NodeId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            up: true,
        }
    }
}
