//! 网络快照模块
//!
//! 此模块包含被仿真的网络设计：层、节点、链路、业务需求，以及作用于它们的变更动作。

// 子模块声明
mod action;
mod demand;
mod id;
mod link;
mod network;
mod node;

// 重新导出公共接口
pub use action::NetAction;
pub use demand::Demand;
pub use id::{DemandId, LayerId, LinkId, NodeId};
pub use link::Link;
pub use network::{Network, TopologySpec};
pub use node::{Layer, Node};
