//! 统计模块
//!
//! 对成员随时间变化的网络实体（网络、层、节点、链路、业务）做增量的时间加权统计。

mod accum;
mod aggregator;
mod report;
mod sample;

pub use accum::{Accumulator, Ratio, TimeShare, Worst, floor_noise, ratio};
pub use aggregator::StatisticsAggregator;
pub use report::ReportNode;
pub use sample::{
    DemandSample, LayerSample, LinkSample, NetworkSample, NodeLayerSample, NodeSample,
};
