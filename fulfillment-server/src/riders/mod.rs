//! 骑手模块
//!
//! 骑手状态 (offline / online / busy)、定位上报，以及按距离选择最近的在线骑手。

pub mod geo;
pub mod service;
