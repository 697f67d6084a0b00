//! 与存储无关的核心算法

pub mod audit;
pub mod distribution;
pub mod draw;
pub mod stats;
pub mod status;
