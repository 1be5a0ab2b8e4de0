//! Wire representation of flowcharts

mod dto;

pub use dto::{FlowChartDto, NodeDto};
