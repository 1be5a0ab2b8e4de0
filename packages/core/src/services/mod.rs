//! Business Services
//!
//! - `FlowChartService` - edit (store-or-update) and fetch of flowcharts

mod error;
mod flowchart_service;


pub use error::FlowChartServiceError;
pub use flowchart_service::{FlowChartService, StoreOutcome, DEFAULT_OPERATION_TIMEOUT};
