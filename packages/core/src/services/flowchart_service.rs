//! Flowchart Service
//!
//! Orchestrates the edit and read paths:
//!
//! - **Edit**: wire DTO → tree builder → store-or-update by key
//! - **Fetch**: stored rows → derived edges → tree builder → `FlowChart`
//!
//! Every call derives a fresh [`Deadline`] from the configured operation
//! timeout and hands it to the store.

use crate::db::{Deadline, FlowChartStore};
use crate::models::{FlowChart, Payload};
use crate::services::error::FlowChartServiceError;
use crate::transport::FlowChartDto;
use std::sync::Arc;
use std::time::Duration;
use tracing::instrument;

/// Default time budget for one store operation
pub const DEFAULT_OPERATION_TIMEOUT: Duration = Duration::from_secs(5);

/// What an edit did to the store
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreOutcome {
    Created { id: String },
    Updated { id: String },
}

impl StoreOutcome {
    pub fn id(&self) -> &str {
        match self {
            Self::Created { id } | Self::Updated { id } => id,
        }
    }
}

/// Flowchart edit/read service over any [`FlowChartStore`]
///
/// # Examples
///
/// ```no_run
/// use flowchart_core::db::{DatabaseService, TursoFlowChartStore};
/// use flowchart_core::models::UnstructuredData;
/// use flowchart_core::services::FlowChartService;
/// use std::path::PathBuf;
/// use std::sync::Arc;
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let db = Arc::new(DatabaseService::new(PathBuf::from("./data/flowchart.db")).await?);
///     let service: FlowChartService<UnstructuredData> =
///         FlowChartService::new(Arc::new(TursoFlowChartStore::new(db)));
///
///     let chart = service.fetch("onboarding").await?;
///     println!("{}", chart.tree());
///     Ok(())
/// }
/// ```
pub struct FlowChartService<D: Payload> {
    store: Arc<dyn FlowChartStore<D>>,
    operation_timeout: Duration,
}

impl<D: Payload> Clone for FlowChartService<D> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            operation_timeout: self.operation_timeout,
        }
    }
}

impl<D: Payload> FlowChartService<D> {
    pub fn new(store: Arc<dyn FlowChartStore<D>>) -> Self {
        Self {
            store,
            operation_timeout: DEFAULT_OPERATION_TIMEOUT,
        }
    }

    pub fn with_operation_timeout(mut self, timeout: Duration) -> Self {
        self.operation_timeout = timeout;
        self
    }

    pub fn operation_timeout(&self) -> Duration {
        self.operation_timeout
    }

    /// Validate a submitted flowchart and persist it
    ///
    /// The tree is built before any storage access, so a malformed node/edge
    /// list never touches the store.
    #[instrument(skip(self, dto, parse), fields(key = %dto.key))]
    pub async fn edit<R, F>(
        &self,
        dto: FlowChartDto<R>,
        parse: F,
    ) -> Result<StoreOutcome, FlowChartServiceError>
    where
        F: FnMut(R) -> D,
    {
        let chart = dto.into_domain(parse)?;
        self.store_or_update(&chart).await
    }

    /// Insert the flowchart if its key is new, otherwise replace the stored one
    #[instrument(skip(self, chart), fields(key = %chart.key, nodes = chart.node_count()))]
    pub async fn store_or_update(
        &self,
        chart: &FlowChart<D>,
    ) -> Result<StoreOutcome, FlowChartServiceError> {
        let deadline = Deadline::after(self.operation_timeout);
        tracing::trace!(tree = %chart.tree(), "Persisting flowchart");

        let outcome = if self.store.flowchart_exists(&deadline, &chart.key).await? {
            StoreOutcome::Updated {
                id: self.store.update_flowchart(&deadline, chart).await?,
            }
        } else {
            StoreOutcome::Created {
                id: self.store.store_flowchart(&deadline, chart).await?,
            }
        };

        tracing::info!(id = outcome.id(), ?outcome, "Flowchart saved");
        Ok(outcome)
    }

    /// Read a flowchart by key and rebuild its tree
    #[instrument(skip(self))]
    pub async fn fetch(&self, key: &str) -> Result<FlowChart<D>, FlowChartServiceError> {
        let deadline = Deadline::after(self.operation_timeout);

        let record = self
            .store
            .fetch_flowchart(&deadline, key)
            .await?
            .ok_or_else(|| FlowChartServiceError::not_found(key))?;

        let chart = record
            .into_flowchart()
            .map_err(|e| FlowChartServiceError::corrupted(key, e))?;
        tracing::debug!(nodes = chart.node_count(), "Fetched flowchart");
        Ok(chart)
    }
}
