//! TursoFlowChartStore - FlowChartStore Implementation for libsql
//!
//! Writes use a transactional replace:
//!
//! ```text
//! BEGIN
//!   INSERT flowchart            (store)   | UPDATE flowchart WHERE key (update)
//!                                         | DELETE node WHERE flowchart_id
//!   INSERT node × N             (pre-order)
//! COMMIT                        (ROLLBACK on the first failure or expired deadline)
//! ```
//!
//! Payloads and geometry are serialized to JSON before `BEGIN`, so a payload
//! that cannot be encoded never opens a transaction.

use crate::db::deadline::Deadline;
use crate::db::error::DatabaseError;
use crate::db::flowchart_store::{FlowChartRecord, FlowChartStore, NodeRecord};
use crate::db::DatabaseService;
use crate::models::{FlowChart, Payload, Position, TreeNode};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDateTime, Utc};
use libsql::{Connection, Row, Value};
use std::future::Future;
use std::sync::Arc;
use uuid::Uuid;

/// libsql-backed flowchart store
pub struct TursoFlowChartStore {
    db: Arc<DatabaseService>,
}

/// One node row, fully encoded and ready to insert
struct NodeRow {
    internal_id: String,
    parent_id: String,
    ordinal: i64,
    dragging: bool,
    selected: bool,
    position_absolute: String,
    height: i16,
    width: i16,
    position: String,
    data: String,
    node_type: String,
}

impl NodeRow {
    fn params(&self, flowchart_id: &str) -> Vec<Value> {
        vec![
            Value::Text(Uuid::new_v4().to_string()),
            Value::Text(self.internal_id.clone()),
            Value::Text(self.parent_id.clone()),
            Value::Text(flowchart_id.to_string()),
            Value::Integer(self.ordinal),
            Value::Integer(i64::from(self.dragging)),
            Value::Integer(i64::from(self.selected)),
            Value::Text(self.position_absolute.clone()),
            Value::Integer(i64::from(self.height)),
            Value::Integer(i64::from(self.width)),
            Value::Text(self.position.clone()),
            Value::Text(self.data.clone()),
            Value::Text(self.node_type.clone()),
        ]
    }
}

const INSERT_NODE: &str = "INSERT INTO node (id, internal_id, parent_id, flowchart_id, ordinal, dragging, selected, position_absolute, height, width, position, data, type)
     VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)";

const SELECT_FLOWCHART: &str = "SELECT f.id, f.title, f.key, f.modified_at,
            n.internal_id, n.parent_id, n.dragging, n.selected, n.position_absolute,
            n.height, n.width, n.position, n.data, n.type
     FROM flowchart f
     LEFT JOIN node n ON n.flowchart_id = f.id
     WHERE f.key = ?
     ORDER BY n.ordinal";

impl TursoFlowChartStore {
    pub fn new(db: Arc<DatabaseService>) -> Self {
        Self { db }
    }

    /// Encode every node of `chart` in pre-order
    fn encode_nodes<D: Payload>(chart: &FlowChart<D>) -> Result<Vec<NodeRow>, DatabaseError> {
        chart
            .linearize()
            .into_iter()
            .enumerate()
            .map(|(ordinal, linear)| -> Result<NodeRow, DatabaseError> {
                let node = linear.node;
                let encode = |what: &str, result: serde_json::Result<String>| {
                    result.map_err(|e| {
                        DatabaseError::serialization(format!(
                            "Failed to encode {} of node '{}': {}",
                            what, node.id, e
                        ))
                    })
                };

                Ok(NodeRow {
                    internal_id: node.id.clone(),
                    parent_id: linear.parent_id.to_string(),
                    ordinal: ordinal as i64,
                    dragging: node.dragging,
                    selected: node.selected,
                    position_absolute: encode(
                        "positionAbsolute",
                        serde_json::to_string(&node.position_absolute),
                    )?,
                    height: node.height,
                    width: node.width,
                    position: encode("position", serde_json::to_string(&node.position))?,
                    data: encode("data", serde_json::to_string(&node.data))?,
                    node_type: node.node_type.clone(),
                })
            })
            .collect()
    }

    /// Run `body` between BEGIN and COMMIT on `conn`
    ///
    /// Any error from `body`, an expired deadline, or a failed COMMIT rolls the
    /// transaction back before the error is returned.
    async fn in_transaction<T, F>(
        conn: &Connection,
        deadline: &Deadline,
        operation: &str,
        body: F,
    ) -> Result<T, DatabaseError>
    where
        F: Future<Output = Result<T, DatabaseError>>,
    {
        conn.execute("BEGIN TRANSACTION", ()).await.map_err(|e| {
            DatabaseError::sql_execution(format!("Failed to begin transaction: {}", e))
        })?;

        match deadline.run(operation, body).await {
            Ok(value) => {
                if let Err(e) = conn.execute("COMMIT", ()).await {
                    let err = DatabaseError::sql_execution(format!(
                        "Failed to commit transaction: {}",
                        e
                    ));
                    tracing::warn!(operation, error = %err, "Rolling back transaction");
                    // The commit error is what the caller needs; a rollback failure is logged
                    let _ = Self::rollback(conn, operation).await;
                    return Err(err);
                }
                Ok(value)
            }
            Err(err) => {
                tracing::warn!(operation, error = %err, "Rolling back transaction");
                let _ = Self::rollback(conn, operation).await;
                Err(err)
            }
        }
    }

    /// Issue ROLLBACK on `conn`, logging a failure with the operation it aborts
    async fn rollback(conn: &Connection, operation: &str) -> Result<(), DatabaseError> {
        conn.execute("ROLLBACK", ()).await.map(|_| ()).map_err(|e| {
            let err =
                DatabaseError::sql_execution(format!("Failed to roll back transaction: {}", e));
            tracing::error!(operation, error = %err, "Rollback failed");
            err
        })
    }

    async fn insert_nodes(
        conn: &Connection,
        deadline: &Deadline,
        flowchart_id: &str,
        rows: &[NodeRow],
    ) -> Result<usize, DatabaseError> {
        for row in rows {
            deadline.check("insert node")?;
            conn.execute(INSERT_NODE, row.params(flowchart_id))
                .await
                .map_err(|e| {
                    DatabaseError::sql_execution(format!(
                        "Failed to insert node '{}': {}",
                        row.internal_id, e
                    ))
                })?;
        }
        Ok(rows.len())
    }

    fn row_to_record<D: Payload>(
        key: &str,
        row: &Row,
    ) -> Result<Option<NodeRecord<D>>, DatabaseError> {
        let column = |name: &str, e: libsql::Error| {
            DatabaseError::sql_execution(format!(
                "Failed to read node column '{}' of flowchart '{}': {}",
                name, key, e
            ))
        };
        let decode = |name: &str, e: serde_json::Error| {
            DatabaseError::serialization(format!(
                "Failed to decode node column '{}' of flowchart '{}': {}",
                name, key, e
            ))
        };

        // A flowchart without nodes yields one row with NULL node columns
        let internal_id: Option<String> = row.get(4).map_err(|e| column("internal_id", e))?;
        let Some(internal_id) = internal_id else {
            return Ok(None);
        };

        let parent_id: String = row.get(5).map_err(|e| column("parent_id", e))?;
        let dragging: i64 = row.get(6).map_err(|e| column("dragging", e))?;
        let selected: i64 = row.get(7).map_err(|e| column("selected", e))?;
        let position_absolute: String =
            row.get(8).map_err(|e| column("position_absolute", e))?;
        let height: i64 = row.get(9).map_err(|e| column("height", e))?;
        let width: i64 = row.get(10).map_err(|e| column("width", e))?;
        let position: String = row.get(11).map_err(|e| column("position", e))?;
        let data: String = row.get(12).map_err(|e| column("data", e))?;
        let node_type: String = row.get(13).map_err(|e| column("type", e))?;

        let dimension = |name: &str, value: i64| {
            i16::try_from(value).map_err(|_| {
                DatabaseError::serialization(format!(
                    "Node '{}' {} out of range: {}",
                    internal_id, name, value
                ))
            })
        };

        let node = TreeNode {
            data: serde_json::from_str(&data).map_err(|e| decode("data", e))?,
            position: serde_json::from_str::<Position>(&position)
                .map_err(|e| decode("position", e))?,
            position_absolute: serde_json::from_str::<Position>(&position_absolute)
                .map_err(|e| decode("position_absolute", e))?,
            width: dimension("width", width)?,
            height: dimension("height", height)?,
            selected: selected != 0,
            dragging: dragging != 0,
            node_type,
            id: internal_id,
        };

        Ok(Some(NodeRecord { node, parent_id }))
    }
}

/// Parse SQLite (`YYYY-MM-DD HH:MM:SS`) or RFC3339 timestamps
fn parse_timestamp(s: &str) -> Result<DateTime<Utc>, String> {
    if let Ok(naive) = NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S") {
        return Ok(naive.and_utc());
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Ok(dt.with_timezone(&Utc));
    }

    Err(format!(
        "Unable to parse timestamp '{}' as SQLite or RFC3339 format",
        s
    ))
}

#[async_trait]
impl<D: Payload> FlowChartStore<D> for TursoFlowChartStore {
    async fn flowchart_exists(&self, deadline: &Deadline, key: &str) -> Result<bool, DatabaseError> {
        deadline.check("flowchart exists")?;
        let conn = self.db.connect_with_timeout().await?;

        deadline
            .run("flowchart exists", async {
                let mut stmt = conn
                    .prepare("SELECT 1 FROM flowchart WHERE key = ?")
                    .await
                    .map_err(|e| {
                        DatabaseError::sql_execution(format!("Failed to prepare query: {}", e))
                    })?;
                let mut rows = stmt.query([key]).await.map_err(|e| {
                    DatabaseError::sql_execution(format!("Failed to execute query: {}", e))
                })?;
                let found = rows
                    .next()
                    .await
                    .map_err(|e| DatabaseError::sql_execution(e.to_string()))?
                    .is_some();
                Ok(found)
            })
            .await
    }

    async fn store_flowchart(
        &self,
        deadline: &Deadline,
        chart: &FlowChart<D>,
    ) -> Result<String, DatabaseError> {
        let rows = Self::encode_nodes(chart)?;
        deadline.check("store flowchart")?;
        let conn = self.db.connect_with_timeout().await?;
        let flowchart_id = Uuid::new_v4().to_string();

        let inserted = Self::in_transaction(&conn, deadline, "store flowchart", async {
            conn.execute(
                "INSERT INTO flowchart (id, title, key) VALUES (?, ?, ?)",
                [
                    flowchart_id.as_str(),
                    chart.title.as_str(),
                    chart.key.as_str(),
                ],
            )
            .await
            .map_err(|e| {
                DatabaseError::sql_execution(format!(
                    "Failed to insert flowchart '{}': {}",
                    chart.key, e
                ))
            })?;

            Self::insert_nodes(&conn, deadline, &flowchart_id, &rows).await
        })
        .await?;

        tracing::debug!(key = %chart.key, id = %flowchart_id, nodes = inserted, "Stored flowchart");
        Ok(flowchart_id)
    }

    async fn update_flowchart(
        &self,
        deadline: &Deadline,
        chart: &FlowChart<D>,
    ) -> Result<String, DatabaseError> {
        let rows = Self::encode_nodes(chart)?;
        deadline.check("update flowchart")?;
        let conn = self.db.connect_with_timeout().await?;

        let (flowchart_id, inserted) =
            Self::in_transaction(&conn, deadline, "update flowchart", async {
                let updated = conn
                    .execute(
                        "UPDATE flowchart SET title = ?, modified_at = CURRENT_TIMESTAMP WHERE key = ?",
                        [chart.title.as_str(), chart.key.as_str()],
                    )
                    .await
                    .map_err(|e| {
                        DatabaseError::sql_execution(format!(
                            "Failed to update flowchart '{}': {}",
                            chart.key, e
                        ))
                    })?;
                if updated == 0 {
                    return Err(DatabaseError::flowchart_not_found(chart.key.as_str()));
                }

                let mut stmt = conn
                    .prepare("SELECT id FROM flowchart WHERE key = ?")
                    .await
                    .map_err(|e| {
                        DatabaseError::sql_execution(format!("Failed to prepare query: {}", e))
                    })?;
                let mut found = stmt.query([chart.key.as_str()]).await.map_err(|e| {
                    DatabaseError::sql_execution(format!("Failed to execute query: {}", e))
                })?;
                let flowchart_id: String = match found
                    .next()
                    .await
                    .map_err(|e| DatabaseError::sql_execution(e.to_string()))?
                {
                    Some(row) => row.get(0).map_err(|e| {
                        DatabaseError::sql_execution(format!("Failed to get flowchart id: {}", e))
                    })?,
                    None => return Err(DatabaseError::flowchart_not_found(chart.key.as_str())),
                };

                deadline.check("delete nodes")?;
                let deleted = conn
                    .execute(
                        "DELETE FROM node WHERE flowchart_id = ?",
                        [flowchart_id.as_str()],
                    )
                    .await
                    .map_err(|e| {
                        DatabaseError::sql_execution(format!(
                            "Failed to delete nodes of flowchart '{}': {}",
                            chart.key, e
                        ))
                    })?;
                tracing::debug!(key = %chart.key, deleted, "Cleared previous tree");

                let inserted = Self::insert_nodes(&conn, deadline, &flowchart_id, &rows).await?;
                Ok((flowchart_id, inserted))
            })
            .await?;

        tracing::debug!(key = %chart.key, id = %flowchart_id, nodes = inserted, "Replaced flowchart");
        Ok(flowchart_id)
    }

    async fn fetch_flowchart(
        &self,
        deadline: &Deadline,
        key: &str,
    ) -> Result<Option<FlowChartRecord<D>>, DatabaseError> {
        deadline.check("fetch flowchart")?;
        let conn = self.db.connect_with_timeout().await?;

        deadline
            .run("fetch flowchart", async {
                let mut stmt = conn.prepare(SELECT_FLOWCHART).await.map_err(|e| {
                    DatabaseError::sql_execution(format!("Failed to prepare query: {}", e))
                })?;
                let mut rows = stmt.query([key]).await.map_err(|e| {
                    DatabaseError::sql_execution(format!("Failed to execute query: {}", e))
                })?;

                let mut record: Option<FlowChartRecord<D>> = None;
                while let Some(row) = rows
                    .next()
                    .await
                    .map_err(|e| DatabaseError::sql_execution(e.to_string()))?
                {
                    if record.is_none() {
                        let id: String = row.get(0).map_err(|e| {
                            DatabaseError::sql_execution(format!("Failed to get id: {}", e))
                        })?;
                        let title: String = row.get(1).map_err(|e| {
                            DatabaseError::sql_execution(format!("Failed to get title: {}", e))
                        })?;
                        let stored_key: String = row.get(2).map_err(|e| {
                            DatabaseError::sql_execution(format!("Failed to get key: {}", e))
                        })?;
                        let modified_at: String = row.get(3).map_err(|e| {
                            DatabaseError::sql_execution(format!("Failed to get modified_at: {}", e))
                        })?;
                        record = Some(FlowChartRecord {
                            id,
                            title,
                            key: stored_key,
                            updated_at: parse_timestamp(&modified_at)
                                .map_err(DatabaseError::serialization)?,
                            nodes: Vec::new(),
                        });
                    }

                    if let (Some(record), Some(node)) =
                        (record.as_mut(), Self::row_to_record::<D>(key, &row)?)
                    {
                        record.nodes.push(node);
                    }
                }

                Ok(record)
            })
            .await
    }
}
