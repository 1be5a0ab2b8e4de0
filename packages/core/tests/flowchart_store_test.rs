//! Flowchart Store Integration Tests
//!
//! Exercises `TursoFlowChartStore` and `FlowChartService` against a real
//! libsql database in a temporary directory.
//!
//! ## Test Coverage
//! - Store → fetch round trip (structured and unstructured payloads)
//! - Replace-on-update leaves exactly the new tree
//! - Rollback on a failing statement keeps the previous tree
//! - Expired deadlines, before or during a write, leave the store untouched
//! - Negative geometry is stored as given
//! - Empty charts, missing keys, duplicate keys

#[cfg(test)]
mod flowchart_store_tests {
    use anyhow::Result;
    use flowchart_core::db::{
        DatabaseError, DatabaseService, Deadline, FlowChartRecord, FlowChartStore,
        TursoFlowChartStore,
    };
    use flowchart_core::models::{
        Edge, FlowChart, LabelData, Position, TreeNode, UnstructuredData,
    };
    use flowchart_core::services::{FlowChartService, FlowChartServiceError, StoreOutcome};
    use flowchart_core::transport::FlowChartDto;
    use serde_json::json;
    use std::sync::Arc;
    use std::time::Duration;
    use tempfile::TempDir;
    use tokio::time::Instant;

    struct TestEnv {
        db: Arc<DatabaseService>,
        store: Arc<TursoFlowChartStore>,
        _temp_dir: TempDir,
    }

    async fn create_test_env() -> Result<TestEnv> {
        let temp_dir = TempDir::new()?;
        let db = Arc::new(DatabaseService::new(temp_dir.path().join("flowchart.db")).await?);
        let store = Arc::new(TursoFlowChartStore::new(db.clone()));
        Ok(TestEnv {
            db,
            store,
            _temp_dir: temp_dir,
        })
    }

    fn deadline() -> Deadline {
        Deadline::after(Duration::from_secs(5))
    }

    fn node(id: &str, x: f64) -> TreeNode<LabelData> {
        TreeNode {
            node_type: if id == "0" { "input".to_string() } else { String::new() },
            position: Position::new(x, x * 2.0),
            position_absolute: Position::new(x + 1.0, x * 2.0 + 1.0),
            width: 150,
            height: 40,
            selected: id == "1",
            dragging: false,
            ..TreeNode::new(id, LabelData::new(format!("step {}", id)))
        }
    }

    fn chart(title: &str, key: &str, pairs: &[(&str, &str)]) -> FlowChart<LabelData> {
        let mut nodes = vec![node("0", 0.0)];
        for (i, (_, target)) in pairs.iter().enumerate() {
            nodes.push(node(target, (i + 1) as f64 * 10.0));
        }
        let edges: Vec<Edge> = pairs.iter().map(|(s, t)| Edge::new(*s, *t)).collect();
        FlowChart::build(title, key, nodes, &edges).expect("valid test chart")
    }

    async fn fetch(
        store: &TursoFlowChartStore,
        key: &str,
    ) -> Result<Option<FlowChartRecord<LabelData>>, DatabaseError> {
        store.fetch_flowchart(&deadline(), key).await
    }

    async fn count_nodes(db: &DatabaseService) -> Result<i64> {
        let conn = db.connect_with_timeout().await?;
        let mut stmt = conn.prepare("SELECT COUNT(*) FROM node").await?;
        let mut rows = stmt.query(()).await?;
        let row = rows.next().await?.expect("count row");
        Ok(row.get::<i64>(0)?)
    }

    /// Make every insert of node `internal_id` fail inside the store's transaction
    async fn reject_node(db: &DatabaseService, internal_id: &str) -> Result<()> {
        let conn = db.connect_with_timeout().await?;
        conn.execute(
            &format!(
                "CREATE TRIGGER reject_node BEFORE INSERT ON node
                 WHEN NEW.internal_id = '{}'
                 BEGIN SELECT RAISE(ABORT, 'node rejected'); END",
                internal_id
            ),
            (),
        )
        .await?;
        Ok(())
    }

    // ========================================================================
    // Round trip
    // ========================================================================

    #[tokio::test]
    async fn test_store_then_fetch_round_trip() -> Result<()> {
        let env = create_test_env().await?;
        let original = chart(
            "Onboarding",
            "onboarding",
            &[("0", "1"), ("1", "2"), ("0", "3"), ("3", "4")],
        );

        let id = env.store.store_flowchart(&deadline(), &original).await?;
        let record = fetch(&env.store, "onboarding")
            .await?
            .expect("stored flowchart");
        assert_eq!(record.id, id);
        assert_eq!(record.nodes[0].parent_id, "0");

        let fetched = record.into_flowchart()?;
        assert_eq!(fetched.title, "Onboarding");
        assert_eq!(fetched.node_count(), original.node_count());
        assert_eq!(fetched.edges(), original.edges());

        for linear in original.linearize() {
            let handle = fetched.tree().handle_of(&linear.node.id).expect("node present");
            assert_eq!(fetched.tree().get(handle), Some(linear.node));
            assert_eq!(fetched.tree().parent_id(handle), linear.parent_id);
        }
        Ok(())
    }

    #[tokio::test]
    async fn test_unstructured_payload_round_trip() -> Result<()> {
        let env = create_test_env().await?;
        let service: FlowChartService<UnstructuredData> = FlowChartService::new(env.store.clone());

        let dto: FlowChartDto<UnstructuredData> = serde_json::from_value(json!({
            "title": "Checklist",
            "key": "checklist",
            "nodes": [
                { "id": "0", "data": { "label": "Start", "meta": { "owner": "ops" } } },
                { "id": "1", "data": { "label": "Review", "tags": ["a", "b"] } },
                { "id": "2", "data": { "label": "Ship" } }
            ],
            "edges": [
                { "id": "1", "source": "0", "target": "1" },
                { "id": "2", "source": "0", "target": "2" }
            ]
        }))?;

        let outcome = service.edit(dto, |data| data).await?;
        assert!(matches!(outcome, StoreOutcome::Created { .. }));

        let fetched = service.fetch("checklist").await?;
        let root = fetched.root_node().expect("root");
        assert_eq!(root.data["meta"]["owner"], "ops");
        let review = fetched.tree().handle_of("1").expect("node 1");
        assert_eq!(fetched.tree().get(review).expect("node").data["tags"][1], "b");
        assert_eq!(fetched.tree().depth(review), 2);
        assert!(fetched.updated_at.is_some());
        Ok(())
    }

    #[tokio::test]
    async fn test_three_node_scenario_through_service() -> Result<()> {
        let env = create_test_env().await?;
        let service: FlowChartService<LabelData> = FlowChartService::new(env.store.clone());

        let outcome = service
            .store_or_update(&chart("Flow", "flow", &[("0", "1"), ("0", "2")]))
            .await?;
        let fetched = service.fetch("flow").await?;

        assert_eq!(fetched.id.as_deref(), Some(outcome.id()));
        let root = fetched.root().expect("root");
        assert_eq!(fetched.tree().depth(root), 1);
        let children: Vec<_> = fetched
            .tree()
            .children(root)
            .map(|h| fetched.tree().depth(h))
            .collect();
        assert_eq!(children, [2, 2]);
        Ok(())
    }

    // ========================================================================
    // Replace semantics
    // ========================================================================

    #[tokio::test]
    async fn test_update_replaces_the_whole_tree() -> Result<()> {
        let env = create_test_env().await?;
        let service: FlowChartService<LabelData> = FlowChartService::new(env.store.clone());

        let created = service
            .store_or_update(&chart("A", "plan", &[("0", "1"), ("0", "2"), ("2", "5")]))
            .await?;
        let updated = service
            .store_or_update(&chart("B", "plan", &[("0", "3")]))
            .await?;

        assert!(matches!(created, StoreOutcome::Created { .. }));
        assert_eq!(updated, StoreOutcome::Updated { id: created.id().to_string() });

        let fetched = service.fetch("plan").await?;
        assert_eq!(fetched.title, "B");
        let ids: Vec<_> = fetched
            .linearize()
            .into_iter()
            .map(|l| l.node.id.clone())
            .collect();
        assert_eq!(ids, ["0", "3"]);
        assert_eq!(count_nodes(&env.db).await?, 2);
        Ok(())
    }

    #[tokio::test]
    async fn test_storing_empty_chart_empties_nodes() -> Result<()> {
        let env = create_test_env().await?;
        let service: FlowChartService<LabelData> = FlowChartService::new(env.store.clone());

        service
            .store_or_update(&chart("Full", "wipe", &[("0", "1")]))
            .await?;
        service
            .store_or_update(&FlowChart::empty("Empty", "wipe")?)
            .await?;

        let fetched = service.fetch("wipe").await?;
        assert_eq!(fetched.title, "Empty");
        assert!(fetched.root().is_none());
        assert_eq!(count_nodes(&env.db).await?, 0);
        Ok(())
    }

    // ========================================================================
    // Failure and rollback
    // ========================================================================

    #[tokio::test]
    async fn test_failed_insert_rolls_back_update() -> Result<()> {
        let env = create_test_env().await?;
        let before = chart("Stable", "rollback", &[("0", "1"), ("0", "2")]);
        env.store.store_flowchart(&deadline(), &before).await?;

        // Third node fails to insert mid-transaction
        reject_node(&env.db, "8").await?;
        let nodes = vec![node("0", 0.0), node("7", 1.0), node("8", 2.0)];
        let broken = FlowChart::build(
            "Broken",
            "rollback",
            nodes,
            &[Edge::new("0", "7"), Edge::new("0", "8")],
        )?;

        let err = env
            .store
            .update_flowchart(&deadline(), &broken)
            .await
            .unwrap_err();
        assert!(matches!(err, DatabaseError::SqlExecutionError { .. }));

        let after = fetch(&env.store, "rollback")
            .await?
            .expect("still stored")
            .into_flowchart()?;
        assert_eq!(after.title, "Stable");
        assert_eq!(after.edges(), before.edges());
        assert_eq!(count_nodes(&env.db).await?, 3);
        Ok(())
    }

    #[tokio::test]
    async fn test_failed_insert_rolls_back_new_flowchart() -> Result<()> {
        let env = create_test_env().await?;
        reject_node(&env.db, "1").await?;
        let nodes = vec![node("0", 0.0), node("1", 1.0)];
        let broken = FlowChart::build("New", "fresh", nodes, &[Edge::new("0", "1")])?;

        assert!(env.store.store_flowchart(&deadline(), &broken).await.is_err());
        assert!(
            !FlowChartStore::<LabelData>::flowchart_exists(env.store.as_ref(), &deadline(), "fresh")
                .await?
        );
        assert_eq!(count_nodes(&env.db).await?, 0);
        Ok(())
    }

    #[tokio::test]
    async fn test_expired_deadline_leaves_store_untouched() -> Result<()> {
        let env = create_test_env().await?;
        let before = chart("Kept", "deadline", &[("0", "1")]);
        env.store.store_flowchart(&deadline(), &before).await?;

        let expired = Deadline::at(Instant::now());
        let err = env
            .store
            .update_flowchart(&expired, &chart("Lost", "deadline", &[("0", "9")]))
            .await
            .unwrap_err();
        assert!(matches!(err, DatabaseError::DeadlineExceeded { .. }));

        let after = fetch(&env.store, "deadline")
            .await?
            .expect("still stored")
            .into_flowchart()?;
        assert_eq!(after.title, "Kept");
        assert!(after.tree().handle_of("1").is_some());
        Ok(())
    }

    #[tokio::test]
    async fn test_deadline_during_large_update_keeps_previous_tree() -> Result<()> {
        let env = create_test_env().await?;
        let before = chart("Kept", "large", &[("0", "1"), ("1", "2")]);
        env.store.store_flowchart(&deadline(), &before).await?;

        // Wide enough that the inserts outlast the deadline
        const WIDTH: usize = 100_000;
        let nodes = (0..=WIDTH).map(|i| node(&i.to_string(), i as f64));
        let edges: Vec<Edge> = (1..=WIDTH).map(|i| Edge::new("0", i.to_string())).collect();
        let large = FlowChart::build("Large", "large", nodes, &edges)?;

        let short = Deadline::after(Duration::from_millis(20));
        let err = env.store.update_flowchart(&short, &large).await.unwrap_err();
        assert!(matches!(err, DatabaseError::DeadlineExceeded { .. }));

        let after = fetch(&env.store, "large")
            .await?
            .expect("still stored")
            .into_flowchart()?;
        assert_eq!(after.title, "Kept");
        assert_eq!(after.edges(), before.edges());
        assert_eq!(count_nodes(&env.db).await?, 3);

        // The store is usable again once the failed transaction is gone
        let next = chart("Next", "large", &[("0", "5")]);
        env.store.update_flowchart(&deadline(), &next).await?;
        let after = fetch(&env.store, "large")
            .await?
            .expect("updated")
            .into_flowchart()?;
        assert_eq!(after.title, "Next");
        assert_eq!(count_nodes(&env.db).await?, 2);
        Ok(())
    }

    #[tokio::test]
    async fn test_negative_geometry_round_trips() -> Result<()> {
        let env = create_test_env().await?;
        let mut nodes = vec![node("0", 0.0), node("1", 1.0)];
        nodes[1].width = -5;
        nodes[1].height = -3;
        let original = FlowChart::build("Odd", "odd", nodes, &[Edge::new("0", "1")])?;
        env.store.store_flowchart(&deadline(), &original).await?;

        let fetched = fetch(&env.store, "odd")
            .await?
            .expect("stored")
            .into_flowchart()?;
        let handle = fetched.tree().handle_of("1").expect("node present");
        let stored = fetched.tree().get(handle).expect("node data");
        assert_eq!((stored.width, stored.height), (-5, -3));
        Ok(())
    }

    #[tokio::test]
    async fn test_update_of_unknown_key_is_not_found() -> Result<()> {
        let env = create_test_env().await?;
        let err = env
            .store
            .update_flowchart(&deadline(), &chart("Ghost", "ghost", &[("0", "1")]))
            .await
            .unwrap_err();
        assert!(matches!(err, DatabaseError::FlowChartNotFound { ref key } if key == "ghost"));
        Ok(())
    }

    #[tokio::test]
    async fn test_duplicate_key_insert_fails() -> Result<()> {
        let env = create_test_env().await?;
        let first = chart("One", "dup", &[("0", "1")]);
        env.store.store_flowchart(&deadline(), &first).await?;

        assert!(env.store.store_flowchart(&deadline(), &first).await.is_err());
        assert_eq!(count_nodes(&env.db).await?, 2);
        Ok(())
    }

    #[tokio::test]
    async fn test_fetch_unknown_key() -> Result<()> {
        let env = create_test_env().await?;
        let service: FlowChartService<LabelData> = FlowChartService::new(env.store.clone());

        assert!(fetch(&env.store, "nope").await?.is_none());
        assert!(matches!(
            service.fetch("nope").await,
            Err(FlowChartServiceError::NotFound { .. })
        ));
        Ok(())
    }
}
