//! Property-based tests for version-history truncation.
//!
//! Uses proptest over random DAGs to verify:
//! - kept paths are bounded by the requested number of levels
//! - no kept version references a removed parent
//! - leaves always survive
//! - persisted truncation matches the in-memory plan

// Property tests use expect/unwrap for simplicity - panics are acceptable in tests
#![allow(clippy::expect_used, clippy::unwrap_used)]

use proptest::prelude::*;
use std::collections::HashSet;
use std::sync::Arc;
use vercat::models::{ItemId, VersionHistoryDag, VersionId};
use vercat::storage::schema::NODE_VERSION_TABLE;
use vercat::storage::{InMemoryStorage, StorageBackend};
use vercat::VersionHistoryStore;

/// Random DAG: version `i + 1` may have parents among versions `1..=i`.
fn arb_dag() -> impl Strategy<Value = VersionHistoryDag> {
    (1usize..25)
        .prop_flat_map(|n| {
            let edges = proptest::collection::vec((0..n, 0..n), 0..n * 2);
            (Just(n), edges)
        })
        .prop_map(|(n, edges)| {
            let mut dag = VersionHistoryDag::new(ItemId::new(1));
            for i in 1..=n {
                dag.add_version(VersionId::new(i64::try_from(i).unwrap()));
            }
            for (a, b) in edges {
                if a < b {
                    dag.add_edge(
                        VersionId::new(i64::try_from(a + 1).unwrap()),
                        VersionId::new(i64::try_from(b + 1).unwrap()),
                    );
                }
            }
            dag
        })
}

proptest! {
    /// Property: the longest kept path has at most `levels` versions.
    #[test]
    fn prop_truncation_bounds_depth(dag in arb_dag(), levels in 1usize..6) {
        let mut kept = dag.clone();
        kept.apply_truncation(&dag.plan_truncation(levels));
        prop_assert!(kept.depth() <= levels);
    }

    /// Property: kept versions never point at removed parents.
    #[test]
    fn prop_no_dangling_parents(dag in arb_dag(), levels in 1usize..6) {
        let plan = dag.plan_truncation(levels);
        let removed: HashSet<VersionId> = plan.removed.iter().copied().collect();
        let mut kept = dag.clone();
        kept.apply_truncation(&plan);

        for version in kept.versions() {
            for parent in kept.get_parent(version) {
                prop_assert!(!removed.contains(&parent));
                prop_assert!(kept.contains(parent));
            }
        }
        prop_assert_eq!(plan.retained.len() + plan.removed.len(), dag.len());
    }

    /// Property: every leaf survives, and children of kept versions are kept.
    #[test]
    fn prop_kept_set_is_closed_toward_leaves(dag in arb_dag(), levels in 1usize..6) {
        let plan = dag.plan_truncation(levels);
        let retained: HashSet<VersionId> = plan.retained.iter().copied().collect();

        for leaf in dag.leaves() {
            prop_assert!(retained.contains(&leaf));
        }
        for version in &plan.retained {
            for child in dag.get_children(*version) {
                prop_assert!(retained.contains(&child));
            }
        }
    }

    /// Property: truncating through storage leaves exactly the planned DAG.
    #[test]
    fn prop_persisted_truncation_matches_plan(dag in arb_dag(), levels in 1usize..6) {
        let storage: Arc<dyn StorageBackend> = Arc::new(InMemoryStorage::new());
        let store = VersionHistoryStore::new(storage);
        let item = dag.item_id();
        for version in dag.versions() {
            store.add_version(item, version).unwrap();
        }
        for (parent, child) in dag.edges() {
            store.add_edge(item, parent, child).unwrap();
        }

        let plan = store.truncate(item, levels, NODE_VERSION_TABLE).unwrap();
        let mut expected = dag.clone();
        expected.apply_truncation(&dag.plan_truncation(levels));
        let stored = store.retrieve_from_database(item).unwrap();

        prop_assert_eq!(plan, dag.plan_truncation(levels));
        prop_assert_eq!(stored.len(), expected.len());
        prop_assert_eq!(stored.edge_count(), expected.edge_count());
        for version in expected.versions() {
            let mut stored_parents = stored.get_parent(version);
            let mut expected_parents = expected.get_parent(version);
            stored_parents.sort();
            expected_parents.sort();
            prop_assert_eq!(stored_parents, expected_parents);
        }
    }
}
