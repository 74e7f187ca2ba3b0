//! Property-based tests for source resolution order

use mentorctx::source::{DataSourceDescriptor, DataSourceRegistry, FnLoader};
use proptest::prelude::*;
use std::sync::Arc;

fn descriptor(name: &str, priority: i32) -> DataSourceDescriptor {
    DataSourceDescriptor::new(name, priority, 10, Arc::new(FnLoader::new(|_, _| Ok(vec![]))))
}

/// Resolution yields each requested source once, by descending priority then name.
#[test]
fn test_resolve_orders_by_priority() {
    let mut runner = proptest::test_runner::TestRunner::default();

    runner
        .run(
            &(
                proptest::collection::vec(-5i32..5, 1..12),
                proptest::collection::vec(any::<prop::sample::Index>(), 0..20),
            ),
            |(priorities, picks)| {
                let mut registry = DataSourceRegistry::new();
                for (i, priority) in priorities.iter().enumerate() {
                    registry.register(descriptor(&format!("src{:02}", i), *priority)).unwrap();
                }

                let requested: Vec<String> = picks
                    .iter()
                    .map(|idx| format!("src{:02}", idx.index(priorities.len())))
                    .collect();
                let resolved = registry.resolve(&requested).unwrap();

                let mut unique = requested.clone();
                unique.sort();
                unique.dedup();
                prop_assert_eq!(resolved.len(), unique.len());

                for pair in resolved.windows(2) {
                    let ordered = pair[0].priority > pair[1].priority
                        || (pair[0].priority == pair[1].priority && pair[0].name < pair[1].name);
                    prop_assert!(ordered);
                }

                Ok(())
            },
        )
        .unwrap();
}
