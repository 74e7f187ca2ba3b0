//! Property-based tests for the compression budget

use mentorctx::context::{compress, CompositeContext};
use mentorctx::types::serialized_len;
use proptest::prelude::*;
use serde_json::json;

fn context(source_sizes: &[(usize, usize)]) -> CompositeContext {
    let mut ctx = CompositeContext::default();
    ctx.subject_context.subject_id = "u1".to_string();
    for (i, (count, width)) in source_sizes.iter().enumerate() {
        let name = ["tasks", "goals", "sessions", "rewards", "notes"][i];
        let records = (0..*count)
            .map(|n| {
                json!({
                    "id": format!("{}-{}", name, n),
                    "title": format!("{} {}", name, n),
                    "body": "x".repeat(*width),
                })
            })
            .collect();
        ctx.scope_data.insert(name.to_string(), records);
        ctx.metadata.sources.push(name.to_string());
    }
    ctx
}

/// Under budget nothing changes; over budget the result fits or is flagged.
#[test]
fn test_compress_respects_budget() {
    let mut runner = proptest::test_runner::TestRunner::default();

    runner
        .run(
            &(
                proptest::collection::vec((0usize..15, 0usize..300), 1..5),
                256usize..20_000,
            ),
            |(sizes, budget)| {
                let original = context(&sizes);
                let original_size = serialized_len(&original);
                let compressed = compress(original.clone(), budget);

                if original_size <= budget {
                    prop_assert_eq!(&compressed, &original);
                } else {
                    let size = serialized_len(&compressed);
                    prop_assert!(compressed.metadata.compressed);
                    prop_assert!(size <= budget || compressed.metadata.truncated);
                    if size > budget {
                        prop_assert!(compressed.metadata.budget_exceeded);
                    }
                    // The highest priority source keeps its key and its records.
                    let first = original.scope_data.get_index(0).map(|(k, _)| k.clone());
                    if let Some(first) = first {
                        prop_assert_eq!(
                            compressed.scope_data[&first].len(),
                            original.scope_data[&first].len()
                        );
                    }
                    prop_assert_eq!(compressed.scope_data.len(), original.scope_data.len());
                }

                Ok(())
            },
        )
        .unwrap();
}
