//! Property-based tests for the conversation window bound

use chrono::{Duration, Utc};
use mentorctx::context::{ConversationLog, ConversationWindow};
use mentorctx::{Role, Turn};
use proptest::prelude::*;

fn turn(i: usize) -> Turn {
    let role = if i % 2 == 0 { Role::User } else { Role::Assistant };
    Turn::new(role, format!("turn {}", i), Utc::now() + Duration::seconds(i as i64))
}

/// Pushing `max_turns + k` turns keeps exactly the last `max_turns`, oldest first.
#[test]
fn test_window_keeps_most_recent_in_order() {
    let mut runner = proptest::test_runner::TestRunner::default();

    runner
        .run(&(1usize..40, 0usize..60), |(max_turns, extra)| {
            let mut window = ConversationWindow::new(max_turns);
            let total = max_turns + extra;
            for i in 0..total {
                window.push(turn(i));
            }

            prop_assert_eq!(window.len(), max_turns.min(total));
            let contents: Vec<String> = window
                .slice(max_turns)
                .into_iter()
                .map(|t| t.content)
                .collect();
            let expected: Vec<String> = (total - max_turns.min(total)..total)
                .map(|i| format!("turn {}", i))
                .collect();
            prop_assert_eq!(contents, expected);

            Ok(())
        })
        .unwrap();
}

/// History never exceeds the requested count and sessions never mix.
#[test]
fn test_history_bounded_per_session() {
    let mut runner = proptest::test_runner::TestRunner::default();

    runner
        .run(
            &(1usize..20, proptest::collection::vec(0usize..3, 0..80), 0usize..30),
            |(max_turns, sessions, requested)| {
                let log = ConversationLog::new(max_turns);
                for (i, session) in sessions.iter().enumerate() {
                    log.record(&format!("s{}", session), turn(i));
                }

                for session in 0..3 {
                    let history = log.history(&format!("s{}", session), requested);
                    let recorded = sessions.iter().filter(|s| **s == session).count();
                    prop_assert_eq!(history.len(), requested.min(max_turns).min(recorded));
                    for pair in history.windows(2) {
                        prop_assert!(pair[0].timestamp < pair[1].timestamp);
                    }
                }

                Ok(())
            },
        )
        .unwrap();
}
