//! Property-based tests for context assembly guarantees

mod compression_budget;
mod conversation_window;
mod source_priority;
