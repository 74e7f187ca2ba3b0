//! Integration tests for the context aggregation and caching engine

mod build_context;
mod cache_ttl;
mod degradation;
mod retention;
mod test_utils;
