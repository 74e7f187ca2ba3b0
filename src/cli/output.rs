//! CLI output: error mapping from domain errors to stable CLI surface.

use crate::error::ContextError;

/// Map domain/service errors to a string for CLI output.
pub fn map_error(e: &ContextError) -> String {
    match e {
        ContextError::SubjectNotFound { source_name, .. } => format!(
            "{}\nhint: ingest a '{}' record for this subject first",
            e, source_name
        ),
        ContextError::UnknownSource(_) => {
            format!("{}\nhint: run `mentorctx sources` to list registered sources", e)
        }
        _ => e.to_string(),
    }
}
