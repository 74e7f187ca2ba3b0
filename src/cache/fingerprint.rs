//! Context fingerprint: the identity of one cache entry.

use crate::context::ContextRequest;
use serde::{Deserialize, Serialize};
use std::fmt;

/// `(subject_id, scope_kind, session_id)`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContextFingerprint {
    pub subject_id: String,
    pub scope_kind: String,
    pub session_id: String,
}

impl ContextFingerprint {
    pub fn new(
        subject_id: impl Into<String>,
        scope_kind: impl Into<String>,
        session_id: impl Into<String>,
    ) -> Self {
        Self {
            subject_id: subject_id.into(),
            scope_kind: scope_kind.into(),
            session_id: session_id.into(),
        }
    }

    /// Requested sources are not part of the identity.
    pub fn for_request(request: &ContextRequest) -> Self {
        Self::new(
            request.subject_id.as_str(),
            request.scope_kind.as_str(),
            request.session_id.as_str(),
        )
    }
}

/// Writes `part` with `\` and `:` backslash-escaped.
fn write_escaped(f: &mut fmt::Formatter<'_>, part: &str) -> fmt::Result {
    for c in part.chars() {
        if c == '\\' || c == ':' {
            f.write_str("\\")?;
        }
        fmt::Write::write_char(f, c)?;
    }
    Ok(())
}

/// `subject:scope:session`, with separators inside a part escaped so distinct
/// fingerprints never render the same.
impl fmt::Display for ContextFingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_escaped(f, &self.subject_id)?;
        f.write_str(":")?;
        write_escaped(f, &self.scope_kind)?;
        f.write_str(":")?;
        write_escaped(f, &self.session_id)
    }
}
