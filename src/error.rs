use std::path::PathBuf;

/// Failures surfaced by the planner.
///
/// Lookup failures (`ComponentNotFound`, `SequenceNotFound`) are produced by
/// design documents; the extractor absorbs them and records an empty
/// sequence. `MissingPartSequence` and `DocumentLoad` abort a planning run.
#[derive(Debug, thiserror::Error)]
pub enum PlanError {
    #[error("component '{id}' not found in design document")]
    ComponentNotFound { id: String },

    #[error("sequence '{uri}' not found in design document")]
    SequenceNotFound { uri: String },

    #[error("construct '{construct}' references part '{part}' which has no sequence entry")]
    MissingPartSequence { construct: String, part: String },

    #[error("could not load design document '{}': {message}", .path.display())]
    DocumentLoad { path: PathBuf, message: String },

    #[error("could not load planner config '{}': {message}", .path.display())]
    Config { path: PathBuf, message: String },
}

impl PlanError {
    pub fn is_lookup_failure(&self) -> bool {
        matches!(
            self,
            PlanError::ComponentNotFound { .. } | PlanError::SequenceNotFound { .. }
        )
    }
}
