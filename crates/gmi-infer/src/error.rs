use gmi_types::TypeConflict;

use crate::ContextId;

/// Failures of the inference engine.
///
/// Missing information is never an error: lookups that find nothing return
/// `Ok(None)`. These variants are misuse or resource limits.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum InferError {
    /// The id was not allocated by this arena.
    #[error("internal error: inference context {0} does not belong to this arena")]
    UnknownContext(ContextId),
    /// The global counter has no room left for another block of ids.
    #[error("internal error: inference context ids are exhausted")]
    ContextIdsExhausted,
    /// Registration or resolution nested deeper than `InferOptions::max_depth`.
    #[error("internal error: inference nesting exceeded {limit} levels")]
    DepthExceeded { limit: usize },
    /// The type system refused to merge two types.
    #[error(transparent)]
    Conflict(#[from] TypeConflict),
}
