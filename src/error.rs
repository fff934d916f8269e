use thiserror::Error;

pub type ChartResult<T> = Result<T, ChartError>;

#[derive(Debug, Error)]
pub enum ChartError {
    #[error("computed writer scoped to `{granted}` cannot write `{attempted}`")]
    ScopeViolation { granted: String, attempted: String },

    #[error("computed key `{key}` already has a writer")]
    WriterConflict { key: String },

    #[error("event `{event}` exceeded the re-entrancy limit of {limit}")]
    ReentrancyLimitExceeded { event: String, limit: usize },

    #[error("drawing surface handle is closed")]
    HandleClosed,

    #[error("facade is closed")]
    FacadeClosed,

    #[error("accessor `{role}` failed on element {index}: {reason}")]
    DataAccessError {
        role: String,
        index: usize,
        reason: String,
    },

    #[error("`{operation}` is not valid while the facade is {state}")]
    InvalidLifecycle {
        state: &'static str,
        operation: &'static str,
    },

    #[error("invalid viewport size: width={width}, height={height}")]
    InvalidViewport { width: u32, height: u32 },

    #[error("invalid data: {0}")]
    InvalidData(String),
}
