//! Error types for flowcore

use thiserror::Error;

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Coarse error taxonomy surfaced to callers (spec §6): transport layers
/// map these onto their own status codes without re-deriving the
/// classification from the error message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// `graph` was absent from a request.
    NilGraph,
    /// `graph` had zero nodes.
    EmptyGraph,
    /// `source_id` is not a node in the graph.
    InvalidSource,
    /// `sink_id` is not a node in the graph.
    InvalidSink,
    /// `source_id == sink_id`.
    SourceEqualsSink,
    /// Node count exceeded the configured ceiling.
    TooManyNodes,
    /// Edge count exceeded the configured ceiling.
    TooManyEdges,
    /// The solve's wall-clock budget elapsed.
    Timeout,
    /// The solve was cancelled cooperatively.
    Canceled,
    /// No worker slot was available in the solver pool.
    ResourceExhausted,
    /// Anything else — a bug, not a validation failure.
    Internal,
}

/// Errors that can occur during a solve
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    /// `graph` field was absent.
    #[error("graph is required")]
    NilGraph,

    /// `graph` had zero nodes.
    #[error("graph has no nodes")]
    EmptyGraph,

    /// `source_id` is not present in the node set.
    #[error("source node {0} is not in the graph")]
    InvalidSource(usize),

    /// `sink_id` is not present in the node set.
    #[error("sink node {0} is not in the graph")]
    InvalidSink(usize),

    /// `source_id == sink_id`.
    #[error("source and sink must be different, both are {0}")]
    SourceEqualsSink(usize),

    /// Node count exceeded the hard ceiling (1,000,000 per spec §6).
    #[error("graph has {got} nodes, exceeding the limit of {limit}")]
    TooManyNodes {
        /// Actual node count.
        got: usize,
        /// Configured ceiling.
        limit: usize,
    },

    /// Edge count exceeded the hard ceiling (10,000,000 per spec §6).
    #[error("graph has {got} edges, exceeding the limit of {limit}")]
    TooManyEdges {
        /// Actual edge count.
        got: usize,
        /// Configured ceiling.
        limit: usize,
    },

    /// The solve's wall-clock budget elapsed before completion.
    #[error("timeout after {seconds} seconds")]
    Timeout {
        /// Seconds elapsed before the timeout fired.
        seconds: f64,
    },

    /// The solve was cancelled cooperatively before completion.
    #[error("solve was canceled")]
    Canceled,

    /// No worker slot was available in the solver pool.
    #[error("no worker slot available: {0}")]
    ResourceExhausted(String),

    /// Invalid input not covered by a more specific variant.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Dimension mismatch in input (e.g. a supplies vector of the wrong
    /// length).
    #[error("dimension mismatch: expected {expected}, got {got}")]
    DimensionMismatch {
        /// Expected dimension.
        expected: usize,
        /// Actual dimension.
        got: usize,
    },

    /// Internal error (a bug, not a validation failure).
    #[error("internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Classify this error into the coarse taxonomy of spec §6.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::NilGraph => ErrorKind::NilGraph,
            Self::EmptyGraph => ErrorKind::EmptyGraph,
            Self::InvalidSource(_) => ErrorKind::InvalidSource,
            Self::InvalidSink(_) => ErrorKind::InvalidSink,
            Self::SourceEqualsSink(_) => ErrorKind::SourceEqualsSink,
            Self::TooManyNodes { .. } => ErrorKind::TooManyNodes,
            Self::TooManyEdges { .. } => ErrorKind::TooManyEdges,
            Self::Timeout { .. } => ErrorKind::Timeout,
            Self::Canceled => ErrorKind::Canceled,
            Self::ResourceExhausted(_) => ErrorKind::ResourceExhausted,
            Self::InvalidInput(_) | Self::DimensionMismatch { .. } | Self::Internal(_) => {
                ErrorKind::Internal
            }
        }
    }

    /// Create an invalid-input error.
    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }

    /// Create a dimension-mismatch error.
    #[must_use]
    pub fn dimension_mismatch(expected: usize, got: usize) -> Self {
        Self::DimensionMismatch { expected, got }
    }

    /// Create a timeout error.
    #[must_use]
    pub fn timeout(seconds: f64) -> Self {
        Self::Timeout { seconds }
    }

    /// Create an internal error.
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }
}
