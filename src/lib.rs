//! # flowcore
//!
//! Max-flow and min-cost-flow solver core: Ford-Fulkerson, Edmonds-Karp,
//! Dinic, Push-Relabel, Successive Shortest Paths, and Capacity Scaling
//! over a shared residual-graph representation, wrapped by a supervisor
//! that handles validation, algorithm selection, pooling, progress
//! reporting, and cooperative cancellation.
//!
//! ## Modules
//!
//! - [`graph`] - the residual graph and its shortest-path kernels (Dijkstra,
//!   Bellman-Ford)
//! - [`maxflow`] - Ford-Fulkerson, Edmonds-Karp, Dinic
//! - [`push_relabel`] - Push-Relabel with FIFO / highest-label / lowest-label
//!   active-node selection
//! - [`mincost`] - Successive Shortest Paths and Capacity Scaling
//! - [`supervisor`] - request validation, algorithm recommendation, the
//!   graph/worker pools, progress reporting, and shutdown
//! - [`cancel`] - the cooperative cancellation token shared by every engine
//!
//! ## Quick Start
//!
//! ```rust
//! use flowcore::graph::ResidualGraph;
//! use flowcore::maxflow::edmonds_karp;
//! use flowcore::cancel::CancellationToken;
//! use flowcore::supervisor::options::SolverOptions;
//!
//! let mut graph = ResidualGraph::new();
//! graph.add_edge_with_reverse(0, 1, 10.0, 0.0);
//! graph.add_edge_with_reverse(1, 2, 7.0, 0.0);
//!
//! let options = SolverOptions::default();
//! let token = CancellationToken::new();
//! let result = edmonds_karp::solve(&mut graph, 0, 2, &options, &token);
//! assert_eq!(result.max_flow, 7.0);
//! ```
//!
//! ## Feature Flags
//!
//! None yet; every engine in this crate ships unconditionally.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod cancel;
pub mod graph;
pub mod maxflow;
pub mod mincost;
pub mod push_relabel;
pub mod supervisor;

mod error;
mod types;

pub use error::{Error, ErrorKind, Result};
pub use types::*;

/// Common imports for callers embedding a solve directly rather than
/// going through [`supervisor::Supervisor`].
pub mod prelude {
    pub use crate::cancel::{CancelCheck, CancellationToken};
    pub use crate::graph::ResidualGraph;
    pub use crate::maxflow::{dinic, edmonds_karp, ford_fulkerson};
    pub use crate::mincost::{capacity_scaling, ssp};
    pub use crate::push_relabel::{self, Variant};
    pub use crate::supervisor::options::SolverOptions;
    pub use crate::supervisor::Supervisor;
    pub use crate::types::{Algorithm, Cost, Flow, NodeId, RecordedPath, SolverResult, SolverStatus};
    pub use crate::{Error, Result};
}
