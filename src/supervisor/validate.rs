//! Input validation (spec §6): rejected as an `Error` before any algorithm
//! runs, so a malformed request never reaches a solver engine.

use crate::error::{Error, Result};
use crate::graph::ResidualGraph;
use crate::types::NodeId;

/// Node-count ceiling (spec §6).
pub const MAX_NODES: usize = 1_000_000;
/// Edge-count ceiling (spec §6).
pub const MAX_EDGES: usize = 10_000_000;

/// Validate a graph plus its source/sink before dispatch. Checked in spec
/// order: emptiness, size ceilings, then source/sink membership.
pub fn validate(graph: &ResidualGraph, source: NodeId, sink: NodeId) -> Result<()> {
    if graph.num_nodes() == 0 {
        return Err(Error::EmptyGraph);
    }
    if graph.num_nodes() > MAX_NODES {
        return Err(Error::TooManyNodes {
            got: graph.num_nodes(),
            limit: MAX_NODES,
        });
    }
    if graph.num_edges() > MAX_EDGES {
        return Err(Error::TooManyEdges {
            got: graph.num_edges(),
            limit: MAX_EDGES,
        });
    }
    graph.validate_source_sink(source, sink)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_empty_graph() {
        let g = ResidualGraph::new();
        assert!(matches!(validate(&g, 0, 1), Err(Error::EmptyGraph)));
    }

    #[test]
    fn rejects_unknown_source() {
        let mut g = ResidualGraph::new();
        g.add_edge(1, 2, 1.0, 0.0);
        assert!(matches!(validate(&g, 99, 2), Err(Error::InvalidSource(99))));
    }

    #[test]
    fn rejects_same_source_and_sink() {
        let mut g = ResidualGraph::new();
        g.add_edge(1, 2, 1.0, 0.0);
        assert!(matches!(validate(&g, 1, 1), Err(Error::SourceEqualsSink(1))));
    }

    #[test]
    fn accepts_well_formed_graph() {
        let mut g = ResidualGraph::new();
        g.add_edge(1, 2, 1.0, 0.0);
        assert!(validate(&g, 1, 2).is_ok());
    }
}
