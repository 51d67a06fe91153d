//! Topology error model
//!
//! Value-like failures describing why a route cannot be expressed as a single
//! continuous line. Two kinds, mirroring the route hierarchy: a single route
//! whose endpoint graph is broken, and a composite aggregating the failures
//! of its children. Both carry enough structure (node ids, member ids, nested
//! errors) to pinpoint the break without re-deriving the graph.

use std::fmt;

use thiserror::Error;

use crate::element::ElementId;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum TopologyError {
    #[error("{0}")]
    Route(RouteTopologyError),
    #[error("{0}")]
    Composite(CompositeTopologyError),
}

impl TopologyError {
    /// Id of the route the error is attributed to
    pub fn route_id(&self) -> ElementId {
        match self {
            TopologyError::Route(err) => err.route_id,
            TopologyError::Composite(err) => err.route_id,
        }
    }
}

/// A route whose endpoint graph cannot be walked as one line
#[derive(Debug, Clone, PartialEq)]
pub struct RouteTopologyError {
    pub route_id: ElementId,
    pub route_name: String,
    /// nodes with degree three or more
    pub branch_nodes: Vec<ElementId>,
    /// degree-1 nodes when their count is not exactly two
    pub dead_ends: Vec<ElementId>,
    /// members whose endpoints could not be resolved against the registry
    pub unresolved_members: Vec<ElementId>,
    /// members never reached by the ordering walk (disconnected graph)
    pub unreached_members: Vec<ElementId>,
}

impl RouteTopologyError {
    pub fn new(route_id: ElementId, route_name: impl Into<String>) -> Self {
        RouteTopologyError {
            route_id,
            route_name: route_name.into(),
            branch_nodes: Vec::new(),
            dead_ends: Vec::new(),
            unresolved_members: Vec::new(),
            unreached_members: Vec::new(),
        }
    }

    /// All node ids flagged by the degree classifier
    pub fn flagged_nodes(&self) -> impl Iterator<Item = ElementId> + '_ {
        self.branch_nodes
            .iter()
            .chain(self.dead_ends.iter())
            .copied()
    }
}

impl fmt::Display for RouteTopologyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut reasons = Vec::new();
        if !self.branch_nodes.is_empty() {
            reasons.push(format!("{} node > 2deg", self.branch_nodes.len()));
        }
        if !self.dead_ends.is_empty() {
            reasons.push(format!("{} dead end", self.dead_ends.len()));
        }
        if !self.unresolved_members.is_empty() {
            reasons.push(format!("{} unresolved member", self.unresolved_members.len()));
        }
        if !self.unreached_members.is_empty() {
            reasons.push(format!("{} unreached member", self.unreached_members.len()));
        }

        write!(f, "{} ({}) is not routable", self.route_id, self.route_name)?;
        if !reasons.is_empty() {
            write!(f, ": {}", reasons.join(", "))?;
        }
        Ok(())
    }
}

/// A composite route that cannot be expressed as one line because of one or
/// more of its children. Nests to arbitrary depth, mirroring the hierarchy.
#[derive(Debug, Clone, PartialEq)]
pub struct CompositeTopologyError {
    pub route_id: ElementId,
    pub route_name: String,
    /// child errors in member order
    pub children: Vec<TopologyError>,
}

impl fmt::Display for CompositeTopologyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({}) is not routable", self.route_id, self.route_name)?;
        // child messages indent two spaces per nesting level
        for child in &self.children {
            for line in child.to_string().lines() {
                write!(f, "\n  {line}")?;
            }
        }
        Ok(())
    }
}
