//! Endpoint graph: construction, degree classification, and path ordering
//!
//! The graph is an undirected multigraph over endpoint node ids. Every member
//! contributes two directed entries with opposite signs, one per direction of
//! travel, so looking up an edge during the ordering walk yields the member id
//! already signed for the direction it is traversed in.
//!
//! Insertion order of nodes and adjacency entries is preserved: the degree
//! buckets and the traversal's choice of start node depend on it for
//! deterministic output.

use std::collections::{HashMap, HashSet};

use crate::element::{ElementId, SignedId};

/// Adjacency entry: neighbor node plus the signed member id reaching it
pub type Entry = (ElementId, SignedId);

/// Undirected multigraph keyed by endpoint node identity.
///
/// Parallel edges and self-loops keep all their entries; a self-loop is
/// recorded as two opposite-signed entries under its single node.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EndpointGraph {
    order: Vec<ElementId>,
    adj: HashMap<ElementId, Vec<Entry>>,
}

impl EndpointGraph {
    pub fn new() -> Self {
        EndpointGraph::default()
    }

    /// Insert one member edge `a -- b`, recorded in both directions with
    /// opposite signs.
    pub fn insert_member(&mut self, a: ElementId, b: ElementId, member: ElementId) {
        self.push_entry(a, b, member.forward());
        self.push_entry(b, a, member.reversed());
    }

    fn push_entry(&mut self, from: ElementId, to: ElementId, id: SignedId) {
        let Self { order, adj } = self;
        adj.entry(from)
            .or_insert_with(|| {
                order.push(from);
                Vec::new()
            })
            .push((to, id));
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn node_count(&self) -> usize {
        self.order.len()
    }

    /// Node ids in insertion order
    pub fn nodes(&self) -> impl Iterator<Item = ElementId> + '_ {
        self.order.iter().copied()
    }

    /// Adjacency entries of a node in insertion order
    pub fn entries(&self, node: ElementId) -> &[Entry] {
        self.adj.get(&node).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Incident-entry count of a node
    pub fn degree(&self, node: ElementId) -> usize {
        self.entries(node).len()
    }

    /// Distinct member ids present in the graph, in insertion order
    pub fn members(&self) -> Vec<ElementId> {
        let mut seen = HashSet::new();
        let mut members = Vec::new();
        for node in self.nodes() {
            for (_, signed) in self.entries(node) {
                if seen.insert(signed.id) {
                    members.push(signed.id);
                }
            }
        }
        members
    }
}

/// Graph nodes bucketed by `min(degree, 3)`
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DegreeBuckets {
    buckets: [Vec<ElementId>; 4],
}

impl DegreeBuckets {
    pub fn classify(graph: &EndpointGraph) -> Self {
        let mut buckets = DegreeBuckets::default();
        for node in graph.nodes() {
            buckets.buckets[graph.degree(node).min(3)].push(node);
        }
        buckets
    }

    /// Node ids with the given degree (3 means three or more), in the order
    /// their nodes entered the graph
    pub fn bucket(&self, degree: usize) -> &[ElementId] {
        &self.buckets[degree.min(3)]
    }

    /// Whether a graph with these buckets can be walked as a single open path
    /// or closed loop: no branch nodes, and either zero dead ends (round trip)
    /// or exactly two (one way).
    pub fn routable(&self) -> bool {
        self.buckets[3].is_empty() && matches!(self.buckets[1].len(), 0 | 2)
    }

    /// Round trip: routable with no dead ends
    pub fn is_round_trip(&self) -> bool {
        self.routable() && self.buckets[1].is_empty()
    }
}

/// Walk the graph from its canonical start, emitting each member edge once.
///
/// One-way routes start at the first degree-1 node in insertion order;
/// round trips start at the first node and stop on returning to it. The walk
/// never immediately backtracks: the candidate entry excludes the member just
/// traversed, which also makes two-member loops (parallel edges) walkable.
///
/// Returns the ordered direction-signed member sequence, or the members the
/// walk never reached when the graph is not a single connected component.
pub fn ordered_member_ids(graph: &EndpointGraph) -> Result<Vec<SignedId>, Vec<ElementId>> {
    let members = graph.members();

    // single-member routes (including a lone closed way) short-circuit
    if let [only] = members.as_slice() {
        return Ok(vec![only.forward()]);
    }
    let Some(first) = graph.nodes().next() else {
        return Ok(Vec::new());
    };

    let (mut curr, end) = match graph.nodes().find(|node| graph.degree(*node) == 1) {
        Some(start) => (start, None),
        None => (first, Some(first)),
    };

    let mut ordered = Vec::with_capacity(members.len());
    let mut last_member: Option<ElementId> = None;

    loop {
        let next = graph
            .entries(curr)
            .iter()
            .find(|(_, signed)| Some(signed.id) != last_member);
        let Some(&(next_node, signed)) = next else {
            break; // dead end reached
        };

        ordered.push(signed);
        last_member = Some(signed.id);
        curr = next_node;

        if end == Some(curr) {
            break; // round trip closed
        }
    }

    if ordered.len() != members.len() {
        let visited: HashSet<ElementId> = ordered.iter().map(|signed| signed.id).collect();
        return Err(members
            .into_iter()
            .filter(|member| !visited.contains(member))
            .collect());
    }

    Ok(ordered)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn way(id: i64) -> ElementId {
        ElementId::way(id)
    }

    fn node(id: i64) -> ElementId {
        ElementId::node(id)
    }

    /// seg12: n102 -> n103, seg13: n104 -> n103 (scenario A shape)
    fn two_segment_path() -> EndpointGraph {
        let mut graph = EndpointGraph::new();
        graph.insert_member(node(102), node(103), way(12));
        graph.insert_member(node(104), node(103), way(13));
        graph
    }

    fn triangle_loop(base: i64) -> EndpointGraph {
        let mut graph = EndpointGraph::new();
        graph.insert_member(node(base), node(base + 1), way(base * 10));
        graph.insert_member(node(base + 1), node(base + 2), way(base * 10 + 1));
        graph.insert_member(node(base + 2), node(base), way(base * 10 + 2));
        graph
    }

    #[test]
    fn test_edge_symmetry() {
        let graph = two_segment_path();
        for a in graph.nodes() {
            for &(b, signed) in graph.entries(a) {
                assert!(
                    graph
                        .entries(b)
                        .iter()
                        .any(|&(back, s)| back == a && s == signed.flipped()),
                    "missing opposite-signed entry for {signed} at {b}"
                );
            }
        }
    }

    #[test]
    fn test_degree_buckets_preserve_insertion_order() {
        let buckets = DegreeBuckets::classify(&two_segment_path());
        assert_eq!(buckets.bucket(0), &[]);
        assert_eq!(buckets.bucket(1), &[node(102), node(104)]);
        assert_eq!(buckets.bucket(2), &[node(103)]);
        assert_eq!(buckets.bucket(3), &[]);
    }

    #[test]
    fn test_routability_matches_degree_predicate() {
        // one way: two dead ends
        assert!(DegreeBuckets::classify(&two_segment_path()).routable());

        // round trip: no dead ends
        let buckets = DegreeBuckets::classify(&triangle_loop(1));
        assert!(buckets.routable());
        assert!(buckets.is_round_trip());

        // four dead ends: disjoint segments
        let mut disjoint = EndpointGraph::new();
        disjoint.insert_member(node(102), node(106), way(12));
        disjoint.insert_member(node(104), node(103), way(13));
        assert!(!DegreeBuckets::classify(&disjoint).routable());

        // branch node
        let mut branched = two_segment_path();
        branched.insert_member(node(103), node(105), way(14));
        assert!(!DegreeBuckets::classify(&branched).routable());

        // exactly one dead end: a path welded to a loop
        let mut lollipop = triangle_loop(1);
        lollipop.insert_member(node(9), node(1), way(99));
        assert!(!DegreeBuckets::classify(&lollipop).routable());
    }

    #[test]
    fn test_ordered_one_way_signs_direction() {
        let ordered = ordered_member_ids(&two_segment_path()).unwrap();
        assert_eq!(ordered, vec![way(12).forward(), way(13).reversed()]);
    }

    #[test]
    fn test_ordered_round_trip_visits_every_member() {
        let ordered = ordered_member_ids(&triangle_loop(1)).unwrap();
        assert_eq!(ordered.len(), 3);

        let mut seen: Vec<ElementId> = ordered.iter().map(|signed| signed.id).collect();
        seen.sort();
        assert_eq!(seen, vec![way(10), way(11), way(12)]);
    }

    #[test]
    fn test_ordered_single_member() {
        let mut graph = EndpointGraph::new();
        graph.insert_member(node(1), node(2), way(5));
        assert_eq!(ordered_member_ids(&graph).unwrap(), vec![way(5).forward()]);
    }

    #[test]
    fn test_ordered_single_closed_way() {
        // closed way: both endpoints are the same node
        let mut graph = EndpointGraph::new();
        graph.insert_member(node(1), node(1), way(5));
        assert_eq!(graph.degree(node(1)), 2);
        assert!(DegreeBuckets::classify(&graph).routable());
        assert_eq!(ordered_member_ids(&graph).unwrap(), vec![way(5).forward()]);
    }

    #[test]
    fn test_ordered_two_member_loop_uses_both_edges() {
        // parallel edges between the same node pair
        let mut graph = EndpointGraph::new();
        graph.insert_member(node(1), node(2), way(5));
        graph.insert_member(node(2), node(1), way(6));
        assert!(DegreeBuckets::classify(&graph).routable());

        let ordered = ordered_member_ids(&graph).unwrap();
        assert_eq!(ordered.len(), 2);
        assert_ne!(ordered[0].id, ordered[1].id);
    }

    #[test]
    fn test_ordered_rejects_disjoint_loops() {
        // two disjoint triangles pass the degree predicate but are not one line
        let mut graph = triangle_loop(1);
        graph.insert_member(node(7), node(8), way(70));
        graph.insert_member(node(8), node(9), way(71));
        graph.insert_member(node(9), node(7), way(72));
        assert!(DegreeBuckets::classify(&graph).routable());

        let unreached = ordered_member_ids(&graph).unwrap_err();
        assert_eq!(unreached, vec![way(70), way(71), way(72)]);
    }
}
