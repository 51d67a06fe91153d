//! Route relations: topology classification, ordering, and geometry shapes
//!
//! A [`RouteRelation`] is either a plain route (members are ways) or a
//! superroute (members are other routes), tagged by [`RouteKind`]. Both share
//! the same endpoint-graph topology and ordering machinery; only the choice of
//! children and the deep (recursive) shape queries differ.
//!
//! Derived values (endpoint graph, routability, ordered member sequence) are
//! computed at most once per instance and cached; relations are immutable
//! after construction, so the caches can never go stale.

use once_cell::sync::OnceCell;
use serde_json::{Map, Value};

use crate::data::RouteData;
use crate::element::{element_properties, ElementId, ElementKind, Meta, SignedId, Tags};
use crate::error::{CompositeTopologyError, RouteTopologyError, TopologyError};
use crate::geojson::{
    reverse_feature_collection, reverse_line_feature, Feature, FeatureCollection, Geometry,
};
use crate::graph::{self, DegreeBuckets, EndpointGraph};
use crate::parse::RawRelation;

/// Role marking a member as an alternative branch, excluded from topology
pub const ROLE_ALTERNATIVE: &str = "alternative";

/// Typed, role-tagged reference from a relation to a child element
#[derive(Debug, Clone, PartialEq)]
pub struct Member {
    pub kind: ElementKind,
    pub ref_id: i64,
    pub role: String,
}

impl Member {
    pub fn element_id(&self) -> ElementId {
        ElementId::new(self.kind, self.ref_id)
    }

    pub fn is_alternative(&self) -> bool {
        self.role == ROLE_ALTERNATIVE
    }
}

/// Which level of the route hierarchy a relation sits at
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteKind {
    /// children are ways
    Route,
    /// children are other routes or superroutes
    SuperRoute,
}

impl RouteKind {
    /// Element kind of the children this route derives its topology from
    fn child_kind(self) -> ElementKind {
        match self {
            RouteKind::Route => ElementKind::Way,
            RouteKind::SuperRoute => ElementKind::Relation,
        }
    }
}

/// Why a member could not contribute an edge or a line to its parent
enum MemberFailure {
    /// no resolved element behind the reference
    Unresolved,
    /// the child is itself a route that failed
    Child(TopologyError),
}

/// A route or superroute relation
#[derive(Debug)]
pub struct RouteRelation {
    pub id: ElementId,
    pub kind: RouteKind,
    pub tags: Tags,
    pub meta: Meta,
    members: Vec<Member>,
    graph: OnceCell<Result<EndpointGraph, TopologyError>>,
    routable: OnceCell<bool>,
    ordered: OnceCell<Result<Vec<SignedId>, TopologyError>>,
}

impl RouteRelation {
    pub(crate) fn from_raw(kind: RouteKind, raw: RawRelation) -> Self {
        RouteRelation {
            id: ElementId::relation(raw.id),
            kind,
            tags: raw.tags,
            meta: raw.meta,
            members: raw
                .members
                .into_iter()
                .map(|m| Member {
                    kind: m.kind,
                    ref_id: m.ref_id,
                    role: m.role,
                })
                .collect(),
            graph: OnceCell::new(),
            routable: OnceCell::new(),
            ordered: OnceCell::new(),
        }
    }

    /// All member references, in relation order
    pub fn members(&self) -> &[Member] {
        &self.members
    }

    pub fn name(&self) -> String {
        self.tags.get("name").cloned().unwrap_or_default()
    }

    pub fn properties(&self) -> Map<String, Value> {
        element_properties(self.id, &self.meta, &self.tags)
    }

    /// Members of the child kind this route's topology is built from,
    /// excluding alternatives
    fn primary_children(&self) -> impl Iterator<Item = &Member> {
        let child_kind = self.kind.child_kind();
        self.members
            .iter()
            .filter(move |m| m.kind == child_kind && !m.is_alternative())
    }

    fn alternative_children(&self) -> impl Iterator<Item = &Member> {
        let child_kind = self.kind.child_kind();
        self.members
            .iter()
            .filter(move |m| m.kind == child_kind && m.is_alternative())
    }

    //
    // topology
    //

    /// The endpoint graph over this route's non-alternative members.
    /// Built once; a build failure is cached as the aggregated error.
    pub fn endpoint_graph(&self, data: &RouteData) -> Result<&EndpointGraph, TopologyError> {
        self.graph
            .get_or_init(|| self.build_graph(data))
            .as_ref()
            .map_err(Clone::clone)
    }

    fn build_graph(&self, data: &RouteData) -> Result<EndpointGraph, TopologyError> {
        let mut graph = EndpointGraph::new();
        let mut unresolved = Vec::new();
        let mut child_errors = Vec::new();

        for member in self.primary_children() {
            let member_id = member.element_id();
            match self.member_end_nodes(member_id, data) {
                Ok((a, b)) => graph.insert_member(a, b, member_id),
                Err(MemberFailure::Unresolved) => unresolved.push(member_id),
                Err(MemberFailure::Child(err)) => child_errors.push(err),
            }
        }

        match self.aggregate_failures(unresolved, child_errors) {
            Some(err) => Err(err),
            None => Ok(graph),
        }
    }

    /// Endpoint node pair of one member: a way's first/last node, or a child
    /// route's own end nodes (which requires the child to be routable).
    fn member_end_nodes(
        &self,
        member_id: ElementId,
        data: &RouteData,
    ) -> Result<(ElementId, ElementId), MemberFailure> {
        match self.kind {
            RouteKind::Route => data
                .way(member_id)
                .and_then(|way| way.end_nodes())
                .ok_or(MemberFailure::Unresolved),
            RouteKind::SuperRoute => {
                let child = data.route(member_id).ok_or(MemberFailure::Unresolved)?;
                child.end_nodes(data).map_err(MemberFailure::Child)
            }
        }
    }

    /// Fold member failures into a single topology error: unresolved members
    /// become a single-route error attributed to this relation; child errors
    /// nest under a composite error in member order.
    fn aggregate_failures(
        &self,
        unresolved: Vec<ElementId>,
        mut child_errors: Vec<TopologyError>,
    ) -> Option<TopologyError> {
        if unresolved.is_empty() && child_errors.is_empty() {
            return None;
        }

        let own = (!unresolved.is_empty()).then(|| {
            TopologyError::Route(RouteTopologyError {
                unresolved_members: unresolved,
                ..RouteTopologyError::new(self.id, self.name())
            })
        });

        if child_errors.is_empty() {
            return own;
        }
        if let Some(own) = own {
            child_errors.push(own);
        }
        Some(TopologyError::Composite(CompositeTopologyError {
            route_id: self.id,
            route_name: self.name(),
            children: child_errors,
        }))
    }

    /// Graph nodes bucketed by degree
    pub fn degree_buckets(&self, data: &RouteData) -> Result<DegreeBuckets, TopologyError> {
        Ok(DegreeBuckets::classify(self.endpoint_graph(data)?))
    }

    /// Whether this route can be expressed as exactly one continuous line
    /// (open path or closed loop). Never fails: a graph-build failure simply
    /// classifies the route as not routable.
    pub fn is_routable(&self, data: &RouteData) -> bool {
        *self.routable.get_or_init(|| match self.endpoint_graph(data) {
            Ok(graph) => !graph.is_empty() && DegreeBuckets::classify(graph).routable(),
            Err(_) => false,
        })
    }

    /// The topology error explaining why this route is not routable
    fn topology_error(&self, data: &RouteData) -> TopologyError {
        match self.endpoint_graph(data) {
            Err(err) => err,
            Ok(graph) => {
                let buckets = DegreeBuckets::classify(graph);
                let dead_ends = buckets.bucket(1);
                TopologyError::Route(RouteTopologyError {
                    branch_nodes: buckets.bucket(3).to_vec(),
                    dead_ends: if dead_ends.len() == 2 {
                        Vec::new()
                    } else {
                        dead_ends.to_vec()
                    },
                    ..RouteTopologyError::new(self.id, self.name())
                })
            }
        }
    }

    fn ensure_routable(&self, data: &RouteData) -> Result<(), TopologyError> {
        if self.is_routable(data) {
            Ok(())
        } else {
            Err(self.topology_error(data))
        }
    }

    /// Start and end node of the route. A round trip reports the same node
    /// twice. Fails when the route is not routable.
    pub fn end_nodes(&self, data: &RouteData) -> Result<(ElementId, ElementId), TopologyError> {
        self.ensure_routable(data)?;
        let buckets = self.degree_buckets(data)?;

        match buckets.bucket(1) {
            [] => match buckets.bucket(2).first() {
                Some(&node) => Ok((node, node)),
                None => Err(self.topology_error(data)),
            },
            [start, end] => Ok((*start, *end)),
            _ => Err(self.topology_error(data)),
        }
    }

    /// Ordered, direction-signed member identifiers tracing the route from
    /// one end to the other (or all the way around a round trip). Fails when
    /// the route is not routable or its graph is not a single component.
    pub fn ordered_member_ids(&self, data: &RouteData) -> Result<&[SignedId], TopologyError> {
        self.ordered
            .get_or_init(|| {
                self.ensure_routable(data)?;
                let graph = self.endpoint_graph(data)?;
                graph::ordered_member_ids(graph).map_err(|unreached| {
                    TopologyError::Route(RouteTopologyError {
                        unreached_members: unreached,
                        ..RouteTopologyError::new(self.id, self.name())
                    })
                })
            })
            .as_ref()
            .map(Vec::as_slice)
            .map_err(Clone::clone)
    }

    //
    // geometry shapes
    //

    /// One member as a single line: a way's own LineString, or a child
    /// route's single-line shape (requiring the child to be routable).
    fn member_line_feature(
        &self,
        member_id: ElementId,
        data: &RouteData,
    ) -> Result<Feature, MemberFailure> {
        match self.kind {
            RouteKind::Route => data
                .way(member_id)
                .map(|way| way.line_string_feature())
                .ok_or(MemberFailure::Unresolved),
            RouteKind::SuperRoute => {
                let child = data.route(member_id).ok_or(MemberFailure::Unresolved)?;
                child.line_string_feature(data).map_err(MemberFailure::Child)
            }
        }
    }

    /// Unordered, per-member shape: each non-alternative member as its own
    /// line feature, in relation member order.
    pub fn feature_collection(&self, data: &RouteData) -> Result<FeatureCollection, TopologyError> {
        let mut features = Vec::new();
        let mut unresolved = Vec::new();
        let mut child_errors = Vec::new();

        for member in self.primary_children() {
            match self.member_line_feature(member.element_id(), data) {
                Ok(feature) => features.push(feature),
                Err(MemberFailure::Unresolved) => unresolved.push(member.element_id()),
                Err(MemberFailure::Child(err)) => child_errors.push(err),
            }
        }

        match self.aggregate_failures(unresolved, child_errors) {
            Some(err) => Err(err),
            None => Ok(FeatureCollection::new(features)),
        }
    }

    /// Unordered multi-line shape with this relation's own properties
    pub fn multi_line_string_feature(&self, data: &RouteData) -> Result<Feature, TopologyError> {
        Ok(self
            .feature_collection(data)?
            .into_multi_line_string(self.properties()))
    }

    /// Ordered, per-member shape: members in traversal order, each reversed
    /// where the traversal runs against its coordinate order (reflected in
    /// the feature's `@id`).
    pub fn ordered_feature_collection(
        &self,
        data: &RouteData,
    ) -> Result<FeatureCollection, TopologyError> {
        let ordered = self.ordered_member_ids(data)?.to_vec();
        let mut features = Vec::with_capacity(ordered.len());
        let mut unresolved = Vec::new();
        let mut child_errors = Vec::new();

        for signed in ordered {
            match self.member_line_feature(signed.id, data) {
                Ok(feature) if signed.reversed => features.push(reverse_line_feature(&feature)),
                Ok(feature) => features.push(feature),
                Err(MemberFailure::Unresolved) => unresolved.push(signed.id),
                Err(MemberFailure::Child(err)) => child_errors.push(err),
            }
        }

        match self.aggregate_failures(unresolved, child_errors) {
            Some(err) => Err(err),
            None => Ok(FeatureCollection::new(features)),
        }
    }

    /// The route as one continuous LineString: members concatenated in
    /// traversal order, dropping each subsequent member's first coordinate
    /// (the shared endpoint). Fails when the route is not routable.
    pub fn line_string_feature(&self, data: &RouteData) -> Result<Feature, TopologyError> {
        let ordered = self.ordered_feature_collection(data)?;

        let mut coordinates = Vec::new();
        for (index, feature) in ordered.features.iter().enumerate() {
            let line = feature.line_coordinates().unwrap_or(&[]);
            let skip = usize::from(index > 0);
            coordinates.extend(line.iter().skip(skip).copied());
        }

        Ok(Feature::new(
            self.properties(),
            Geometry::LineString { coordinates },
        ))
    }

    /// A LineString when routable, otherwise the deep multi-line shape
    pub fn simplest_feature(&self, data: &RouteData) -> Result<Feature, TopologyError> {
        if self.is_routable(data) {
            self.line_string_feature(data)
        } else {
            self.deep_multi_line_string_feature(data)
        }
    }

    //
    // deep (recursive) shapes; for plain routes these equal the shallow ones
    //

    /// Depth-first expansion of every non-alternative descendant way, in
    /// member order, without any ordering or reversal.
    pub fn deep_feature_collection(
        &self,
        data: &RouteData,
    ) -> Result<FeatureCollection, TopologyError> {
        match self.kind {
            RouteKind::Route => self.feature_collection(data),
            RouteKind::SuperRoute => {
                let mut features = Vec::new();
                let mut unresolved = Vec::new();
                let mut child_errors = Vec::new();

                for member in self.primary_children() {
                    match data.route(member.element_id()) {
                        None => unresolved.push(member.element_id()),
                        Some(child) => match child.deep_feature_collection(data) {
                            Ok(collection) => features.extend(collection.features),
                            Err(err) => child_errors.push(err),
                        },
                    }
                }

                match self.aggregate_failures(unresolved, child_errors) {
                    Some(err) => Err(err),
                    None => Ok(FeatureCollection::new(features)),
                }
            }
        }
    }

    /// Ordered depth-first expansion down to ways: children in traversal
    /// order, with a child reversed by the parent having its whole deep
    /// output reversed (line order, coordinates, and traversal flags).
    pub fn deep_ordered_feature_collection(
        &self,
        data: &RouteData,
    ) -> Result<FeatureCollection, TopologyError> {
        match self.kind {
            RouteKind::Route => self.ordered_feature_collection(data),
            RouteKind::SuperRoute => {
                let ordered = self.ordered_member_ids(data)?.to_vec();
                let mut features = Vec::new();
                let mut unresolved = Vec::new();
                let mut child_errors = Vec::new();

                for signed in ordered {
                    match data.route(signed.id) {
                        None => unresolved.push(signed.id),
                        Some(child) => match child.deep_ordered_feature_collection(data) {
                            Ok(collection) if signed.reversed => {
                                features.extend(reverse_feature_collection(&collection).features)
                            }
                            Ok(collection) => features.extend(collection.features),
                            Err(err) => child_errors.push(err),
                        },
                    }
                }

                match self.aggregate_failures(unresolved, child_errors) {
                    Some(err) => Err(err),
                    None => Ok(FeatureCollection::new(features)),
                }
            }
        }
    }

    /// Deep unordered multi-line shape: every descendant way as one line of
    /// a MultiLineString carrying this relation's properties.
    pub fn deep_multi_line_string_feature(
        &self,
        data: &RouteData,
    ) -> Result<Feature, TopologyError> {
        Ok(self
            .deep_feature_collection(data)?
            .into_multi_line_string(self.properties()))
    }

    //
    // alternatives
    //

    /// Alternative-role members, excluded from topology and ordering. A plain
    /// route expands one level (its alternative ways); a superroute collects
    /// its alternative children's simplest shapes plus each primary child's
    /// own alternatives, flattened.
    pub fn alternatives(&self, data: &RouteData) -> Result<FeatureCollection, TopologyError> {
        let mut features = Vec::new();
        let mut unresolved = Vec::new();
        let mut child_errors = Vec::new();

        match self.kind {
            RouteKind::Route => {
                for member in self.alternative_children() {
                    match data.way(member.element_id()) {
                        Some(way) => features.push(way.line_string_feature()),
                        None => unresolved.push(member.element_id()),
                    }
                }
            }
            RouteKind::SuperRoute => {
                let child_kind = self.kind.child_kind();
                for member in self.members.iter().filter(|m| m.kind == child_kind) {
                    let Some(child) = data.route(member.element_id()) else {
                        unresolved.push(member.element_id());
                        continue;
                    };
                    if member.is_alternative() {
                        match child.simplest_feature(data) {
                            Ok(feature) => features.push(feature),
                            Err(err) => child_errors.push(err),
                        }
                    } else {
                        match child.alternatives(data) {
                            Ok(collection) => features.extend(collection.features),
                            Err(err) => child_errors.push(err),
                        }
                    }
                }
            }
        }

        match self.aggregate_failures(unresolved, child_errors) {
            Some(err) => Err(err),
            None => Ok(FeatureCollection::new(features)),
        }
    }
}
