//! Element registry
//!
//! [`RouteData`] owns every element of one query result, keyed by
//! [`ElementId`] with insertion order preserved. Relations are classified on
//! ingest: a `type=route` relation whose members are ways becomes a plain
//! route, a `route` or `superroute` relation nesting other relations becomes
//! a superroute, and anything else (multipolygons, networks, superroutes
//! with no child routes) is skipped. The registry also records dangling member references up front so
//! callers can report data gaps without walking every topology.

use std::collections::HashMap;

use log::warn;

use crate::element::{ElementId, ElementKind, Node, Way};
use crate::parse::{OverpassJson, RawElement, RawRelation};
use crate::route::{Member, RouteKind, RouteRelation, ROLE_ALTERNATIVE};

/// One registered element
#[derive(Debug)]
pub enum Element {
    Node(Node),
    Way(Way),
    Route(RouteRelation),
}

impl Element {
    pub fn id(&self) -> ElementId {
        match self {
            Element::Node(node) => node.id,
            Element::Way(way) => way.id,
            Element::Route(route) => route.id,
        }
    }
}

/// A membership edge pointing upward: which relation holds the element, and
/// under which role
#[derive(Debug, Clone, PartialEq)]
pub struct ParentRef {
    pub parent: ElementId,
    pub role: String,
}

/// A member reference with no element behind it in this data set
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct UnresolvedRef {
    pub parent: ElementId,
    pub member: ElementId,
}

/// All elements of one query result
#[derive(Debug, Default)]
pub struct RouteData {
    elements: HashMap<ElementId, Element>,
    order: Vec<ElementId>,
    parents: HashMap<ElementId, Vec<ParentRef>>,
    unresolved: Vec<UnresolvedRef>,
    timestamp: Option<String>,
}

impl RouteData {
    /// Build a registry from parsed elements. Relation classification and the
    /// parent/unresolved indexes are computed here; later lookups are pure.
    pub fn from_elements(elements: Vec<RawElement>, timestamp: Option<String>) -> Self {
        let mut data = RouteData {
            timestamp,
            ..RouteData::default()
        };

        for element in elements {
            match element {
                RawElement::Node(raw) => data.insert(Element::Node(raw.into())),
                RawElement::Way(raw) => data.insert(Element::Way(raw.into())),
                RawElement::Relation(raw) => {
                    if let Some(kind) = classify_relation(&raw) {
                        data.insert(Element::Route(RouteRelation::from_raw(kind, raw)));
                    }
                }
            }
        }

        data.index_members();
        data
    }

    /// Parse a full Overpass JSON payload into a registry
    pub fn from_overpass_json(json: &str) -> Result<Self, serde_json::Error> {
        let payload: OverpassJson = serde_json::from_str(json)?;
        let timestamp = payload.osm3s.and_then(|o| o.timestamp_osm_base);
        Ok(Self::from_elements(payload.elements, timestamp))
    }

    fn insert(&mut self, element: Element) {
        let id = element.id();
        if self.elements.insert(id, element).is_none() {
            self.order.push(id);
        }
    }

    /// Walk every route's members once, filling the parent index and the
    /// unresolved-reference report. Node members (route markers, stops) are
    /// indexed but never reported missing when absent.
    fn index_members(&mut self) {
        let mut parents: HashMap<ElementId, Vec<ParentRef>> = HashMap::new();
        let mut unresolved = Vec::new();

        for id in &self.order {
            let Some(Element::Route(route)) = self.elements.get(id) else {
                continue;
            };
            for member in route.members() {
                let member_id = member.element_id();
                parents.entry(member_id).or_default().push(ParentRef {
                    parent: route.id,
                    role: member.role.clone(),
                });
                if member.kind != ElementKind::Node && !self.elements.contains_key(&member_id) {
                    warn!("{} refers to missing member {member_id}", route.id);
                    unresolved.push(UnresolvedRef {
                        parent: route.id,
                        member: member_id,
                    });
                }
            }
        }

        self.parents = parents;
        self.unresolved = unresolved;
    }

    pub fn get(&self, id: ElementId) -> Option<&Element> {
        self.elements.get(&id)
    }

    /// Resolve a member reference to its element; `None` marks a data gap
    pub fn resolved_member(&self, member: &Member) -> Option<&Element> {
        self.get(member.element_id())
    }

    pub fn node(&self, id: ElementId) -> Option<&Node> {
        match self.get(id) {
            Some(Element::Node(node)) => Some(node),
            _ => None,
        }
    }

    pub fn way(&self, id: ElementId) -> Option<&Way> {
        match self.get(id) {
            Some(Element::Way(way)) => Some(way),
            _ => None,
        }
    }

    pub fn route(&self, id: ElementId) -> Option<&RouteRelation> {
        match self.get(id) {
            Some(Element::Route(route)) => Some(route),
            _ => None,
        }
    }

    /// Every route and superroute, in input order
    pub fn all_routes(&self) -> impl Iterator<Item = &RouteRelation> {
        self.order.iter().filter_map(|id| self.route(*id))
    }

    /// Routes whose members are ways
    pub fn base_routes(&self) -> impl Iterator<Item = &RouteRelation> {
        self.all_routes()
            .filter(|route| route.kind == RouteKind::Route)
    }

    /// Routes whose members are other routes
    pub fn super_routes(&self) -> impl Iterator<Item = &RouteRelation> {
        self.all_routes()
            .filter(|route| route.kind == RouteKind::SuperRoute)
    }

    /// Relations holding the given element as a member
    pub fn parents_of(&self, id: ElementId) -> &[ParentRef] {
        self.parents.get(&id).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Way and relation member references with no element behind them
    pub fn unresolved(&self) -> &[UnresolvedRef] {
        &self.unresolved
    }

    /// `osm3s.timestamp_osm_base` of the source payload, when present
    pub fn timestamp(&self) -> Option<&str> {
        self.timestamp.as_deref()
    }
}

/// Decide whether a raw relation is a plain route, a superroute, or neither.
///
/// The superroute bucket requires at least one non-alternative relation
/// member, since its topology must be derived from child routes: a `route`
/// relation nests as soon as it carries one, and a `superroute` relation
/// without any is ignored rather than registered as an empty composite.
fn classify_relation(raw: &RawRelation) -> Option<RouteKind> {
    let nests = raw.members.iter().any(|member| {
        member.kind == ElementKind::Relation && member.role != ROLE_ALTERNATIVE
    });

    match raw.tags.get("type").map(String::as_str) {
        Some("route") if nests => Some(RouteKind::SuperRoute),
        Some("route") => Some(RouteKind::Route),
        Some("superroute") if nests => Some(RouteKind::SuperRoute),
        _ => None,
    }
}
