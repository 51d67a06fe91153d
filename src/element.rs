//! Element identity and shared element data
//!
//! Every element is addressed by an [`ElementId`]: its numeric OSM id scoped by
//! kind, so node 12 and way 12 never collide as registry or graph keys. A
//! [`SignedId`] qualifies a member id with its direction of travel.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::geojson::{Feature, Geometry, Position};
use crate::parse::{RawNode, RawWay};

/// Free-form OSM tags
pub type Tags = BTreeMap<String, String>;

/// Kind of an OSM element; also selects the single-character id-space prefix
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ElementKind {
    Node,
    Way,
    Relation,
}

impl ElementKind {
    pub fn prefix(self) -> char {
        match self {
            ElementKind::Node => 'n',
            ElementKind::Way => 'w',
            ElementKind::Relation => 'r',
        }
    }
}

/// Kind-scoped element identifier, displayed as `n102` / `w12` / `r2`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ElementId {
    pub kind: ElementKind,
    pub id: i64,
}

impl ElementId {
    pub fn new(kind: ElementKind, id: i64) -> Self {
        ElementId { kind, id }
    }

    pub fn node(id: i64) -> Self {
        Self::new(ElementKind::Node, id)
    }

    pub fn way(id: i64) -> Self {
        Self::new(ElementKind::Way, id)
    }

    pub fn relation(id: i64) -> Self {
        Self::new(ElementKind::Relation, id)
    }

    /// This member traversed in its own coordinate order
    pub fn forward(self) -> SignedId {
        SignedId {
            id: self,
            reversed: false,
        }
    }

    /// This member traversed against its own coordinate order
    pub fn reversed(self) -> SignedId {
        SignedId {
            id: self,
            reversed: true,
        }
    }
}

impl fmt::Display for ElementId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.kind.prefix(), self.id)
    }
}

/// A member id qualified with a traversal direction.
///
/// Two signed ids with the same [`ElementId`] refer to the same edge but
/// opposite traversals. Displays as `w12` / `-w13`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SignedId {
    pub id: ElementId,
    pub reversed: bool,
}

impl SignedId {
    /// Same member, opposite direction of travel
    pub fn flipped(self) -> Self {
        SignedId {
            id: self.id,
            reversed: !self.reversed,
        }
    }
}

impl fmt::Display for SignedId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.reversed {
            write!(f, "-{}", self.id)
        } else {
            write!(f, "{}", self.id)
        }
    }
}

/// Provenance metadata of a source record. Fields absent on the source stay
/// `None` and are omitted from surfaced properties, never emitted as null.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Meta {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub changeset: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub uid: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<u32>,
}

impl Meta {
    fn annotate(&self, props: &mut Map<String, Value>) {
        if let Some(changeset) = self.changeset {
            props.insert("@changeset".to_string(), changeset.into());
        }
        if let Some(timestamp) = &self.timestamp {
            props.insert("@timestamp".to_string(), timestamp.clone().into());
        }
        if let Some(uid) = self.uid {
            props.insert("@uid".to_string(), uid.into());
        }
        if let Some(user) = &self.user {
            props.insert("@user".to_string(), user.clone().into());
        }
        if let Some(version) = self.version {
            props.insert("@version".to_string(), version.into());
        }
    }
}

/// GeoJSON `properties` of an element: `@id`, `@`-prefixed metadata fields
/// that were present on the source record, then the free-form tags.
pub(crate) fn element_properties(id: ElementId, meta: &Meta, tags: &Tags) -> Map<String, Value> {
    let mut props = Map::new();
    props.insert("@id".to_string(), id.to_string().into());
    meta.annotate(&mut props);
    for (key, value) in tags {
        props.insert(key.clone(), value.clone().into());
    }
    props
}

/// A point element; routes only use it as a graph vertex key
#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    pub id: ElementId,
    pub lat: f64,
    pub lon: f64,
    pub tags: Tags,
    pub meta: Meta,
}

impl From<RawNode> for Node {
    fn from(raw: RawNode) -> Self {
        Node {
            id: ElementId::node(raw.id),
            lat: raw.lat,
            lon: raw.lon,
            tags: raw.tags,
            meta: raw.meta,
        }
    }
}

/// A linear feature: an ordered coordinate sequence plus the node ids of its
/// two endpoints. Immutable after construction.
#[derive(Debug, Clone, PartialEq)]
pub struct Way {
    pub id: ElementId,
    nodes: Vec<i64>,
    coords: Vec<Position>,
    pub tags: Tags,
    pub meta: Meta,
}

impl Way {
    /// Endpoint node ids (first and last coordinate), or `None` for a way
    /// without nodes, which can never participate in a topology.
    pub fn end_nodes(&self) -> Option<(ElementId, ElementId)> {
        let first = *self.nodes.first()?;
        let last = *self.nodes.last()?;
        Some((ElementId::node(first), ElementId::node(last)))
    }

    /// `[lon, lat]` coordinate sequence
    pub fn coords(&self) -> &[Position] {
        &self.coords
    }

    pub fn properties(&self) -> Map<String, Value> {
        element_properties(self.id, &self.meta, &self.tags)
    }

    /// This way as a GeoJSON LineString feature
    pub fn line_string_feature(&self) -> Feature {
        Feature::new(
            self.properties(),
            Geometry::LineString {
                coordinates: self.coords.clone(),
            },
        )
    }
}

impl From<RawWay> for Way {
    fn from(raw: RawWay) -> Self {
        Way {
            id: ElementId::way(raw.id),
            nodes: raw.nodes,
            coords: raw.geometry.iter().map(|g| [g.lon, g.lat]).collect(),
            tags: raw.tags,
            meta: raw.meta,
        }
    }
}
