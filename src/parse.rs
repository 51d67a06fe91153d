//! Raw Overpass-JSON element model
//!
//! Mirrors the element shape produced by an `out meta geom` Overpass query.
//! The registry ([`crate::data::RouteData`]) consumes these records and
//! classifies them; nothing here performs network or file I/O.

use std::collections::BTreeMap;

use serde::Deserialize;

use crate::element::{ElementKind, Meta};

/// One element of an Overpass query result
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum RawElement {
    Node(RawNode),
    Way(RawWay),
    Relation(RawRelation),
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawNode {
    pub id: i64,
    pub lat: f64,
    pub lon: f64,
    #[serde(default)]
    pub tags: BTreeMap<String, String>,
    #[serde(flatten)]
    pub meta: Meta,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawWay {
    pub id: i64,
    #[serde(default)]
    pub nodes: Vec<i64>,
    #[serde(default)]
    pub geometry: Vec<LonLat>,
    #[serde(default)]
    pub tags: BTreeMap<String, String>,
    #[serde(flatten)]
    pub meta: Meta,
}

/// Coordinate pair as Overpass emits it on way geometries
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct LonLat {
    pub lon: f64,
    pub lat: f64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawRelation {
    pub id: i64,
    #[serde(default)]
    pub members: Vec<RawMember>,
    #[serde(default)]
    pub tags: BTreeMap<String, String>,
    #[serde(flatten)]
    pub meta: Meta,
}

/// Typed, role-tagged reference from a relation to a child element
#[derive(Debug, Clone, Deserialize)]
pub struct RawMember {
    #[serde(rename = "type")]
    pub kind: ElementKind,
    #[serde(rename = "ref")]
    pub ref_id: i64,
    #[serde(default)]
    pub role: String,
}

/// Top-level Overpass JSON payload
#[derive(Debug, Clone, Deserialize)]
pub struct OverpassJson {
    #[serde(default)]
    pub elements: Vec<RawElement>,
    #[serde(default)]
    pub osm3s: Option<Osm3s>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Osm3s {
    #[serde(default)]
    pub timestamp_osm_base: Option<String>,
}
