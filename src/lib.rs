//! Topology engine for OSM route and superroute relations.
//!
//! Feed it the elements of an Overpass `out meta geom` query and it builds a
//! registry of routes, classifies each one by endpoint-graph topology, orders
//! members into a continuous traversal with per-member direction signs, and
//! renders the result as GeoJSON line features. Superroutes compose
//! recursively: a parent's topology is derived from its children's end nodes,
//! and its deep shapes expand down to individual ways.
//!
//! ```
//! use butterfly_routes::{ElementId, RouteData};
//!
//! let data = RouteData::from_overpass_json(r#"{
//!     "elements": [
//!         {"type": "way", "id": 12, "nodes": [102, 103],
//!          "geometry": [{"lat": 102, "lon": 102}, {"lat": 103, "lon": 103}]},
//!         {"type": "way", "id": 13, "nodes": [104, 103],
//!          "geometry": [{"lat": 104, "lon": 104}, {"lat": 103, "lon": 103}]},
//!         {"type": "relation", "id": 2, "tags": {"type": "route"},
//!          "members": [
//!             {"type": "way", "ref": 12, "role": ""},
//!             {"type": "way", "ref": 13, "role": ""}
//!          ]}
//!     ]
//! }"#)?;
//!
//! let route = data.route(ElementId::relation(2)).unwrap();
//! assert!(route.is_routable(&data));
//!
//! let ordered: Vec<String> = route
//!     .ordered_member_ids(&data)?
//!     .iter()
//!     .map(ToString::to_string)
//!     .collect();
//! assert_eq!(ordered, ["w12", "-w13"]);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod data;
pub mod element;
pub mod error;
pub mod geojson;
pub mod graph;
pub mod parse;
pub mod route;

pub use data::{Element, ParentRef, RouteData, UnresolvedRef};
pub use element::{ElementId, ElementKind, Meta, Node, SignedId, Tags, Way};
pub use error::{CompositeTopologyError, RouteTopologyError, TopologyError};
pub use geojson::{Feature, FeatureCollection, Geometry, Position, Properties};
pub use graph::{DegreeBuckets, EndpointGraph};
pub use route::{Member, RouteKind, RouteRelation};
