//! Decoding an Envoy admin config dump.
//!
//! A dump is a JSON object with a `configs` list of `Any` messages, each one
//! tagged with an `@type`. Both the typed decoder and the raw side channel
//! walk the same parsed tree with the helpers in this module, so positional
//! indexes always agree between the two.

mod decode;
mod enums;
pub mod model;
mod raw;
mod sections;

use enum_map::EnumMap;
use serde::Serialize;
use serde_json::{Map, Value};

pub use decode::{decode, decode_value, DecodeError};
pub use enums::{
    DiscoveryType, EnumValue, HealthStatus, LbPolicy, ProtoEnum, RoutingPriority,
    TrafficDirection,
};
pub use raw::{RawConfigs, RouteKey};
pub use sections::{ResourceType, Section};

use model::{Bootstrap, Cluster, ClusterLoadAssignment, Listener, RouteConfiguration};

/// Everything decoded from a single config dump.
#[derive(Clone, Debug, Default)]
pub struct ConfigSnapshot {
    pub bootstrap: Option<Bootstrap>,
    pub listeners: Vec<Decoded<Listener>>,
    pub clusters: Vec<Decoded<Cluster>>,
    pub routes: Vec<Decoded<RouteConfiguration>>,

    /// Never filled in by [decode]. Endpoints come from the admin
    /// `/clusters` interface, not from the config dump.
    pub endpoints: Vec<ClusterLoadAssignment>,

    pub raw: RawConfigs,
}

/// Where in a dump section a resource came from.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, enum_map::Enum)]
#[serde(rename_all = "snake_case")]
pub enum Origin {
    Static,
    Dynamic,
}

impl std::fmt::Display for Origin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Origin::Static => f.write_str("static"),
            Origin::Dynamic => f.write_str("dynamic"),
        }
    }
}

/// The lifecycle state Envoy reported a dynamic resource in. Static
/// resources are always active.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceState {
    Active,
    Warming,
    Draining,
}

/// A typed resource plus the bookkeeping from its dump entry.
#[derive(Clone, Debug, PartialEq)]
pub struct Decoded<T> {
    pub origin: Origin,
    pub state: ResourceState,

    /// The position of this entry among all entries with the same origin in
    /// its section, counting entries that failed to decode.
    pub index: usize,

    pub version_info: String,
    pub last_updated: String,
    pub resource: T,
}

/// One element of the top-level `configs` list.
pub(crate) enum SubMessage<'a> {
    Section(Section, &'a Map<String, Value>),
    Unrecognized(&'a str),
}

impl<'a> SubMessage<'a> {
    pub(crate) fn classify(config: &'a Value) -> Self {
        let Some(body) = config.as_object() else {
            return SubMessage::Unrecognized("");
        };

        let type_url = body.get("@type").and_then(Value::as_str).unwrap_or_default();
        match Section::from_type_url(type_url) {
            Some(section) => SubMessage::Section(section, body),
            None => SubMessage::Unrecognized(type_url),
        }
    }
}

/// A resource entry found inside a listener, cluster, or route section.
pub(crate) struct Entry<'a> {
    pub origin: Origin,
    pub state: ResourceState,
    pub index: usize,
    pub version_info: &'a str,
    pub last_updated: &'a str,
    pub resource: &'a Value,
}

impl<'a> Entry<'a> {
    pub(crate) fn decoded<T>(&self, resource: T) -> Decoded<T> {
        Decoded {
            origin: self.origin,
            state: self.state,
            index: self.index,
            version_info: self.version_info.to_string(),
            last_updated: self.last_updated.to_string(),
            resource,
        }
    }
}

/// Running per-origin positions for one resource type across a whole dump.
pub(crate) type EntryIndexes = EnumMap<Origin, usize>;

// (sub-section key, origin, fixed state). a missing state means the entry
// wraps its resource in one of the active/warming/draining states.
type SubSection = (&'static str, Origin, Option<ResourceState>);

const LISTENER_SUB_SECTIONS: &[SubSection] = &[
    ("static_listeners", Origin::Static, Some(ResourceState::Active)),
    ("dynamic_listeners", Origin::Dynamic, None),
];

const CLUSTER_SUB_SECTIONS: &[SubSection] = &[
    ("static_clusters", Origin::Static, Some(ResourceState::Active)),
    ("dynamic_active_clusters", Origin::Dynamic, Some(ResourceState::Active)),
    ("dynamic_warming_clusters", Origin::Dynamic, Some(ResourceState::Warming)),
];

const ROUTE_SUB_SECTIONS: &[SubSection] = &[
    ("static_route_configs", Origin::Static, Some(ResourceState::Active)),
    ("dynamic_route_configs", Origin::Dynamic, Some(ResourceState::Active)),
];

const LISTENER_STATES: &[(&str, ResourceState)] = &[
    ("active_state", ResourceState::Active),
    ("warming_state", ResourceState::Warming),
    ("draining_state", ResourceState::Draining),
];

/// List the resource entries in a section body in document order.
///
/// Only the listener, cluster, and route sections contain entries. Entries
/// without a resource (a dynamic listener that only has an `error_state`)
/// are left out but still take up an index.
pub(crate) fn section_entries<'a>(
    resource_type: ResourceType,
    body: &'a Map<String, Value>,
    indexes: &mut EntryIndexes,
) -> Vec<Entry<'a>> {
    let (sub_sections, field) = match resource_type {
        ResourceType::Listener => (LISTENER_SUB_SECTIONS, "listener"),
        ResourceType::Cluster => (CLUSTER_SUB_SECTIONS, "cluster"),
        ResourceType::RouteConfiguration => (ROUTE_SUB_SECTIONS, "route_config"),
        ResourceType::ClusterLoadAssignment => return Vec::new(),
    };

    let mut entries = Vec::new();
    for (key, value) in body {
        let Some((_, origin, state)) = sub_sections.iter().find(|(k, _, _)| k == key) else {
            continue;
        };
        let Some(items) = value.as_array() else {
            continue;
        };

        for item in items {
            let index = indexes[*origin];
            indexes[*origin] += 1;

            let (state, holder) = match state {
                Some(state) => (*state, item),
                None => {
                    let found = LISTENER_STATES
                        .iter()
                        .find_map(|(k, state)| item.get(*k).map(|holder| (*state, holder)));
                    match found {
                        Some(found) => found,
                        None => continue,
                    }
                }
            };

            let Some(resource) = holder.get(field) else {
                continue;
            };

            entries.push(Entry {
                origin: *origin,
                state,
                index,
                version_info: str_field(holder, "version_info"),
                last_updated: str_field(holder, "last_updated"),
                resource,
            });
        }
    }

    entries
}

/// The top-level `configs` list of a dump.
pub(crate) fn configs(dump: &Value) -> Result<&[Value], DecodeError> {
    let Some(dump) = dump.as_object() else {
        return Err(DecodeError::NotAnObject);
    };

    match dump.get("configs") {
        Some(Value::Array(configs)) => Ok(configs),
        Some(_) => Err(DecodeError::InvalidConfigs),
        None => Ok(&[]),
    }
}

fn str_field<'a>(value: &'a Value, key: &str) -> &'a str {
    value.get(key).and_then(Value::as_str).unwrap_or_default()
}
