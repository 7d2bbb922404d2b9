use std::collections::BTreeMap;

use serde_json::Value;
use tracing::warn;

use super::{section_entries, EntryIndexes, Origin, ResourceType, Section, SubMessage};

/// The original text of every named object in a dump.
///
/// Typed decoding drops anything our model doesn't know about, so this keeps
/// a pretty-printed copy of each listener, cluster, and route configuration
/// exactly as Envoy reported it. It's for display only.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct RawConfigs {
    bootstrap: Option<String>,
    listeners: BTreeMap<String, RawEntry>,
    clusters: BTreeMap<String, RawEntry>,
    routes: BTreeMap<RouteKey, String>,
}

#[derive(Clone, Debug, PartialEq)]
struct RawEntry {
    origin: Origin,
    text: String,
}

/// Route configurations are keyed by position as well as by name. Route names
/// are often blank, and the same name can show up as both a static and a
/// dynamic route.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RouteKey {
    pub origin: Origin,
    pub index: usize,
    pub name: String,
}

impl RouteKey {
    pub fn new(origin: Origin, index: usize, name: impl Into<String>) -> Self {
        Self {
            origin,
            index,
            name: name.into(),
        }
    }

    /// A human readable label for this key. Blank names are replaced with
    /// their origin and position.
    pub fn label(&self) -> String {
        if self.name.trim().is_empty() {
            format!("__empty_{}_{}", self.origin, self.index)
        } else {
            self.name.clone()
        }
    }
}

impl RawConfigs {
    /// Walk the `configs` list of a dump and save the text of each named
    /// object.
    pub fn extract(configs: &[Value]) -> Self {
        let mut raw = RawConfigs::default();
        let mut indexes: enum_map::EnumMap<ResourceType, EntryIndexes> = Default::default();

        for config in configs {
            let SubMessage::Section(section, body) = SubMessage::classify(config) else {
                continue;
            };

            let resource_type = match section {
                Section::Bootstrap => {
                    if raw.bootstrap.is_none() {
                        raw.bootstrap = body.get("bootstrap").and_then(pretty);
                    }
                    continue;
                }
                Section::Listeners => ResourceType::Listener,
                Section::Clusters => ResourceType::Cluster,
                Section::Routes => ResourceType::RouteConfiguration,
                Section::ScopedRoutes | Section::Endpoints | Section::Secrets | Section::Ecds => {
                    continue
                }
            };

            for entry in section_entries(resource_type, body, &mut indexes[resource_type]) {
                let name = entry
                    .resource
                    .get("name")
                    .and_then(Value::as_str)
                    .unwrap_or_default();
                let Some(text) = pretty(entry.resource) else {
                    continue;
                };

                match resource_type {
                    ResourceType::Listener => insert_named(&mut raw.listeners, name, entry.origin, text),
                    ResourceType::Cluster => insert_named(&mut raw.clusters, name, entry.origin, text),
                    ResourceType::RouteConfiguration => {
                        raw.routes
                            .insert(RouteKey::new(entry.origin, entry.index, name), text);
                    }
                    ResourceType::ClusterLoadAssignment => (),
                }
            }
        }

        raw
    }

    pub fn bootstrap(&self) -> Option<&str> {
        self.bootstrap.as_deref()
    }

    pub fn listener(&self, name: &str) -> Option<&str> {
        self.listeners.get(name).map(|e| e.text.as_str())
    }

    pub fn cluster(&self, name: &str) -> Option<&str> {
        self.clusters.get(name).map(|e| e.text.as_str())
    }

    pub fn route(&self, key: &RouteKey) -> Option<&str> {
        self.routes.get(key).map(String::as_str)
    }

    pub fn routes(&self) -> impl Iterator<Item = (&RouteKey, &str)> {
        self.routes.iter().map(|(k, v)| (k, v.as_str()))
    }

    pub fn is_empty(&self) -> bool {
        self.bootstrap.is_none()
            && self.listeners.is_empty()
            && self.clusters.is_empty()
            && self.routes.is_empty()
    }
}

// listeners and clusters are keyed by name alone. a static resource always
// replaces a dynamic one with the same name, no matter which came first.
fn insert_named(map: &mut BTreeMap<String, RawEntry>, name: &str, origin: Origin, text: String) {
    if name.is_empty() {
        return;
    }

    match map.get(name) {
        Some(existing) if existing.origin == Origin::Static && origin == Origin::Dynamic => (),
        _ => {
            map.insert(name.to_string(), RawEntry { origin, text });
        }
    }
}

fn pretty(value: &Value) -> Option<String> {
    match serde_json::to_string_pretty(value) {
        Ok(text) => Some(text),
        Err(e) => {
            warn!(err = %e, "failed to re-serialize raw config");
            None
        }
    }
}
