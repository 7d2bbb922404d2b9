use enum_map::EnumMap;
use serde::{de::DeserializeOwned, Deserialize};
use serde_json::Value;
use tracing::{debug, info, warn};

use super::{
    configs, model::Bootstrap, section_entries, ConfigSnapshot, Decoded, Entry, EntryIndexes,
    RawConfigs, ResourceType, Section, SubMessage,
};
use crate::metrics::scoped_timer;

#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    #[error("invalid config dump: {0}")]
    InvalidJson(#[from] serde_json::Error),

    #[error("invalid config dump: expected a JSON object")]
    NotAnObject,

    #[error("invalid config dump: configs must be a list")]
    InvalidConfigs,
}

/// Decode a JSON config dump, as served from Envoy's `/config_dump` admin
/// endpoint.
///
/// Only a dump that isn't structurally a config dump at all is an error.
/// Sections with an unknown type are skipped, and individual resources that
/// fail to decode are logged and left out.
pub fn decode(bytes: &[u8]) -> Result<ConfigSnapshot, DecodeError> {
    crate::metrics::describe_metrics();
    let _timer = scoped_timer!("decode_time");

    let dump: Value = serde_json::from_slice(bytes)?;
    decode_value(&dump)
}

/// Decode a config dump that has already been parsed as JSON.
pub fn decode_value(dump: &Value) -> Result<ConfigSnapshot, DecodeError> {
    let configs = configs(dump)?;

    let mut snapshot = ConfigSnapshot {
        raw: RawConfigs::extract(configs),
        ..Default::default()
    };
    let mut indexes: EnumMap<ResourceType, EntryIndexes> = EnumMap::default();

    for config in configs {
        let (section, body) = match SubMessage::classify(config) {
            SubMessage::Section(section, body) => (section, body),
            SubMessage::Unrecognized(type_url) => {
                debug!(type_url, "skipping unrecognized config section");
                metrics::counter!("decode.unknown_sections").increment(1);
                continue;
            }
        };

        match section {
            Section::Bootstrap => {
                let Some(bootstrap) = body.get("bootstrap") else {
                    continue;
                };
                match Bootstrap::deserialize(bootstrap) {
                    Ok(bootstrap) if snapshot.bootstrap.is_none() => {
                        snapshot.bootstrap = Some(bootstrap);
                    }
                    Ok(_) => debug!("ignoring a second bootstrap section"),
                    Err(e) => skipped(section, None, &e),
                }
            }
            Section::Listeners => {
                let rtype = ResourceType::Listener;
                for entry in section_entries(rtype, body, &mut indexes[rtype]) {
                    snapshot
                        .listeners
                        .extend(decode_entry(section, rtype, &entry));
                }
            }
            Section::Clusters => {
                let rtype = ResourceType::Cluster;
                for entry in section_entries(rtype, body, &mut indexes[rtype]) {
                    snapshot
                        .clusters
                        .extend(decode_entry(section, rtype, &entry));
                }
            }
            Section::Routes => {
                let rtype = ResourceType::RouteConfiguration;
                for entry in section_entries(rtype, body, &mut indexes[rtype]) {
                    snapshot.routes.extend(decode_entry(section, rtype, &entry));
                }
            }
            Section::ScopedRoutes | Section::Endpoints | Section::Secrets | Section::Ecds => {
                debug!(section = section.label(), "skipping config section");
            }
        }
    }

    info!(
        bootstrap = snapshot.bootstrap.is_some(),
        listeners = snapshot.listeners.len(),
        clusters = snapshot.clusters.len(),
        routes = snapshot.routes.len(),
        "decoded config dump",
    );

    Ok(snapshot)
}

fn decode_entry<T: DeserializeOwned>(
    section: Section,
    resource_type: ResourceType,
    entry: &Entry<'_>,
) -> Option<Decoded<T>> {
    let type_url = entry.resource.get("@type").and_then(Value::as_str);
    if let Some(type_url) = type_url {
        if type_url != resource_type.type_url() {
            warn!(
                section = section.label(),
                origin = %entry.origin,
                index = entry.index,
                type_url,
                "skipping resource with unexpected type",
            );
            metrics::counter!("decode.skipped", "section" => section.label()).increment(1);
            return None;
        }
    }

    match T::deserialize(entry.resource) {
        Ok(resource) => Some(entry.decoded(resource)),
        Err(e) => {
            skipped(section, Some(entry), &e);
            None
        }
    }
}

fn skipped(section: Section, entry: Option<&Entry<'_>>, err: &serde_json::Error) {
    warn!(
        section = section.label(),
        origin = ?entry.map(|e| e.origin),
        index = ?entry.map(|e| e.index),
        err = %err,
        "skipping resource that failed to decode",
    );
    metrics::counter!("decode.skipped", "section" => section.label()).increment(1);
}
