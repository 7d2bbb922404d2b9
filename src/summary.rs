//! Reduced, display-friendly summaries of decoded config.
//!
//! Summarizing never fails. Anything missing from the typed records comes
//! out as an empty or zero field.

mod bootstrap;
mod cluster;
mod endpoint;
mod listener;
mod route;

use std::collections::BTreeMap;
use std::fmt::Debug;

use serde::Serialize;
use serde_json::Value;

use crate::classify::{ClusterName, Direction, ListenerType, RouteType};
use crate::dump::{model, ConfigSnapshot, Origin, ResourceState};
use crate::mesh::{ProxyMode, ServiceIdentity};

pub use endpoint::summarize_endpoint;

/// Summaries of everything in a config dump.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct ParsedSummary {
    /// Only set by the mesh overlay.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub proxy_mode: Option<ProxyMode>,

    pub bootstrap: Option<BootstrapSummary>,
    pub listeners: Vec<ListenerSummary>,
    pub clusters: Vec<ClusterSummary>,
    pub routes: Vec<RouteSummary>,
    pub endpoints: Vec<EndpointSummary>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct BootstrapSummary {
    pub node: NodeSummary,
    pub admin_address: String,
    pub admin_port: u32,
    pub dynamic_resources: DynamicResourcesSummary,
    pub cluster_manager: ClusterManagerSummary,
    pub static_listeners: usize,
    pub static_clusters: usize,
    pub raw_config: String,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct NodeSummary {
    pub id: String,
    pub cluster: String,
    pub metadata: BTreeMap<String, String>,
    pub region: String,
    pub zone: String,
    pub sub_zone: String,
    pub user_agent_name: String,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct DynamicResourcesSummary {
    pub ads: bool,
    pub lds: bool,
    pub cds: bool,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct ClusterManagerSummary {
    pub local_cluster_name: String,
    pub outlier_detection: bool,
    pub upstream_bind_config: bool,
    pub load_stats_config: bool,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ListenerSummary {
    pub name: String,
    pub address: String,
    pub port: u32,
    pub use_original_dst: bool,
    pub traffic_direction: String,
    pub listener_type: ListenerType,
    pub origin: Origin,
    pub state: ResourceState,
    pub version_info: String,
    pub last_updated: String,
    pub listener_filters: Vec<String>,
    pub filter_chains: Vec<FilterChainSummary>,
    pub rules: Vec<ListenerRule>,
    pub raw_config: String,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct FilterChainSummary {
    pub name: String,
    pub is_default: bool,
    #[serde(rename = "match")]
    pub chain_match: Option<FilterChainMatchSummary>,
    pub filters: Vec<FilterSummary>,
    pub transport_socket: String,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct FilterChainMatchSummary {
    pub server_names: Vec<String>,
    pub application_protocols: Vec<String>,
    pub transport_protocol: String,
    pub prefix_ranges: Vec<String>,
    pub source_prefix_ranges: Vec<String>,
    pub destination_port: u32,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct FilterSummary {
    pub name: String,
    pub type_url: String,
    #[serde(flatten)]
    pub config: FilterConfigSummary,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FilterConfigSummary {
    HttpConnectionManager {
        stat_prefix: String,
        /// The RDS route configuration name. Empty for inline routes.
        route_config_name: String,
        http_filters: Vec<String>,
        /// Inline routes only.
        virtual_hosts: Vec<VirtualHostSummary>,
    },
    TcpProxy {
        stat_prefix: String,
        cluster: String,
        weighted_clusters: Vec<WeightedClusterSummary>,
    },
    Opaque,
}

/// A match paired with where matching traffic goes.
///
/// Listener rules come from filter chain matches and from the routes of any
/// HTTP connection manager on the listener, in the order they're found.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct ListenerRule {
    #[serde(rename = "match")]
    pub rule_match: Option<RuleMatch>,
    pub destination: Option<RuleDestination>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct RuleMatch {
    pub match_type: String,
    pub value: String,
    pub virtual_host: String,
    pub domains: Vec<String>,
    pub server_names: Vec<String>,
    pub application_protocols: Vec<String>,
    pub transport_protocol: String,
    pub prefix_ranges: Vec<String>,
    pub destination_port: u32,
    pub headers: Vec<HeaderMatchSummary>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct HeaderMatchSummary {
    pub name: String,
    pub match_type: String,
    pub value: String,
    pub invert: bool,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct RuleDestination {
    pub destination_type: String,
    pub cluster: String,
    pub weighted_clusters: Vec<WeightedClusterSummary>,
    pub route_config_name: String,
    pub redirect: String,
    pub status: u32,
    pub timeout: String,
    pub service_fqdn: String,
    pub port: u32,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct WeightedClusterSummary {
    pub name: String,
    pub weight: u32,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ClusterSummary {
    pub name: String,
    pub discovery_type: String,
    pub lb_policy: String,
    pub connect_timeout: String,
    pub eds_service_name: String,
    pub transport_socket: String,
    pub health_checks: Vec<HealthCheckSummary>,
    pub circuit_breakers: Vec<ThresholdsSummary>,
    pub load_assignment: Option<EndpointSummary>,
    pub origin: Origin,
    pub state: ResourceState,
    pub version_info: String,
    pub last_updated: String,
    pub direction: Direction,
    pub port: u32,
    pub subset: String,
    pub service_fqdn: String,
    /// Only set by the mesh overlay.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub service: Option<ServiceIdentity>,
    pub raw_config: String,
}

impl ClusterSummary {
    pub(crate) fn set_cluster_name(&mut self, parts: ClusterName) {
        self.direction = parts.direction;
        self.port = parts.port;
        self.subset = parts.subset;
        self.service_fqdn = parts.service_fqdn;
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct HealthCheckSummary {
    pub kind: String,
    pub path: String,
    pub timeout: String,
    pub interval: String,
    pub healthy_threshold: u32,
    pub unhealthy_threshold: u32,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct ThresholdsSummary {
    pub priority: String,
    pub max_connections: Option<u32>,
    pub max_pending_requests: Option<u32>,
    pub max_requests: Option<u32>,
    pub max_retries: Option<u32>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct RouteSummary {
    pub name: String,
    /// The side channel label: the name, or an origin and position for a
    /// blank name.
    pub key: String,
    pub route_type: RouteType,
    pub origin: Origin,
    pub version_info: String,
    pub last_updated: String,
    pub validate_clusters: bool,
    pub virtual_hosts: Vec<VirtualHostSummary>,
    pub raw_config: String,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct VirtualHostSummary {
    pub name: String,
    pub domains: Vec<String>,
    pub routes: Vec<RouteEntrySummary>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct RouteEntrySummary {
    pub name: String,
    #[serde(rename = "match")]
    pub route_match: RuleMatch,
    pub destination: Option<RuleDestination>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct EndpointSummary {
    pub cluster_name: String,
    pub localities: Vec<LocalityEndpointsSummary>,
    pub direction: Direction,
    pub port: u32,
    pub subset: String,
    pub service_fqdn: String,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct LocalityEndpointsSummary {
    pub region: String,
    pub zone: String,
    pub sub_zone: String,
    pub priority: u32,
    pub weight: Option<u32>,
    pub endpoints: Vec<EndpointHostSummary>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct EndpointHostSummary {
    pub address: String,
    pub port: u32,
    pub hostname: String,
    pub health_status: String,
    pub weight: u32,
    pub metadata: BTreeMap<String, String>,
}

/// Summarize every decoded resource in a snapshot.
///
/// Listener summaries resolve RDS route names against the routes in the same
/// snapshot, so a listener's rules include the routes it serves.
pub fn summarize(snapshot: &ConfigSnapshot) -> ParsedSummary {
    let routes: Vec<_> = snapshot
        .routes
        .iter()
        .map(|r| route::summarize_route(r, &snapshot.raw))
        .collect();

    let listeners = snapshot
        .listeners
        .iter()
        .map(|l| listener::summarize_listener(l, &routes, &snapshot.raw))
        .collect();

    let clusters = snapshot
        .clusters
        .iter()
        .map(|c| cluster::summarize_cluster(c, &snapshot.raw))
        .collect();

    let endpoints = snapshot.endpoints.iter().map(summarize_endpoint).collect();

    let bootstrap = snapshot
        .bootstrap
        .as_ref()
        .map(|b| bootstrap::summarize_bootstrap(b, snapshot.raw.bootstrap()));

    ParsedSummary {
        proxy_mode: None,
        bootstrap,
        listeners,
        clusters,
        routes,
        endpoints,
    }
}

/// The raw text of a resource when the side channel has it, or our own
/// rendering of the typed record when it doesn't.
pub(crate) fn raw_or_rendered<T: Serialize + Debug>(raw: Option<&str>, resource: &T) -> String {
    if let Some(raw) = raw {
        return raw.to_string();
    }

    serde_json::to_string_pretty(resource).unwrap_or_else(|_| format!("{resource:#?}"))
}

/// The address and port of an [model::Address]. Pipes have a path and no
/// port.
pub(crate) fn address_and_port(address: Option<&model::Address>) -> (String, u32) {
    let Some(address) = address else {
        return (String::new(), 0);
    };

    if let Some(socket) = &address.socket_address {
        return (socket.address.clone(), socket.port_value);
    }
    if let Some(pipe) = &address.pipe {
        return (pipe.path.clone(), 0);
    }
    (String::new(), 0)
}

pub(crate) fn cidr_ranges(ranges: &[model::CidrRange]) -> Vec<String> {
    ranges
        .iter()
        .map(|r| format!("{}/{}", r.address_prefix, r.prefix_len.unwrap_or(0)))
        .collect()
}

/// Flatten a JSON struct to dotted keys. Array elements are keyed by index.
pub(crate) fn flatten_metadata(value: &Value) -> BTreeMap<String, String> {
    let mut flat = BTreeMap::new();
    flatten_into(&mut flat, String::new(), value);
    flat
}

fn flatten_into(flat: &mut BTreeMap<String, String>, prefix: String, value: &Value) {
    let join = |key: &str| {
        if prefix.is_empty() {
            key.to_string()
        } else {
            format!("{prefix}.{key}")
        }
    };

    match value {
        Value::Object(fields) => {
            for (k, v) in fields {
                flatten_into(flat, join(k), v);
            }
        }
        Value::Array(items) => {
            for (i, v) in items.iter().enumerate() {
                flatten_into(flat, join(&i.to_string()), v);
            }
        }
        Value::String(s) => {
            flat.insert(prefix, s.clone());
        }
        Value::Null => {
            flat.insert(prefix, String::new());
        }
        other => {
            flat.insert(prefix, other.to_string());
        }
    }
}
