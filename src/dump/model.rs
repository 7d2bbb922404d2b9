//! Typed records for the parts of a config dump we summarize.
//!
//! These mirror the proto field names Envoy writes into its JSON dump but only
//! carry the fields we use. Unknown fields are dropped on decode, which is
//! why every named object also keeps its raw text around.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::enums::EnumValue;

const HTTP_CONNECTION_MANAGER_TYPE_URL: &str =
    "type.googleapis.com/envoy.extensions.filters.network.http_connection_manager.v3.HttpConnectionManager";

const TCP_PROXY_TYPE_URL: &str =
    "type.googleapis.com/envoy.extensions.filters.network.tcp_proxy.v3.TcpProxy";

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Bootstrap {
    pub node: Option<Node>,
    pub admin: Option<Admin>,
    pub static_resources: Option<StaticResources>,
    pub dynamic_resources: Option<DynamicResources>,
    pub cluster_manager: Option<ClusterManager>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Node {
    pub id: String,
    pub cluster: String,
    pub metadata: Option<Value>,
    pub locality: Option<Locality>,
    pub user_agent_name: String,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Admin {
    pub address: Option<Address>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StaticResources {
    pub listeners: Vec<Value>,
    pub clusters: Vec<Value>,
    pub secrets: Vec<Value>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DynamicResources {
    pub ads_config: Option<Value>,
    pub lds_config: Option<Value>,
    pub cds_config: Option<Value>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClusterManager {
    pub local_cluster_name: String,
    pub outlier_detection: Option<Value>,
    pub upstream_bind_config: Option<Value>,
    pub load_stats_config: Option<Value>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Locality {
    pub region: String,
    pub zone: String,
    pub sub_zone: String,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Address {
    pub socket_address: Option<SocketAddress>,
    pub pipe: Option<Pipe>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SocketAddress {
    pub address: String,
    pub port_value: u32,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Pipe {
    pub path: String,
}

// listeners

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Listener {
    pub name: String,
    pub address: Option<Address>,
    pub filter_chains: Vec<FilterChain>,
    pub default_filter_chain: Option<FilterChain>,
    pub use_original_dst: Option<bool>,
    pub listener_filters: Vec<ListenerFilter>,
    pub traffic_direction: EnumValue,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterChain {
    pub name: String,
    pub filter_chain_match: Option<FilterChainMatch>,
    pub filters: Vec<Filter>,
    pub transport_socket: Option<TransportSocket>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterChainMatch {
    pub destination_port: Option<u32>,
    pub prefix_ranges: Vec<CidrRange>,
    pub source_prefix_ranges: Vec<CidrRange>,
    pub server_names: Vec<String>,
    pub transport_protocol: String,
    pub application_protocols: Vec<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CidrRange {
    pub address_prefix: String,
    pub prefix_len: Option<u32>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ListenerFilter {
    pub name: String,
    pub typed_config: Option<Value>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TransportSocket {
    pub name: String,
    pub typed_config: Option<Value>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Filter {
    pub name: String,
    pub typed_config: Option<FilterConfig>,
}

/// The `typed_config` of a network filter.
///
/// Only the filters we know how to summarize are decoded. Everything else,
/// including a known filter whose body doesn't decode, is kept as an
/// [FilterConfig::Opaque] placeholder with its type URL.
#[derive(Clone, Debug, PartialEq)]
pub enum FilterConfig {
    HttpConnectionManager(Box<HttpConnectionManager>),
    TcpProxy(TcpProxy),
    Opaque { type_url: String },
}

impl FilterConfig {
    pub fn type_url(&self) -> &str {
        match self {
            FilterConfig::HttpConnectionManager(_) => HTTP_CONNECTION_MANAGER_TYPE_URL,
            FilterConfig::TcpProxy(_) => TCP_PROXY_TYPE_URL,
            FilterConfig::Opaque { type_url } => type_url,
        }
    }

    fn from_value(value: Value) -> Self {
        let type_url = value
            .get("@type")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();

        let decoded = if type_url == HTTP_CONNECTION_MANAGER_TYPE_URL {
            serde_json::from_value(value)
                .map(|hcm| FilterConfig::HttpConnectionManager(Box::new(hcm)))
                .ok()
        } else if type_url == TCP_PROXY_TYPE_URL {
            serde_json::from_value(value).map(FilterConfig::TcpProxy).ok()
        } else {
            None
        };

        decoded.unwrap_or(FilterConfig::Opaque { type_url })
    }
}

impl<'de> Deserialize<'de> for FilterConfig {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let value = Value::deserialize(deserializer)?;
        Ok(FilterConfig::from_value(value))
    }
}

impl Serialize for FilterConfig {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        let body = match self {
            FilterConfig::HttpConnectionManager(hcm) => serde_json::to_value(hcm),
            FilterConfig::TcpProxy(tcp) => serde_json::to_value(tcp),
            FilterConfig::Opaque { .. } => Ok(Value::Object(Default::default())),
        };

        let mut body = body.map_err(serde::ser::Error::custom)?;
        if let Value::Object(fields) = &mut body {
            fields.insert("@type".to_string(), Value::String(self.type_url().to_string()));
        }
        body.serialize(serializer)
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpConnectionManager {
    pub stat_prefix: String,
    pub rds: Option<Rds>,
    pub route_config: Option<RouteConfiguration>,
    pub http_filters: Vec<HttpFilter>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Rds {
    pub route_config_name: String,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpFilter {
    pub name: String,
    pub typed_config: Option<Value>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TcpProxy {
    pub stat_prefix: String,
    pub cluster: String,
    pub weighted_clusters: Option<WeightedClusters>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WeightedClusters {
    pub clusters: Vec<ClusterWeight>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClusterWeight {
    pub name: String,
    pub weight: Option<u32>,
}

// routes

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RouteConfiguration {
    pub name: String,
    pub virtual_hosts: Vec<VirtualHost>,
    pub validate_clusters: Option<bool>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VirtualHost {
    pub name: String,
    pub domains: Vec<String>,
    pub routes: Vec<Route>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Route {
    pub name: String,
    #[serde(rename = "match")]
    pub route_match: Option<RouteMatch>,
    pub route: Option<RouteAction>,
    pub redirect: Option<RedirectAction>,
    pub direct_response: Option<DirectResponseAction>,
    pub non_forwarding_action: Option<Value>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RouteMatch {
    pub prefix: Option<String>,
    pub path: Option<String>,
    pub safe_regex: Option<RegexMatcher>,
    pub path_separated_prefix: Option<String>,
    pub connect_matcher: Option<Value>,
    pub headers: Vec<HeaderMatcher>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RegexMatcher {
    pub regex: String,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HeaderMatcher {
    pub name: String,
    pub exact_match: Option<String>,
    pub prefix_match: Option<String>,
    pub suffix_match: Option<String>,
    pub contains_match: Option<String>,
    pub safe_regex_match: Option<RegexMatcher>,
    pub present_match: Option<bool>,
    pub string_match: Option<StringMatcher>,
    pub invert_match: bool,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StringMatcher {
    pub exact: Option<String>,
    pub prefix: Option<String>,
    pub suffix: Option<String>,
    pub contains: Option<String>,
    pub safe_regex: Option<RegexMatcher>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RouteAction {
    pub cluster: Option<String>,
    pub cluster_header: Option<String>,
    pub weighted_clusters: Option<WeightedClusters>,
    pub timeout: Option<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RedirectAction {
    pub host_redirect: String,
    pub path_redirect: String,
    pub https_redirect: bool,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DirectResponseAction {
    pub status: u32,
}

// clusters and endpoints

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Cluster {
    pub name: String,
    #[serde(rename = "type")]
    pub discovery_type: EnumValue,
    pub cluster_type: Option<CustomClusterType>,
    pub lb_policy: EnumValue,
    pub connect_timeout: Option<String>,
    pub load_assignment: Option<ClusterLoadAssignment>,
    pub eds_cluster_config: Option<EdsClusterConfig>,
    pub health_checks: Vec<HealthCheck>,
    pub circuit_breakers: Option<CircuitBreakers>,
    pub transport_socket: Option<TransportSocket>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CustomClusterType {
    pub name: String,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EdsClusterConfig {
    pub service_name: String,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HealthCheck {
    pub timeout: Option<String>,
    pub interval: Option<String>,
    pub unhealthy_threshold: Option<u32>,
    pub healthy_threshold: Option<u32>,
    pub http_health_check: Option<HttpHealthCheck>,
    pub tcp_health_check: Option<Value>,
    pub grpc_health_check: Option<Value>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpHealthCheck {
    pub path: String,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CircuitBreakers {
    pub thresholds: Vec<Thresholds>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Thresholds {
    pub priority: EnumValue,
    pub max_connections: Option<u32>,
    pub max_pending_requests: Option<u32>,
    pub max_requests: Option<u32>,
    pub max_retries: Option<u32>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClusterLoadAssignment {
    pub cluster_name: String,
    pub endpoints: Vec<LocalityLbEndpoints>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LocalityLbEndpoints {
    pub locality: Option<Locality>,
    pub lb_endpoints: Vec<LbEndpoint>,
    pub load_balancing_weight: Option<u32>,
    pub priority: u32,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LbEndpoint {
    pub endpoint: Option<Endpoint>,
    pub health_status: EnumValue,
    pub metadata: Option<Metadata>,
    pub load_balancing_weight: Option<u32>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Endpoint {
    pub address: Option<Address>,
    pub hostname: String,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Metadata {
    pub filter_metadata: serde_json::Map<String, Value>,
}

#[cfg(test)]
mod test {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_filter_config_known_types() {
        let filter: Filter = serde_json::from_value(json!({
            "name": "envoy.filters.network.tcp_proxy",
            "typed_config": {
                "@type": TCP_PROXY_TYPE_URL,
                "stat_prefix": "outbound|9080||reviews",
                "cluster": "outbound|9080||reviews.default.svc.cluster.local",
                "some_field_from_the_future": true,
            }
        }))
        .unwrap();

        let Some(FilterConfig::TcpProxy(tcp)) = filter.typed_config else {
            panic!("expected a tcp proxy config");
        };
        assert_eq!(tcp.cluster, "outbound|9080||reviews.default.svc.cluster.local");
    }

    #[test]
    fn test_filter_config_unknown_type_is_opaque() {
        let filter: Filter = serde_json::from_value(json!({
            "name": "istio.stats",
            "typed_config": {
                "@type": "type.googleapis.com/udpa.type.v1.TypedStruct",
                "type_url": "type.googleapis.com/stats.PluginConfig",
                "value": {"anything": [1, 2, 3]},
            }
        }))
        .unwrap();

        assert_eq!(
            filter.typed_config,
            Some(FilterConfig::Opaque {
                type_url: "type.googleapis.com/udpa.type.v1.TypedStruct".to_string()
            })
        );
    }

    #[test]
    fn test_filter_config_bad_body_is_opaque() {
        let filter: Filter = serde_json::from_value(json!({
            "name": "envoy.filters.network.tcp_proxy",
            "typed_config": {
                "@type": TCP_PROXY_TYPE_URL,
                "cluster": ["not", "a", "string"],
            }
        }))
        .unwrap();

        assert_eq!(
            filter.typed_config,
            Some(FilterConfig::Opaque {
                type_url: TCP_PROXY_TYPE_URL.to_string()
            })
        );
    }

    #[test]
    fn test_filter_config_serializes_type_url() {
        let config = FilterConfig::TcpProxy(TcpProxy {
            cluster: "backend".to_string(),
            ..Default::default()
        });

        let value = serde_json::to_value(&config).unwrap();
        assert_eq!(value["@type"], TCP_PROXY_TYPE_URL);
        assert_eq!(value["cluster"], "backend");
    }

    #[test]
    fn test_unread_fields_are_ignored() {
        let listener: Listener = serde_json::from_value(json!({
            "name": "0.0.0.0_8080",
            "address": {"socket_address": {"protocol": "TCP", "address": "0.0.0.0", "port_value": 8080, "ipv4_compat": true}},
            "bind_to_port": false,
            "filter_chains": [{
                "filters": [{
                    "name": "envoy.filters.network.http_connection_manager",
                    "typed_config": {
                        "@type": HTTP_CONNECTION_MANAGER_TYPE_URL,
                        "rds": {"route_config_name": "8080", "config_source": {"ads": {}}},
                    }
                }]
            }],
        }))
        .unwrap();

        let socket = listener.address.unwrap().socket_address.unwrap();
        assert_eq!((socket.address.as_str(), socket.port_value), ("0.0.0.0", 8080));

        let Some(FilterConfig::HttpConnectionManager(hcm)) = &listener.filter_chains[0].filters[0].typed_config
        else {
            panic!("expected a connection manager config");
        };
        assert_eq!(hcm.rds.as_ref().unwrap().route_config_name, "8080");
    }

    #[test]
    fn test_missing_fields_default() {
        let cluster: Cluster = serde_json::from_value(json!({"name": "BlackHoleCluster"})).unwrap();
        assert_eq!(cluster.name, "BlackHoleCluster");
        assert_eq!(cluster.discovery_type, EnumValue::Number(0));
        assert!(cluster.load_assignment.is_none());
        assert!(cluster.health_checks.is_empty());
    }
}
