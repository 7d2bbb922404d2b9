//! Istio-specific classification layered over the generic summary.
//!
//! The overlay is opt-in. It rewrites listener and route types using the
//! proxy's role, fills in cluster name parts the strict decomposition left
//! empty, and tags matches and destinations that point at mesh internals.
//! Every step can be repeated without changing the result.

mod enrich;

use serde::Serialize;

use crate::classify::{
    self, is_port_name, is_static_route_name, virtual_listener_type, wildcard_listener_type,
    ListenerType, RouteType, WILDCARD_ADDRESS,
};

pub use enrich::{
    enrich, enrich_cluster, enrich_destination, enrich_endpoint, enrich_listener, enrich_match,
    enrich_route, enrich_with, EnrichOptions,
};

/// Listener addresses that bind every interface on a gateway.
pub const GATEWAY_WILDCARD_ADDRESSES: &[&str] = &["0.0.0.0", "::"];

/// The header name given to `:authority` and `host` matches on a
/// cluster-local service.
pub const SERVICE_HOST_HEADER: &str = "istio_service_host";

/// The prefix given to SNI server names of cluster-local services.
pub const SERVICE_SNI_PREFIX: &str = "istio_service_";

pub(crate) const CLUSTER_LOCAL_SUFFIX: &str = ".svc.cluster.local";

/// The role a proxy plays in the mesh.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ProxyMode {
    Sidecar,
    Gateway,
    #[default]
    #[serde(rename = "UNKNOWN_PROXY_MODE")]
    Unknown,
}

impl ProxyMode {
    /// Infer the proxy mode from a node id like
    /// `sidecar~10.244.0.1~pod.ns~ns.svc.cluster.local`.
    ///
    /// Only the first `~` separated field counts, and it's compared without
    /// case.
    pub fn from_node_id(node_id: &str) -> Self {
        let has_prefix = |prefix: &str| {
            node_id
                .get(..prefix.len())
                .is_some_and(|p| p.eq_ignore_ascii_case(prefix))
        };

        if has_prefix("sidecar~") {
            ProxyMode::Sidecar
        } else if has_prefix("router~") || has_prefix("gateway~") {
            ProxyMode::Gateway
        } else {
            ProxyMode::Unknown
        }
    }
}

/// A Kubernetes service, from an FQDN shaped like
/// `<name>.<namespace>.svc.<domain>`.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize)]
pub struct ServiceIdentity {
    pub name: String,
    pub namespace: String,
    pub domain: String,
}

impl ServiceIdentity {
    pub fn from_fqdn(fqdn: &str) -> Option<Self> {
        let mut parts = fqdn.splitn(4, '.');

        let name = parts.next().filter(|s| !s.is_empty())?;
        let namespace = parts.next().filter(|s| !s.is_empty())?;
        if parts.next()? != "svc" {
            return None;
        }
        let domain = parts.next().filter(|s| !s.is_empty())?;

        Some(Self {
            name: name.to_string(),
            namespace: namespace.to_string(),
            domain: domain.to_string(),
        })
    }
}

/// Classify a listener the way the mesh does.
///
/// Identical to [crate::classify::listener_type] for anything but a
/// gateway. On a gateway `::` is also a wildcard, and wildcard listeners
/// without original destination capture are [ListenerType::GatewayInbound].
pub fn listener_type(
    name: &str,
    address: &str,
    port: u32,
    use_original_dst: bool,
    mode: ProxyMode,
) -> ListenerType {
    if let Some(virtual_type) = virtual_listener_type(name) {
        return virtual_type;
    }

    let is_wildcard = match mode {
        ProxyMode::Gateway => GATEWAY_WILDCARD_ADDRESSES.contains(&address),
        _ => address == WILDCARD_ADDRESS,
    };
    if !is_wildcard {
        return ListenerType::ServiceOutbound;
    }

    if let Some(port_type) = wildcard_listener_type(port, use_original_dst) {
        return port_type;
    }

    if mode == ProxyMode::Gateway && !use_original_dst {
        return ListenerType::GatewayInbound;
    }

    ListenerType::PortOutbound
}

/// Classify a route configuration the way the mesh does.
///
/// Gateways name their port routes `http.<port>` or `https.<port>.<...>`,
/// which are port based along with bare port numbers. Other proxies get the
/// generic [crate::classify::route_type].
pub fn route_type(name: &str, is_static: bool, mode: ProxyMode) -> RouteType {
    if mode != ProxyMode::Gateway {
        return classify::route_type(name, is_static);
    }

    if is_static || name.trim().is_empty() {
        return RouteType::Static;
    }

    if is_port_name(name) || is_gateway_port_name(name) {
        return RouteType::PortBased;
    }

    if is_static_route_name(name) {
        return RouteType::Static;
    }

    RouteType::ServiceSpecific
}

fn is_gateway_port_name(name: &str) -> bool {
    if let Some(port) = name.strip_prefix("http.") {
        return is_port_name(port);
    }

    if let Some(rest) = name.strip_prefix("https.") {
        let port = rest.split('.').next().unwrap_or_default();
        return is_port_name(port);
    }

    false
}
