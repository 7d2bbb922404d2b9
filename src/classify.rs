//! Mesh-agnostic classification of listeners, clusters, and routes.
//!
//! Everything here is a pure function of names, addresses, and ports. Rules
//! are checked in priority order and the first match wins.

use serde::Serialize;

pub const WILDCARD_ADDRESS: &str = "0.0.0.0";

/// The sidecar's Prometheus merge port.
pub const PROXY_METRICS_PORT: u32 = 15090;

/// The sidecar's readiness port.
pub const PROXY_HEALTHCHECK_PORT: u32 = 15021;

/// Ports that iptables redirects all outbound and inbound traffic to.
pub const VIRTUAL_LISTENER_PORTS: [u32; 2] = [15001, 15006];

pub const VIRTUAL_INBOUND_NAME: &str = "virtualInbound";
pub const VIRTUAL_OUTBOUND_NAME: &str = "virtualOutbound";

/// Route names that always belong to static or internal configuration.
pub const STATIC_ROUTE_NAMES: &[&str] = &[
    "InboundPassthroughCluster",
    "BlackHoleCluster",
    "PassthroughCluster",
    "local_agent",
    "admin",
];

const LOOPBACK_MARKERS: &[&str] = &["127.0.0.1", "localhost"];

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ListenerType {
    VirtualInbound,
    VirtualOutbound,
    ProxyMetrics,
    ProxyHealthcheck,
    PortOutbound,
    ServiceOutbound,
    GatewayInbound,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Direction {
    #[default]
    Unspecified,
    Inbound,
    Outbound,
}

impl Direction {
    fn from_name_part(part: &str) -> Self {
        if part.eq_ignore_ascii_case("inbound") {
            Direction::Inbound
        } else if part.eq_ignore_ascii_case("outbound") {
            Direction::Outbound
        } else {
            Direction::Unspecified
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RouteType {
    Static,
    PortBased,
    ServiceSpecific,
}

/// Classify a listener by its name and the address it binds.
pub fn listener_type(name: &str, address: &str, port: u32, use_original_dst: bool) -> ListenerType {
    if let Some(virtual_type) = virtual_listener_type(name) {
        return virtual_type;
    }

    if address != WILDCARD_ADDRESS {
        return ListenerType::ServiceOutbound;
    }

    wildcard_listener_type(port, use_original_dst).unwrap_or(ListenerType::PortOutbound)
}

pub(crate) fn virtual_listener_type(name: &str) -> Option<ListenerType> {
    match name {
        VIRTUAL_INBOUND_NAME => Some(ListenerType::VirtualInbound),
        VIRTUAL_OUTBOUND_NAME => Some(ListenerType::VirtualOutbound),
        _ => None,
    }
}

// the port rules for a listener on a wildcard address. None when no
// well-known port applies.
pub(crate) fn wildcard_listener_type(port: u32, use_original_dst: bool) -> Option<ListenerType> {
    match port {
        PROXY_METRICS_PORT => Some(ListenerType::ProxyMetrics),
        PROXY_HEALTHCHECK_PORT => Some(ListenerType::ProxyHealthcheck),
        port if VIRTUAL_LISTENER_PORTS.contains(&port) && use_original_dst => {
            Some(ListenerType::VirtualOutbound)
        }
        _ => None,
    }
}

/// The parts of a cluster name that follows the
/// `direction|port|subset|fqdn` convention.
///
/// The convention isn't guaranteed. Anything that doesn't fit leaves fields
/// at their defaults instead of failing.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct ClusterName {
    pub direction: Direction,
    pub port: u32,
    pub subset: String,
    pub service_fqdn: String,
}

impl ClusterName {
    /// Decompose a cluster name with exactly four `|` separated parts. Any
    /// other shape decomposes to all defaults.
    pub fn parse(name: &str) -> Self {
        let parts: Vec<_> = name.split('|').collect();
        if parts.len() != 4 {
            return Self::default();
        }

        Self::from_parts(&parts)
    }

    /// Decompose as much of a cluster name as is there. Names with one to four
    /// parts fill in a prefix of direction, port, subset, and FQDN. Names with
    /// more than four parts decompose to all defaults.
    pub fn components(name: &str) -> Self {
        let parts: Vec<_> = name.split('|').collect();
        if parts.len() > 4 {
            return Self::default();
        }

        Self::from_parts(&parts)
    }

    /// True if this name matched the convention at all.
    pub fn is_structured(&self) -> bool {
        self.direction != Direction::Unspecified
    }

    fn from_parts(parts: &[&str]) -> Self {
        let part = |i: usize| parts.get(i).copied().unwrap_or_default();

        Self {
            direction: Direction::from_name_part(part(0)),
            port: parse_port(part(1)),
            subset: part(2).to_string(),
            service_fqdn: part(3).to_string(),
        }
    }
}

/// Classify a route configuration by name and by which section of the dump it
/// came from.
pub fn route_type(name: &str, is_static: bool) -> RouteType {
    // FIXME: an unnamed dynamic route is treated as static. it's rare enough
    // that nobody has complained, but it isn't actually static config.
    if is_static || name.trim().is_empty() {
        return RouteType::Static;
    }

    if is_port_name(name) {
        return RouteType::PortBased;
    }

    if is_static_route_name(name) {
        return RouteType::Static;
    }

    RouteType::ServiceSpecific
}

/// True for a bare port number between 1 and 65535. Leading zeros are fine.
pub(crate) fn is_port_name(name: &str) -> bool {
    matches!(parse_port(name), 1..=65535)
}

// only plain ASCII digits count, anything else is port 0.
fn parse_port(s: &str) -> u32 {
    if s.is_empty() || !s.bytes().all(|b| b.is_ascii_digit()) {
        return 0;
    }

    s.parse().unwrap_or(0)
}

pub(crate) fn is_static_route_name(name: &str) -> bool {
    STATIC_ROUTE_NAMES.contains(&name)
        || name.starts_with("inbound|")
        || name.starts_with("outbound|")
        || LOOPBACK_MARKERS.iter().any(|m| name.contains(m))
}
