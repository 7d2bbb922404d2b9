use tracing::debug;

use super::{
    listener_type, route_type, ProxyMode, ServiceIdentity, CLUSTER_LOCAL_SUFFIX,
    SERVICE_HOST_HEADER, SERVICE_SNI_PREFIX,
};
use crate::classify::{ClusterName, Direction};
use crate::dump::Origin;
use crate::summary::{
    ClusterSummary, EndpointSummary, FilterConfigSummary, ListenerSummary, ParsedSummary,
    RouteSummary, RuleDestination, RuleMatch, VirtualHostSummary,
};

#[derive(Clone, Debug, Default)]
pub struct EnrichOptions {
    /// Use this mode instead of inferring one from the bootstrap node id.
    pub proxy_mode: Option<ProxyMode>,
}

/// Run the mesh overlay over a summary, inferring the proxy mode from the
/// bootstrap node.
pub fn enrich(summary: &mut ParsedSummary) {
    enrich_with(summary, &EnrichOptions::default())
}

pub fn enrich_with(summary: &mut ParsedSummary, options: &EnrichOptions) {
    let mode = options.proxy_mode.unwrap_or_else(|| {
        summary
            .bootstrap
            .as_ref()
            .map(|b| ProxyMode::from_node_id(&b.node.id))
            .unwrap_or_default()
    });
    debug!(proxy_mode = ?mode, "enriching summary");

    summary.proxy_mode = Some(mode);

    for listener in &mut summary.listeners {
        enrich_listener(listener, mode);
    }
    for cluster in &mut summary.clusters {
        enrich_cluster(cluster);
    }
    for route in &mut summary.routes {
        enrich_route(route, mode);
    }
    for endpoint in &mut summary.endpoints {
        enrich_endpoint(endpoint);
    }
}

pub fn enrich_listener(listener: &mut ListenerSummary, mode: ProxyMode) {
    listener.listener_type = listener_type(
        &listener.name,
        &listener.address,
        listener.port,
        listener.use_original_dst,
        mode,
    );

    for rule in &mut listener.rules {
        if let Some(rule_match) = &mut rule.rule_match {
            enrich_match(rule_match);
        }
        if let Some(destination) = &mut rule.destination {
            enrich_destination(destination);
        }
    }

    // inline routes on connection managers
    for chain in &mut listener.filter_chains {
        for filter in &mut chain.filters {
            if let FilterConfigSummary::HttpConnectionManager { virtual_hosts, .. } = &mut filter.config {
                enrich_virtual_hosts(virtual_hosts);
            }
        }
    }
}

/// Fill in the cluster name parts that the strict four part decomposition
/// left empty, then identify the service behind the FQDN.
pub fn enrich_cluster(cluster: &mut ClusterSummary) {
    let parts = ClusterName::components(&cluster.name);
    fill_cluster_name(
        &mut cluster.direction,
        &mut cluster.port,
        &mut cluster.subset,
        &mut cluster.service_fqdn,
        parts,
    );
    cluster.service = ServiceIdentity::from_fqdn(&cluster.service_fqdn);

    if let Some(assignment) = &mut cluster.load_assignment {
        enrich_endpoint(assignment);
    }
}

pub fn enrich_endpoint(endpoint: &mut EndpointSummary) {
    let parts = ClusterName::components(&endpoint.cluster_name);
    fill_cluster_name(
        &mut endpoint.direction,
        &mut endpoint.port,
        &mut endpoint.subset,
        &mut endpoint.service_fqdn,
        parts,
    );
}

pub fn enrich_route(route: &mut RouteSummary, mode: ProxyMode) {
    route.route_type = route_type(&route.name, route.origin == Origin::Static, mode);
    enrich_virtual_hosts(&mut route.virtual_hosts);
}

fn enrich_virtual_hosts(virtual_hosts: &mut [VirtualHostSummary]) {
    for entry in virtual_hosts.iter_mut().flat_map(|vh| &mut vh.routes) {
        enrich_match(&mut entry.route_match);
        if let Some(destination) = &mut entry.destination {
            enrich_destination(destination);
        }
    }
}

/// Tag matches on the proxy's own endpoints and on cluster-local services.
pub fn enrich_match(rule_match: &mut RuleMatch) {
    if is_path_match(&rule_match.match_type) {
        let proxy_path_type = [
            ("/stats", "istio_stats"),
            ("/health", "istio_health"),
            ("/ready", "istio_ready"),
        ]
        .into_iter()
        .find(|(prefix, _)| rule_match.value.starts_with(*prefix));

        if let Some((_, match_type)) = proxy_path_type {
            rule_match.match_type = match_type.to_string();
        }
    }

    for header in &mut rule_match.headers {
        let is_host = header.name.eq_ignore_ascii_case(":authority")
            || header.name.eq_ignore_ascii_case("host");
        if is_host && header.value.contains(CLUSTER_LOCAL_SUFFIX) {
            header.name = SERVICE_HOST_HEADER.to_string();
        }
    }

    for server_name in &mut rule_match.server_names {
        if server_name.contains(CLUSTER_LOCAL_SUFFIX) && !server_name.starts_with(SERVICE_SNI_PREFIX) {
            server_name.insert_str(0, SERVICE_SNI_PREFIX);
        }
    }
}

/// Backfill the service and port of a destination cluster and retype
/// destinations that go to mesh sentinel clusters.
///
/// A weighted split is treated like its cluster when it has exactly one
/// member. Splits across several clusters are left alone.
pub fn enrich_destination(destination: &mut RuleDestination) {
    // the cluster field holds a header name here
    if destination.destination_type == "cluster_header" {
        return;
    }

    let cluster = match destination.weighted_clusters.as_slice() {
        _ if !destination.cluster.is_empty() => destination.cluster.clone(),
        [only] if !only.name.is_empty() => only.name.clone(),
        _ => return,
    };

    let parts = ClusterName::parse(&cluster);
    if destination.service_fqdn.is_empty() {
        destination.service_fqdn = parts.service_fqdn;
    }
    if destination.port == 0 {
        destination.port = parts.port;
    }

    let cluster = cluster.as_str();
    let sentinel_type = match cluster {
        "PassthroughCluster" => Some("passthrough"),
        "BlackHoleCluster" => Some("blackhole"),
        _ if cluster.starts_with("inbound") => Some("inbound"),
        _ if cluster.starts_with("outbound") => Some("outbound"),
        _ => None,
    };
    if let Some(sentinel_type) = sentinel_type {
        destination.destination_type = sentinel_type.to_string();
    }
}

fn is_path_match(match_type: &str) -> bool {
    matches!(match_type, "prefix" | "path" | "path_separated_prefix")
}

fn fill_cluster_name(
    direction: &mut Direction,
    port: &mut u32,
    subset: &mut String,
    service_fqdn: &mut String,
    parts: ClusterName,
) {
    if *direction == Direction::Unspecified {
        *direction = parts.direction;
    }
    if *port == 0 {
        *port = parts.port;
    }
    if subset.is_empty() {
        *subset = parts.subset;
    }
    if service_fqdn.is_empty() {
        *service_fqdn = parts.service_fqdn;
    }
}
