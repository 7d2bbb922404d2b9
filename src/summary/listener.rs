use super::{
    address_and_port, cidr_ranges, raw_or_rendered,
    route::{summarize_virtual_hosts, weighted_clusters},
    FilterChainMatchSummary, FilterChainSummary, FilterConfigSummary, FilterSummary,
    ListenerRule, ListenerSummary, RouteSummary, RuleDestination, RuleMatch,
};
use crate::classify::listener_type;
use crate::dump::{model, Decoded, RawConfigs, TrafficDirection};

pub(super) fn summarize_listener(
    decoded: &Decoded<model::Listener>,
    routes: &[RouteSummary],
    raw: &RawConfigs,
) -> ListenerSummary {
    let listener = &decoded.resource;
    let (address, port) = address_and_port(listener.address.as_ref());
    let use_original_dst = listener.use_original_dst.unwrap_or_default();

    let mut filter_chains: Vec<_> = listener
        .filter_chains
        .iter()
        .map(|chain| summarize_filter_chain(chain, false))
        .collect();
    if let Some(default_chain) = &listener.default_filter_chain {
        filter_chains.push(summarize_filter_chain(default_chain, true));
    }

    let rules = listener_rules(&filter_chains, routes);

    ListenerSummary {
        listener_type: listener_type(&listener.name, &address, port, use_original_dst),
        name: listener.name.clone(),
        address,
        port,
        use_original_dst,
        traffic_direction: listener.traffic_direction.render::<TrafficDirection>(),
        origin: decoded.origin,
        state: decoded.state,
        version_info: decoded.version_info.clone(),
        last_updated: decoded.last_updated.clone(),
        listener_filters: listener
            .listener_filters
            .iter()
            .map(|f| f.name.clone())
            .collect(),
        filter_chains,
        rules,
        raw_config: raw_or_rendered(raw.listener(&listener.name), listener),
    }
}

fn summarize_filter_chain(chain: &model::FilterChain, is_default: bool) -> FilterChainSummary {
    FilterChainSummary {
        name: chain.name.clone(),
        is_default,
        chain_match: chain.filter_chain_match.as_ref().map(|m| FilterChainMatchSummary {
            server_names: m.server_names.clone(),
            application_protocols: m.application_protocols.clone(),
            transport_protocol: m.transport_protocol.clone(),
            prefix_ranges: cidr_ranges(&m.prefix_ranges),
            source_prefix_ranges: cidr_ranges(&m.source_prefix_ranges),
            destination_port: m.destination_port.unwrap_or_default(),
        }),
        filters: chain.filters.iter().map(summarize_filter).collect(),
        transport_socket: chain
            .transport_socket
            .as_ref()
            .map(|ts| ts.name.clone())
            .unwrap_or_default(),
    }
}

fn summarize_filter(filter: &model::Filter) -> FilterSummary {
    let config = match &filter.typed_config {
        Some(model::FilterConfig::HttpConnectionManager(hcm)) => {
            FilterConfigSummary::HttpConnectionManager {
                stat_prefix: hcm.stat_prefix.clone(),
                route_config_name: hcm
                    .rds
                    .as_ref()
                    .map(|rds| rds.route_config_name.clone())
                    .unwrap_or_default(),
                http_filters: hcm.http_filters.iter().map(|f| f.name.clone()).collect(),
                virtual_hosts: hcm
                    .route_config
                    .as_ref()
                    .map(|rc| summarize_virtual_hosts(&rc.virtual_hosts))
                    .unwrap_or_default(),
            }
        }
        Some(model::FilterConfig::TcpProxy(tcp)) => FilterConfigSummary::TcpProxy {
            stat_prefix: tcp.stat_prefix.clone(),
            cluster: tcp.cluster.clone(),
            weighted_clusters: tcp
                .weighted_clusters
                .as_ref()
                .map(weighted_clusters)
                .unwrap_or_default(),
        },
        Some(model::FilterConfig::Opaque { .. }) | None => FilterConfigSummary::Opaque,
    };

    FilterSummary {
        name: filter.name.clone(),
        type_url: filter
            .typed_config
            .as_ref()
            .map(|c| c.type_url().to_string())
            .unwrap_or_default(),
        config,
    }
}

/// Pair up filter chain matches with destinations.
///
/// Each TCP proxy gives one rule for its chain. An HTTP connection manager
/// gives a rule for its chain's match, if there is one, followed by one rule
/// per route it serves. RDS routes are looked up by name in `routes`.
fn listener_rules(chains: &[FilterChainSummary], routes: &[RouteSummary]) -> Vec<ListenerRule> {
    let mut rules = Vec::new();

    for chain in chains {
        let chain_match = chain.chain_match.as_ref().map(chain_rule_match);

        for filter in &chain.filters {
            match &filter.config {
                FilterConfigSummary::TcpProxy {
                    cluster,
                    weighted_clusters,
                    ..
                } => {
                    let destination = if weighted_clusters.is_empty() {
                        RuleDestination {
                            destination_type: "cluster".to_string(),
                            cluster: cluster.clone(),
                            ..Default::default()
                        }
                    } else {
                        RuleDestination {
                            destination_type: "weighted_clusters".to_string(),
                            weighted_clusters: weighted_clusters.clone(),
                            ..Default::default()
                        }
                    };

                    rules.push(ListenerRule {
                        rule_match: chain_match.clone(),
                        destination: Some(destination),
                    });
                }
                FilterConfigSummary::HttpConnectionManager {
                    route_config_name,
                    virtual_hosts,
                    ..
                } => {
                    if let Some(chain_match) = &chain_match {
                        rules.push(ListenerRule {
                            rule_match: Some(chain_match.clone()),
                            destination: Some(RuleDestination {
                                destination_type: "http_connection_manager".to_string(),
                                route_config_name: route_config_name.clone(),
                                ..Default::default()
                            }),
                        });
                    }

                    let virtual_hosts = if route_config_name.is_empty() {
                        virtual_hosts.as_slice()
                    } else {
                        routes
                            .iter()
                            .find(|r| &r.name == route_config_name)
                            .map(|r| r.virtual_hosts.as_slice())
                            .unwrap_or_default()
                    };

                    for entry in virtual_hosts.iter().flat_map(|vh| &vh.routes) {
                        rules.push(ListenerRule {
                            rule_match: Some(entry.route_match.clone()),
                            destination: entry.destination.clone(),
                        });
                    }
                }
                FilterConfigSummary::Opaque => (),
            }
        }
    }

    rules
}

fn chain_rule_match(chain_match: &FilterChainMatchSummary) -> RuleMatch {
    RuleMatch {
        match_type: "filter_chain".to_string(),
        server_names: chain_match.server_names.clone(),
        application_protocols: chain_match.application_protocols.clone(),
        transport_protocol: chain_match.transport_protocol.clone(),
        prefix_ranges: chain_match.prefix_ranges.clone(),
        destination_port: chain_match.destination_port,
        ..Default::default()
    }
}

#[cfg(test)]
mod test {
    use serde::Deserialize;
    use serde_json::json;

    use super::*;
    use crate::classify::ListenerType;
    use crate::dump::{Origin, ResourceState};
    use crate::summary::{RouteEntrySummary, VirtualHostSummary};

    const HCM: &str =
        "type.googleapis.com/envoy.extensions.filters.network.http_connection_manager.v3.HttpConnectionManager";
    const TCP: &str = "type.googleapis.com/envoy.extensions.filters.network.tcp_proxy.v3.TcpProxy";

    fn decoded(listener: serde_json::Value) -> Decoded<model::Listener> {
        Decoded {
            origin: Origin::Dynamic,
            state: ResourceState::Active,
            index: 0,
            version_info: String::new(),
            last_updated: String::new(),
            resource: model::Listener::deserialize(&listener).unwrap(),
        }
    }

    fn route_summary(name: &str, cluster: &str) -> RouteSummary {
        RouteSummary {
            name: name.to_string(),
            key: name.to_string(),
            route_type: crate::classify::RouteType::PortBased,
            origin: Origin::Dynamic,
            version_info: String::new(),
            last_updated: String::new(),
            validate_clusters: false,
            virtual_hosts: vec![VirtualHostSummary {
                name: "vh".to_string(),
                domains: vec!["*".to_string()],
                routes: vec![RouteEntrySummary {
                    name: "default".to_string(),
                    route_match: RuleMatch {
                        match_type: "prefix".to_string(),
                        value: "/".to_string(),
                        ..Default::default()
                    },
                    destination: Some(RuleDestination {
                        destination_type: "cluster".to_string(),
                        cluster: cluster.to_string(),
                        ..Default::default()
                    }),
                }],
            }],
            raw_config: String::new(),
        }
    }

    #[test]
    fn test_summarize_virtual_outbound() {
        let listener = decoded(json!({
            "name": "virtualOutbound",
            "address": {"socket_address": {"address": "0.0.0.0", "port_value": 15001}},
            "use_original_dst": true,
            "traffic_direction": "OUTBOUND",
            "listener_filters": [{"name": "envoy.filters.listener.original_dst"}],
            "filter_chains": [{
                "name": "virtualOutbound-catchall-tcp",
                "filter_chain_match": {"prefix_ranges": [{"address_prefix": "10.244.0.1", "prefix_len": 32}]},
                "filters": [{"name": "envoy.filters.network.tcp_proxy", "typed_config": {"@type": TCP, "cluster": "BlackHoleCluster"}}],
            }],
            "default_filter_chain": {
                "name": "PassthroughFilterChain",
                "filters": [{"name": "envoy.filters.network.tcp_proxy", "typed_config": {"@type": TCP, "cluster": "PassthroughCluster"}}],
            },
        }));

        let summary = summarize_listener(&listener, &[], &RawConfigs::default());
        assert_eq!(summary.listener_type, ListenerType::VirtualOutbound);
        assert_eq!(summary.address, "0.0.0.0");
        assert_eq!(summary.port, 15001);
        assert!(summary.use_original_dst);
        assert_eq!(summary.traffic_direction, "OUTBOUND");
        assert_eq!(summary.listener_filters, vec!["envoy.filters.listener.original_dst"]);

        assert_eq!(summary.filter_chains.len(), 2);
        assert!(!summary.filter_chains[0].is_default);
        assert!(summary.filter_chains[1].is_default);
        assert_eq!(
            summary.filter_chains[0].chain_match.as_ref().unwrap().prefix_ranges,
            vec!["10.244.0.1/32"]
        );

        assert_eq!(summary.rules.len(), 2);
        let first = &summary.rules[0];
        assert_eq!(first.rule_match.as_ref().unwrap().match_type, "filter_chain");
        assert_eq!(first.destination.as_ref().unwrap().cluster, "BlackHoleCluster");

        // the default chain has no match
        let last = &summary.rules[1];
        assert_eq!(last.rule_match, None);
        assert_eq!(last.destination.as_ref().unwrap().cluster, "PassthroughCluster");
    }

    #[test]
    fn test_rds_routes_become_rules() {
        let listener = decoded(json!({
            "name": "0.0.0.0_9080",
            "address": {"socket_address": {"address": "0.0.0.0", "port_value": 9080}},
            "filter_chains": [{
                "filter_chain_match": {"application_protocols": ["http/1.1", "h2c"]},
                "filters": [{
                    "name": "envoy.filters.network.http_connection_manager",
                    "typed_config": {
                        "@type": HCM,
                        "stat_prefix": "outbound_0.0.0.0_9080",
                        "rds": {"route_config_name": "9080"},
                        "http_filters": [{"name": "envoy.filters.http.router"}],
                    },
                }],
            }],
        }));

        let routes = [
            route_summary("8080", "outbound|8080||other"),
            route_summary("9080", "outbound|9080||reviews.default.svc.cluster.local"),
        ];
        let summary = summarize_listener(&listener, &routes, &RawConfigs::default());
        assert_eq!(summary.listener_type, ListenerType::PortOutbound);

        let FilterConfigSummary::HttpConnectionManager {
            route_config_name,
            http_filters,
            ..
        } = &summary.filter_chains[0].filters[0].config
        else {
            panic!("expected an http connection manager");
        };
        assert_eq!(route_config_name, "9080");
        assert_eq!(http_filters, &vec!["envoy.filters.http.router".to_string()]);
        assert_eq!(summary.filter_chains[0].filters[0].type_url, HCM);

        assert_eq!(summary.rules.len(), 2);
        assert_eq!(
            summary.rules[0].destination.as_ref().unwrap().destination_type,
            "http_connection_manager"
        );
        assert_eq!(
            summary.rules[0].rule_match.as_ref().unwrap().application_protocols,
            vec!["http/1.1", "h2c"]
        );
        assert_eq!(
            summary.rules[1].destination.as_ref().unwrap().cluster,
            "outbound|9080||reviews.default.svc.cluster.local"
        );
    }

    #[test]
    fn test_inline_routes_and_opaque_filters() {
        let listener = decoded(json!({
            "name": "10.96.0.1_15014",
            "address": {"socket_address": {"address": "10.96.0.1", "port_value": 15014}},
            "filter_chains": [{
                "filters": [
                    {"name": "istio.metadata_exchange", "typed_config": {"@type": "type.googleapis.com/udpa.type.v1.TypedStruct"}},
                    {"name": "no-config"},
                    {
                        "name": "envoy.filters.network.http_connection_manager",
                        "typed_config": {
                            "@type": HCM,
                            "route_config": {
                                "name": "inline",
                                "virtual_hosts": [{
                                    "name": "backend",
                                    "domains": ["*"],
                                    "routes": [{"match": {"prefix": "/stats/prometheus"}, "route": {"cluster": "prometheus_stats"}}],
                                }],
                            },
                        },
                    },
                ],
            }],
        }));

        let summary = summarize_listener(&listener, &[], &RawConfigs::default());
        assert_eq!(summary.listener_type, ListenerType::ServiceOutbound);

        let filters = &summary.filter_chains[0].filters;
        assert_eq!(filters[0].config, FilterConfigSummary::Opaque);
        assert_eq!(filters[0].type_url, "type.googleapis.com/udpa.type.v1.TypedStruct");
        assert_eq!(filters[1].config, FilterConfigSummary::Opaque);
        assert_eq!(filters[1].type_url, "");

        // no chain match, so only the inline route
        assert_eq!(summary.rules.len(), 1);
        let rule_match = summary.rules[0].rule_match.as_ref().unwrap();
        assert_eq!(rule_match.value, "/stats/prometheus");
        assert_eq!(rule_match.virtual_host, "backend");
    }

    #[test]
    fn test_missing_rds_route() {
        let listener = decoded(json!({
            "name": "0.0.0.0_80",
            "filter_chains": [{
                "filters": [{
                    "name": "envoy.filters.network.http_connection_manager",
                    "typed_config": {"@type": HCM, "rds": {"route_config_name": "80"}},
                }],
            }],
        }));

        let summary = summarize_listener(&listener, &[], &RawConfigs::default());
        assert!(summary.rules.is_empty());
        assert_eq!(summary.address, "");
        assert_eq!(summary.listener_type, ListenerType::ServiceOutbound);
    }
}
