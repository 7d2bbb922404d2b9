//! Decode, summarize, and classify Envoy admin config dumps.
//!
//! The pipeline is [decode] into a [dump::ConfigSnapshot], [summarize] into a
//! [summary::ParsedSummary], and optionally [enrich] the summary with Istio
//! naming conventions. Only a structurally broken dump is an error. Anything
//! else degrades to empty or default fields.

pub mod classify;
pub mod dump;
pub mod mesh;
pub mod summary;

mod metrics;

pub use crate::dump::{decode, DecodeError};
pub use crate::mesh::{enrich, enrich_with, EnrichOptions, ProxyMode};
pub use crate::metrics::describe_metrics;
pub use crate::summary::summarize;

#[cfg(test)]
mod test {
    use pretty_assertions::assert_eq;
    use serde_json::Value;

    use super::*;
    use crate::classify::{Direction, ListenerType, RouteType};
    use crate::dump::{Origin, RouteKey};

    const SIDECAR_DUMP: &str = include_str!("../testdata/sidecar_dump.json");

    fn sidecar_summary() -> summary::ParsedSummary {
        let snapshot = decode(SIDECAR_DUMP.as_bytes()).unwrap();
        summarize(&snapshot)
    }

    #[test]
    fn test_decode_sidecar_dump() {
        let snapshot = decode(SIDECAR_DUMP.as_bytes()).unwrap();

        assert!(snapshot.bootstrap.is_some());
        assert!(snapshot.endpoints.is_empty());

        let listener_names: Vec<_> = snapshot
            .listeners
            .iter()
            .map(|l| l.resource.name.as_str())
            .collect();
        assert_eq!(
            listener_names,
            vec![
                "0.0.0.0_15090",
                "0.0.0.0_15021",
                "virtualOutbound",
                "virtualInbound",
                "10.96.0.10_53",
                "0.0.0.0_9080",
            ]
        );

        // the malformed cluster is skipped, its siblings aren't
        let cluster_names: Vec<_> = snapshot
            .clusters
            .iter()
            .map(|c| c.resource.name.as_str())
            .collect();
        assert_eq!(
            cluster_names,
            vec![
                "prometheus_stats",
                "agent",
                "BlackHoleCluster",
                "PassthroughCluster",
                "inbound|9080||",
                "outbound|9080|v1|reviews.default.svc.cluster.local",
            ]
        );

        assert_eq!(snapshot.routes.len(), 4);
        assert!(snapshot
            .raw
            .route(&RouteKey::new(Origin::Static, 0, ""))
            .is_some());
        assert!(snapshot
            .raw
            .route(&RouteKey::new(Origin::Dynamic, 1, ""))
            .is_some());
    }

    #[test]
    fn test_raw_listener_round_trip() {
        let snapshot = decode(SIDECAR_DUMP.as_bytes()).unwrap();

        for listener in &snapshot.listeners {
            let name = &listener.resource.name;
            let raw = snapshot.raw.listener(name).unwrap();
            assert!(serde_json::from_str::<Value>(raw).is_ok(), "{name}");
            assert!(raw.contains(name.as_str()), "{name}");
        }
    }

    #[test]
    fn test_summarize_sidecar_dump() {
        let summary = sidecar_summary();
        assert_eq!(summary.proxy_mode, None);

        let bootstrap = summary.bootstrap.as_ref().unwrap();
        assert_eq!(bootstrap.node.cluster, "productpage.default");
        assert_eq!(bootstrap.admin_port, 15000);

        let listener_types: Vec<_> = summary.listeners.iter().map(|l| l.listener_type).collect();
        assert_eq!(
            listener_types,
            vec![
                ListenerType::ProxyMetrics,
                ListenerType::ProxyHealthcheck,
                ListenerType::VirtualOutbound,
                ListenerType::VirtualInbound,
                ListenerType::ServiceOutbound,
                ListenerType::PortOutbound,
            ]
        );

        // RDS routes resolve against the snapshot's route configs
        let port_listener = &summary.listeners[5];
        let destinations: Vec<_> = port_listener
            .rules
            .iter()
            .filter_map(|r| r.destination.as_ref())
            .map(|d| d.destination_type.as_str())
            .collect();
        assert_eq!(
            destinations,
            vec!["http_connection_manager", "cluster", "cluster", "cluster"]
        );
        assert_eq!(port_listener.state, crate::dump::ResourceState::Warming);

        let route_types: Vec<_> = summary
            .routes
            .iter()
            .map(|r| (r.key.as_str(), r.route_type))
            .collect();
        assert_eq!(
            route_types,
            vec![
                ("__empty_static_0", RouteType::Static),
                ("9080", RouteType::PortBased),
                ("__empty_dynamic_1", RouteType::Static),
                ("reviews.default.svc.cluster.local:9080", RouteType::ServiceSpecific),
            ]
        );

        let reviews = summary
            .clusters
            .iter()
            .find(|c| c.name == "outbound|9080|v1|reviews.default.svc.cluster.local")
            .unwrap();
        assert_eq!(reviews.direction, Direction::Outbound);
        assert_eq!(reviews.port, 9080);
        assert_eq!(reviews.subset, "v1");

        let inbound = summary.clusters.iter().find(|c| c.name == "inbound|9080||").unwrap();
        assert_eq!(inbound.direction, Direction::Inbound);

        for cluster in &summary.clusters {
            assert!(!cluster.raw_config.is_empty());
        }
    }

    #[test]
    fn test_enrich_sidecar_dump() {
        let mut summary = sidecar_summary();
        enrich(&mut summary);

        assert_eq!(summary.proxy_mode, Some(ProxyMode::Sidecar));

        let reviews = summary
            .clusters
            .iter()
            .find(|c| c.name == "outbound|9080|v1|reviews.default.svc.cluster.local")
            .unwrap();
        let service = reviews.service.as_ref().unwrap();
        assert_eq!(service.name, "reviews");
        assert_eq!(service.namespace, "default");

        let outbound = &summary.listeners[2];
        let sentinels: Vec<_> = outbound
            .rules
            .iter()
            .filter_map(|r| r.destination.as_ref())
            .map(|d| d.destination_type.as_str())
            .collect();
        assert_eq!(sentinels, vec!["blackhole", "passthrough"]);

        let port_listener = &summary.listeners[5];
        let reviews_rule = port_listener.rules.last().unwrap();
        let destination = reviews_rule.destination.as_ref().unwrap();
        assert_eq!(destination.destination_type, "outbound");
        assert_eq!(destination.service_fqdn, "reviews.default.svc.cluster.local");
        assert_eq!(destination.port, 9080);

        let sni = port_listener.rules[3].rule_match.as_ref().unwrap();
        assert_eq!(
            sni.server_names,
            vec!["istio_service_outbound_.9080_.v1_.reviews.default.svc.cluster.local"]
        );

        let health_listener = &summary.listeners[1];
        let health_match = health_listener.rules[0].rule_match.as_ref().unwrap();
        assert_eq!(health_match.match_type, "istio_health");

        let service_route = &summary.routes[3];
        let jason = &service_route.virtual_hosts[0].routes[0];
        assert_eq!(jason.route_match.headers[1].name, "istio_service_host");
    }

    #[test]
    fn test_enrich_is_idempotent() {
        let mut once = sidecar_summary();
        enrich(&mut once);

        let mut twice = once.clone();
        enrich(&mut twice);
        assert_eq!(once, twice);

        let rendered_once = serde_json::to_string(&once).unwrap();
        let rendered_twice = serde_json::to_string(&twice).unwrap();
        assert_eq!(rendered_once, rendered_twice);
        assert_eq!(rendered_once.matches("istio_service_istio_service_").count(), 0);
    }

    #[test]
    fn test_gateway_override() {
        let mut summary = sidecar_summary();
        enrich_with(
            &mut summary,
            &EnrichOptions {
                proxy_mode: Some(ProxyMode::Gateway),
            },
        );

        assert_eq!(summary.proxy_mode, Some(ProxyMode::Gateway));
        assert_eq!(summary.listeners[5].listener_type, ListenerType::GatewayInbound);
        assert_eq!(summary.listeners[0].listener_type, ListenerType::ProxyMetrics);
        assert_eq!(summary.listeners[2].listener_type, ListenerType::VirtualOutbound);
    }

    #[test]
    fn test_pipeline_is_deterministic() {
        let first = serde_json::to_string(&sidecar_summary()).unwrap();
        let second = serde_json::to_string(&sidecar_summary()).unwrap();
        assert_eq!(first, second);
    }
}
