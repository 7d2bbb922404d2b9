use super::{
    endpoint::summarize_endpoint, raw_or_rendered, ClusterSummary, HealthCheckSummary,
    ThresholdsSummary,
};
use crate::classify::ClusterName;
use crate::dump::{model, Decoded, DiscoveryType, LbPolicy, RawConfigs, RoutingPriority};

pub(super) fn summarize_cluster(decoded: &Decoded<model::Cluster>, raw: &RawConfigs) -> ClusterSummary {
    let cluster = &decoded.resource;

    // custom cluster types replace the discovery type
    let discovery_type = match &cluster.cluster_type {
        Some(custom) if !custom.name.is_empty() => custom.name.clone(),
        _ => cluster.discovery_type.render::<DiscoveryType>(),
    };

    let circuit_breakers = cluster
        .circuit_breakers
        .as_ref()
        .map(|cb| cb.thresholds.iter().map(summarize_thresholds).collect())
        .unwrap_or_default();

    let mut summary = ClusterSummary {
        name: cluster.name.clone(),
        discovery_type,
        lb_policy: cluster.lb_policy.render::<LbPolicy>(),
        connect_timeout: cluster.connect_timeout.clone().unwrap_or_default(),
        eds_service_name: cluster
            .eds_cluster_config
            .as_ref()
            .map(|eds| eds.service_name.clone())
            .unwrap_or_default(),
        transport_socket: cluster
            .transport_socket
            .as_ref()
            .map(|ts| ts.name.clone())
            .unwrap_or_default(),
        health_checks: cluster.health_checks.iter().map(summarize_health_check).collect(),
        circuit_breakers,
        load_assignment: cluster.load_assignment.as_ref().map(summarize_endpoint),
        origin: decoded.origin,
        state: decoded.state,
        version_info: decoded.version_info.clone(),
        last_updated: decoded.last_updated.clone(),
        direction: Default::default(),
        port: 0,
        subset: String::new(),
        service_fqdn: String::new(),
        service: None,
        raw_config: raw_or_rendered(raw.cluster(&cluster.name), cluster),
    };
    summary.set_cluster_name(ClusterName::parse(&cluster.name));

    summary
}

fn summarize_health_check(hc: &model::HealthCheck) -> HealthCheckSummary {
    let (kind, path) = if let Some(http) = &hc.http_health_check {
        ("http", http.path.clone())
    } else if hc.tcp_health_check.is_some() {
        ("tcp", String::new())
    } else if hc.grpc_health_check.is_some() {
        ("grpc", String::new())
    } else {
        ("unknown", String::new())
    };

    HealthCheckSummary {
        kind: kind.to_string(),
        path,
        timeout: hc.timeout.clone().unwrap_or_default(),
        interval: hc.interval.clone().unwrap_or_default(),
        healthy_threshold: hc.healthy_threshold.unwrap_or_default(),
        unhealthy_threshold: hc.unhealthy_threshold.unwrap_or_default(),
    }
}

fn summarize_thresholds(thresholds: &model::Thresholds) -> ThresholdsSummary {
    ThresholdsSummary {
        priority: thresholds.priority.render::<RoutingPriority>(),
        max_connections: thresholds.max_connections,
        max_pending_requests: thresholds.max_pending_requests,
        max_requests: thresholds.max_requests,
        max_retries: thresholds.max_retries,
    }
}

#[cfg(test)]
mod test {
    use serde::Deserialize;
    use serde_json::json;

    use super::*;
    use crate::classify::Direction;
    use crate::dump::{Origin, ResourceState};

    fn decoded(cluster: serde_json::Value) -> Decoded<model::Cluster> {
        Decoded {
            origin: Origin::Dynamic,
            state: ResourceState::Active,
            index: 0,
            version_info: "2024-05-01T00:00:00Z/12".to_string(),
            last_updated: String::new(),
            resource: model::Cluster::deserialize(&cluster).unwrap(),
        }
    }

    #[test]
    fn test_summarize_eds_cluster() {
        let cluster = decoded(json!({
            "name": "outbound|9080|v2|reviews.default.svc.cluster.local",
            "type": "EDS",
            "eds_cluster_config": {"service_name": "outbound|9080|v2|reviews.default.svc.cluster.local"},
            "connect_timeout": "10s",
            "lb_policy": "LEAST_REQUEST",
            "circuit_breakers": {"thresholds": [{"max_connections": 4294967295u32, "max_retries": 4294967295u32}]},
            "health_checks": [{"timeout": "1s", "interval": "5s", "http_health_check": {"path": "/healthz"}}],
            "transport_socket": {"name": "envoy.transport_sockets.tls"},
        }));

        let summary = summarize_cluster(&cluster, &RawConfigs::default());
        assert_eq!(summary.discovery_type, "EDS");
        assert_eq!(summary.lb_policy, "LEAST_REQUEST");
        assert_eq!(summary.connect_timeout, "10s");
        assert_eq!(summary.eds_service_name, cluster.resource.name);
        assert_eq!(summary.transport_socket, "envoy.transport_sockets.tls");
        assert_eq!(summary.circuit_breakers[0].priority, "DEFAULT");
        assert_eq!(summary.circuit_breakers[0].max_connections, Some(u32::MAX));
        assert_eq!(summary.circuit_breakers[0].max_requests, None);
        assert_eq!(summary.health_checks[0].kind, "http");
        assert_eq!(summary.health_checks[0].path, "/healthz");
        assert_eq!(summary.version_info, "2024-05-01T00:00:00Z/12");

        assert_eq!(summary.direction, Direction::Outbound);
        assert_eq!(summary.port, 9080);
        assert_eq!(summary.subset, "v2");
        assert_eq!(summary.service_fqdn, "reviews.default.svc.cluster.local");
        assert!(summary.service.is_none());
    }

    #[test]
    fn test_summarize_minimal_cluster() {
        let cluster = decoded(json!({"name": "BlackHoleCluster"}));
        let summary = summarize_cluster(&cluster, &RawConfigs::default());

        assert_eq!(summary.discovery_type, "STATIC");
        assert_eq!(summary.lb_policy, "ROUND_ROBIN");
        assert!(summary.load_assignment.is_none());
        assert_eq!(summary.direction, Direction::Unspecified);
        assert_eq!(summary.port, 0);
        assert!(summary.raw_config.contains("BlackHoleCluster"));
    }

    #[test]
    fn test_summarize_custom_cluster_type() {
        let cluster = decoded(json!({
            "name": "aggregate",
            "cluster_type": {"name": "envoy.clusters.aggregate"},
            "load_assignment": {"cluster_name": "aggregate"},
        }));
        let summary = summarize_cluster(&cluster, &RawConfigs::default());

        assert_eq!(summary.discovery_type, "envoy.clusters.aggregate");
        assert_eq!(summary.load_assignment.unwrap().cluster_name, "aggregate");
    }

    #[test]
    fn test_loose_cluster_names_are_not_decomposed() {
        let cluster = decoded(json!({"name": "inbound|8080|"}));
        let summary = summarize_cluster(&cluster, &RawConfigs::default());

        assert_eq!(summary.direction, Direction::Unspecified);
        assert_eq!(summary.port, 0);
    }
}
