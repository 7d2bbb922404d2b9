use super::{
    address_and_port, flatten_metadata, raw_or_rendered, BootstrapSummary, ClusterManagerSummary,
    DynamicResourcesSummary, NodeSummary,
};
use crate::dump::model::Bootstrap;

pub(super) fn summarize_bootstrap(bootstrap: &Bootstrap, raw: Option<&str>) -> BootstrapSummary {
    let node = bootstrap
        .node
        .as_ref()
        .map(|node| {
            let locality = node.locality.clone().unwrap_or_default();
            NodeSummary {
                id: node.id.clone(),
                cluster: node.cluster.clone(),
                metadata: node
                    .metadata
                    .as_ref()
                    .map(flatten_metadata)
                    .unwrap_or_default(),
                region: locality.region,
                zone: locality.zone,
                sub_zone: locality.sub_zone,
                user_agent_name: node.user_agent_name.clone(),
            }
        })
        .unwrap_or_default();

    let (admin_address, admin_port) =
        address_and_port(bootstrap.admin.as_ref().and_then(|a| a.address.as_ref()));

    let dynamic_resources = bootstrap
        .dynamic_resources
        .as_ref()
        .map(|d| DynamicResourcesSummary {
            ads: d.ads_config.is_some(),
            lds: d.lds_config.is_some(),
            cds: d.cds_config.is_some(),
        })
        .unwrap_or_default();

    let cluster_manager = bootstrap
        .cluster_manager
        .as_ref()
        .map(|cm| ClusterManagerSummary {
            local_cluster_name: cm.local_cluster_name.clone(),
            outlier_detection: cm.outlier_detection.is_some(),
            upstream_bind_config: cm.upstream_bind_config.is_some(),
            load_stats_config: cm.load_stats_config.is_some(),
        })
        .unwrap_or_default();

    let (static_listeners, static_clusters) = bootstrap
        .static_resources
        .as_ref()
        .map(|s| (s.listeners.len(), s.clusters.len()))
        .unwrap_or_default();

    BootstrapSummary {
        node,
        admin_address,
        admin_port,
        dynamic_resources,
        cluster_manager,
        static_listeners,
        static_clusters,
        raw_config: raw_or_rendered(raw, bootstrap),
    }
}
