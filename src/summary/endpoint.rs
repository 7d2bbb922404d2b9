use serde_json::Value;

use super::{
    address_and_port, flatten_metadata, EndpointHostSummary, EndpointSummary,
    LocalityEndpointsSummary,
};
use crate::dump::{model, HealthStatus};

/// Summarize a ClusterLoadAssignment, either a cluster's inline assignment or
/// one fetched from EDS.
pub fn summarize_endpoint(assignment: &model::ClusterLoadAssignment) -> EndpointSummary {
    let localities = assignment
        .endpoints
        .iter()
        .map(|group| {
            let locality = group.locality.clone().unwrap_or_default();
            LocalityEndpointsSummary {
                region: locality.region,
                zone: locality.zone,
                sub_zone: locality.sub_zone,
                priority: group.priority,
                weight: group.load_balancing_weight,
                endpoints: group.lb_endpoints.iter().map(summarize_lb_endpoint).collect(),
            }
        })
        .collect();

    EndpointSummary {
        cluster_name: assignment.cluster_name.clone(),
        localities,
        ..Default::default()
    }
}

fn summarize_lb_endpoint(lb_endpoint: &model::LbEndpoint) -> EndpointHostSummary {
    let endpoint = lb_endpoint.endpoint.as_ref();
    let (address, port) = address_and_port(endpoint.and_then(|e| e.address.as_ref()));

    let metadata = lb_endpoint
        .metadata
        .as_ref()
        .map(|m| flatten_metadata(&Value::Object(m.filter_metadata.clone())))
        .unwrap_or_default();

    EndpointHostSummary {
        address,
        port,
        hostname: endpoint.map(|e| e.hostname.clone()).unwrap_or_default(),
        health_status: lb_endpoint.health_status.render::<HealthStatus>(),
        // unset weights count as 1
        weight: lb_endpoint.load_balancing_weight.unwrap_or(1),
        metadata,
    }
}
