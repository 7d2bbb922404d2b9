use super::{
    raw_or_rendered, HeaderMatchSummary, RouteEntrySummary, RouteSummary, RuleDestination,
    RuleMatch, VirtualHostSummary, WeightedClusterSummary,
};
use crate::classify::route_type;
use crate::dump::{model, Decoded, Origin, RawConfigs, RouteKey};

pub(super) fn summarize_route(
    decoded: &Decoded<model::RouteConfiguration>,
    raw: &RawConfigs,
) -> RouteSummary {
    let route = &decoded.resource;
    let key = RouteKey::new(decoded.origin, decoded.index, route.name.clone());

    RouteSummary {
        name: route.name.clone(),
        key: key.label(),
        route_type: route_type(&route.name, decoded.origin == Origin::Static),
        origin: decoded.origin,
        version_info: decoded.version_info.clone(),
        last_updated: decoded.last_updated.clone(),
        validate_clusters: route.validate_clusters.unwrap_or_default(),
        virtual_hosts: summarize_virtual_hosts(&route.virtual_hosts),
        raw_config: raw_or_rendered(raw.route(&key), route),
    }
}

pub(super) fn summarize_virtual_hosts(virtual_hosts: &[model::VirtualHost]) -> Vec<VirtualHostSummary> {
    virtual_hosts.iter().map(summarize_virtual_host).collect()
}

fn summarize_virtual_host(vhost: &model::VirtualHost) -> VirtualHostSummary {
    let routes = vhost
        .routes
        .iter()
        .map(|route| {
            let mut route_match = summarize_match(route.route_match.as_ref());
            route_match.virtual_host = vhost.name.clone();
            route_match.domains = vhost.domains.clone();

            RouteEntrySummary {
                name: route.name.clone(),
                route_match,
                destination: summarize_destination(route),
            }
        })
        .collect();

    VirtualHostSummary {
        name: vhost.name.clone(),
        domains: vhost.domains.clone(),
        routes,
    }
}

fn summarize_match(route_match: Option<&model::RouteMatch>) -> RuleMatch {
    let Some(route_match) = route_match else {
        return RuleMatch {
            match_type: "any".to_string(),
            ..Default::default()
        };
    };

    let (match_type, value) = if let Some(prefix) = &route_match.prefix {
        ("prefix", prefix.clone())
    } else if let Some(path) = &route_match.path {
        ("path", path.clone())
    } else if let Some(regex) = &route_match.safe_regex {
        ("safe_regex", regex.regex.clone())
    } else if let Some(prefix) = &route_match.path_separated_prefix {
        ("path_separated_prefix", prefix.clone())
    } else if route_match.connect_matcher.is_some() {
        ("connect_matcher", String::new())
    } else {
        ("any", String::new())
    };

    RuleMatch {
        match_type: match_type.to_string(),
        value,
        headers: route_match.headers.iter().map(summarize_header).collect(),
        ..Default::default()
    }
}

fn summarize_header(header: &model::HeaderMatcher) -> HeaderMatchSummary {
    let string_match = header.string_match.as_ref();

    let (match_type, value) = if let Some(m) = string_match {
        if let Some(v) = &m.exact {
            ("exact", v.clone())
        } else if let Some(v) = &m.prefix {
            ("prefix", v.clone())
        } else if let Some(v) = &m.suffix {
            ("suffix", v.clone())
        } else if let Some(v) = &m.contains {
            ("contains", v.clone())
        } else if let Some(v) = &m.safe_regex {
            ("safe_regex", v.regex.clone())
        } else {
            ("any", String::new())
        }
    } else if let Some(v) = &header.exact_match {
        ("exact", v.clone())
    } else if let Some(v) = &header.prefix_match {
        ("prefix", v.clone())
    } else if let Some(v) = &header.suffix_match {
        ("suffix", v.clone())
    } else if let Some(v) = &header.contains_match {
        ("contains", v.clone())
    } else if let Some(v) = &header.safe_regex_match {
        ("safe_regex", v.regex.clone())
    } else if let Some(present) = header.present_match {
        ("present", present.to_string())
    } else {
        ("any", String::new())
    };

    HeaderMatchSummary {
        name: header.name.clone(),
        match_type: match_type.to_string(),
        value,
        invert: header.invert_match,
    }
}

fn summarize_destination(route: &model::Route) -> Option<RuleDestination> {
    if let Some(action) = &route.route {
        let timeout = action.timeout.clone().unwrap_or_default();

        let destination = if let Some(cluster) = &action.cluster {
            RuleDestination {
                destination_type: "cluster".to_string(),
                cluster: cluster.clone(),
                ..Default::default()
            }
        } else if let Some(weighted) = &action.weighted_clusters {
            RuleDestination {
                destination_type: "weighted_clusters".to_string(),
                weighted_clusters: weighted_clusters(weighted),
                ..Default::default()
            }
        } else if let Some(header) = &action.cluster_header {
            RuleDestination {
                destination_type: "cluster_header".to_string(),
                cluster: header.clone(),
                ..Default::default()
            }
        } else {
            RuleDestination {
                destination_type: "cluster".to_string(),
                ..Default::default()
            }
        };

        return Some(RuleDestination {
            timeout,
            ..destination
        });
    }

    if let Some(redirect) = &route.redirect {
        let target = if redirect.https_redirect {
            format!("https://{}{}", redirect.host_redirect, redirect.path_redirect)
        } else {
            format!("{}{}", redirect.host_redirect, redirect.path_redirect)
        };

        return Some(RuleDestination {
            destination_type: "redirect".to_string(),
            redirect: target,
            ..Default::default()
        });
    }

    if let Some(direct) = &route.direct_response {
        return Some(RuleDestination {
            destination_type: "direct_response".to_string(),
            status: direct.status,
            ..Default::default()
        });
    }

    if route.non_forwarding_action.is_some() {
        return Some(RuleDestination {
            destination_type: "non_forwarding".to_string(),
            ..Default::default()
        });
    }

    None
}

pub(super) fn weighted_clusters(weighted: &model::WeightedClusters) -> Vec<WeightedClusterSummary> {
    weighted
        .clusters
        .iter()
        .map(|c| WeightedClusterSummary {
            name: c.name.clone(),
            weight: c.weight.unwrap_or_default(),
        })
        .collect()
}
