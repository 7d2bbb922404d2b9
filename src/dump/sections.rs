/// Declare a closed set of types identified by a protobuf type URL, with
/// lookup in both directions.
macro_rules! type_urls {
    (enum $name:ident { $($variant:ident => $type_url:literal),* $(,)* }) => {
        #[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, enum_map::Enum)]
        pub enum $name {
            $(
                $variant,
            )*
        }

        impl $name {
            pub fn all() -> &'static [$name] {
                &[
                    $(
                        $name::$variant,
                    )*
                ]
            }

            pub fn type_url(&self) -> &'static str {
                match self {
                    $(
                        $name::$variant => $type_url,
                    )*
                }
            }

            pub fn from_type_url(type_url: &str) -> Option<Self> {
                match type_url {
                    $(
                        $type_url => Some($name::$variant),
                    )*
                    _ => None,
                }
            }
        }
    };
}

type_urls! {
    enum Section {
        Bootstrap => "type.googleapis.com/envoy.admin.v3.BootstrapConfigDump",
        Listeners => "type.googleapis.com/envoy.admin.v3.ListenersConfigDump",
        Clusters => "type.googleapis.com/envoy.admin.v3.ClustersConfigDump",
        Routes => "type.googleapis.com/envoy.admin.v3.RoutesConfigDump",
        ScopedRoutes => "type.googleapis.com/envoy.admin.v3.ScopedRoutesConfigDump",
        Endpoints => "type.googleapis.com/envoy.admin.v3.EndpointsConfigDump",
        Secrets => "type.googleapis.com/envoy.admin.v3.SecretsConfigDump",
        Ecds => "type.googleapis.com/envoy.admin.v3.EcdsConfigDump",
    }
}

impl Section {
    /// A short name for logs and metric labels.
    pub fn label(&self) -> &'static str {
        match self {
            Section::Bootstrap => "bootstrap",
            Section::Listeners => "listeners",
            Section::Clusters => "clusters",
            Section::Routes => "routes",
            Section::ScopedRoutes => "scoped_routes",
            Section::Endpoints => "endpoints",
            Section::Secrets => "secrets",
            Section::Ecds => "ecds",
        }
    }
}

type_urls! {
    enum ResourceType {
        Listener => "type.googleapis.com/envoy.config.listener.v3.Listener",
        RouteConfiguration => "type.googleapis.com/envoy.config.route.v3.RouteConfiguration",
        Cluster => "type.googleapis.com/envoy.config.cluster.v3.Cluster",
        ClusterLoadAssignment => "type.googleapis.com/envoy.config.endpoint.v3.ClusterLoadAssignment",
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_section_type_urls() {
        for section in Section::all() {
            assert_eq!(Section::from_type_url(section.type_url()), Some(*section));
        }

        assert_eq!(
            Section::from_type_url("type.googleapis.com/envoy.admin.v3.ListenersConfigDump"),
            Some(Section::Listeners),
        );
        assert_eq!(
            Section::from_type_url("type.googleapis.com/envoy.admin.v2alpha.ListenersConfigDump"),
            None,
        );
    }

    #[test]
    fn test_resource_type_urls() {
        assert_eq!(
            ResourceType::Listener.type_url(),
            "type.googleapis.com/envoy.config.listener.v3.Listener"
        );
        assert_eq!(
            ResourceType::from_type_url("type.googleapis.com/envoy.config.cluster.v3.Cluster"),
            Some(ResourceType::Cluster),
        );
        assert_eq!(ResourceType::from_type_url(""), None);
    }
}
