//! Protobuf enums as they appear in a JSON config dump.
//!
//! The JSON mapping writes enums by symbolic name, but accepts numbers too,
//! and leaves them out entirely when they hold their zero value. Rendering
//! goes through the generated xDS bindings so names always match the proto.

use serde::{Deserialize, Serialize};
use xds_api::pb::envoy::config::{cluster::v3 as xds_cluster, core::v3 as xds_core};

pub type DiscoveryType = xds_cluster::cluster::DiscoveryType;
pub type LbPolicy = xds_cluster::cluster::LbPolicy;
pub type HealthStatus = xds_core::HealthStatus;
pub type RoutingPriority = xds_core::RoutingPriority;
pub type TrafficDirection = xds_core::TrafficDirection;

/// An enum field, either by name or by number.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum EnumValue {
    Name(String),
    Number(i32),
}

impl Default for EnumValue {
    fn default() -> Self {
        EnumValue::Number(0)
    }
}

impl EnumValue {
    /// Render as the symbolic name for `E`. Names are kept as-is, even when
    /// they're newer than the bindings. Unknown numbers render as decimal.
    pub fn render<E: ProtoEnum>(&self) -> String {
        match self {
            EnumValue::Name(name) => name.clone(),
            EnumValue::Number(n) => match E::name_of(*n) {
                Some(name) => name.to_string(),
                None => n.to_string(),
            },
        }
    }
}

pub trait ProtoEnum {
    fn name_of(value: i32) -> Option<&'static str>;
}

macro_rules! proto_enums {
    ($($ty:ty),* $(,)?) => {
        $(
            impl ProtoEnum for $ty {
                fn name_of(value: i32) -> Option<&'static str> {
                    <$ty>::try_from(value).ok().map(|v| v.as_str_name())
                }
            }
        )*
    };
}

proto_enums! {
    DiscoveryType,
    LbPolicy,
    HealthStatus,
    RoutingPriority,
    TrafficDirection,
}
