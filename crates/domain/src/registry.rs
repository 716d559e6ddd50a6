//! Registry lifecycle policies.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// How a registry decides when devices come into and go out of existence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RegistryPolicy {
    /// Devices are created and removed by explicit calls.
    #[default]
    Eager,
    /// Devices materialize on first reference and are never removed.
    OnDemand,
}

impl fmt::Display for RegistryPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Eager => f.write_str("eager"),
            Self::OnDemand => f.write_str("on_demand"),
        }
    }
}

impl FromStr for RegistryPolicy {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().replace('-', "_").as_str() {
            "eager" => Ok(Self::Eager),
            "on_demand" => Ok(Self::OnDemand),
            _ => Err(ValidationError::UnknownPolicy(s.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn should_default_to_eager() {
        assert_eq!(RegistryPolicy::default(), RegistryPolicy::Eager);
    }

    #[test]
    fn should_parse_policy_names_leniently() {
        assert_eq!("eager".parse(), Ok(RegistryPolicy::Eager));
        assert_eq!("On-Demand".parse(), Ok(RegistryPolicy::OnDemand));
        assert_eq!("on_demand".parse(), Ok(RegistryPolicy::OnDemand));
    }

    #[test]
    fn should_reject_unknown_policy() {
        let result = RegistryPolicy::from_str("lazy");
        assert_eq!(result, Err(ValidationError::UnknownPolicy("lazy".into())));
    }

    #[test]
    fn should_roundtrip_through_serde_json() {
        let json = serde_json::to_string(&RegistryPolicy::OnDemand).unwrap();
        assert_eq!(json, "\"on_demand\"");
        let parsed: RegistryPolicy = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, RegistryPolicy::OnDemand);
    }
}
