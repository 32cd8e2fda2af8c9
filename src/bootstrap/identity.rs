//! Broker identity
//!
//! A broker's ordinal is the trailing integer of its instance name
//! (`acme-broker-7` → 7). The naming scheme guarantees a unique, dense
//! ordinal per broker; anything unparsable fails the whole bootstrap as a
//! configuration error before any side effect happens.

use serde::{Deserialize, Serialize};
use std::net::IpAddr;

use crate::common::{Error, Result};

/// Identity of the broker this coordinator is bootstrapping.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BrokerIdentity {
    /// Instance name as assigned at creation time
    pub name: String,
    /// 0-based dense index among the declared peer count
    pub ordinal: u32,
    /// Reserved internal address, assigned pre-boot
    pub address: IpAddr,
}

impl BrokerIdentity {
    pub fn new(name: impl Into<String>, address: IpAddr) -> Result<Self> {
        let name = name.into();
        let ordinal = parse_ordinal(&name)?;
        Ok(Self {
            name,
            ordinal,
            address,
        })
    }

    /// KRaft node ID. Identical to the ordinal in this design.
    pub fn node_id(&self) -> u32 {
        self.ordinal
    }

    /// Only the first node performs one-time storage formatting.
    pub fn is_first_node(&self) -> bool {
        self.ordinal == 0
    }
}

impl std::fmt::Display for BrokerIdentity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} (node {})", self.name, self.ordinal)
    }
}

/// Parse the trailing integer of an instance name.
pub fn parse_ordinal(name: &str) -> Result<u32> {
    let digits: String = name
        .chars()
        .rev()
        .take_while(|c| c.is_ascii_digit())
        .collect::<Vec<_>>()
        .into_iter()
        .rev()
        .collect();

    if digits.is_empty() {
        return Err(Error::InvalidOrdinal(name.to_string()));
    }
    digits
        .parse()
        .map_err(|_| Error::InvalidOrdinal(name.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_ordinal() {
        assert_eq!(parse_ordinal("prefix-broker-0").unwrap(), 0);
        assert_eq!(parse_ordinal("prefix-broker-7").unwrap(), 7);
        assert_eq!(parse_ordinal("prefix-broker-12").unwrap(), 12);
    }

    #[test]
    fn test_parse_ordinal_rejects_missing_trailing_integer() {
        let err = parse_ordinal("prefix-broker").unwrap_err();
        assert!(matches!(err, Error::InvalidOrdinal(_)));
        assert!(parse_ordinal("").is_err());
        assert!(parse_ordinal("broker-").is_err());
    }

    #[test]
    fn test_identity() {
        let id = BrokerIdentity::new("acme-broker-3", "10.0.0.5".parse().unwrap()).unwrap();
        assert_eq!(id.ordinal, 3);
        assert_eq!(id.node_id(), 3);
        assert!(!id.is_first_node());

        let first = BrokerIdentity::new("acme-broker-0", "10.0.0.2".parse().unwrap()).unwrap();
        assert!(first.is_first_node());
    }
}
