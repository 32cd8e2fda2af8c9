//! Peer address directory
//!
//! Every broker resolves every peer's reserved internal address through the
//! same directory, so all brokers derive the same voter set from the same
//! static ordinal → address mapping. [`DnsDirectory`] is the production
//! implementation (the provisioner registers reserved addresses in internal
//! DNS before any instance boots); [`StaticDirectory`] backs tests,
//! including the late-registration race simulation.

mod dns;

pub use dns::DnsDirectory;

use std::collections::HashMap;
use std::net::IpAddr;
use std::sync::{Arc, Mutex};

use crate::common::{Error, Result};

/// Lookup of a broker's reserved internal address by its well-known name.
#[allow(async_fn_in_trait)]
pub trait AddressDirectory {
    /// Resolve one broker name. A name the directory does not know yet must
    /// surface as [`Error::PeerUnresolved`] so callers can retry.
    async fn resolve(&self, name: &str) -> Result<IpAddr>;
}

/// In-memory directory for tests. Entries can be added while a lookup loop
/// is already retrying, which is exactly the provisioning race the
/// coordinator has to survive.
#[derive(Debug, Clone, Default)]
pub struct StaticDirectory {
    entries: Arc<Mutex<HashMap<String, IpAddr>>>,
}

impl StaticDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, name: impl Into<String>, address: IpAddr) {
        self.entries
            .lock()
            .expect("directory lock poisoned")
            .insert(name.into(), address);
    }

    pub fn remove(&self, name: &str) {
        self.entries
            .lock()
            .expect("directory lock poisoned")
            .remove(name);
    }
}

impl AddressDirectory for StaticDirectory {
    async fn resolve(&self, name: &str) -> Result<IpAddr> {
        self.entries
            .lock()
            .expect("directory lock poisoned")
            .get(name)
            .copied()
            .ok_or_else(|| Error::PeerUnresolved {
                name: name.to_string(),
                attempts: 1,
            })
    }
}
