//! Infrastructure discovery
//!
//! The expander only needs to know which resources a deployed stack
//! contains and at which address each is reachable. Deploying stacks is
//! done elsewhere; its tooling writes an address file that
//! [`StaticDiscovery`] reads.

use anyhow::{Context, Result, bail};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

/// Resource name to network address
pub type AddressMap = BTreeMap<String, String>;

/// Source of resource addresses per stack
pub trait Discovery {
    /// Addresses of every resource in `stack`
    fn addresses(&self, stack: &str) -> Result<AddressMap>;
}

/// Addresses held in memory
///
/// # File format
///
/// ```toml
/// [range-1]
/// kali = "10.0.1.10"
/// target = "10.0.1.20"
///
/// [range-2]
/// kali = "10.0.2.10"
/// ```
///
/// The same shape is accepted as JSON.
#[derive(Debug, Clone, Default)]
pub struct StaticDiscovery {
    stacks: BTreeMap<String, AddressMap>,
}

impl StaticDiscovery {
    pub fn new() -> Self {
        Self::default()
    }

    #[cfg(test)]
    pub fn with_stack<I, K, V>(mut self, stack: impl Into<String>, addresses: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.stacks.insert(
            stack.into(),
            addresses
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        );
        self
    }

    /// Load an address file (`.json`, otherwise TOML)
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Could not read {}", path.display()))?;
        let stacks = if path.extension().is_some_and(|ext| ext == "json") {
            serde_json::from_str(&content)
                .with_context(|| format!("Invalid address file {}", path.display()))?
        } else {
            toml::from_str(&content)
                .with_context(|| format!("Invalid address file {}", path.display()))?
        };
        Ok(Self { stacks })
    }
}

impl Discovery for StaticDiscovery {
    fn addresses(&self, stack: &str) -> Result<AddressMap> {
        match self.stacks.get(stack) {
            Some(addresses) => Ok(addresses.clone()),
            None => bail!("no addresses known for stack '{stack}'"),
        }
    }
}
