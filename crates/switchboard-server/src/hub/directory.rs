//! Tools and network identity advertised by distributed servers.

use std::collections::{BTreeMap, BTreeSet, HashSet};

use serde::Serialize;
use switchboard_core::ConnectionId;
use switchboard_protocol::{ReportIp, ToolManifest};

/// Everything the hub knows about one distributed server.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DistributedServerRecord {
    /// The owning connection's id.
    pub server_id: ConnectionId,
    /// Name from the latest identity report.
    pub server_name: Option<String>,
    /// Advertised tool names, in advertisement order, without duplicates.
    pub tools: Vec<String>,
    /// Local interface addresses.
    #[serde(rename = "localIPs")]
    pub local_ips: Vec<String>,
    /// Public address.
    #[serde(rename = "publicIP")]
    pub public_ip: Option<String>,
}

impl DistributedServerRecord {
    /// The name if reported, otherwise the id.
    pub fn display_name(&self) -> &str {
        self.server_name.as_deref().unwrap_or(self.server_id.as_str())
    }

    fn has_address(&self, ip: &str) -> bool {
        self.public_ip.as_deref() == Some(ip) || self.local_ips.iter().any(|a| a == ip)
    }
}

/// One record per distributed-server connection.
pub struct ToolDirectory {
    records: BTreeMap<ConnectionId, DistributedServerRecord>,
    internal: HashSet<String>,
}

impl ToolDirectory {
    /// Create a directory that hides `internal` tool names.
    pub fn new(internal: impl IntoIterator<Item = String>) -> Self {
        Self {
            records: BTreeMap::new(),
            internal: internal.into_iter().collect(),
        }
    }

    /// Start an empty record for a newly connected server.
    pub fn create(&mut self, server_id: ConnectionId) {
        let _ = self.records.insert(
            server_id.clone(),
            DistributedServerRecord {
                server_id,
                ..DistributedServerRecord::default()
            },
        );
    }

    /// Replace the server's advertised tools.
    ///
    /// Internal names and repeats are dropped. Returns the accepted
    /// manifests, or `None` when the server has no record.
    pub fn register_tools(
        &mut self,
        server_id: &str,
        tools: Vec<ToolManifest>,
    ) -> Option<Vec<ToolManifest>> {
        let record = self.records.get_mut(server_id)?;
        let mut seen = HashSet::new();
        let accepted: Vec<ToolManifest> = tools
            .into_iter()
            .filter(|t| !self.internal.contains(&t.name))
            .filter(|t| seen.insert(t.name.clone()))
            .collect();
        record.tools = accepted.iter().map(|t| t.name.clone()).collect();
        Some(accepted)
    }

    /// Merge an identity report. Fields the report carries overwrite the
    /// previous values; absent fields are kept.
    pub fn report_identity(&mut self, server_id: &str, report: ReportIp) -> bool {
        let Some(record) = self.records.get_mut(server_id) else {
            return false;
        };
        if let Some(local_ips) = report.local_ips {
            record.local_ips = local_ips;
        }
        if report.public_ip.is_some() {
            record.public_ip = report.public_ip;
        }
        if report.server_name.is_some() {
            record.server_name = report.server_name;
        }
        true
    }

    /// Delete the server's record, returning it.
    pub fn unregister_all(&mut self, server_id: &str) -> Option<DistributedServerRecord> {
        self.records.remove(server_id)
    }

    /// Record for `server_id`.
    pub fn get(&self, server_id: &str) -> Option<&DistributedServerRecord> {
        self.records.get(server_id)
    }

    /// Earliest-connected server that reported `name`.
    pub fn find_by_name(&self, name: &str) -> Option<&ConnectionId> {
        self.records
            .values()
            .find(|r| r.server_name.as_deref() == Some(name))
            .map(|r| &r.server_id)
    }

    /// Display name of the server that reported `ip` as a local or public
    /// address.
    pub fn server_for_ip(&self, ip: &str) -> Option<String> {
        self.records
            .values()
            .find(|r| r.has_address(ip))
            .map(|r| r.display_name().to_owned())
    }

    /// Union of every server's tools.
    pub fn exposed_tools(&self) -> BTreeSet<String> {
        self.records
            .values()
            .flat_map(|r| r.tools.iter().cloned())
            .collect()
    }

    /// Copy of every record, in connect order.
    pub fn snapshot(&self) -> Vec<DistributedServerRecord> {
        self.records.values().cloned().collect()
    }

    /// Number of records.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether there are no records.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
