//! Cluster topology: which host plays which role, and where its releases live

use crate::config::Config;
use crate::host_name::HostName;
use std::fmt;

const MASTER_MARKER: &str = "clustermaster";
const NODE_MARKER: &str = "clusternode";

/// Role of a host inside a cluster, derived from its remote directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ClusterRole {
    /// Not part of a cluster
    #[default]
    None,
    /// The first host
    Master,
    /// Every other host
    Node,
}

impl ClusterRole {
    /// Derive the role from the markers in a remote directory path.
    pub fn from_remote_dir(remote_dir: &str) -> Self {
        if remote_dir.contains(MASTER_MARKER) {
            ClusterRole::Master
        } else if remote_dir.contains(NODE_MARKER) {
            ClusterRole::Node
        } else {
            ClusterRole::None
        }
    }

    /// Suffix tag used in file variants, `None` outside a cluster.
    pub fn tag(&self) -> Option<&'static str> {
        match self {
            ClusterRole::None => None,
            ClusterRole::Master => Some("master"),
            ClusterRole::Node => Some("node"),
        }
    }
}

impl fmt::Display for ClusterRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag().unwrap_or("none"))
    }
}

/// A host together with the directory its releases are kept in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostTarget {
    pub host: HostName,
    pub remote_dir: String,
}

impl HostTarget {
    pub fn role(&self) -> ClusterRole {
        ClusterRole::from_remote_dir(&self.remote_dir)
    }

    /// Path of an entry directly below the remote directory.
    pub fn path(&self, entry: &str) -> String {
        format!("{}/{}", self.remote_dir.trim_end_matches('/'), entry)
    }
}

impl fmt::Display for HostTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host, self.remote_dir)
    }
}

/// Every host of a deployment in configuration order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Topology {
    targets: Vec<HostTarget>,
}

impl Topology {
    /// The first host keeps the configured directory; the rest get the node
    /// marker substituted for the master marker.
    pub fn from_config(config: &Config) -> Self {
        let master_dir = config.target_remote_dir();
        let node_dir = master_dir.replace(MASTER_MARKER, NODE_MARKER);

        let targets = config
            .hosts
            .iter()
            .enumerate()
            .map(|(i, host)| HostTarget {
                host: host.clone(),
                remote_dir: if i == 0 {
                    master_dir.clone()
                } else {
                    node_dir.clone()
                },
            })
            .collect();
        Self { targets }
    }

    pub fn targets(&self) -> &[HostTarget] {
        &self.targets
    }

    /// The cluster master, if any host is configured.
    pub fn master(&self) -> Option<&HostTarget> {
        self.targets.first()
    }

    /// Cluster nodes: every host after the master.
    pub fn nodes(&self) -> &[HostTarget] {
        self.targets.get(1..).unwrap_or(&[])
    }
}

#[cfg(test)]
#[path = "topology_test.rs"]
mod tests;
