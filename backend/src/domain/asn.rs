//! Autonomous System records and the longest-prefix-match resolver.
//!
//! The table is built once from the blocks an ingestion process has stored
//! and is read-only afterwards, so lookups need no synchronisation.

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::net::IpAddr;

use ipnet::IpNet;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Autonomous System Number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AsnId(i64);

impl AsnId {
    /// Wrap a raw AS number.
    pub const fn new(value: i64) -> Self {
        Self(value)
    }

    /// Raw AS number.
    pub const fn get(self) -> i64 {
        self.0
    }
}

impl fmt::Display for AsnId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "AS{}", self.0)
    }
}

/// Autonomous System with its registered organisation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Asn {
    pub id: AsnId,
    pub organization: Option<String>,
}

/// Announced network block owned by an Autonomous System.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkBlock {
    /// Storage identity of the block; breaks ties between identical prefixes.
    pub id: i64,
    pub network: IpNet,
    pub asn: AsnId,
}

#[derive(Debug, Clone, Copy)]
struct BlockEntry {
    block_id: i64,
    asn: AsnId,
}

/// Blocks of one address family indexed by prefix length, then by the
/// truncated network address.
#[derive(Debug, Default)]
struct PrefixIndex {
    by_length: BTreeMap<u8, HashMap<IpNet, BlockEntry>>,
}

impl PrefixIndex {
    fn insert(&mut self, block: &NetworkBlock) {
        let network = block.network.trunc();
        let entry = BlockEntry {
            block_id: block.id,
            asn: block.asn,
        };
        self.by_length
            .entry(network.prefix_len())
            .or_default()
            .entry(network)
            .and_modify(|existing| {
                if entry.block_id < existing.block_id {
                    *existing = entry;
                }
            })
            .or_insert(entry);
    }

    fn longest_match(&self, addr: IpAddr) -> Option<BlockEntry> {
        self.by_length.iter().rev().find_map(|(len, blocks)| {
            let candidate = IpNet::new(addr, *len).ok()?.trunc();
            blocks.get(&candidate).copied()
        })
    }

    fn len(&self) -> usize {
        self.by_length.values().map(HashMap::len).sum()
    }
}

/// Immutable ASN table answering "which AS owns this address".
///
/// When several blocks contain an address the most specific prefix wins;
/// identical prefixes resolve to the block with the lowest identity.
///
/// # Examples
/// ```
/// use wifi_advisor::domain::{AsnId, AsnTable, NetworkBlock};
///
/// let table = AsnTable::new(
///     Vec::new(),
///     vec![
///         NetworkBlock { id: 1, network: "10.0.0.0/8".parse().expect("cidr"), asn: AsnId::new(64500) },
///         NetworkBlock { id: 2, network: "10.1.0.0/16".parse().expect("cidr"), asn: AsnId::new(64501) },
///     ],
/// );
/// let ip = "10.1.2.3".parse().expect("ip");
/// assert_eq!(table.resolve(ip), Some(AsnId::new(64501)));
/// ```
#[derive(Debug, Default)]
pub struct AsnTable {
    asns: HashMap<AsnId, Asn>,
    v4: PrefixIndex,
    v6: PrefixIndex,
}

impl AsnTable {
    /// Build the table from stored AS records and network blocks.
    ///
    /// Blocks referencing an AS missing from `asns` are still indexed; the
    /// lookup then reports the number without an organisation.
    pub fn new(asns: Vec<Asn>, blocks: Vec<NetworkBlock>) -> Self {
        let mut table = Self {
            asns: asns.into_iter().map(|asn| (asn.id, asn)).collect(),
            ..Self::default()
        };
        for block in &blocks {
            if !table.asns.contains_key(&block.asn) {
                warn!(block_id = block.id, asn = %block.asn, "network block references unknown AS");
            }
            match block.network {
                IpNet::V4(_) => table.v4.insert(block),
                IpNet::V6(_) => table.v6.insert(block),
            }
        }
        table
    }

    /// Resolve the AS owning `ip`, or `None` when no block contains it.
    ///
    /// IPv4-mapped IPv6 addresses are matched against IPv4 blocks.
    pub fn resolve(&self, ip: IpAddr) -> Option<AsnId> {
        let addr = normalise(ip);
        let index = match addr {
            IpAddr::V4(_) => &self.v4,
            IpAddr::V6(_) => &self.v6,
        };
        let found = index.longest_match(addr).map(|entry| entry.asn);
        if found.is_none() {
            debug!(%ip, "no network block contains address");
        }
        found
    }

    /// Resolve `ip` to the full AS record, including its organisation.
    pub fn lookup(&self, ip: IpAddr) -> Option<Asn> {
        self.resolve(ip).map(|id| {
            self.asns.get(&id).cloned().unwrap_or_else(|| Asn {
                id,
                organization: None,
            })
        })
    }

    /// Number of distinct indexed prefixes.
    pub fn block_count(&self) -> usize {
        self.v4.len() + self.v6.len()
    }

    /// Number of known AS records.
    pub fn asn_count(&self) -> usize {
        self.asns.len()
    }
}

fn normalise(ip: IpAddr) -> IpAddr {
    match ip {
        IpAddr::V6(v6) => v6
            .to_ipv4_mapped()
            .map_or(IpAddr::V6(v6), IpAddr::V4),
        IpAddr::V4(_) => ip,
    }
}
