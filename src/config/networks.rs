/// A chain the pipeline has been run against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Network {
    pub chain_id: u64,
    pub name: &'static str,
}

/// Networks with a known name. Other chain ids are accepted but logged as unknown.
pub const KNOWN_NETWORKS: &[Network] = &[
    Network {
        chain_id: 1,
        name: "Ethereum",
    },
    Network {
        chain_id: 8453,
        name: "Base",
    },
    Network {
        chain_id: 84532,
        name: "Base Sepolia",
    },
];

pub fn network_name(chain_id: u64) -> Option<&'static str> {
    KNOWN_NETWORKS
        .iter()
        .find(|n| n.chain_id == chain_id)
        .map(|n| n.name)
}
