mod networks;
mod settings;

pub use networks::{network_name, Network, KNOWN_NETWORKS};
pub use settings::{BlockPinning, PipelineConfig, Settings, TokenPair};
