use serde::{Deserialize, Serialize};

#[derive(Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Debug)]
pub enum TrackerMode {
    /// Will track every new info hash and serve every peer.
    #[serde(rename = "dynamic")]
    Dynamic,

    /// Will only track allow-listed info hashes.
    #[serde(rename = "listed")]
    Listed,
}
