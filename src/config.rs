use crate::{error::GatewayError, store::ReconcilePolicy, Result};
use serde::{Deserialize, Serialize};
use solana_sdk::{
    commitment_config::CommitmentConfig,
    signature::{read_keypair_file, Keypair},
};
use std::{path::PathBuf, time::Duration};

pub const LAMPORTS_DECIMALS: u8 = 9;
pub const DISPLAY_DECIMALS: usize = 3;
pub const DEFAULT_RPC_URL: &str = "http://127.0.0.1:8899";
pub const DEFAULT_COMMITMENT: &str = "confirmed";
/// Lag before the second reconciliation refresh after a confirmed transaction.
pub const DEFAULT_DEFERRED_REFRESH_MS: u64 = 2000;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    pub rpc_url: String,
    /// One of `processed`, `confirmed`, `finalized`.
    pub commitment: String,
    /// Base58 genesis hash the endpoint must report, if set.
    pub genesis_hash: Option<String>,
    pub keypair_path: Option<PathBuf>,
    /// Zero disables the deferred refresh.
    pub deferred_refresh_ms: u64,
}

impl Default for ClientConfig {
    fn default() -> Self {
        ClientConfig {
            rpc_url: DEFAULT_RPC_URL.to_string(),
            commitment: DEFAULT_COMMITMENT.to_string(),
            genesis_hash: None,
            keypair_path: None,
            deferred_refresh_ms: DEFAULT_DEFERRED_REFRESH_MS,
        }
    }
}

impl ClientConfig {
    pub fn from_json(json: &str) -> Result<Self> {
        let config: ClientConfig = serde_json::from_str(json)
            .map_err(|e| GatewayError::validation(format!("bad client config: {}", e)))?;
        config.commitment_config()?;
        Ok(config)
    }

    pub fn commitment_config(&self) -> Result<CommitmentConfig> {
        match self.commitment.as_str() {
            "processed" => Ok(CommitmentConfig::processed()),
            "confirmed" => Ok(CommitmentConfig::confirmed()),
            "finalized" => Ok(CommitmentConfig::finalized()),
            other => Err(GatewayError::validation(format!(
                "unknown commitment level `{}`",
                other
            ))),
        }
    }

    pub fn reconcile_policy(&self) -> ReconcilePolicy {
        ReconcilePolicy {
            deferred_lag: match self.deferred_refresh_ms {
                0 => None,
                ms => Some(Duration::from_millis(ms)),
            },
        }
    }

    pub fn load_keypair(&self) -> Result<Keypair> {
        let path = self
            .keypair_path
            .as_ref()
            .ok_or_else(|| GatewayError::validation("no keypair_path configured"))?;
        read_keypair_file(path).map_err(|e| {
            GatewayError::validation(format!("cannot read keypair {}: {}", path.display(), e))
        })
    }
}
