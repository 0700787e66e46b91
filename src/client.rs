//! Transport to the ledger: account reads and signed, confirmed submissions.

use crate::{
    config::ClientConfig,
    error::{classify_transaction_error, GatewayError},
    Result,
};
use anchor_lang::{prelude::Pubkey, solana_program::instruction::Instruction};
use async_trait::async_trait;
use log::{debug, info};
use solana_client::{
    client_error::{ClientError, ClientErrorKind},
    nonblocking::rpc_client::RpcClient,
    rpc_request::{RpcError, RpcResponseErrorData},
};
use solana_sdk::{
    account::Account,
    signature::{Keypair, Signature},
    signer::Signer,
    transaction::Transaction,
};

#[async_trait]
pub trait ChainClient: Send + Sync {
    /// Address of the signing identity; pays for and signs every submission.
    fn payer(&self) -> Pubkey;

    async fn get_account(&self, address: &Pubkey) -> Result<Option<Account>>;

    /// Signs `instructions` into one transaction and waits for confirmation.
    async fn send_and_confirm(&self, instructions: &[Instruction]) -> Result<Signature>;
}

/// JSON-RPC client bound to one endpoint and one signer.
///
/// Constructed by [`RpcChainClient::connect`], which checks the endpoint before
/// handing out a ready client, and released with [`RpcChainClient::dispose`].
pub struct RpcChainClient {
    url: String,
    rpc: RpcClient,
    signer: Keypair,
}

impl RpcChainClient {
    pub async fn connect(config: &ClientConfig, signer: Keypair) -> Result<Self> {
        let rpc = RpcClient::new_with_commitment(config.rpc_url.clone(), config.commitment_config()?);
        let genesis_hash = rpc.get_genesis_hash().await.map_err(transport_error)?;
        if let Some(expected) = &config.genesis_hash {
            if genesis_hash.to_string() != *expected {
                return Err(GatewayError::Transport(format!(
                    "{} serves genesis {}, expected {}",
                    config.rpc_url, genesis_hash, expected
                )));
            }
        }
        info!(
            "connected to {} (genesis {}) as {}",
            config.rpc_url,
            genesis_hash,
            signer.pubkey()
        );
        Ok(RpcChainClient {
            url: config.rpc_url.clone(),
            rpc,
            signer,
        })
    }

    /// Ends the session. The RPC client owns the HTTP connection pool, so
    /// dropping it here closes the connections; the signer is dropped with it.
    /// Letting the client fall out of scope releases the same resources.
    pub fn dispose(self) {
        let RpcChainClient { url, rpc, signer } = self;
        drop(rpc);
        info!("disconnected {} from {}", signer.pubkey(), url);
    }
}

#[async_trait]
impl ChainClient for RpcChainClient {
    fn payer(&self) -> Pubkey {
        self.signer.pubkey()
    }

    async fn get_account(&self, address: &Pubkey) -> Result<Option<Account>> {
        debug!("get_account {}", address);
        self.rpc
            .get_account_with_commitment(address, self.rpc.commitment())
            .await
            .map(|response| response.value)
            .map_err(transport_error)
    }

    async fn send_and_confirm(&self, instructions: &[Instruction]) -> Result<Signature> {
        let blockhash = self.rpc.get_latest_blockhash().await.map_err(transport_error)?;
        let transaction = Transaction::new_signed_with_payer(
            instructions,
            Some(&self.signer.pubkey()),
            &[&self.signer],
            blockhash,
        );
        let signature = self
            .rpc
            .send_and_confirm_transaction(&transaction)
            .await
            .map_err(submission_error)?;
        info!("confirmed {}", signature);
        Ok(signature)
    }
}

fn transport_error(err: ClientError) -> GatewayError {
    GatewayError::Transport(err.to_string())
}

fn preflight_logs(err: &ClientError) -> Vec<String> {
    match err.kind() {
        ClientErrorKind::RpcError(RpcError::RpcResponseError {
            data: RpcResponseErrorData::SendTransactionPreflightFailure(simulation),
            ..
        }) => simulation.logs.clone().unwrap_or_default(),
        _ => Vec::new(),
    }
}

/// A rejected transaction is a revert; anything else never reached the program.
fn submission_error(err: ClientError) -> GatewayError {
    match err.get_transaction_error() {
        Some(tx_err) => classify_transaction_error(&tx_err, &preflight_logs(&err)),
        None => transport_error(err),
    }
}
