//! Typed access to the factory and campaign accounts of the program.
//!
//! Every response is decoded and checked here; nothing is cached and no
//! submission is retried. Writes are not idempotent: a retried call after an
//! ambiguous failure may submit twice.

use crate::{
    client::ChainClient,
    error::GatewayError,
    instructions,
    model::{validate_withdrawal_request, Campaign, CampaignForm, WithdrawalRequest},
    state::{CampaignState, Factory, RequestState},
    utils::*,
    Result,
};
use anchor_lang::{
    prelude::Pubkey, solana_program::instruction::Instruction, AccountDeserialize,
};
use async_trait::async_trait;
use futures::future::try_join_all;
use log::{debug, info};
use solana_sdk::signature::Signature;
use std::sync::Arc;

#[async_trait]
pub trait Gateway: Send + Sync {
    fn signer(&self) -> Pubkey;

    async fn list_campaign_addresses(&self) -> Result<Vec<Pubkey>>;

    async fn fetch_campaign(&self, address: Pubkey) -> Result<Campaign>;

    /// A campaign together with its requests, both taken from a single read of
    /// the campaign account.
    async fn fetch_campaign_with_requests(
        &self,
        address: Pubkey,
    ) -> Result<(Campaign, Vec<WithdrawalRequest>)>;

    async fn create_campaign(&self, form: &CampaignForm) -> Result<Signature>;

    async fn contribute(&self, address: Pubkey, amount: u64) -> Result<Signature>;

    /// Ordered by request index.
    async fn list_withdrawal_requests(&self, address: Pubkey) -> Result<Vec<WithdrawalRequest>>;

    async fn create_withdrawal_request(
        &self,
        address: Pubkey,
        description: &str,
        value: u64,
        recipient: Pubkey,
    ) -> Result<Signature>;

    async fn approve_withdrawal_request(&self, address: Pubkey, index: u32) -> Result<Signature>;

    async fn finalize_withdrawal_request(&self, address: Pubkey, index: u32) -> Result<Signature>;

    async fn is_teacher(&self, who: Pubkey) -> Result<bool>;

    async fn is_admin(&self, who: Pubkey) -> Result<bool>;

    async fn list_teachers(&self) -> Result<Vec<Pubkey>>;

    async fn add_teacher(&self, teacher: Pubkey) -> Result<Signature>;

    async fn remove_teacher(&self, teacher: Pubkey) -> Result<Signature>;
}

/// [`Gateway`] over a [`ChainClient`], speaking the program's account layouts.
pub struct ProgramGateway<C> {
    client: Arc<C>,
}

impl<C: ChainClient> ProgramGateway<C> {
    pub fn new(client: Arc<C>) -> Self {
        ProgramGateway { client }
    }

    pub fn client(&self) -> &Arc<C> {
        &self.client
    }

    /// Reads a program-owned account of type `T`; `None` when the address holds
    /// no such account.
    async fn fetch<T: AccountDeserialize + Send>(
        &self,
        address: &Pubkey,
        type_name: &str,
    ) -> Result<Option<T>> {
        let account = match self.client.get_account(address).await? {
            Some(account) if account.owner == crate::ID => account,
            _ => return Ok(None),
        };
        if !account.data.starts_with(&account_discriminator(type_name)) {
            return Ok(None);
        }
        T::try_deserialize(&mut account.data.as_slice())
            .map(Some)
            .map_err(|e| GatewayError::Decode(format!("{} at {}: {}", type_name, address, e)))
    }

    async fn factory(&self) -> Result<Factory> {
        let address = find_factory();
        self.fetch(&address, "Factory")
            .await?
            .ok_or_else(|| GatewayError::NotFound(format!("factory at {}", address)))
    }

    async fn campaign_state(&self, address: &Pubkey) -> Result<CampaignState> {
        self.fetch(address, "CampaignState")
            .await?
            .ok_or_else(|| GatewayError::NotFound(format!("campaign {}", address)))
    }

    async fn request(&self, campaign: &Pubkey, index: u32) -> Result<WithdrawalRequest> {
        let state: RequestState = self
            .fetch(&find_request(campaign, index), "RequestState")
            .await?
            .ok_or_else(|| {
                GatewayError::NotFound(format!("request {} of campaign {}", index, campaign))
            })?;
        WithdrawalRequest::from_state(campaign, index, state)
    }

    async fn requests(&self, campaign: &Pubkey, count: u32) -> Result<Vec<WithdrawalRequest>> {
        debug!("fetching {} requests of {}", count, campaign);
        try_join_all((0..count).map(|index| self.request(campaign, index))).await
    }

    async fn submit(&self, what: &str, instruction: Instruction) -> Result<Signature> {
        info!("submitting {}", what);
        let signature = self.client.send_and_confirm(&[instruction]).await?;
        info!("{} confirmed in {}", what, signature);
        Ok(signature)
    }
}

#[async_trait]
impl<C: ChainClient> Gateway for ProgramGateway<C> {
    fn signer(&self) -> Pubkey {
        self.client.payer()
    }

    async fn list_campaign_addresses(&self) -> Result<Vec<Pubkey>> {
        Ok(self.factory().await?.campaigns)
    }

    async fn fetch_campaign(&self, address: Pubkey) -> Result<Campaign> {
        debug!("fetching campaign {}", address);
        let state = self.campaign_state(&address).await?;
        Ok(Campaign::from_state(address, state))
    }

    async fn fetch_campaign_with_requests(
        &self,
        address: Pubkey,
    ) -> Result<(Campaign, Vec<WithdrawalRequest>)> {
        debug!("fetching campaign {} with its requests", address);
        let state = self.campaign_state(&address).await?;
        let requests = self.requests(&address, state.requests_count).await?;
        Ok((Campaign::from_state(address, state), requests))
    }

    async fn create_campaign(&self, form: &CampaignForm) -> Result<Signature> {
        let campaign = form.validate()?;
        let index = self.factory().await?.campaigns.len() as u32;
        let instruction = instructions::create_campaign(self.signer(), index, campaign)?;
        self.submit("create_campaign", instruction).await
    }

    async fn contribute(&self, address: Pubkey, amount: u64) -> Result<Signature> {
        // The minimum can move between this read and the submission; the
        // program re-validates on its side.
        let minimum = self.campaign_state(&address).await?.minimum_contribution;
        if amount == 0 || amount < minimum {
            return Err(GatewayError::validation(format!(
                "minimum contribution is {} SOL",
                format_sol(minimum)
            )));
        }
        let instruction = instructions::contribute(address, self.signer(), amount)?;
        self.submit("contribute", instruction).await
    }

    async fn list_withdrawal_requests(&self, address: Pubkey) -> Result<Vec<WithdrawalRequest>> {
        let count = self.campaign_state(&address).await?.requests_count;
        self.requests(&address, count).await
    }

    async fn create_withdrawal_request(
        &self,
        address: Pubkey,
        description: &str,
        value: u64,
        recipient: Pubkey,
    ) -> Result<Signature> {
        validate_withdrawal_request(description, value, &recipient)?;
        let index = self.campaign_state(&address).await?.requests_count;
        let instruction = instructions::create_withdrawal_request(
            address,
            self.signer(),
            index,
            description.trim().to_string(),
            value,
            recipient,
        )?;
        self.submit("create_withdrawal_request", instruction).await
    }

    async fn approve_withdrawal_request(&self, address: Pubkey, index: u32) -> Result<Signature> {
        let request = self.request(&address, index).await?;
        let instruction =
            instructions::approve_request(address, self.signer(), index, request.recipient)?;
        self.submit("approve_request", instruction).await
    }

    async fn finalize_withdrawal_request(&self, address: Pubkey, index: u32) -> Result<Signature> {
        let request = self.request(&address, index).await?;
        let instruction =
            instructions::finalize_request(address, self.signer(), index, request.recipient)?;
        self.submit("finalize_request", instruction).await
    }

    async fn is_teacher(&self, who: Pubkey) -> Result<bool> {
        Ok(self.factory().await?.teachers.contains(&who))
    }

    async fn is_admin(&self, who: Pubkey) -> Result<bool> {
        Ok(self.factory().await?.admin == who)
    }

    async fn list_teachers(&self) -> Result<Vec<Pubkey>> {
        Ok(self.factory().await?.teachers)
    }

    async fn add_teacher(&self, teacher: Pubkey) -> Result<Signature> {
        let instruction = instructions::add_teacher(self.signer(), teacher)?;
        self.submit("add_teacher", instruction).await
    }

    async fn remove_teacher(&self, teacher: Pubkey) -> Result<Signature> {
        let instruction = instructions::remove_teacher(self.signer(), teacher)?;
        self.submit("remove_teacher", instruction).await
    }
}
