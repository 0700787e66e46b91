//! Client-side snapshot of every campaign and its withdrawal requests.
//!
//! The snapshot is only ever replaced whole, and only by a refresh in which
//! every fetch succeeded. Mutations never patch it locally: once a transaction
//! is confirmed the store refreshes right away and once more after the
//! configured lag, since reads can trail confirmation.

use crate::{
    error::GatewayError,
    gateway::Gateway,
    model::{Campaign, CampaignForm, RequestKey, WithdrawalRequest},
    Result,
};
use anchor_lang::prelude::Pubkey;
use futures::future::try_join_all;
use log::{debug, info, warn};
use solana_sdk::signature::Signature;
use std::{
    collections::HashMap,
    sync::{Arc, Mutex, MutexGuard},
    time::Duration,
};
use tokio::task::JoinHandle;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ReconcilePolicy {
    /// Delay of the second refresh after a confirmed mutation; `None` skips it.
    pub deferred_lag: Option<Duration>,
}

impl Default for ReconcilePolicy {
    fn default() -> Self {
        ReconcilePolicy {
            deferred_lag: Some(Duration::from_millis(
                crate::config::DEFAULT_DEFERRED_REFRESH_MS,
            )),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SyncState {
    Unknown,
    Loading,
    Loaded,
    Stale,
}

/// Point-in-time view of all campaigns, in factory order.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Snapshot {
    campaigns: Vec<Campaign>,
    requests: HashMap<Pubkey, Vec<WithdrawalRequest>>,
    generation: u64,
}

impl Snapshot {
    pub(crate) fn from_entries(
        generation: u64,
        entries: impl IntoIterator<Item = (Campaign, Vec<WithdrawalRequest>)>,
    ) -> Self {
        let mut snapshot = Snapshot {
            generation,
            ..Snapshot::default()
        };
        for (campaign, requests) in entries {
            snapshot.requests.insert(campaign.address, requests);
            snapshot.campaigns.push(campaign);
        }
        snapshot
    }

    pub fn campaigns(&self) -> &[Campaign] {
        &self.campaigns
    }

    pub fn campaign(&self, address: &Pubkey) -> Option<&Campaign> {
        self.campaigns.iter().find(|c| c.address == *address)
    }

    pub fn requests(&self, address: &Pubkey) -> &[WithdrawalRequest] {
        self.requests.get(address).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn request(&self, key: &RequestKey) -> Option<&WithdrawalRequest> {
        self.requests(&key.campaign)
            .iter()
            .find(|r| r.index == key.index)
    }

    /// Generation of the refresh that produced this snapshot; 0 before the first.
    pub fn generation(&self) -> u64 {
        self.generation
    }
}

#[derive(Default)]
struct Inner {
    snapshot: Arc<Snapshot>,
    /// Refreshes started so far; the next one gets `started + 1`.
    started: u64,
    in_flight: usize,
    /// Campaign address -> `started` at the time it was marked.
    stale: HashMap<Pubkey, u64>,
    /// Set when a campaign was created and the address list itself is behind.
    listing_stale: Option<u64>,
    processing: HashMap<RequestKey, usize>,
}

impl Inner {
    /// Whether a running refresh may still discover addresses the snapshot lacks.
    fn listing_pending(&self) -> bool {
        self.in_flight > 0 && (self.snapshot.generation == 0 || self.listing_stale.is_some())
    }

    fn campaign_state(&self, address: &Pubkey) -> SyncState {
        let known = self.snapshot.campaign(address).is_some();
        if (known && self.in_flight > 0) || (!known && self.listing_pending()) {
            SyncState::Loading
        } else if self.stale.contains_key(address) {
            SyncState::Stale
        } else if known {
            SyncState::Loaded
        } else {
            SyncState::Unknown
        }
    }

    /// Requests follow their campaign; a request missing from a loaded
    /// campaign is unknown.
    fn request_state(&self, key: &RequestKey) -> SyncState {
        match self.campaign_state(&key.campaign) {
            SyncState::Loaded if self.snapshot.request(key).is_none() => SyncState::Unknown,
            state => state,
        }
    }
}

struct Shared<G> {
    gateway: Arc<G>,
    inner: Mutex<Inner>,
}

impl<G> Shared<G> {
    fn lock(&self) -> MutexGuard<'_, Inner> {
        // Nothing panics while holding the lock, so a poisoned guard is still consistent.
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl<G: Gateway> Shared<G> {
    async fn refresh(&self) -> Result<Arc<Snapshot>> {
        let generation = {
            let mut inner = self.lock();
            inner.started += 1;
            inner.in_flight += 1;
            inner.started
        };
        let fetched = self.fetch_all(generation).await;

        let mut inner = self.lock();
        inner.in_flight -= 1;
        let snapshot = match fetched {
            Ok(snapshot) => snapshot,
            Err(e) => {
                warn!(
                    "refresh #{} failed, keeping snapshot #{}: {}",
                    generation, inner.snapshot.generation, e
                );
                return Err(e);
            }
        };
        if inner.snapshot.generation > generation {
            debug!(
                "refresh #{} superseded by #{}",
                generation, inner.snapshot.generation
            );
            return Ok(inner.snapshot.clone());
        }
        inner.stale.retain(|_, marked| *marked >= generation);
        if matches!(inner.listing_stale, Some(marked) if marked < generation) {
            inner.listing_stale = None;
        }
        inner.snapshot = Arc::new(snapshot);
        debug!(
            "published snapshot #{} with {} campaigns",
            generation,
            inner.snapshot.campaigns.len()
        );
        Ok(inner.snapshot.clone())
    }

    async fn fetch_all(&self, generation: u64) -> Result<Snapshot> {
        let addresses = self.gateway.list_campaign_addresses().await?;
        let entries = try_join_all(
            addresses
                .into_iter()
                .map(|address| self.gateway.fetch_campaign_with_requests(address)),
        )
        .await?;
        Ok(Snapshot::from_entries(generation, entries))
    }
}

/// Clears a processing marker when the action finishes, however it finishes.
struct ProcessingGuard<'a, G> {
    shared: &'a Shared<G>,
    key: RequestKey,
}

impl<'a, G> ProcessingGuard<'a, G> {
    fn new(shared: &'a Shared<G>, key: RequestKey) -> Self {
        *shared.lock().processing.entry(key).or_insert(0) += 1;
        ProcessingGuard { shared, key }
    }
}

impl<G> Drop for ProcessingGuard<'_, G> {
    fn drop(&mut self) {
        let mut inner = self.shared.lock();
        if let Some(count) = inner.processing.get_mut(&self.key) {
            *count -= 1;
            if *count == 0 {
                inner.processing.remove(&self.key);
            }
        }
    }
}

pub struct SyncStore<G> {
    shared: Arc<Shared<G>>,
    policy: ReconcilePolicy,
    deferred: Mutex<Option<JoinHandle<()>>>,
}

impl<G: Gateway + 'static> SyncStore<G> {
    pub fn new(gateway: Arc<G>, policy: ReconcilePolicy) -> Self {
        SyncStore {
            shared: Arc::new(Shared {
                gateway,
                inner: Mutex::new(Inner::default()),
            }),
            policy,
            deferred: Mutex::new(None),
        }
    }

    pub fn gateway(&self) -> &Arc<G> {
        &self.shared.gateway
    }

    pub fn snapshot(&self) -> Arc<Snapshot> {
        self.shared.lock().snapshot.clone()
    }

    /// State of the store as a whole.
    pub fn state(&self) -> SyncState {
        let inner = self.shared.lock();
        if inner.in_flight > 0 {
            SyncState::Loading
        } else if inner.listing_stale.is_some() || !inner.stale.is_empty() {
            SyncState::Stale
        } else if inner.snapshot.generation == 0 {
            SyncState::Unknown
        } else {
            SyncState::Loaded
        }
    }

    pub fn campaign_state(&self, address: &Pubkey) -> SyncState {
        self.shared.lock().campaign_state(address)
    }

    pub fn request_state(&self, key: &RequestKey) -> SyncState {
        self.shared.lock().request_state(key)
    }

    pub fn is_processing(&self, key: &RequestKey) -> bool {
        self.shared.lock().processing.contains_key(key)
    }

    /// Replaces the snapshot with a fresh one, or leaves it untouched on error.
    pub async fn refresh(&self) -> Result<Arc<Snapshot>> {
        self.shared.refresh().await
    }

    /// Waits for the pending deferred refresh, if one is scheduled.
    pub async fn settle(&self) {
        let handle = self.lock_deferred().take();
        if let Some(handle) = handle {
            if let Err(e) = handle.await {
                warn!("deferred refresh task ended abnormally: {}", e);
            }
        }
    }

    pub async fn create_campaign(&self, form: &CampaignForm) -> Result<Signature> {
        let signature = self.shared.gateway.create_campaign(form).await?;
        {
            let mut inner = self.shared.lock();
            let started = inner.started;
            inner.listing_stale = Some(started);
        }
        self.reconcile().await;
        Ok(signature)
    }

    pub async fn contribute(&self, address: Pubkey, amount: u64) -> Result<Signature> {
        let signature = self.shared.gateway.contribute(address, amount).await?;
        self.mark_stale(address);
        self.reconcile().await;
        Ok(signature)
    }

    pub async fn create_withdrawal_request(
        &self,
        address: Pubkey,
        description: &str,
        value: u64,
        recipient: Pubkey,
    ) -> Result<Signature> {
        let signature = self
            .shared
            .gateway
            .create_withdrawal_request(address, description, value, recipient)
            .await?;
        self.mark_stale(address);
        self.reconcile().await;
        Ok(signature)
    }

    pub async fn approve_withdrawal_request(&self, address: Pubkey, index: u32) -> Result<Signature> {
        let key = RequestKey::new(address, index);
        self.ensure_open(&key)?;
        let signature = {
            let _processing = ProcessingGuard::new(&self.shared, key);
            self.shared
                .gateway
                .approve_withdrawal_request(address, index)
                .await?
        };
        self.mark_stale(address);
        self.reconcile().await;
        Ok(signature)
    }

    pub async fn finalize_withdrawal_request(&self, address: Pubkey, index: u32) -> Result<Signature> {
        let key = RequestKey::new(address, index);
        self.ensure_open(&key)?;
        let signature = {
            let _processing = ProcessingGuard::new(&self.shared, key);
            self.shared
                .gateway
                .finalize_withdrawal_request(address, index)
                .await?
        };
        self.mark_stale(address);
        self.reconcile().await;
        Ok(signature)
    }

    pub async fn is_teacher(&self, who: Pubkey) -> Result<bool> {
        self.shared.gateway.is_teacher(who).await
    }

    pub async fn is_admin(&self, who: Pubkey) -> Result<bool> {
        self.shared.gateway.is_admin(who).await
    }

    pub async fn list_teachers(&self) -> Result<Vec<Pubkey>> {
        self.shared.gateway.list_teachers().await
    }

    pub async fn add_teacher(&self, teacher: Pubkey) -> Result<Signature> {
        self.shared.gateway.add_teacher(teacher).await
    }

    pub async fn remove_teacher(&self, teacher: Pubkey) -> Result<Signature> {
        self.shared.gateway.remove_teacher(teacher).await
    }

    /// A request already completed in the snapshot cannot be acted on again.
    fn ensure_open(&self, key: &RequestKey) -> Result<()> {
        match self.shared.lock().snapshot.request(key) {
            Some(request) if request.completed => Err(GatewayError::validation(format!(
                "request {} of {} is already completed",
                key.index, key.campaign
            ))),
            _ => Ok(()),
        }
    }

    fn mark_stale(&self, address: Pubkey) {
        let mut inner = self.shared.lock();
        let started = inner.started;
        inner.stale.insert(address, started);
    }

    fn lock_deferred(&self) -> MutexGuard<'_, Option<JoinHandle<()>>> {
        self.deferred.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Refreshes now and schedules the lagged refresh. The mutation has already
    /// been confirmed, so refresh failures are logged rather than returned.
    async fn reconcile(&self) {
        if let Err(e) = self.shared.refresh().await {
            warn!("refresh after confirmation failed: {}", e);
        }
        let lag = match self.policy.deferred_lag {
            Some(lag) => lag,
            None => return,
        };
        let shared = self.shared.clone();
        let handle = tokio::spawn(async move {
            tokio::time::sleep(lag).await;
            match shared.refresh().await {
                Ok(snapshot) => info!("deferred refresh published #{}", snapshot.generation),
                Err(e) => warn!("deferred refresh failed: {}", e),
            }
        });
        // An earlier deferred refresh keeps running detached; `settle` waits on the newest.
        *self.lock_deferred() = Some(handle);
    }
}
