//! Read-only projections over a [`Snapshot`]. All amounts stay in lamports;
//! only the `*_sol` helpers convert, and only for display.

use crate::{
    model::{Campaign, WithdrawalRequest},
    store::Snapshot,
    utils::format_sol,
};
use anchor_lang::prelude::Pubkey;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SummaryStats {
    pub total_campaigns: usize,
    pub total_raised: u64,
    pub total_target: u64,
    /// Campaigns whose balance is still strictly below target.
    pub active_campaigns: usize,
}

impl SummaryStats {
    pub fn total_raised_sol(&self) -> String {
        format_sol(self.total_raised)
    }

    pub fn total_target_sol(&self) -> String {
        format_sol(self.total_target)
    }
}

pub fn summary_stats(campaigns: &[Campaign]) -> SummaryStats {
    campaigns.iter().fold(
        SummaryStats {
            total_campaigns: campaigns.len(),
            ..SummaryStats::default()
        },
        |mut stats, c| {
            stats.total_raised = stats.total_raised.saturating_add(c.balance);
            stats.total_target = stats.total_target.saturating_add(c.target_amount);
            if c.balance < c.target_amount {
                stats.active_campaigns += 1;
            }
            stats
        },
    )
}

/// Percent of target raised, clamped to `[0, 100]`; zero when there is no target.
pub fn funding_percentage(campaign: &Campaign) -> f64 {
    if campaign.target_amount == 0 {
        return 0.0;
    }
    (campaign.balance as f64 / campaign.target_amount as f64 * 100.0).clamp(0.0, 100.0)
}

pub fn remaining_amount(campaign: &Campaign) -> u64 {
    campaign.target_amount.saturating_sub(campaign.balance)
}

pub fn user_campaigns<'a>(snapshot: &'a Snapshot, owner: &Pubkey) -> Vec<&'a Campaign> {
    snapshot
        .campaigns()
        .iter()
        .filter(|c| c.student == *owner)
        .collect()
}

/// One withdrawal request together with the campaign it draws from.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RequestRow<'a> {
    pub campaign_address: Pubkey,
    pub campaign_title: &'a str,
    pub student: Pubkey,
    pub student_roll: &'a str,
    pub request: &'a WithdrawalRequest,
}

/// Every request of every campaign, in campaign order then request index.
pub fn flatten_withdrawal_requests(snapshot: &Snapshot) -> Vec<RequestRow<'_>> {
    snapshot
        .campaigns()
        .iter()
        .flat_map(|c| {
            snapshot.requests(&c.address).iter().map(move |request| RequestRow {
                campaign_address: c.address,
                campaign_title: &c.title,
                student: c.student,
                student_roll: &c.student_roll,
                request,
            })
        })
        .collect()
}

pub fn pending_requests<'a, 'r>(
    rows: &'r [RequestRow<'a>],
) -> impl Iterator<Item = &'r RequestRow<'a>> {
    rows.iter().filter(|row| !row.request.completed)
}
