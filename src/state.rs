use anchor_lang::prelude::*;

/// Factory account, one per deployment at the `["factory"]` PDA.
#[account]
#[derive(Debug, PartialEq, Eq)]
pub struct Factory {
    pub admin: Pubkey,
    pub teachers: Vec<Pubkey>,
    /// Deployed campaigns in creation order.
    pub campaigns: Vec<Pubkey>,
}

#[account]
#[derive(Debug, PartialEq, Eq)]
pub struct CampaignState {
    pub student: Pubkey,
    pub student_roll: String,
    pub title: String,
    pub description: String,
    pub image: String,
    pub minimum_contribution: u64,
    pub target_amount: u64,
    pub balance: u64,
    pub requests_count: u32,
    pub contributors_count: u32,
}

#[account]
#[derive(Debug, PartialEq, Eq)]
pub struct RequestState {
    pub campaign: Pubkey,
    pub index: u32,
    pub description: String,
    pub value: u64,
    pub recipient: Pubkey,
    pub approval_count: u32,
    pub completed: bool,
}
