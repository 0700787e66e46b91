use crate::{
    error::GatewayError,
    state::{CampaignState, RequestState},
    utils::parse_sol,
    Result,
};
use anchor_lang::prelude::Pubkey;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Campaign {
    pub address: Pubkey,
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

impl Campaign {
    pub fn from_state(address: Pubkey, state: CampaignState) -> Self {
        Campaign {
            address,
            student: state.student,
            student_roll: state.student_roll,
            title: state.title,
            description: state.description,
            image: state.image,
            minimum_contribution: state.minimum_contribution,
            target_amount: state.target_amount,
            balance: state.balance,
            requests_count: state.requests_count,
            contributors_count: state.contributors_count,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WithdrawalRequest {
    pub index: u32,
    pub description: String,
    pub value: u64,
    pub recipient: Pubkey,
    pub approval_count: u32,
    pub completed: bool,
}

impl WithdrawalRequest {
    /// Rejects a request account that does not sit where it was looked up.
    pub fn from_state(campaign: &Pubkey, index: u32, state: RequestState) -> Result<Self> {
        if state.campaign != *campaign || state.index != index {
            return Err(GatewayError::Decode(format!(
                "request {} of {} decoded as request {} of {}",
                index, campaign, state.index, state.campaign
            )));
        }
        Ok(WithdrawalRequest {
            index,
            description: state.description,
            value: state.value,
            recipient: state.recipient,
            approval_count: state.approval_count,
            completed: state.completed,
        })
    }
}

/// Identifies one withdrawal request across all campaigns.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RequestKey {
    pub campaign: Pubkey,
    pub index: u32,
}

impl RequestKey {
    pub fn new(campaign: Pubkey, index: u32) -> Self {
        RequestKey { campaign, index }
    }
}

/// Campaign creation input as typed by the student; amounts in SOL.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CampaignForm {
    pub minimum_contribution: String,
    pub target_amount: String,
    pub title: String,
    pub description: String,
    pub image: String,
    pub student_roll: String,
}

/// A validated `CampaignForm` with amounts in lamports.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NewCampaign {
    pub minimum_contribution: u64,
    pub target_amount: u64,
    pub title: String,
    pub description: String,
    pub image: String,
    pub student_roll: String,
}

fn required<'a>(field: &str, value: &'a str) -> Result<&'a str> {
    let value = value.trim();
    if value.is_empty() {
        return Err(GatewayError::validation(format!("{} is required", field)));
    }
    Ok(value)
}

impl CampaignForm {
    pub fn validate(&self) -> Result<NewCampaign> {
        let minimum_contribution =
            parse_sol(required("minimum contribution", &self.minimum_contribution)?)?;
        let target_amount = parse_sol(required("target amount", &self.target_amount)?)?;
        Ok(NewCampaign {
            minimum_contribution,
            target_amount,
            title: required("title", &self.title)?.to_string(),
            description: required("description", &self.description)?.to_string(),
            image: required("image", &self.image)?.to_string(),
            student_roll: required("student roll", &self.student_roll)?.to_string(),
        })
    }
}

pub(crate) fn validate_withdrawal_request(
    description: &str,
    value: u64,
    recipient: &Pubkey,
) -> Result<()> {
    required("description", description)?;
    if value == 0 {
        return Err(GatewayError::validation("request value must be positive"));
    }
    if *recipient == Pubkey::default() {
        return Err(GatewayError::validation("recipient is required"));
    }
    Ok(())
}
