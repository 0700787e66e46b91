use crate::{
    instructions::{build, InstructionArgs},
    model::NewCampaign,
    utils::*,
    Result,
};
use anchor_lang::{
    prelude::*,
    solana_program::{
        instruction::{AccountMeta, Instruction},
        system_program,
    },
};

#[derive(AnchorSerialize, AnchorDeserialize, Clone, Debug, PartialEq, Eq)]
pub struct CreateCampaign {
    pub minimum_contribution: u64,
    pub title: String,
    pub description: String,
    pub image: String,
    pub target_amount: u64,
    pub student_roll: String,
}

impl InstructionArgs for CreateCampaign {
    const NAME: &'static str = "create_campaign";
}

/// `index` is the factory's current campaign count; the new campaign lands at that PDA.
pub fn create_campaign(student: Pubkey, index: u32, campaign: NewCampaign) -> Result<Instruction> {
    build(
        &CreateCampaign {
            minimum_contribution: campaign.minimum_contribution,
            title: campaign.title,
            description: campaign.description,
            image: campaign.image,
            target_amount: campaign.target_amount,
            student_roll: campaign.student_roll,
        },
        vec![
            AccountMeta::new(find_factory(), false),
            AccountMeta::new(find_campaign(index), false),
            AccountMeta::new(student, true),
            AccountMeta::new_readonly(system_program::ID, false),
        ],
    )
}
