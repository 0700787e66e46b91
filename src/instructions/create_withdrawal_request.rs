use crate::{
    instructions::{build, InstructionArgs},
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
pub struct CreateWithdrawalRequest {
    pub description: String,
    pub value: u64,
    pub recipient: Pubkey,
}

impl InstructionArgs for CreateWithdrawalRequest {
    const NAME: &'static str = "create_withdrawal_request";
}

/// `index` is the campaign's current `requests_count`.
pub fn create_withdrawal_request(
    campaign: Pubkey,
    student: Pubkey,
    index: u32,
    description: String,
    value: u64,
    recipient: Pubkey,
) -> Result<Instruction> {
    build(
        &CreateWithdrawalRequest {
            description,
            value,
            recipient,
        },
        vec![
            AccountMeta::new(campaign, false),
            AccountMeta::new(find_request(&campaign, index), false),
            AccountMeta::new(student, true),
            AccountMeta::new_readonly(system_program::ID, false),
        ],
    )
}
