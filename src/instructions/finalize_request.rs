use crate::{
    instructions::{build, InstructionArgs},
    utils::*,
    Result,
};
use anchor_lang::{
    prelude::*,
    solana_program::instruction::{AccountMeta, Instruction},
};

#[derive(AnchorSerialize, AnchorDeserialize, Clone, Debug, PartialEq, Eq)]
pub struct FinalizeRequest {
    pub index: u32,
}

impl InstructionArgs for FinalizeRequest {
    const NAME: &'static str = "finalize_request";
}

pub fn finalize_request(
    campaign: Pubkey,
    student: Pubkey,
    index: u32,
    recipient: Pubkey,
) -> Result<Instruction> {
    build(
        &FinalizeRequest { index },
        vec![
            AccountMeta::new(campaign, false),
            AccountMeta::new(find_request(&campaign, index), false),
            AccountMeta::new(student, true),
            AccountMeta::new(recipient, false),
        ],
    )
}
