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
pub struct ApproveRequest {
    pub index: u32,
}

impl InstructionArgs for ApproveRequest {
    const NAME: &'static str = "approve_request";
}

/// The recipient is writable because the program may pay out on approval.
pub fn approve_request(
    campaign: Pubkey,
    teacher: Pubkey,
    index: u32,
    recipient: Pubkey,
) -> Result<Instruction> {
    build(
        &ApproveRequest { index },
        vec![
            AccountMeta::new_readonly(find_factory(), false),
            AccountMeta::new(campaign, false),
            AccountMeta::new(find_request(&campaign, index), false),
            AccountMeta::new(teacher, true),
            AccountMeta::new(recipient, false),
            AccountMeta::new_readonly(system_program::ID, false),
        ],
    )
}
