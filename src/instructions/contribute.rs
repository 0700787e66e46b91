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
pub struct Contribute {
    pub amount: u64,
}

impl InstructionArgs for Contribute {
    const NAME: &'static str = "contribute";
}

pub fn contribute(campaign: Pubkey, contributor: Pubkey, amount: u64) -> Result<Instruction> {
    build(
        &Contribute { amount },
        vec![
            AccountMeta::new(campaign, false),
            AccountMeta::new(find_contribution(&campaign, &contributor), false),
            AccountMeta::new(contributor, true),
            AccountMeta::new_readonly(system_program::ID, false),
        ],
    )
}
