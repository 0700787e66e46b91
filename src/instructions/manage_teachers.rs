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
pub struct AddTeacher {
    pub teacher: Pubkey,
}

impl InstructionArgs for AddTeacher {
    const NAME: &'static str = "add_teacher";
}

#[derive(AnchorSerialize, AnchorDeserialize, Clone, Debug, PartialEq, Eq)]
pub struct RemoveTeacher {
    pub teacher: Pubkey,
}

impl InstructionArgs for RemoveTeacher {
    const NAME: &'static str = "remove_teacher";
}

fn admin_accounts(admin: Pubkey) -> Vec<AccountMeta> {
    vec![
        AccountMeta::new(find_factory(), false),
        AccountMeta::new_readonly(admin, true),
    ]
}

pub fn add_teacher(admin: Pubkey, teacher: Pubkey) -> Result<Instruction> {
    build(&AddTeacher { teacher }, admin_accounts(admin))
}

pub fn remove_teacher(admin: Pubkey, teacher: Pubkey) -> Result<Instruction> {
    build(&RemoveTeacher { teacher }, admin_accounts(admin))
}
