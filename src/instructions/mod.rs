pub use crate::instructions::{
    approve_request::*, contribute::*, create_campaign::*, create_withdrawal_request::*,
    finalize_request::*, manage_teachers::*,
};

use crate::{error::GatewayError, utils::sighash, Result};
use anchor_lang::{
    solana_program::instruction::{AccountMeta, Instruction},
    AnchorSerialize,
};

pub mod approve_request;
pub mod contribute;
pub mod create_campaign;
pub mod create_withdrawal_request;
pub mod finalize_request;
pub mod manage_teachers;

/// Arguments of one program instruction, Borsh-encoded after its selector.
pub trait InstructionArgs: AnchorSerialize {
    const NAME: &'static str;

    fn data(&self) -> Result<Vec<u8>> {
        let mut data = sighash(Self::NAME).to_vec();
        self.serialize(&mut data)
            .map_err(|e| GatewayError::validation(format!("cannot encode {}: {}", Self::NAME, e)))?;
        Ok(data)
    }
}

fn build<A: InstructionArgs>(args: &A, accounts: Vec<AccountMeta>) -> Result<Instruction> {
    Ok(Instruction {
        program_id: crate::ID,
        data: args.data()?,
        accounts,
    })
}
