use crate::{config::*, error::GatewayError, Result};
use anchor_lang::{
    prelude::Pubkey,
    solana_program::{hash::hash, native_token::lamports_to_sol},
};

fn find_pda(seeds: &[&[u8]]) -> Pubkey {
    Pubkey::find_program_address(seeds, &crate::ID).0
}

pub fn find_factory() -> Pubkey {
    find_pda(&[b"factory"])
}

pub fn find_campaign(index: u32) -> Pubkey {
    find_pda(&[b"campaign", &index.to_le_bytes()])
}

pub fn find_request(campaign: &Pubkey, index: u32) -> Pubkey {
    find_pda(&[b"request", campaign.as_ref(), &index.to_le_bytes()])
}

pub fn find_contribution(campaign: &Pubkey, contributor: &Pubkey) -> Pubkey {
    find_pda(&[b"contribution", campaign.as_ref(), contributor.as_ref()])
}

fn namespaced_hash(namespace: &str, name: &str) -> [u8; 8] {
    let mut out = [0; 8];
    out.copy_from_slice(&hash(format!("{}:{}", namespace, name).as_bytes()).to_bytes()[..8]);
    out
}

/// Anchor instruction selector for `name` (snake case).
pub fn sighash(name: &str) -> [u8; 8] {
    namespaced_hash("global", name)
}

/// Anchor account discriminator for the struct named `name`.
pub fn account_discriminator(name: &str) -> [u8; 8] {
    namespaced_hash("account", name)
}

/// Parses a decimal SOL amount ("1.5") into lamports without going through floats.
pub fn parse_sol(amount: &str) -> Result<u64> {
    let amount = amount.trim();
    let invalid = || GatewayError::validation(format!("`{}` is not a valid amount", amount));
    let (whole, frac) = amount.split_once('.').unwrap_or((amount, ""));
    if (whole.is_empty() && frac.is_empty())
        || frac.len() > LAMPORTS_DECIMALS as usize
        || !whole.bytes().chain(frac.bytes()).all(|b| b.is_ascii_digit())
    {
        return Err(invalid());
    }
    let scale = 10u64.pow(LAMPORTS_DECIMALS as u32);
    let whole: u64 = if whole.is_empty() {
        0
    } else {
        whole.parse().map_err(|_| invalid())?
    };
    let frac: u64 = if frac.is_empty() {
        0
    } else {
        format!("{:0<width$}", frac, width = LAMPORTS_DECIMALS as usize)
            .parse()
            .map_err(|_| invalid())?
    };
    whole
        .checked_mul(scale)
        .and_then(|l| l.checked_add(frac))
        .ok_or_else(invalid)
}

/// Display rendering, rounded to `DISPLAY_DECIMALS`. Not for arithmetic.
pub fn format_sol(lamports: u64) -> String {
    format!("{:.*}", DISPLAY_DECIMALS, lamports_to_sol(lamports))
}
