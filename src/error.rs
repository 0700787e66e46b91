use anchor_lang::prelude::*;
use anchor_lang::solana_program::instruction::InstructionError;
use solana_sdk::transaction::TransactionError;

/// Error codes raised by the college campaign program.
#[error_code]
pub enum CampaignError {
    /// 6000 0x1770
    #[msg("Caller is not the factory admin")]
    NotAdmin,
    /// 6001 0x1771
    #[msg("Caller is not an allowlisted teacher")]
    NotTeacher,
    /// 6002 0x1772
    #[msg("Caller is not the campaign student")]
    NotStudent,
    /// 6003 0x1773
    #[msg("Contribution is below the campaign minimum")]
    BelowMinimumContribution,
    /// 6004 0x1774
    #[msg("Withdrawal request is already completed")]
    RequestCompleted,
    /// 6005 0x1775
    #[msg("Teacher has already approved this request")]
    AlreadyApproved,
    /// 6006 0x1776
    #[msg("Campaign balance is too low for this request")]
    InsufficientBalance,
    /// 6007 0x1777
    #[msg("Request does not have enough approvals")]
    NotEnoughApprovals,
}

impl CampaignError {
    const ALL: [CampaignError; 8] = [
        CampaignError::NotAdmin,
        CampaignError::NotTeacher,
        CampaignError::NotStudent,
        CampaignError::BelowMinimumContribution,
        CampaignError::RequestCompleted,
        CampaignError::AlreadyApproved,
        CampaignError::InsufficientBalance,
        CampaignError::NotEnoughApprovals,
    ];

    pub fn from_code(code: u32) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|e| *e as u32 + anchor_lang::error::ERROR_CODE_OFFSET == code)
    }

    fn is_role_check(self) -> bool {
        matches!(
            self,
            CampaignError::NotAdmin | CampaignError::NotTeacher | CampaignError::NotStudent
        )
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Validation,
    Transport,
    Revert,
    Authorization,
    NotFound,
    Decode,
}

#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum GatewayError {
    #[error("invalid input: {0}")]
    Validation(String),
    #[error("transport failure: {0}")]
    Transport(String),
    #[error("transaction reverted: {reason}")]
    Revert { code: Option<u32>, reason: String },
    #[error("not authorized: {0}")]
    Authorization(String),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("malformed response: {0}")]
    Decode(String),
}

impl GatewayError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            GatewayError::Validation(_) => ErrorKind::Validation,
            GatewayError::Transport(_) => ErrorKind::Transport,
            GatewayError::Revert { .. } => ErrorKind::Revert,
            GatewayError::Authorization(_) => ErrorKind::Authorization,
            GatewayError::NotFound(_) => ErrorKind::NotFound,
            GatewayError::Decode(_) => ErrorKind::Decode,
        }
    }

    pub(crate) fn validation(msg: impl Into<String>) -> Self {
        GatewayError::Validation(msg.into())
    }
}

/// Pulls the `Error Message:` part out of an Anchor error log line.
pub fn reason_from_logs(logs: &[String]) -> Option<String> {
    logs.iter().rev().find_map(|line| {
        line.split_once("Error Message: ")
            .map(|(_, msg)| msg.trim().trim_end_matches('.').to_string())
    })
}

/// Maps a failed transaction onto the client taxonomy.
pub fn classify_transaction_error(err: &TransactionError, logs: &[String]) -> GatewayError {
    let from_logs = reason_from_logs(logs);
    match err {
        TransactionError::InstructionError(_, InstructionError::Custom(code)) => {
            match CampaignError::from_code(*code) {
                Some(e) if e.is_role_check() => {
                    GatewayError::Authorization(from_logs.unwrap_or_else(|| e.to_string()))
                }
                Some(e) => GatewayError::Revert {
                    code: Some(*code),
                    reason: from_logs.unwrap_or_else(|| e.to_string()),
                },
                None => GatewayError::Revert {
                    code: Some(*code),
                    reason: from_logs.unwrap_or_else(|| format!("custom program error: {:#x}", code)),
                },
            }
        }
        TransactionError::InstructionError(_, InstructionError::MissingRequiredSignature) => {
            GatewayError::Authorization(from_logs.unwrap_or_else(|| err.to_string()))
        }
        _ => GatewayError::Revert {
            code: None,
            reason: from_logs.unwrap_or_else(|| err.to_string()),
        },
    }
}
