use thiserror::Error;
use uuid::Uuid;

use crate::decimal::Money;

#[derive(Error, Debug)]
pub enum LedgerError {
    #[error("fee assignment not found: {id}")]
    AssignmentNotFound {
        id: Uuid,
    },

    #[error("discount definition not found: {id}")]
    DiscountNotFound {
        id: Uuid,
    },

    #[error("fee assignment is inactive: {id}")]
    AssignmentInactive {
        id: Uuid,
    },

    #[error("discount definition is inactive: {id}")]
    DiscountInactive {
        id: Uuid,
    },

    #[error("fee already assigned for student {student_id}, structure {fee_structure_id}, session {session_id}")]
    DuplicateAssignment {
        student_id: Uuid,
        fee_structure_id: Uuid,
        session_id: Uuid,
    },

    #[error("an active funding arrangement already exists for student {student_id}, session {session_id}")]
    DuplicateFundingArrangement {
        student_id: Uuid,
        session_id: Uuid,
    },

    #[error("invalid amount: {amount}")]
    InvalidAmount {
        amount: Money,
    },

    #[error("no pending principal to discount")]
    NoPendingPrincipal,

    #[error("discount exceeds remaining principal: discount {discount}, pending {pending}")]
    DiscountExceedsPrincipal {
        discount: Money,
        pending: Money,
    },

    #[error("no outstanding late fee to waive")]
    NoOutstandingLateFee,

    #[error("waiver exceeds waivable late fee: requested {requested}, outstanding {outstanding}")]
    ExceedsWaivableLateFee {
        requested: Money,
        outstanding: Money,
    },

    #[error("payment exceeds pending balance: requested {requested}, pending {pending}")]
    Overpayment {
        requested: Money,
        pending: Money,
    },

    #[error("nothing due on assignment {id}")]
    NothingDue {
        id: Uuid,
    },

    #[error("concurrent update detected on assignment {id}")]
    ConcurrencyConflict {
        id: Uuid,
    },

    #[error("invalid configuration: {message}")]
    InvalidConfiguration {
        message: String,
    },
}

impl LedgerError {
    /// conflicts are the only errors worth resubmitting against a fresh read
    pub fn is_retryable(&self) -> bool {
        matches!(self, LedgerError::ConcurrencyConflict { .. })
    }
}

pub type Result<T> = std::result::Result<T, LedgerError>;
