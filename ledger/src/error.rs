//! # Ledger Errors
//!
//! Every rejected operation maps to exactly one [`LedgerError`] variant and
//! leaves the ledger untouched. Validation outcomes are ordinary values the
//! caller can react to (retry later, pick another target). Arithmetic
//! failures travel on their own variant and are flagged unrecoverable by
//! [`LedgerError::is_recoverable`].

use serde::Serialize;
use thiserror::Error;

/// Overflow or underflow in balance or supply bookkeeping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error, Serialize)]
pub enum ArithmeticError {
    /// An addition exceeded `u64::MAX`.
    #[error("arithmetic overflow: {current} + {delta}")]
    Overflow {
        /// Value before the operation.
        current: u64,
        /// Amount that was added.
        delta: u64,
    },

    /// A subtraction went below zero.
    #[error("arithmetic underflow: {current} - {delta}")]
    Underflow {
        /// Value before the operation.
        current: u64,
        /// Amount that was subtracted.
        delta: u64,
    },
}

/// Errors returned by ledger operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LedgerError {
    /// The target is the null address or equal to the sender.
    #[error("invalid target: {0}")]
    InvalidTarget(String),

    /// The beneficiary already holds a lock with funds still restricted.
    #[error("duplicate vesting schedule for {0}")]
    DuplicateSchedule(String),

    /// The raw balance does not cover the requested debit.
    #[error("insufficient balance: have {balance}, requested {requested}")]
    InsufficientBalance {
        /// Raw balance of the sender.
        balance: u64,
        /// Amount the caller tried to move.
        requested: u64,
    },

    /// The debit would touch funds still restricted by a vesting lock.
    #[error("locked funds exceeded: withdrawable {withdrawable}, requested {requested}")]
    LockedFundsExceeded {
        /// Balance minus remaining locked amount.
        withdrawable: u64,
        /// Amount the caller tried to move.
        requested: u64,
    },

    /// No vesting period has closed yet, or there is no lock at all.
    #[error("unlock not open for {0}")]
    UnlockNotOpen(String),

    /// Nothing new became releasable since the last successful unlock.
    #[error("already released: no new entitlement for {0}")]
    AlreadyReleased(String),

    /// The schedule has no restricted funds left.
    #[error("schedule fully unlocked for {0}")]
    FullyUnlocked(String),

    /// The schedule parameters cannot produce a valid lock.
    #[error("invalid schedule: {0}")]
    InvalidSchedule(String),

    /// Balance or supply arithmetic failed.
    #[error(transparent)]
    Arithmetic(#[from] ArithmeticError),
}

impl LedgerError {
    /// `false` only for arithmetic failures, which indicate corrupted state
    /// or an attack rather than a caller mistake.
    pub fn is_recoverable(&self) -> bool {
        !matches!(self, LedgerError::Arithmetic(_))
    }

    /// Stable machine-readable name of the variant.
    pub fn kind(&self) -> &'static str {
        match self {
            LedgerError::InvalidTarget(_) => "InvalidTarget",
            LedgerError::DuplicateSchedule(_) => "DuplicateSchedule",
            LedgerError::InsufficientBalance { .. } => "InsufficientBalance",
            LedgerError::LockedFundsExceeded { .. } => "LockedFundsExceeded",
            LedgerError::UnlockNotOpen(_) => "UnlockNotOpen",
            LedgerError::AlreadyReleased(_) => "AlreadyReleased",
            LedgerError::FullyUnlocked(_) => "FullyUnlocked",
            LedgerError::InvalidSchedule(_) => "InvalidSchedule",
            LedgerError::Arithmetic(_) => "Arithmetic",
        }
    }
}

/// Convenience alias used throughout the crate.
pub type LedgerResult<T> = Result<T, LedgerError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_arithmetic_is_unrecoverable() {
        let overflow: LedgerError = ArithmeticError::Overflow {
            current: u64::MAX,
            delta: 1,
        }
        .into();
        assert!(!overflow.is_recoverable());
        assert!(LedgerError::UnlockNotOpen("0x01".into()).is_recoverable());
        assert!(LedgerError::InsufficientBalance {
            balance: 1,
            requested: 2
        }
        .is_recoverable());
    }

    #[test]
    fn display_includes_amounts() {
        let err = LedgerError::LockedFundsExceeded {
            withdrawable: 10,
            requested: 25,
        };
        assert_eq!(
            err.to_string(),
            "locked funds exceeded: withdrawable 10, requested 25"
        );
        assert_eq!(err.kind(), "LockedFundsExceeded");
    }
}
