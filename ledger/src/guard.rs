//! # Transfer Guard
//!
//! Decides whether a debit may leave an account. A debit must target a real,
//! different account and fit inside the sender's *withdrawable* balance:
//! raw balance minus whatever a vesting lock still restricts.

use crate::address::Address;
use crate::error::{LedgerError, LedgerResult};

/// Raw balance minus the locked amount, floored at zero.
pub fn withdrawable(balance: u64, locked: u64) -> u64 {
    balance.saturating_sub(locked)
}

/// Authorizes moving `amount` from `sender` to `target`.
///
/// `balance` is the sender's raw balance and `locked` the remaining amount
/// of the sender's vesting lock (zero without one).
///
/// # Errors
///
/// - [`LedgerError::InvalidTarget`] for a self-transfer or the null address.
/// - [`LedgerError::InsufficientBalance`] if `amount` exceeds `balance`.
/// - [`LedgerError::LockedFundsExceeded`] if `amount` exceeds the
///   withdrawable balance.
pub fn authorize_debit(
    sender: &Address,
    target: &Address,
    amount: u64,
    balance: u64,
    locked: u64,
) -> LedgerResult<()> {
    if target == sender {
        return Err(LedgerError::InvalidTarget(format!(
            "{} cannot transfer to itself",
            sender
        )));
    }
    if target.is_zero() {
        return Err(LedgerError::InvalidTarget(
            "transfer target is the null address".into(),
        ));
    }
    if amount > balance {
        return Err(LedgerError::InsufficientBalance {
            balance,
            requested: amount,
        });
    }

    let available = withdrawable(balance, locked);
    if amount > available {
        return Err(LedgerError::LockedFundsExceeded {
            withdrawable: available,
            requested: amount,
        });
    }

    Ok(())
}
