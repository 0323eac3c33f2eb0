//! # Account Ledger
//!
//! Raw balance bookkeeping. The vesting core only talks to the
//! [`AccountLedger`] trait; [`BalanceBook`] is the in-memory implementation
//! used by [`crate::ledger::VestingLedger`] by default.
//!
//! Balances and total supply are adjusted with checked arithmetic: a credit
//! that would pass `u64::MAX` fails with [`ArithmeticError::Overflow`], a
//! debit below zero with [`ArithmeticError::Underflow`]. Neither mutates
//! anything on failure.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::address::Address;
use crate::error::ArithmeticError;

/// Raw balance storage consulted and mutated by the vesting core.
pub trait AccountLedger {
    /// Raw balance of `address`; unknown accounts hold zero.
    fn balance_of(&self, address: &Address) -> u64;

    /// Adds `amount` to `address`. Returns the new balance.
    fn credit(&mut self, address: &Address, amount: u64) -> Result<u64, ArithmeticError>;

    /// Removes `amount` from `address`. Returns the new balance.
    fn debit(&mut self, address: &Address, amount: u64) -> Result<u64, ArithmeticError>;

    /// Sum of all balances.
    fn total_supply(&self) -> u64;

    /// `true` when `address` may hold funds.
    fn is_valid_target(&self, address: &Address) -> bool {
        !address.is_zero()
    }
}

/// State of a single account.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    /// Raw balance, locked funds included.
    pub balance: u64,
}

/// In-memory [`AccountLedger`].
///
/// Accounts are created lazily on first credit and never removed; a zero
/// balance is a valid terminal state.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BalanceBook {
    accounts: HashMap<Address, Account>,
    total_supply: u64,
}

impl BalanceBook {
    /// Creates an empty book.
    pub fn new() -> Self {
        Self::default()
    }

    /// Mints `amount` to `address`, growing total supply.
    ///
    /// Used for genesis allocation only; ordinary operations move existing
    /// supply with [`AccountLedger::credit`] and [`AccountLedger::debit`].
    pub fn mint(&mut self, address: &Address, amount: u64) -> Result<u64, ArithmeticError> {
        let new_supply =
            self.total_supply
                .checked_add(amount)
                .ok_or(ArithmeticError::Overflow {
                    current: self.total_supply,
                    delta: amount,
                })?;
        let balance = self.credit_balance(address, amount)?;
        self.total_supply = new_supply;
        Ok(balance)
    }

    /// Returns the account record, if the address was ever credited.
    pub fn account(&self, address: &Address) -> Option<&Account> {
        self.accounts.get(address)
    }

    /// Number of known accounts.
    pub fn account_count(&self) -> usize {
        self.accounts.len()
    }

    fn credit_balance(&mut self, address: &Address, amount: u64) -> Result<u64, ArithmeticError> {
        let account = self.accounts.entry(*address).or_default();
        account.balance = account
            .balance
            .checked_add(amount)
            .ok_or(ArithmeticError::Overflow {
                current: account.balance,
                delta: amount,
            })?;
        Ok(account.balance)
    }
}

impl AccountLedger for BalanceBook {
    fn balance_of(&self, address: &Address) -> u64 {
        self.accounts.get(address).map(|a| a.balance).unwrap_or(0)
    }

    fn credit(&mut self, address: &Address, amount: u64) -> Result<u64, ArithmeticError> {
        self.credit_balance(address, amount)
    }

    fn debit(&mut self, address: &Address, amount: u64) -> Result<u64, ArithmeticError> {
        let current = self.balance_of(address);
        let remaining = current
            .checked_sub(amount)
            .ok_or(ArithmeticError::Underflow {
                current,
                delta: amount,
            })?;
        self.accounts.entry(*address).or_default().balance = remaining;
        Ok(remaining)
    }

    fn total_supply(&self) -> u64 {
        self.total_supply
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALICE: Address = Address::from_low_u8(1);
    const BOB: Address = Address::from_low_u8(2);

    #[test]
    fn unknown_account_has_zero_balance() {
        let book = BalanceBook::new();
        assert_eq!(book.balance_of(&ALICE), 0);
        assert!(book.account(&ALICE).is_none());
    }

    #[test]
    fn mint_grows_supply_and_balance() {
        let mut book = BalanceBook::new();
        book.mint(&ALICE, 1_000).unwrap();
        book.mint(&BOB, 500).unwrap();
        assert_eq!(book.total_supply(), 1_500);
        assert_eq!(book.balance_of(&ALICE), 1_000);
        assert_eq!(book.account_count(), 2);
    }

    #[test]
    fn credit_and_debit_move_balance() {
        let mut book = BalanceBook::new();
        book.mint(&ALICE, 100).unwrap();
        assert_eq!(book.debit(&ALICE, 40).unwrap(), 60);
        assert_eq!(book.credit(&BOB, 40).unwrap(), 40);
        assert_eq!(book.total_supply(), 100);
    }

    #[test]
    fn debit_below_zero_underflows_without_mutation() {
        let mut book = BalanceBook::new();
        book.mint(&ALICE, 10).unwrap();
        let err = book.debit(&ALICE, 11).unwrap_err();
        assert_eq!(
            err,
            ArithmeticError::Underflow {
                current: 10,
                delta: 11
            }
        );
        assert_eq!(book.balance_of(&ALICE), 10);
    }

    #[test]
    fn credit_past_max_overflows_without_mutation() {
        let mut book = BalanceBook::new();
        book.mint(&ALICE, u64::MAX).unwrap();
        assert!(book.credit(&ALICE, 1).is_err());
        assert!(book.mint(&BOB, 1).is_err());
        assert_eq!(book.balance_of(&ALICE), u64::MAX);
        assert_eq!(book.balance_of(&BOB), 0);
    }

    #[test]
    fn null_address_is_not_a_valid_target() {
        let book = BalanceBook::new();
        assert!(!book.is_valid_target(&Address::ZERO));
        assert!(book.is_valid_target(&ALICE));
    }
}
