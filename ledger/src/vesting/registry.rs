//! # Vesting Registry
//!
//! Maps each beneficiary to at most one [`VestingLock`]. A lock is created by
//! a vesting transfer, mutated only through [`VestingRegistry::apply_release`],
//! and never removed. Once its remaining amount reaches zero it no longer
//! restricts anything and a new vesting transfer may replace it.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::engine;
use crate::address::Address;
use crate::config::{MAX_RELEASE_PERCENT, SECONDS_PER_DAY};
use crate::error::{LedgerError, LedgerResult};

/// A time-gated restriction on part of an account's balance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VestingLock {
    /// Account whose balance is restricted.
    pub beneficiary: Address,
    /// Amount restricted at creation.
    pub locked_token_original: u64,
    /// Amount still restricted. Never increases.
    pub remaining_locked_token: u64,
    /// Length of one vesting period in seconds.
    pub period_length_seconds: u64,
    /// Share of the original amount released per elapsed period (1..=100).
    pub release_percent_per_period: u8,
    /// Creation time. Entitlement is measured from here.
    pub start_time: DateTime<Utc>,
    /// Time of the last successful release, or `start_time`.
    pub last_release_time: DateTime<Utc>,
}

impl VestingLock {
    /// Amount already released from this lock.
    pub fn released_amount(&self) -> u64 {
        self.locked_token_original - self.remaining_locked_token
    }

    /// `true` once nothing remains restricted.
    pub fn is_exhausted(&self) -> bool {
        self.remaining_locked_token == 0
    }
}

/// Checks schedule parameters and returns the period length in seconds.
pub fn validate_schedule(amount: u64, duration_days: u32, percent_per_period: u8) -> LedgerResult<u64> {
    if amount == 0 {
        return Err(LedgerError::InvalidSchedule(
            "locked amount must be greater than zero".into(),
        ));
    }
    if duration_days == 0 {
        return Err(LedgerError::InvalidSchedule(
            "period must be at least one day".into(),
        ));
    }
    if percent_per_period == 0 || percent_per_period > MAX_RELEASE_PERCENT {
        return Err(LedgerError::InvalidSchedule(format!(
            "release percent must be within 1..={}, got {}",
            MAX_RELEASE_PERCENT, percent_per_period
        )));
    }
    Ok(u64::from(duration_days) * SECONDS_PER_DAY)
}

/// All vesting locks known to a ledger, keyed by beneficiary.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct VestingRegistry {
    locks: HashMap<Address, VestingLock>,
}

impl VestingRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Fails with [`LedgerError::InvalidTarget`] for the null address and
    /// [`LedgerError::DuplicateSchedule`] if `beneficiary` still has
    /// restricted funds. Performs no mutation.
    pub fn ensure_can_lock(&self, beneficiary: &Address) -> LedgerResult<()> {
        if beneficiary.is_zero() {
            return Err(LedgerError::InvalidTarget(
                "vesting beneficiary is the null address".into(),
            ));
        }
        match self.locks.get(beneficiary) {
            Some(lock) if !lock.is_exhausted() => {
                Err(LedgerError::DuplicateSchedule(beneficiary.to_string()))
            }
            _ => Ok(()),
        }
    }

    /// Stores a new lock for `beneficiary` and returns it.
    ///
    /// Replaces an exhausted lock if one exists. Crediting the beneficiary's
    /// balance is the caller's job and must happen in the same atomic step.
    ///
    /// # Errors
    ///
    /// [`LedgerError::InvalidSchedule`] for unusable parameters, then the
    /// errors of [`ensure_can_lock`](Self::ensure_can_lock).
    pub fn create_lock(
        &mut self,
        beneficiary: Address,
        amount: u64,
        duration_days: u32,
        percent_per_period: u8,
        now: DateTime<Utc>,
    ) -> LedgerResult<VestingLock> {
        let period_length_seconds = validate_schedule(amount, duration_days, percent_per_period)?;
        self.ensure_can_lock(&beneficiary)?;

        let lock = VestingLock {
            beneficiary,
            locked_token_original: amount,
            remaining_locked_token: amount,
            period_length_seconds,
            release_percent_per_period: percent_per_period,
            start_time: now,
            last_release_time: now,
        };
        self.locks.insert(beneficiary, lock.clone());
        Ok(lock)
    }

    /// Lock record for `address`, if any.
    pub fn get_lock(&self, address: &Address) -> Option<&VestingLock> {
        self.locks.get(address)
    }

    /// Amount still restricted for `address`; zero without a lock.
    pub fn locked_amount(&self, address: &Address) -> u64 {
        self.locks
            .get(address)
            .map(|l| l.remaining_locked_token)
            .unwrap_or(0)
    }

    /// Sum of restricted funds across all locks.
    pub fn total_locked(&self) -> u64 {
        self.locks
            .values()
            .map(|l| l.remaining_locked_token)
            .fold(0u64, u64::saturating_add)
    }

    /// Number of locks that still restrict funds.
    pub fn active_count(&self) -> usize {
        self.locks.values().filter(|l| !l.is_exhausted()).count()
    }

    /// Runs the unlock engine on `beneficiary`'s lock and writes the
    /// updated record back. Returns the amount released.
    ///
    /// A missing lock reports [`LedgerError::UnlockNotOpen`].
    pub fn apply_release(&mut self, beneficiary: &Address, now: DateTime<Utc>) -> LedgerResult<u64> {
        let lock = self
            .locks
            .get_mut(beneficiary)
            .ok_or_else(|| LedgerError::UnlockNotOpen(beneficiary.to_string()))?;

        let outcome = engine::release(lock, now)?;
        *lock = outcome.lock;
        Ok(outcome.released)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    const BENEFICIARY: Address = Address::from_low_u8(9);

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap()
    }

    #[test]
    fn create_lock_initializes_record() {
        let mut registry = VestingRegistry::new();
        let lock = registry.create_lock(BENEFICIARY, 1_000, 30, 10, t0()).unwrap();

        assert_eq!(lock.locked_token_original, 1_000);
        assert_eq!(lock.remaining_locked_token, 1_000);
        assert_eq!(lock.period_length_seconds, 30 * SECONDS_PER_DAY);
        assert_eq!(lock.release_percent_per_period, 10);
        assert_eq!(lock.start_time, t0());
        assert_eq!(lock.last_release_time, t0());
        assert_eq!(registry.get_lock(&BENEFICIARY), Some(&lock));
        assert_eq!(registry.locked_amount(&BENEFICIARY), 1_000);
    }

    #[test]
    fn null_beneficiary_rejected() {
        let mut registry = VestingRegistry::new();
        let err = registry
            .create_lock(Address::ZERO, 100, 1, 50, t0())
            .unwrap_err();
        assert!(matches!(err, LedgerError::InvalidTarget(_)));
    }

    #[test]
    fn second_active_lock_is_duplicate() {
        let mut registry = VestingRegistry::new();
        registry.create_lock(BENEFICIARY, 100, 1, 50, t0()).unwrap();
        let err = registry
            .create_lock(BENEFICIARY, 5, 1, 50, t0())
            .unwrap_err();
        assert!(matches!(err, LedgerError::DuplicateSchedule(_)));
        assert_eq!(registry.locked_amount(&BENEFICIARY), 100);
    }

    #[test]
    fn exhausted_lock_can_be_replaced() {
        let mut registry = VestingRegistry::new();
        registry.create_lock(BENEFICIARY, 100, 1, 100, t0()).unwrap();
        let released = registry
            .apply_release(&BENEFICIARY, t0() + Duration::days(1))
            .unwrap();
        assert_eq!(released, 100);
        assert_eq!(registry.active_count(), 0);

        let later = t0() + Duration::days(2);
        let lock = registry.create_lock(BENEFICIARY, 40, 2, 25, later).unwrap();
        assert_eq!(lock.start_time, later);
        assert_eq!(registry.locked_amount(&BENEFICIARY), 40);
    }

    #[test]
    fn invalid_schedule_parameters_rejected() {
        assert!(matches!(
            validate_schedule(0, 1, 10),
            Err(LedgerError::InvalidSchedule(_))
        ));
        assert!(matches!(
            validate_schedule(10, 0, 10),
            Err(LedgerError::InvalidSchedule(_))
        ));
        assert!(matches!(
            validate_schedule(10, 1, 0),
            Err(LedgerError::InvalidSchedule(_))
        ));
        assert!(matches!(
            validate_schedule(10, 1, 101),
            Err(LedgerError::InvalidSchedule(_))
        ));
        assert_eq!(validate_schedule(10, 2, 100).unwrap(), 2 * SECONDS_PER_DAY);
    }

    #[test]
    fn release_without_lock_is_not_open() {
        let mut registry = VestingRegistry::new();
        let err = registry.apply_release(&BENEFICIARY, t0()).unwrap_err();
        assert!(matches!(err, LedgerError::UnlockNotOpen(_)));
    }

    #[test]
    fn failed_release_leaves_record_untouched() {
        let mut registry = VestingRegistry::new();
        let lock = registry.create_lock(BENEFICIARY, 100, 2, 50, t0()).unwrap();
        assert!(registry
            .apply_release(&BENEFICIARY, t0() + Duration::days(1))
            .is_err());
        assert_eq!(registry.get_lock(&BENEFICIARY), Some(&lock));
    }

    #[test]
    fn totals_cover_all_locks() {
        let mut registry = VestingRegistry::new();
        registry
            .create_lock(Address::from_low_u8(1), 100, 1, 50, t0())
            .unwrap();
        registry
            .create_lock(Address::from_low_u8(2), 250, 1, 50, t0())
            .unwrap();
        assert_eq!(registry.total_locked(), 350);
        assert_eq!(registry.active_count(), 2);
    }
}
