//! # Shared Ledger Handle
//!
//! [`SharedLedger`] makes one [`VestingLedger`] usable from many threads or
//! request handlers. Every operation takes the same mutex and reads `now`
//! from the injected [`Clock`] inside the critical section, so operations
//! are serialized and see non-decreasing timestamps in commit order. Two
//! concurrent unlocks of one beneficiary therefore never count the same
//! entitlement twice.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use parking_lot::Mutex;

use crate::account::{AccountLedger, BalanceBook};
use crate::address::Address;
use crate::error::LedgerResult;
use crate::events::{NoopNotifier, TransferEvent, TransferNotifier};
use crate::ledger::{AccountSnapshot, VestingLedger};
use crate::vesting::VestingLock;

/// Source of the authoritative current time.
pub trait Clock: Send + Sync {
    /// Current time.
    fn now(&self) -> DateTime<Utc>;
}

/// Wall clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Manually driven clock for tests and simulations. Never moves backwards.
#[derive(Debug, Clone)]
pub struct ManualClock {
    now: Arc<Mutex<DateTime<Utc>>>,
}

impl ManualClock {
    /// Starts the clock at `start`.
    pub fn new(start: DateTime<Utc>) -> Self {
        Self {
            now: Arc::new(Mutex::new(start)),
        }
    }

    /// Moves the clock forward by `by`. Negative durations are ignored.
    pub fn advance(&self, by: Duration) {
        if by > Duration::zero() {
            let mut now = self.now.lock();
            *now += by;
        }
    }

    /// Jumps to `to` if it is later than the current time.
    pub fn set(&self, to: DateTime<Utc>) {
        let mut now = self.now.lock();
        if to > *now {
            *now = to;
        }
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock()
    }
}

/// Thread-safe, cloneable handle to a [`VestingLedger`].
pub struct SharedLedger<A = BalanceBook, N = NoopNotifier> {
    inner: Arc<Mutex<VestingLedger<A, N>>>,
    clock: Arc<dyn Clock>,
}

impl<A, N> Clone for SharedLedger<A, N> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
            clock: Arc::clone(&self.clock),
        }
    }
}

impl<A: AccountLedger, N: TransferNotifier> SharedLedger<A, N> {
    /// Wraps `ledger`, reading time from `clock`.
    pub fn new(ledger: VestingLedger<A, N>, clock: Arc<dyn Clock>) -> Self {
        Self {
            inner: Arc::new(Mutex::new(ledger)),
            clock,
        }
    }

    /// Current time according to the handle's clock.
    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    /// See [`VestingLedger::transfer`].
    pub fn transfer(&self, sender: Address, target: Address, amount: u64) -> LedgerResult<TransferEvent> {
        let mut ledger = self.inner.lock();
        let now = self.clock.now();
        ledger.transfer(sender, target, amount, now)
    }

    /// See [`VestingLedger::transfer_with_vesting`].
    pub fn transfer_with_vesting(
        &self,
        sender: Address,
        beneficiary: Address,
        amount: u64,
        duration_days: u32,
        percent_per_period: u8,
    ) -> LedgerResult<VestingLock> {
        let mut ledger = self.inner.lock();
        let now = self.clock.now();
        ledger.transfer_with_vesting(sender, beneficiary, amount, duration_days, percent_per_period, now)
    }

    /// See [`VestingLedger::unlock`].
    pub fn unlock(&self, beneficiary: Address) -> LedgerResult<u64> {
        let mut ledger = self.inner.lock();
        let now = self.clock.now();
        ledger.unlock(beneficiary, now)
    }

    /// Unlocks like [`Self::unlock`] and reports the amount still locked,
    /// both read in the same critical section.
    pub fn unlock_with_remaining(&self, beneficiary: Address) -> LedgerResult<(u64, u64)> {
        let mut ledger = self.inner.lock();
        let now = self.clock.now();
        let released = ledger.unlock(beneficiary, now)?;
        Ok((released, ledger.locked_of(&beneficiary)))
    }

    /// See [`VestingLedger::lock_of`].
    pub fn lock_of(&self, beneficiary: &Address) -> Option<VestingLock> {
        self.inner.lock().lock_of(beneficiary).cloned()
    }

    /// See [`VestingLedger::snapshot`].
    pub fn snapshot(&self, address: &Address) -> AccountSnapshot {
        let ledger = self.inner.lock();
        ledger.snapshot(address, self.clock.now())
    }

    /// Runs `f` with shared access to the ledger under the lock.
    pub fn read<R>(&self, f: impl FnOnce(&VestingLedger<A, N>) -> R) -> R {
        let ledger = self.inner.lock();
        f(&*ledger)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{GenesisAllocation, LedgerConfig, TokenMetadata};
    use crate::error::LedgerError;
    use chrono::TimeZone;
    use std::thread;

    const OWNER: Address = Address::from_low_u8(1);
    const ALICE: Address = Address::from_low_u8(2);

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 1, 15, 9, 30, 0).unwrap()
    }

    fn shared(clock: &ManualClock) -> SharedLedger {
        let config = LedgerConfig {
            token: TokenMetadata::default(),
            genesis: vec![GenesisAllocation {
                address: OWNER,
                amount: 10_000,
            }],
        };
        let ledger = VestingLedger::from_config(&config, NoopNotifier).unwrap();
        SharedLedger::new(ledger, Arc::new(clock.clone()))
    }

    #[test]
    fn manual_clock_never_goes_back() {
        let clock = ManualClock::new(t0());
        clock.advance(Duration::days(2));
        clock.advance(Duration::days(-5));
        clock.set(t0());
        assert_eq!(clock.now(), t0() + Duration::days(2));
    }

    #[test]
    fn operations_use_injected_clock() {
        let clock = ManualClock::new(t0());
        let ledger = shared(&clock);

        let lock = ledger.transfer_with_vesting(OWNER, ALICE, 1_000, 10, 10).unwrap();
        assert_eq!(lock.start_time, t0());

        assert!(matches!(ledger.unlock(ALICE), Err(LedgerError::UnlockNotOpen(_))));
        clock.advance(Duration::days(10));
        assert_eq!(ledger.unlock(ALICE).unwrap(), 100);
        assert_eq!(
            ledger.lock_of(&ALICE).unwrap().last_release_time,
            t0() + Duration::days(10)
        );
    }

    #[test]
    fn concurrent_unlocks_release_once() {
        let clock = ManualClock::new(t0());
        let ledger = shared(&clock);
        ledger.transfer_with_vesting(OWNER, ALICE, 1_000, 1, 25).unwrap();
        clock.advance(Duration::days(2));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let ledger = ledger.clone();
                thread::spawn(move || ledger.unlock(ALICE))
            })
            .collect();

        let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        let released: u64 = results.iter().filter_map(|r| r.as_ref().ok()).sum();
        let successes = results.iter().filter(|r| r.is_ok()).count();

        assert_eq!(successes, 1);
        assert_eq!(released, 500);
        assert!(results
            .iter()
            .filter_map(|r| r.as_ref().err())
            .all(|e| matches!(e, LedgerError::AlreadyReleased(_))));
        assert_eq!(ledger.read(|l| l.locked_of(&ALICE)), 500);
    }

    #[test]
    fn unlock_reports_remaining_of_same_lock() {
        let clock = ManualClock::new(t0());
        let ledger = shared(&clock);
        ledger.transfer_with_vesting(OWNER, ALICE, 1_000, 1, 40).unwrap();

        clock.advance(Duration::days(1));
        assert_eq!(ledger.unlock_with_remaining(ALICE).unwrap(), (400, 600));

        clock.advance(Duration::days(2));
        assert_eq!(ledger.unlock_with_remaining(ALICE).unwrap(), (600, 0));

        // The exhausted lock can be replaced; the earlier result is unaffected.
        ledger.transfer_with_vesting(OWNER, ALICE, 300, 1, 10).unwrap();
        assert_eq!(ledger.read(|l| l.locked_of(&ALICE)), 300);
        assert!(matches!(
            ledger.unlock_with_remaining(ALICE),
            Err(LedgerError::UnlockNotOpen(_))
        ));
    }

    #[test]
    fn snapshot_reads_under_lock() {
        let clock = ManualClock::new(t0());
        let ledger = shared(&clock);
        ledger.transfer(OWNER, ALICE, 400).unwrap();
        let snap = ledger.snapshot(&ALICE);
        assert_eq!(snap.balance, 400);
        assert_eq!(snap.withdrawable, 400);
        assert!(snap.lock.is_none());
    }
}
