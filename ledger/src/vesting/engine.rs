//! # Unlock Engine
//!
//! Pure release computation over a [`VestingLock`] and a timestamp.
//!
//! Entitlement is cumulative from the lock's start time:
//!
//! ```text
//! elapsed_periods = floor((now - start_time) / period_length_seconds)
//! entitled        = min(original, original * percent * elapsed_periods / 100)
//! releasable      = entitled - (original - remaining)
//! ```
//!
//! Subtracting what was already released (instead of releasing one tranche
//! per call) means a caller who skips several periods catches up in a single
//! unlock, and a repeated call in the same period finds nothing new.

use chrono::{DateTime, Utc};

use super::registry::VestingLock;
use crate::config::MAX_RELEASE_PERCENT;
use crate::error::{LedgerError, LedgerResult};

/// Result of a successful release.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReleaseOutcome {
    /// Amount whose restriction was lifted.
    pub released: u64,
    /// Lock record after the release.
    pub lock: VestingLock,
}

/// Whole periods elapsed since `start_time`, or `None` if `now` is earlier.
pub fn elapsed_periods(lock: &VestingLock, now: DateTime<Utc>) -> Option<u64> {
    let elapsed = now.signed_duration_since(lock.start_time).num_seconds();
    let elapsed = u64::try_from(elapsed).ok()?;
    // Validated locks never have a zero period.
    Some(elapsed / lock.period_length_seconds.max(1))
}

/// Cumulative amount the beneficiary is owed by `now`, capped at the
/// original lock.
pub fn entitlement(lock: &VestingLock, now: DateTime<Utc>) -> u64 {
    let periods = match elapsed_periods(lock, now) {
        Some(p) => p,
        None => return 0,
    };

    // With percent >= 1, 100 periods already cover the whole lock, so the
    // product below fits comfortably in u128.
    let periods = periods.min(u64::from(MAX_RELEASE_PERCENT));
    let entitled = u128::from(lock.locked_token_original)
        * u128::from(lock.release_percent_per_period)
        * u128::from(periods)
        / u128::from(MAX_RELEASE_PERCENT);

    u64::try_from(entitled)
        .unwrap_or(u64::MAX)
        .min(lock.locked_token_original)
}

/// Amount a release at `now` would lift, without validating gating rules.
pub fn releasable(lock: &VestingLock, now: DateTime<Utc>) -> u64 {
    entitlement(lock, now).saturating_sub(lock.released_amount())
}

/// Computes a release at `now`.
///
/// # Errors
///
/// - [`LedgerError::UnlockNotOpen`] before the first period closes.
/// - [`LedgerError::FullyUnlocked`] once nothing remains restricted.
/// - [`LedgerError::AlreadyReleased`] when no new entitlement accrued since
///   the last release.
pub fn release(lock: &VestingLock, now: DateTime<Utc>) -> LedgerResult<ReleaseOutcome> {
    let beneficiary = lock.beneficiary.to_string();

    match elapsed_periods(lock, now) {
        Some(periods) if periods >= 1 => {}
        _ => return Err(LedgerError::UnlockNotOpen(beneficiary)),
    }

    if lock.is_exhausted() {
        return Err(LedgerError::FullyUnlocked(beneficiary));
    }

    let amount = releasable(lock, now);
    if amount == 0 {
        return Err(LedgerError::AlreadyReleased(beneficiary));
    }

    let mut updated = lock.clone();
    updated.remaining_locked_token -= amount;
    updated.last_release_time = now;

    Ok(ReleaseOutcome {
        released: amount,
        lock: updated,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::address::Address;
    use crate::config::SECONDS_PER_DAY;
    use chrono::{Duration, TimeZone};

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap()
    }

    fn lock(amount: u64, days: u64, percent: u8) -> VestingLock {
        VestingLock {
            beneficiary: Address::from_low_u8(3),
            locked_token_original: amount,
            remaining_locked_token: amount,
            period_length_seconds: days * SECONDS_PER_DAY,
            release_percent_per_period: percent,
            start_time: t0(),
            last_release_time: t0(),
        }
    }

    #[test]
    fn before_first_period_is_not_open() {
        let l = lock(100, 30, 10);
        let err = release(&l, t0() + Duration::days(1)).unwrap_err();
        assert!(matches!(err, LedgerError::UnlockNotOpen(_)));

        // One second short of the boundary.
        let err = release(&l, t0() + Duration::days(30) - Duration::seconds(1)).unwrap_err();
        assert!(matches!(err, LedgerError::UnlockNotOpen(_)));
    }

    #[test]
    fn clock_before_start_is_not_open() {
        let l = lock(100, 1, 50);
        assert_eq!(elapsed_periods(&l, t0() - Duration::days(3)), None);
        assert!(matches!(
            release(&l, t0() - Duration::days(3)),
            Err(LedgerError::UnlockNotOpen(_))
        ));
    }

    #[test]
    fn one_period_releases_one_tranche() {
        let l = lock(100, 2, 50);
        let now = t0() + Duration::days(3);
        let outcome = release(&l, now).unwrap();
        assert_eq!(outcome.released, 50);
        assert_eq!(outcome.lock.remaining_locked_token, 50);
        assert_eq!(outcome.lock.last_release_time, now);
        assert_eq!(outcome.lock.start_time, t0());
    }

    #[test]
    fn boundary_is_inclusive() {
        let l = lock(1_000, 7, 25);
        let outcome = release(&l, t0() + Duration::days(7)).unwrap();
        assert_eq!(outcome.released, 250);
    }

    #[test]
    fn second_call_in_same_period_finds_nothing() {
        let l = lock(100, 2, 50);
        let now = t0() + Duration::days(3);
        let first = release(&l, now).unwrap();
        let err = release(&first.lock, now).unwrap_err();
        assert!(matches!(err, LedgerError::AlreadyReleased(_)));
    }

    #[test]
    fn skipped_periods_are_caught_up() {
        let l = lock(1_000, 10, 20);
        let first = release(&l, t0() + Duration::days(10)).unwrap();
        assert_eq!(first.released, 200);

        // Three more periods pass without an unlock.
        let second = release(&first.lock, t0() + Duration::days(40)).unwrap();
        assert_eq!(second.released, 600);
        assert_eq!(second.lock.remaining_locked_token, 200);
    }

    #[test]
    fn entitlement_caps_at_original() {
        let l = lock(90, 1, 40);
        assert_eq!(entitlement(&l, t0() + Duration::days(2)), 72);
        assert_eq!(entitlement(&l, t0() + Duration::days(3)), 90);
        assert_eq!(entitlement(&l, t0() + Duration::days(10_000)), 90);

        let outcome = release(&l, t0() + Duration::days(5)).unwrap();
        assert_eq!(outcome.released, 90);
        assert!(outcome.lock.is_exhausted());
    }

    #[test]
    fn exhausted_lock_is_fully_unlocked() {
        let l = lock(10, 1, 100);
        let done = release(&l, t0() + Duration::days(1)).unwrap();
        let err = release(&done.lock, t0() + Duration::days(50)).unwrap_err();
        assert!(matches!(err, LedgerError::FullyUnlocked(_)));
    }

    #[test]
    fn rounding_floors_partial_units() {
        // 7 * 33% = 2.31 -> 2 after one period.
        let l = lock(7, 1, 33);
        assert_eq!(releasable(&l, t0() + Duration::days(1)), 2);
        assert_eq!(releasable(&l, t0() + Duration::days(2)), 4);
        assert_eq!(releasable(&l, t0() + Duration::days(4)), 7);
    }

    #[test]
    fn large_amounts_do_not_overflow() {
        let l = lock(u64::MAX, 1, 100);
        assert_eq!(entitlement(&l, t0() + Duration::days(365)), u64::MAX);
        let outcome = release(&l, t0() + Duration::days(365)).unwrap();
        assert_eq!(outcome.released, u64::MAX);
    }
}
