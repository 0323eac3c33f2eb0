//! # Vesting Ledger
//!
//! The facade that ties the account ledger, the vesting registry, the unlock
//! engine, and the transfer guard together. Each public operation is one
//! atomic state transition: every check runs before the first mutation, so a
//! rejected call leaves balances, locks, and notifications untouched.
//!
//! Time is always an explicit `now` argument. Hosts that want a wall clock
//! wrap the ledger in a [`SharedLedger`](crate::shared::SharedLedger).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};

use crate::account::{AccountLedger, BalanceBook};
use crate::address::Address;
use crate::config::{ConfigError, LedgerConfig, TokenMetadata};
use crate::error::{ArithmeticError, LedgerError, LedgerResult};
use crate::events::{NoopNotifier, TransferEvent, TransferNotifier};
use crate::guard;
use crate::vesting::{engine, validate_schedule, VestingLock, VestingRegistry};

/// Point-in-time view of one account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountSnapshot {
    /// The account.
    pub address: Address,
    /// Raw balance, locked funds included.
    pub balance: u64,
    /// Balance that may leave the account right now.
    pub withdrawable: u64,
    /// Vesting lock, if one was ever created.
    pub lock: Option<VestingLock>,
    /// Amount an unlock at snapshot time would release.
    pub releasable_now: u64,
}

/// Token ledger with vesting locks.
pub struct VestingLedger<A = BalanceBook, N = NoopNotifier> {
    metadata: TokenMetadata,
    accounts: A,
    registry: VestingRegistry,
    notifier: N,
}

impl<N: TransferNotifier> VestingLedger<BalanceBook, N> {
    /// Builds a ledger from a validated config, minting the genesis
    /// allocation into a fresh [`BalanceBook`].
    pub fn from_config(config: &LedgerConfig, notifier: N) -> Result<Self, ConfigError> {
        let supply = config.validate()?;

        let mut book = BalanceBook::new();
        for alloc in &config.genesis {
            book.mint(&alloc.address, alloc.amount)
                .map_err(|_| ConfigError::SupplyOverflow)?;
        }

        info!(
            symbol = %config.token.symbol,
            accounts = config.genesis.len(),
            supply,
            "ledger initialized from genesis"
        );
        Ok(Self::new(config.token.clone(), book, notifier))
    }
}

impl<A: AccountLedger, N: TransferNotifier> VestingLedger<A, N> {
    /// Wraps an existing account ledger. The registry starts empty.
    pub fn new(metadata: TokenMetadata, accounts: A, notifier: N) -> Self {
        Self {
            metadata,
            accounts,
            registry: VestingRegistry::new(),
            notifier,
        }
    }

    // -----------------------------------------------------------------------
    // Operations
    // -----------------------------------------------------------------------

    /// Moves `amount` of unrestricted funds from `sender` to `target`.
    ///
    /// # Errors
    ///
    /// The Transfer Guard errors ([`LedgerError::InvalidTarget`],
    /// [`LedgerError::InsufficientBalance`],
    /// [`LedgerError::LockedFundsExceeded`]) and
    /// [`LedgerError::Arithmetic`] if the target balance would overflow.
    pub fn transfer(
        &mut self,
        sender: Address,
        target: Address,
        amount: u64,
        now: DateTime<Utc>,
    ) -> LedgerResult<TransferEvent> {
        self.authorize(&sender, &target, amount)?;
        self.move_funds(&sender, &target, amount)?;

        let event = TransferEvent::new(sender, target, amount, false, now);
        debug!(from = %sender, to = %target, amount, "transfer applied");
        self.publish(&event);
        Ok(event)
    }

    /// Moves `amount` from `sender` to `beneficiary` and restricts it under
    /// a new vesting lock.
    ///
    /// The funds land in the beneficiary's balance immediately; the lock
    /// only limits what the beneficiary can move out. One period lasts
    /// `duration_days` days and releases `percent_per_period` percent of
    /// `amount`.
    ///
    /// # Errors
    ///
    /// [`LedgerError::InvalidSchedule`], [`LedgerError::InvalidTarget`],
    /// [`LedgerError::DuplicateSchedule`], then the Transfer Guard errors
    /// for the sender's side of the movement.
    pub fn transfer_with_vesting(
        &mut self,
        sender: Address,
        beneficiary: Address,
        amount: u64,
        duration_days: u32,
        percent_per_period: u8,
        now: DateTime<Utc>,
    ) -> LedgerResult<VestingLock> {
        validate_schedule(amount, duration_days, percent_per_period)?;
        self.registry.ensure_can_lock(&beneficiary)?;
        self.authorize(&sender, &beneficiary, amount)?;
        self.move_funds(&sender, &beneficiary, amount)?;

        // Every condition create_lock checks was verified above.
        let lock = self.registry.create_lock(
            beneficiary,
            amount,
            duration_days,
            percent_per_period,
            now,
        )?;

        info!(
            from = %sender,
            beneficiary = %beneficiary,
            amount,
            duration_days,
            percent_per_period,
            "vesting lock created"
        );
        self.publish(&TransferEvent::new(sender, beneficiary, amount, true, now));
        Ok(lock)
    }

    /// Lifts the restriction on whatever `beneficiary` became entitled to
    /// since the last release. Returns the amount released. No funds move.
    ///
    /// # Errors
    ///
    /// [`LedgerError::InvalidTarget`] for the null address, then
    /// [`LedgerError::UnlockNotOpen`], [`LedgerError::FullyUnlocked`], or
    /// [`LedgerError::AlreadyReleased`].
    pub fn unlock(&mut self, beneficiary: Address, now: DateTime<Utc>) -> LedgerResult<u64> {
        if beneficiary.is_zero() {
            return Err(LedgerError::InvalidTarget(
                "cannot unlock the null address".into(),
            ));
        }

        let released = self.registry.apply_release(&beneficiary, now)?;
        info!(
            beneficiary = %beneficiary,
            released,
            remaining = self.registry.locked_amount(&beneficiary),
            "vesting tranche released"
        );
        Ok(released)
    }

    /// Current lock record of `beneficiary`, if any.
    pub fn lock_of(&self, beneficiary: &Address) -> Option<&VestingLock> {
        self.registry.get_lock(beneficiary)
    }

    // -----------------------------------------------------------------------
    // Queries
    // -----------------------------------------------------------------------

    /// Raw balance of `address`.
    pub fn balance_of(&self, address: &Address) -> u64 {
        self.accounts.balance_of(address)
    }

    /// Amount still restricted on `address`.
    pub fn locked_of(&self, address: &Address) -> u64 {
        self.registry.locked_amount(address)
    }

    /// Raw balance minus remaining lock.
    pub fn withdrawable_of(&self, address: &Address) -> u64 {
        guard::withdrawable(self.balance_of(address), self.locked_of(address))
    }

    /// Amount an unlock at `now` would release; zero when none would succeed.
    pub fn releasable_of(&self, address: &Address, now: DateTime<Utc>) -> u64 {
        self.registry
            .get_lock(address)
            .and_then(|lock| engine::release(lock, now).ok())
            .map(|outcome| outcome.released)
            .unwrap_or(0)
    }

    /// Balance, withdrawable amount and lock of `address` at `now`.
    pub fn snapshot(&self, address: &Address, now: DateTime<Utc>) -> AccountSnapshot {
        AccountSnapshot {
            address: *address,
            balance: self.balance_of(address),
            withdrawable: self.withdrawable_of(address),
            lock: self.lock_of(address).cloned(),
            releasable_now: self.releasable_of(address, now),
        }
    }

    /// Total supply reported by the account ledger.
    pub fn total_supply(&self) -> u64 {
        self.accounts.total_supply()
    }

    /// Sum of restricted funds across all accounts.
    pub fn total_locked(&self) -> u64 {
        self.registry.total_locked()
    }

    /// Number of locks still restricting funds.
    pub fn active_locks(&self) -> usize {
        self.registry.active_count()
    }

    /// Token metadata.
    pub fn metadata(&self) -> &TokenMetadata {
        &self.metadata
    }

    /// Read access to the underlying account ledger.
    pub fn accounts(&self) -> &A {
        &self.accounts
    }

    /// Read access to the vesting registry.
    pub fn registry(&self) -> &VestingRegistry {
        &self.registry
    }

    // -----------------------------------------------------------------------
    // Internals
    // -----------------------------------------------------------------------

    fn authorize(&self, sender: &Address, target: &Address, amount: u64) -> LedgerResult<()> {
        if !self.accounts.is_valid_target(target) {
            return Err(LedgerError::InvalidTarget(format!(
                "{} cannot receive funds",
                target
            )));
        }
        guard::authorize_debit(
            sender,
            target,
            amount,
            self.accounts.balance_of(sender),
            self.registry.locked_amount(sender),
        )
    }

    /// Debits `from` and credits `to`. Checks the credit side first so a
    /// failure never leaves a half-applied movement.
    fn move_funds(&mut self, from: &Address, to: &Address, amount: u64) -> LedgerResult<()> {
        let target_balance = self.accounts.balance_of(to);
        if target_balance.checked_add(amount).is_none() {
            return Err(ArithmeticError::Overflow {
                current: target_balance,
                delta: amount,
            }
            .into());
        }

        self.accounts.debit(from, amount)?;
        if let Err(e) = self.accounts.credit(to, amount) {
            if let Err(restore) = self.accounts.credit(from, amount) {
                error!(
                    from = %from,
                    amount,
                    error = %restore,
                    "failed to restore debited funds"
                );
                return Err(restore.into());
            }
            return Err(e.into());
        }
        Ok(())
    }

    fn publish(&self, event: &TransferEvent) {
        if let Err(e) = self.notifier.notify_transfer(event) {
            warn!(event_id = %event.id, error = %e, "transfer notification dropped");
        }
    }
}
