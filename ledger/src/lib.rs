// Copyright (c) 2026 ALAS Technology. MIT License.
// See LICENSE for details.

//! # Vesting Ledger
//!
//! A fungible-token ledger where a sender can transfer funds under a
//! *vesting lock*: the recipient owns the balance immediately, but may only
//! move out the part that time-gated releases have unlocked.
//!
//! ## Architecture
//!
//! ```text
//! address.rs  — 20-byte account addresses, hex on the wire
//! account.rs  — raw balance bookkeeping (AccountLedger, BalanceBook)
//! vesting/    — lock registry and the unlock engine
//! guard.rs    — withdrawable balance and debit authorization
//! ledger.rs   — VestingLedger: the atomic public operations
//! shared.rs   — SharedLedger: serialized access with an injected clock
//! events.rs   — transfer notifications
//! config.rs   — constants, token metadata, genesis allocation
//! error.rs    — LedgerError
//! ```
//!
//! ## Design Principles
//!
//! 1. Checked arithmetic on every balance change. Overflow is its own error
//!    variant, never a silent wrap.
//! 2. Time is an explicit argument. The core never reads a clock.
//! 3. Rejected operations change nothing.

pub mod account;
pub mod address;
pub mod config;
pub mod error;
pub mod events;
pub mod guard;
pub mod ledger;
pub mod shared;
pub mod vesting;

pub use account::{Account, AccountLedger, BalanceBook};
pub use address::{Address, AddressError};
pub use config::{ConfigError, GenesisAllocation, LedgerConfig, TokenMetadata};
pub use error::{ArithmeticError, LedgerError, LedgerResult};
pub use events::{MemoryNotifier, NoopNotifier, NotifyError, TransferEvent, TransferNotifier};
pub use ledger::{AccountSnapshot, VestingLedger};
pub use shared::{Clock, ManualClock, SharedLedger, SystemClock};
pub use vesting::{VestingLock, VestingRegistry};
