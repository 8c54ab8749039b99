//! Core types for the augur credit entitlement engine.
//!
//! This crate provides the domain model shared by the store, engine and service crates:
//!
//! - **Identifiers**: `UserId`, `ActionId`, `EntryId`
//! - **Wallets**: `Wallet`, `Balance`, `Currency`
//! - **Ledger**: `LedgerEntry`, `EntryKind`
//! - **Quota**: `UsageDay`, `DailyUsageRecord`
//! - **Rewards**: `RewardKind`, `EarningRule`, `RewardSchedule`, `RewardGrant`
//! - **Actions**: `ActionType`, `ActionRecord`, `FundingMode`, `ActionStatus`
//! - **Entitlement**: `Decision`, `resolve`
//!
//! # Currencies
//!
//! Credits are the consumable currency debited per billable action. Diamonds are a
//! secondary currency earned through non-purchase rewards and convertible to credits at
//! [`DIAMOND_TO_CREDIT_RATE`]. Both are stored as `i64` and never go negative.

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod action;
pub mod entitlement;
pub mod error;
pub mod ids;
pub mod ledger;
pub mod quota;
pub mod reward;
pub mod wallet;

pub use action::{ActionCreated, ActionRecord, ActionStatus, ActionType, FundingMode};
pub use entitlement::{resolve, Decision, DenialReason};
pub use error::{BillingError, Result};
pub use ids::{ActionId, EntryId, IdError, UserId};
pub use ledger::{EntryKind, LedgerEntry};
pub use quota::{DailyUsageRecord, UsageDay};
pub use reward::{EarningRule, IdempotencyKey, RewardGrant, RewardKind, RewardSchedule};
pub use wallet::{
    Balance, BalanceError, Currency, Wallet, DEFAULT_WELCOME_CREDITS, DIAMOND_TO_CREDIT_RATE,
};
