//! API handlers.

pub mod actions;
pub mod credits;
pub mod health;
pub mod quota;
pub mod rewards;
pub mod wallet;
pub mod webhooks;
