//! Augur client SDK.
//!
//! Used by the app backend on behalf of signed-in users, and by the fulfillment worker to
//! report action outcomes.
//!
//! # Example
//!
//! ```no_run
//! use augur_client::{AugurClient, ClientError};
//!
//! # async fn example(user_jwt: &str) -> Result<(), ClientError> {
//! let client = AugurClient::new("http://augur.internal:8080")?;
//!
//! match client.submit_action(user_jwt, "fortune").await {
//!     Ok(submission) => println!("{} funded {:?}", submission.action_id, submission.funding_mode),
//!     Err(ClientError::InsufficientCredits { balance, required }) => {
//!         println!("need {required} credits, have {balance}");
//!     }
//!     Err(e) => return Err(e),
//! }
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

mod client;
mod error;
mod types;

pub use client::{AugurClient, ClientOptions};
pub use error::ClientError;
pub use types::*;
