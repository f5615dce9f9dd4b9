//! Concrete passkey job handlers and the queue drain processor.
//!
//! # Job kinds
//!
//! - `ADD_PASSKEY` - create a new login record carrying a WebAuthn credential
//! - `UPDATE_PASSKEY` - replace the credential on an existing record
//!
//! [`process_job_queue`] runs one full drain cycle: acquire the DB write
//! guard, read the encrypted queue, run each pending job for the active vault
//! through [`dispatch_job`], apply the retry policy, then rewrite or fully
//! clean up the queue file.

mod add_passkey;
mod credential;
mod dispatch;
mod processor;
mod update_passkey;

pub use add_passkey::{handle_add_passkey, AddPasskeyPayload};
pub use dispatch::dispatch_job;
pub use processor::process_job_queue;
pub use update_passkey::{handle_update_passkey, UpdatePasskeyPayload};
