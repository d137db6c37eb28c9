//! # jobs-cli
//!
//! Exercises a development chain's jobs module end-to-end: registers a role
//! profile for two well-known dev accounts, submits a two-party threshold
//! keygen job, derives the resulting key locally, authenticates it with both
//! role keys and submits the job result.
//!
//! Every transaction is signed, broadcast and awaited strictly in sequence,
//! which is what a manual test run against a devnet wants.

/// The demo flow: wiring up a node connection and running the sequence
pub mod actions;

/// Board trait and domain types for job lifecycle submissions
pub mod board;

/// Client bindings for the on-chain jobs module
pub mod jobs_contract;

/// Role and keygen-output key pairs
pub mod keys;

/// Command line options
pub mod opts;

#[cfg(test)]
mod test_helpers;
