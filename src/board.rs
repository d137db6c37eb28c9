/// # Jobs board
///
/// The board is where the job lifecycle transactions are published: role
/// profiles, job requests and job results.
use async_trait::async_trait;
use ethers::types::{Address, H256};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Threshold scheme a profile or job refers to, as tagged on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RoleType {
    ThresholdEd25519,
    ThresholdBls12381,
}

impl RoleType {
    /// Wire tag used by the jobs module.
    pub const fn as_u8(self) -> u8 {
        match self {
            RoleType::ThresholdEd25519 => 1,
            RoleType::ThresholdBls12381 => 2,
        }
    }
}

impl TryFrom<u8> for RoleType {
    type Error = BoardError;

    fn try_from(tag: u8) -> Result<Self, BoardError> {
        match tag {
            1 => Ok(RoleType::ThresholdEd25519),
            2 => Ok(RoleType::ThresholdBls12381),
            other => Err(BoardError::UnknownRole(other)),
        }
    }
}

impl fmt::Display for RoleType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RoleType::ThresholdEd25519 => write!(f, "threshold-ed25519"),
            RoleType::ThresholdBls12381 => write!(f, "threshold-bls12381"),
        }
    }
}

/// A role key registered on chain for the submitting account.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoleProfile {
    pub role: RoleType,
    pub key: Vec<u8>,
}

/// A request for a distributed keygen between `participants`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobSubmission {
    pub role: RoleType,
    pub participants: Vec<Address>,
    pub threshold: u8,
    /// Account allowed to submit the result. The zero address leaves the
    /// job open to anyone.
    pub permitted_caller: Address,
    /// Block height after which the job lapses.
    pub expiry: u64,
}

/// The artifact produced by a job: the generated public key plus one role
/// signature per participant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobResultSubmission {
    pub role: RoleType,
    pub job_id: u64,
    pub key: Vec<u8>,
    pub signatures: Vec<Vec<u8>>,
}

/// What the chain reported once a submission landed in a block.
#[derive(Debug, Clone, PartialEq)]
pub struct Inclusion {
    pub block_hash: H256,
    pub events: Vec<String>,
}

#[derive(Debug, Error)]
pub enum BoardError {
    /// The transaction was broadcast but never reported mined.
    #[error("transaction was not mined")]
    NotMined,

    /// Building or broadcasting the transaction failed.
    #[error("contract call failed: {0}")]
    Contract(String),

    /// The node connection failed while awaiting inclusion.
    #[error("provider error: {0}")]
    Provider(String),

    /// A transaction was mined but the event it must emit is missing.
    #[error("expected {0} event was not emitted")]
    MissingEvent(&'static str),

    /// The module rejected the submission.
    #[error("submission rejected: {0}")]
    Rejected(String),

    #[error("unknown role type tag {0}")]
    UnknownRole(u8),
}

/// Writing side of the jobs module. An implementation is bound to a single
/// signing identity; each call signs one transaction, broadcasts it and
/// blocks until the chain reports it included.
#[async_trait(?Send)]
pub trait JobsBoard {
    type Error;

    /// Registers the caller's role key.
    async fn create_profile(&mut self, profile: RoleProfile) -> Result<Inclusion, Self::Error>;

    /// The id the chain will assign to the next submitted job.
    async fn next_job_id(&self) -> Result<u64, Self::Error>;

    /// Requests a keygen job. Returns the assigned job id along with the
    /// inclusion report.
    async fn submit_job(&mut self, job: JobSubmission) -> Result<(u64, Inclusion), Self::Error>;

    /// Publishes a job's result.
    async fn submit_job_result(
        &mut self,
        result: JobResultSubmission,
    ) -> Result<Inclusion, Self::Error>;
}
