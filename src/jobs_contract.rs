//! Client bindings for the jobs module, which the devnet exposes as a system
//! contract at a well-known address.
use crate::board::{
    BoardError, Inclusion, JobResultSubmission, JobSubmission, JobsBoard, RoleProfile, RoleType,
};
use async_trait::async_trait;
use ethers::{
    contract::{Contract, ContractCall, EthEvent, Lazy},
    core::abi::{parse_abi, Abi, Detokenize, RawLog},
    providers::Middleware,
    types::{Address, Bytes, Log, TransactionReceipt},
};
use std::{ops::Deref, sync::Arc};
use tracing::debug;

pub static JOBS_ABI: Lazy<Abi> = Lazy::new(|| {
    parse_abi(&[
        "function createProfile(uint8 roleType, bytes roleKey)",
        "function nextJobId() view returns (uint64)",
        "function submitJob(uint8 roleType, address[] participants, uint8 threshold, address permittedCaller, uint64 expiry)",
        "function submitJobResult(uint8 roleType, uint64 jobId, bytes key, bytes[] signatures)",
        "event ProfileCreated(address indexed owner, uint8 roleType)",
        "event JobSubmitted(uint64 indexed jobId, uint8 roleType, address submitter)",
        "event JobResultSubmitted(uint64 indexed jobId, uint8 roleType)",
    ])
    .expect("invalid abi")
});

#[derive(Clone, Debug, PartialEq, EthEvent)]
pub struct ProfileCreated {
    #[ethevent(indexed)]
    pub owner: Address,
    pub role_type: u8,
}

#[derive(Clone, Debug, PartialEq, EthEvent)]
pub struct JobSubmitted {
    #[ethevent(indexed)]
    pub job_id: u64,
    pub role_type: u8,
    pub submitter: Address,
}

#[derive(Clone, Debug, PartialEq, EthEvent)]
pub struct JobResultSubmitted {
    #[ethevent(indexed)]
    pub job_id: u64,
    pub role_type: u8,
}

/// A handle on the jobs module. The contract instance carries the middleware
/// it was created with, so every call is signed by that middleware's wallet.
#[derive(Clone)]
pub struct Jobs<M>(Contract<M>);

impl<M> Deref for Jobs<M> {
    type Target = Contract<M>;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl<M: Middleware> std::fmt::Debug for Jobs<M> {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        f.debug_tuple("Jobs").field(&self.address()).finish()
    }
}

impl<M: Middleware> Jobs<M> {
    pub fn new<T: Into<Address>>(address: T, client: Arc<M>) -> Self {
        Self(Contract::new(address.into(), JOBS_ABI.clone(), client))
    }

    /// Calls the module's `createProfile` function
    pub fn create_profile(&self, role_type: u8, role_key: Bytes) -> ContractCall<M, ()> {
        self.0
            .method("createProfile", (role_type, role_key))
            .expect("method not found (this should never happen)")
    }

    /// Calls the module's `nextJobId` function
    pub fn next_job_id(&self) -> ContractCall<M, u64> {
        self.0
            .method("nextJobId", ())
            .expect("method not found (this should never happen)")
    }

    /// Calls the module's `submitJob` function
    pub fn submit_job(
        &self,
        role_type: u8,
        participants: Vec<Address>,
        threshold: u8,
        permitted_caller: Address,
        expiry: u64,
    ) -> ContractCall<M, ()> {
        self.0
            .method(
                "submitJob",
                (role_type, participants, threshold, permitted_caller, expiry),
            )
            .expect("method not found (this should never happen)")
    }

    /// Calls the module's `submitJobResult` function
    pub fn submit_job_result(
        &self,
        role_type: u8,
        job_id: u64,
        key: Bytes,
        signatures: Vec<Bytes>,
    ) -> ContractCall<M, ()> {
        self.0
            .method("submitJobResult", (role_type, job_id, key, signatures))
            .expect("method not found (this should never happen)")
    }
}

/// Broadcasts `call` and blocks until its receipt is available.
async fn wait_mined<M, D>(call: ContractCall<M, D>) -> Result<TransactionReceipt, BoardError>
where
    M: Middleware,
    D: Detokenize,
{
    let pending = call
        .send()
        .await
        .map_err(|err| BoardError::Contract(err.to_string()))?;
    let tx_hash = *pending;
    debug!(%tx_hash, "transaction broadcast");

    pending
        .await
        .map_err(|err| BoardError::Provider(err.to_string()))?
        .ok_or(BoardError::NotMined)
}

fn role_name(tag: u8) -> String {
    RoleType::try_from(tag)
        .map(|role| role.to_string())
        .unwrap_or_else(|_| format!("unknown role {tag}"))
}

fn describe_log(log: &Log) -> String {
    let raw = RawLog::from(log.clone());
    if let Ok(event) = ProfileCreated::decode_log(&raw) {
        return format!(
            "ProfileCreated(owner: {:?}, role: {})",
            event.owner,
            role_name(event.role_type)
        );
    }
    if let Ok(event) = JobSubmitted::decode_log(&raw) {
        return format!(
            "JobSubmitted(jobId: {}, role: {}, submitter: {:?})",
            event.job_id,
            role_name(event.role_type),
            event.submitter
        );
    }
    if let Ok(event) = JobResultSubmitted::decode_log(&raw) {
        return format!(
            "JobResultSubmitted(jobId: {}, role: {})",
            event.job_id,
            role_name(event.role_type)
        );
    }
    format!("unrecognised log from {:?}", log.address)
}

fn inclusion(receipt: &TransactionReceipt) -> Result<Inclusion, BoardError> {
    let block_hash = receipt.block_hash.ok_or(BoardError::NotMined)?;
    Ok(Inclusion {
        block_hash,
        events: receipt.logs.iter().map(describe_log).collect(),
    })
}

#[async_trait(?Send)]
impl<M: Middleware + 'static> JobsBoard for Jobs<M> {
    type Error = BoardError;

    async fn create_profile(&mut self, profile: RoleProfile) -> Result<Inclusion, BoardError> {
        let call = Jobs::create_profile(self, profile.role.as_u8(), Bytes::from(profile.key));
        let receipt = wait_mined(call).await?;
        inclusion(&receipt)
    }

    async fn next_job_id(&self) -> Result<u64, BoardError> {
        self.next_job_id()
            .call()
            .await
            .map_err(|err| BoardError::Contract(err.to_string()))
    }

    async fn submit_job(&mut self, job: JobSubmission) -> Result<(u64, Inclusion), BoardError> {
        let call = Jobs::submit_job(
            self,
            job.role.as_u8(),
            job.participants,
            job.threshold,
            job.permitted_caller,
            job.expiry,
        );
        let receipt = wait_mined(call).await?;

        // the chain assigns the id; read it back from the emitted event
        let assigned = receipt
            .logs
            .iter()
            .find_map(|log| JobSubmitted::decode_log(&RawLog::from(log.clone())).ok())
            .map(|event| event.job_id)
            .ok_or(BoardError::MissingEvent("JobSubmitted"))?;

        Ok((assigned, inclusion(&receipt)?))
    }

    async fn submit_job_result(
        &mut self,
        result: JobResultSubmission,
    ) -> Result<Inclusion, BoardError> {
        let call = Jobs::submit_job_result(
            self,
            result.role.as_u8(),
            result.job_id,
            Bytes::from(result.key),
            result.signatures.into_iter().map(Bytes::from).collect(),
        );
        let receipt = wait_mined(call).await?;
        inclusion(&receipt)
    }
}
