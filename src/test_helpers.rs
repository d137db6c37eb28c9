use crate::{
    board::{
        BoardError, Inclusion, JobResultSubmission, JobSubmission, JobsBoard, RoleProfile,
    },
    keys,
};
use async_trait::async_trait;
use ethers::types::{Address, H256};
use std::{cell::RefCell, collections::HashMap, rc::Rc};

/// An in-memory jobs board used for testing. Two handles over one shared
/// chain state stand in for the two signing identities, and the state
/// enforces the same rules the module does on chain.
pub struct InMemoryBoard {
    chain: Rc<RefCell<ChainState>>,
    signer: Address,
}

#[derive(Default)]
struct ChainState {
    height: u64,
    next_job_id: u64,
    profiles: HashMap<Address, RoleProfile>,
    jobs: HashMap<u64, JobSubmission>,
    results: HashMap<u64, JobResultSubmission>,
}

impl ChainState {
    fn mine(&mut self, events: Vec<String>) -> Inclusion {
        self.height += 1;
        Inclusion {
            block_hash: H256::from_low_u64_be(self.height),
            events,
        }
    }
}

impl InMemoryBoard {
    /// Creates two handles, one per signer, over a fresh chain state.
    pub fn pair(alice: Address, bob: Address) -> (Self, Self) {
        let chain = Rc::new(RefCell::new(ChainState::default()));
        (
            Self {
                chain: Rc::clone(&chain),
                signer: alice,
            },
            Self { chain, signer: bob },
        )
    }

    pub fn profile(&self, owner: Address) -> Option<RoleProfile> {
        self.chain.borrow().profiles.get(&owner).cloned()
    }

    pub fn job(&self, id: u64) -> Option<JobSubmission> {
        self.chain.borrow().jobs.get(&id).cloned()
    }

    pub fn result(&self, id: u64) -> Option<JobResultSubmission> {
        self.chain.borrow().results.get(&id).cloned()
    }
}

#[async_trait(?Send)]
impl JobsBoard for InMemoryBoard {
    type Error = BoardError;

    async fn create_profile(&mut self, profile: RoleProfile) -> Result<Inclusion, BoardError> {
        if profile.key.len() != keys::PUBLIC_KEY_LEN {
            return Err(BoardError::Rejected(format!(
                "role key must be {} bytes",
                keys::PUBLIC_KEY_LEN
            )));
        }

        let mut chain = self.chain.borrow_mut();
        let event = format!(
            "ProfileCreated(owner: {:?}, role: {})",
            self.signer, profile.role
        );
        chain.profiles.insert(self.signer, profile);
        Ok(chain.mine(vec![event]))
    }

    async fn next_job_id(&self) -> Result<u64, BoardError> {
        Ok(self.chain.borrow().next_job_id)
    }

    async fn submit_job(&mut self, job: JobSubmission) -> Result<(u64, Inclusion), BoardError> {
        let mut chain = self.chain.borrow_mut();

        if job.participants.is_empty() || usize::from(job.threshold) > job.participants.len() {
            return Err(BoardError::Rejected(format!(
                "invalid threshold {} for {} participants",
                job.threshold,
                job.participants.len()
            )));
        }
        for participant in &job.participants {
            match chain.profiles.get(participant) {
                Some(profile) if profile.role == job.role => {}
                _ => {
                    return Err(BoardError::Rejected(format!(
                        "{participant:?} has no {} profile",
                        job.role
                    )))
                }
            }
        }

        let id = chain.next_job_id;
        chain.next_job_id += 1;
        let event = format!(
            "JobSubmitted(jobId: {id}, role: {}, submitter: {:?})",
            job.role, self.signer
        );
        chain.jobs.insert(id, job);
        Ok((id, chain.mine(vec![event])))
    }

    async fn submit_job_result(
        &mut self,
        result: JobResultSubmission,
    ) -> Result<Inclusion, BoardError> {
        let mut chain = self.chain.borrow_mut();

        let job = chain
            .jobs
            .get(&result.job_id)
            .ok_or_else(|| BoardError::Rejected(format!("unknown job id {}", result.job_id)))?
            .clone();

        if job.permitted_caller != Address::zero() && job.permitted_caller != self.signer {
            return Err(BoardError::Rejected(format!(
                "{:?} is not permitted to submit results for job {}",
                self.signer, result.job_id
            )));
        }
        if result.role != job.role {
            return Err(BoardError::Rejected(format!(
                "result role {} does not match job role {}",
                result.role, job.role
            )));
        }
        if result.signatures.len() != job.participants.len() {
            return Err(BoardError::Rejected(format!(
                "expected {} signatures, got {}",
                job.participants.len(),
                result.signatures.len()
            )));
        }

        let digest = keys::key_digest(&result.key);
        for (participant, signature) in job.participants.iter().zip(&result.signatures) {
            let profile = chain
                .profiles
                .get(participant)
                .expect("participants were checked when the job was submitted");
            let public: [u8; keys::PUBLIC_KEY_LEN] = profile
                .key
                .as_slice()
                .try_into()
                .expect("profile keys were checked when they were created");
            keys::verify_with_recovery(&public, &digest, signature).map_err(|err| {
                BoardError::Rejected(format!("bad signature from {participant:?}: {err}"))
            })?;
        }

        let event = format!(
            "JobResultSubmitted(jobId: {}, role: {})",
            result.job_id, result.role
        );
        chain.results.insert(result.job_id, result);
        Ok(chain.mine(vec![event]))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::RoleType;
    use crate::keys::SigningPair;

    fn addresses() -> (Address, Address) {
        (Address::from_low_u64_be(1), Address::from_low_u64_be(2))
    }

    fn profile_for(seed: [u8; keys::SEED_LEN]) -> RoleProfile {
        RoleProfile {
            role: RoleType::ThresholdEd25519,
            key: SigningPair::from_seed(seed).public().to_vec(),
        }
    }

    fn job_between(alice: Address, bob: Address) -> JobSubmission {
        JobSubmission {
            role: RoleType::ThresholdEd25519,
            participants: vec![alice, bob],
            threshold: 1,
            permitted_caller: alice,
            expiry: 100,
        }
    }

    #[tokio::test]
    async fn jobs_need_registered_participants() {
        let (alice, bob) = addresses();
        let (mut alice_board, _) = InMemoryBoard::pair(alice, bob);

        let err = alice_board.submit_job(job_between(alice, bob)).await.unwrap_err();
        assert!(matches!(err, BoardError::Rejected(_)));
    }

    #[tokio::test]
    async fn only_the_permitted_caller_may_submit_results() {
        let (alice, bob) = addresses();
        let (mut alice_board, mut bob_board) = InMemoryBoard::pair(alice, bob);

        alice_board
            .create_profile(profile_for(keys::ALICE_ROLE_SEED))
            .await
            .unwrap();
        bob_board
            .create_profile(profile_for(keys::BOB_ROLE_SEED))
            .await
            .unwrap();
        let (job_id, _) = alice_board.submit_job(job_between(alice, bob)).await.unwrap();

        let output = SigningPair::from_seed(keys::DKG_OUTPUT_SEED);
        let digest = keys::key_digest(&output.public());
        let result = JobResultSubmission {
            role: RoleType::ThresholdEd25519,
            job_id,
            key: output.public().to_vec(),
            signatures: vec![
                SigningPair::from_seed(keys::ALICE_ROLE_SEED)
                    .sign_with_recovery(&digest)
                    .to_vec(),
                SigningPair::from_seed(keys::BOB_ROLE_SEED)
                    .sign_with_recovery(&digest)
                    .to_vec(),
            ],
        };

        let err = bob_board.submit_job_result(result.clone()).await.unwrap_err();
        assert!(matches!(err, BoardError::Rejected(_)));

        alice_board.submit_job_result(result).await.unwrap();
        assert!(alice_board.result(job_id).is_some());
    }

    #[tokio::test]
    async fn forged_signatures_are_rejected() {
        let (alice, bob) = addresses();
        let (mut alice_board, mut bob_board) = InMemoryBoard::pair(alice, bob);

        alice_board
            .create_profile(profile_for(keys::ALICE_ROLE_SEED))
            .await
            .unwrap();
        bob_board
            .create_profile(profile_for(keys::BOB_ROLE_SEED))
            .await
            .unwrap();
        let (job_id, _) = alice_board.submit_job(job_between(alice, bob)).await.unwrap();

        let output = SigningPair::from_seed(keys::DKG_OUTPUT_SEED);
        let digest = keys::key_digest(&output.public());
        // Bob's slot signed with Alice's key
        let alice_sig = SigningPair::from_seed(keys::ALICE_ROLE_SEED)
            .sign_with_recovery(&digest)
            .to_vec();
        let result = JobResultSubmission {
            role: RoleType::ThresholdEd25519,
            job_id,
            key: output.public().to_vec(),
            signatures: vec![alice_sig.clone(), alice_sig],
        };

        let err = alice_board.submit_job_result(result).await.unwrap_err();
        assert!(matches!(err, BoardError::Rejected(_)));
        assert!(alice_board.result(job_id).is_none());
    }

    #[tokio::test]
    async fn missing_signatures_are_rejected() {
        let (alice, bob) = addresses();
        let (mut alice_board, mut bob_board) = InMemoryBoard::pair(alice, bob);

        alice_board
            .create_profile(profile_for(keys::ALICE_ROLE_SEED))
            .await
            .unwrap();
        bob_board
            .create_profile(profile_for(keys::BOB_ROLE_SEED))
            .await
            .unwrap();
        let (job_id, _) = alice_board.submit_job(job_between(alice, bob)).await.unwrap();

        let output = SigningPair::from_seed(keys::DKG_OUTPUT_SEED);
        let digest = keys::key_digest(&output.public());
        let result = JobResultSubmission {
            role: RoleType::ThresholdEd25519,
            job_id,
            key: output.public().to_vec(),
            signatures: vec![SigningPair::from_seed(keys::ALICE_ROLE_SEED)
                .sign_with_recovery(&digest)
                .to_vec()],
        };

        let err = alice_board.submit_job_result(result).await.unwrap_err();
        assert!(matches!(err, BoardError::Rejected(_)));
    }
}
