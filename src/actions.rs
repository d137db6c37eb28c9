use crate::{
    board::{Inclusion, JobResultSubmission, JobSubmission, JobsBoard, RoleProfile, RoleType},
    jobs_contract::Jobs,
    keys::{self, SigningPair},
    opts::{KeygenOpts, RunOpts},
};
use anyhow::{ensure, Context, Result};
use ethers::{
    middleware::SignerMiddleware,
    providers::{Middleware, Provider, Ws},
    signers::{coins_bip39::English, LocalWallet, MnemonicBuilder, Signer},
    types::Address,
};
use rand::RngCore;
use std::{fs::File, sync::Arc};
use tracing::info;

/// The standard mnemonic whose accounts come pre-funded on anvil and hardhat
/// devnets. Alice is account 0, Bob is account 1.
pub const DEV_MNEMONIC: &str = "test test test test test test test test test test test junk";

/// Everything the submission sequence needs besides the boards themselves.
pub struct DemoParams {
    pub alice: Address,
    pub bob: Address,
    pub alice_role: SigningPair,
    pub bob_role: SigningPair,
    pub dkg_seed: [u8; keys::SEED_LEN],
    pub role: RoleType,
    pub threshold: u8,
    pub permitted_caller: Address,
    pub expiry: u64,
}

#[derive(serde::Serialize, Debug, Clone)]
pub struct DemoReport {
    #[serde(rename = "jobId")]
    pub job_id: u64,
    #[serde(rename = "publicKey")]
    pub public_key: String,
    #[serde(rename = "signatures")]
    pub signatures: Vec<String>,
}

#[derive(serde::Serialize, Debug)]
struct RoleSeedJson {
    seed: String,
    #[serde(rename = "publicKey")]
    public_key: String,
}

/// Generates a fresh role seed and writes it out as JSON.
pub fn keygen<R>(opts: KeygenOpts, rng: &mut R) -> Result<()>
where
    R: RngCore,
{
    let mut seed = [0u8; keys::SEED_LEN];
    rng.fill_bytes(&mut seed);
    let pair = SigningPair::from_seed(seed);

    let output = RoleSeedJson {
        seed: hex::encode(seed),
        public_key: pair.public_hex(),
    };

    if let Some(path) = opts.path {
        let f = File::create(path)?;
        serde_json::to_writer(&f, &output)?;
    } else {
        serde_json::to_writer(std::io::stdout(), &output)?;
    }

    Ok(())
}

/// Connects to the node and runs the whole submission sequence with the
/// demo's fixed identities and seeds.
pub async fn run(opts: RunOpts) -> Result<()> {
    let provider = Provider::<Ws>::connect(&opts.node_url)
        .await
        .with_context(|| format!("connecting to {}", opts.node_url))?;
    let chain_id = provider.get_chainid().await?;
    let height = provider.get_block_number().await?.as_u64();
    info!(%chain_id, height, "connected to node");

    let alice = dev_wallet(0, chain_id.as_u64())?;
    let bob = dev_wallet(1, chain_id.as_u64())?;
    info!(alice = %alice.address(), bob = %bob.address(), "derived dev identities");

    let alice_role = SigningPair::from_seed(keys::ALICE_ROLE_SEED);
    let bob_role = SigningPair::from_seed(keys::BOB_ROLE_SEED);
    info!(
        seed = %hex::encode(keys::ALICE_ROLE_SEED),
        public = %alice_role.public_hex(),
        "Alice's role key"
    );
    info!(
        seed = %hex::encode(keys::BOB_ROLE_SEED),
        public = %bob_role.public_hex(),
        "Bob's role key"
    );

    let address: Address = opts
        .contract_address
        .parse()
        .context("invalid jobs module address")?;

    let params = DemoParams {
        alice: alice.address(),
        bob: bob.address(),
        alice_role,
        bob_role,
        dkg_seed: keys::DKG_OUTPUT_SEED,
        role: RoleType::ThresholdEd25519,
        threshold: opts.threshold,
        permitted_caller: alice.address(),
        expiry: height + opts.ttl,
    };

    let mut alice_board = Jobs::new(
        address,
        Arc::new(SignerMiddleware::new(provider.clone(), alice)),
    );
    let mut bob_board = Jobs::new(address, Arc::new(SignerMiddleware::new(provider, bob)));

    let report = exercise(&mut alice_board, &mut bob_board, &params).await?;

    if let Some(path) = opts.output_path {
        let f = File::create(path)?;
        serde_json::to_writer(&f, &report)?;
    } else {
        serde_json::to_writer(std::io::stdout(), &report)?;
    }

    Ok(())
}

/// The submission sequence itself, one transaction at a time: two profiles,
/// the keygen job, then the locally derived result.
pub async fn exercise<A, B>(
    alice_board: &mut A,
    bob_board: &mut B,
    params: &DemoParams,
) -> Result<DemoReport>
where
    A: JobsBoard,
    B: JobsBoard,
    A::Error: std::error::Error + Send + Sync + 'static,
    B::Error: std::error::Error + Send + Sync + 'static,
{
    info!(owner = %params.alice, "creating Alice's role profile");
    let included = alice_board
        .create_profile(RoleProfile {
            role: params.role,
            key: params.alice_role.public().to_vec(),
        })
        .await?;
    log_inclusion("profile created", &included);

    info!(owner = %params.bob, "creating Bob's role profile");
    let included = bob_board
        .create_profile(RoleProfile {
            role: params.role,
            key: params.bob_role.public().to_vec(),
        })
        .await?;
    log_inclusion("profile created", &included);

    let expected = alice_board.next_job_id().await?;
    info!(job_id = expected, "submitting keygen job");
    let (job_id, included) = alice_board
        .submit_job(JobSubmission {
            role: params.role,
            participants: vec![params.alice, params.bob],
            threshold: params.threshold,
            permitted_caller: params.permitted_caller,
            expiry: params.expiry,
        })
        .await?;
    log_inclusion("job submitted", &included);
    ensure!(
        job_id == expected,
        "chain assigned job id {job_id}, expected {expected}"
    );

    // Stand in for the keygen protocol: derive the group key locally and
    // authenticate it with both role keys.
    let output = SigningPair::from_seed(params.dkg_seed);
    let digest = keys::key_digest(&output.public());
    let signatures = vec![
        params.alice_role.sign_with_recovery(&digest).to_vec(),
        params.bob_role.sign_with_recovery(&digest).to_vec(),
    ];
    info!(public_key = %output.public_hex(), "derived keygen output");

    let included = alice_board
        .submit_job_result(JobResultSubmission {
            role: params.role,
            job_id,
            key: output.public().to_vec(),
            signatures: signatures.clone(),
        })
        .await?;
    log_inclusion("job result submitted", &included);

    Ok(DemoReport {
        job_id,
        public_key: output.public_hex(),
        signatures: signatures.iter().map(hex::encode).collect(),
    })
}

fn log_inclusion(what: &str, included: &Inclusion) {
    info!(block_hash = %included.block_hash, "{what}");
    for event in &included.events {
        info!("  event: {event}");
    }
}

fn dev_wallet(index: u32, chain_id: u64) -> Result<LocalWallet> {
    let wallet = MnemonicBuilder::<English>::default()
        .phrase(DEV_MNEMONIC)
        .index(index)?
        .build()?;
    Ok(wallet.with_chain_id(chain_id))
}
