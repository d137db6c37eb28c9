use gumdrop::Options;

#[derive(Debug, Options, Clone)]
pub struct JobsOpts {
    help: bool,

    #[options(command)]
    pub command: Option<Command>,
}

// The supported commands
#[derive(Debug, Options, Clone)]
pub enum Command {
    #[options(help = "runs the profile/job/result sequence against a devnet")]
    Run(RunOpts),

    #[options(help = "creates a new role keypair seed")]
    Keygen(KeygenOpts),
}

/// Every flag has a demo default, so `jobs-cli run` works as-is against a
/// local devnet.
#[derive(Debug, Options, Clone)]
pub struct RunOpts {
    help: bool,

    #[options(
        help = "the node's websocket RPC endpoint",
        default = "ws://127.0.0.1:8545"
    )]
    pub node_url: String,

    #[options(
        help = "the jobs module's address",
        default = "0x0000000000000000000000000000000000000816"
    )]
    pub contract_address: String,

    #[options(help = "signing threshold for the generated key", default = "1")]
    pub threshold: u8,

    #[options(help = "number of blocks until the job expires", default = "1000")]
    pub ttl: u64,

    #[options(help = "path where the demo report is written (stdout if none provided)")]
    pub output_path: Option<String>,
}

#[derive(Debug, Options, Clone)]
pub struct KeygenOpts {
    help: bool,

    #[options(help = "path to the file where the seed will be written (stdout if none provided)")]
    pub path: Option<String>,
}
