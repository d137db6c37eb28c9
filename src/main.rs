use jobs_cli::{
    actions,
    opts::{Command, JobsOpts},
};

use gumdrop::Options;
use std::process;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let opts = JobsOpts::parse_args_default_or_exit();

    let command = opts.command.unwrap_or_else(|| {
        eprintln!("No command was provided.");
        eprintln!("{}", JobsOpts::usage());
        process::exit(2)
    });

    match command {
        Command::Run(opts) => actions::run(opts).await,
        Command::Keygen(opts) => actions::keygen(opts, &mut rand::thread_rng()),
    }
    .expect("command failed");
}
