mod cli;
mod fake;

use clap::Parser;
use cli::args::{Cli, Command};
use tracing_subscriber::EnvFilter;

pub mod exit_codes {
    pub const OK: i32 = 0;
    pub const OPERATION_FAILED: i32 = 1;
    pub const CONFIG_ERROR: i32 = 2;
}

#[tokio::main(flavor = "multi_thread")]
async fn main() {
    init_tracing();

    let cli = Cli::parse();
    let code = match dispatch(cli).await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("fatal: {e:?}");
            exit_codes::CONFIG_ERROR
        }
    };
    std::process::exit(code);
}

async fn dispatch(cli: Cli) -> anyhow::Result<i32> {
    let config_path = cli.config;
    match cli.cmd {
        Command::Init(args) => cli::commands::cmd_init(&config_path, args).await,
        Command::Load(args) => cli::commands::cmd_load(&config_path, args).await,
        Command::Sets => cli::commands::cmd_sets(&config_path).await,
        Command::Generate(args) => cli::commands::cmd_generate(&config_path, args).await,
        Command::Evaluate(args) => cli::commands::cmd_evaluate(&config_path, args).await,
        Command::Status(args) => cli::commands::cmd_status(&config_path, args).await,
        Command::Compare(args) => cli::commands::cmd_compare(&config_path, args).await,
        Command::Version => {
            println!("{}", env!("CARGO_PKG_VERSION"));
            Ok(exit_codes::OK)
        }
    }
}

fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}
