//! UI walkthrough runner - scripted browser smoke tests
//!
//! Runs a declarative list of steps against a web application through
//! WebDriver, capturing screenshots along the way.

use clap::Parser;
use walkthrough::commands::{Commands, GlobalOpts};
use walkthrough::{cli, common::logging};

#[derive(Parser)]
#[command(name = "walkthrough", about = "Scripted UI walkthrough runner")]
#[command(version, long_about = None)]
struct Cli {
    #[command(flatten)]
    opts: GlobalOpts,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    logging::init_cli(cli.opts.verbose);

    match cli::dispatch(cli.command, &cli.opts).await {
        Ok(code) => std::process::exit(code),
        Err(e) => {
            eprintln!("Error: {e}");
            std::process::exit(1);
        }
    }
}
