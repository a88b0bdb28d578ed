use ad_wizard::config::AppConfig;
use ad_wizard::error::AppError;
use ad_wizard::telemetry;
use clap::{Parser, Subcommand};

use crate::demo::{run_access_check, run_demo, AccessArgs, DemoArgs};

#[derive(Parser, Debug)]
#[command(
    name = "Ad Wizard",
    about = "Drive the guarded ad submission workflow from the command line",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run a scripted ad-creation session end to end (default command)
    Demo(DemoArgs),
    /// Evaluate whether an identity may open the ad workflow
    Access(AccessArgs),
}

pub(crate) async fn run() -> Result<(), AppError> {
    let cli = Cli::parse();
    let config = AppConfig::load()?;
    telemetry::init(&config.telemetry)?;

    let command = cli
        .command
        .unwrap_or_else(|| Command::Demo(DemoArgs::default()));

    match command {
        Command::Demo(args) => run_demo(args, &config).await,
        Command::Access(args) => run_access_check(args, &config),
    }
}
