use clap::{Parser, Subcommand};

mod commands;
mod output;
mod tty;

use commands::{cron, deploy, prune, service, target};

const VERSION: &str = env!("CARGO_PKG_VERSION");

#[derive(Parser)]
#[command(name = "slipway")]
#[command(version = VERSION)]
#[command(about = "CLI for symlink-swap release deployment over SSH")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Deploy a fresh release and make it current
    Deploy(deploy::DeployArgs),
    /// Delete old releases beyond the retention window
    Prune(prune::PruneArgs),
    /// Install the crontab for the active release
    SetCrontab(cron::CronArgs),
    /// Disable the crontab for the active release
    DisableCrontab(cron::CronArgs),
    /// Stop the application process
    Stop(service::ServiceArgs),
    /// Clear the application cache
    ClearCache(service::ServiceArgs),
    /// Manage target configurations
    #[command(visible_alias = "targets")]
    Target(target::TargetArgs),
}

/// Dispatch a command to its handler and map result to JSON.
macro_rules! dispatch {
    ($args:expr, $handler:path) => {
        output::map_cmd_result_to_json($handler($args))
    };
}

fn run_json(command: Commands) -> (slipway::Result<serde_json::Value>, i32) {
    tty::status("slipway is working...");

    match command {
        Commands::Deploy(args) => dispatch!(args, deploy::run),
        Commands::Prune(args) => dispatch!(args, prune::run),
        Commands::SetCrontab(args) => dispatch!(args, cron::run_set),
        Commands::DisableCrontab(args) => dispatch!(args, cron::run_disable),
        Commands::Stop(args) => dispatch!(args, service::run_stop),
        Commands::ClearCache(args) => dispatch!(args, service::run_clear_cache),
        Commands::Target(args) => dispatch!(args, target::run),
    }
}

fn main() -> std::process::ExitCode {
    let cli = Cli::parse();

    let (json_result, exit_code) = run_json(cli.command);
    let _ = output::print_json_result(json_result);

    std::process::ExitCode::from(exit_code_to_u8(exit_code))
}

fn exit_code_to_u8(code: i32) -> u8 {
    if code <= 0 {
        0
    } else if code >= 255 {
        255
    } else {
        code as u8
    }
}
