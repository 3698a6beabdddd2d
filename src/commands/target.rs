use clap::{Args, Subcommand};
use serde::Serialize;

use slipway::target::{Target, TargetName};
use slipway::{config, Error};

use super::CmdResult;

#[derive(Args)]
pub struct TargetArgs {
    #[command(subcommand)]
    pub command: TargetCommand,
}

#[derive(Subcommand)]
pub enum TargetCommand {
    /// Create or update a target from a JSON spec
    Set {
        #[arg(value_enum)]
        name: TargetName,
        /// JSON object merged over the stored target
        /// (e.g. '{"host":"dupont","user":"alarms","repo":"...","home":"/projects/alarms"}')
        json: String,
    },
    /// Show a target's resolved configuration
    Show {
        #[arg(value_enum)]
        name: TargetName,
    },
    /// List configured targets
    List,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TargetOutput {
    pub command: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target: Option<Target>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub targets: Option<Vec<TargetName>>,
}

pub fn run(args: TargetArgs) -> CmdResult<TargetOutput> {
    match args.command {
        TargetCommand::Set { name, json } => {
            let target = config::merge(name, &json)?;
            Ok((
                TargetOutput {
                    command: "target.set".to_string(),
                    target: Some(target),
                    targets: None,
                },
                0,
            ))
        }
        TargetCommand::Show { name } => {
            let target = config::load(name).map_err(|e| {
                if e.code == slipway::ErrorCode::ConfigMissingFile {
                    Error::target_not_found(name.as_str())
                } else {
                    e
                }
            })?;
            Ok((
                TargetOutput {
                    command: "target.show".to_string(),
                    target: Some(target),
                    targets: None,
                },
                0,
            ))
        }
        TargetCommand::List => Ok((
            TargetOutput {
                command: "target.list".to_string(),
                target: None,
                targets: Some(config::list()),
            },
            0,
        )),
    }
}
