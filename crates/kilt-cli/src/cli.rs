//! Command line definition

use clap::builder::{BoolishValueParser, FalseyValueParser};
use clap::{value_parser, Arg, ArgAction, Command};
use std::path::PathBuf;

/// Build the `kilt` command
#[must_use]
pub fn build_cli() -> Command {
    Command::new("kilt")
        .version(crate::VERSION)
        .about("Instruments ECS task definitions in CloudFormation templates")
        .subcommand_required(true)
        .arg_required_else_help(true)
        .arg(
            Arg::new("log-json")
                .long("log-json")
                .global(true)
                .action(ArgAction::SetTrue)
                .help("Emit logs as JSON lines"),
        )
        .subcommand(patch_command())
        .subcommand(evaluate_command())
}

fn recipe_args() -> [Arg; 3] {
    [
        Arg::new("recipe")
            .long("recipe")
            .env("KILT_DEFINITION")
            .required(true)
            .value_parser(value_parser!(PathBuf))
            .help("Recipe file"),
        Arg::new("recipe-config")
            .long("recipe-config")
            .env("KILT_RECIPE_CONFIG")
            .conflicts_with("recipe-config-file")
            .help("User configuration exposed to the recipe as config.*"),
        Arg::new("recipe-config-file")
            .long("recipe-config-file")
            .value_parser(value_parser!(PathBuf))
            .help("Read the user configuration from a file"),
    ]
}

fn patch_command() -> Command {
    Command::new("patch")
        .about("Patch a CloudFormation template")
        .args(recipe_args())
        .arg(
            Arg::new("input")
                .long("input")
                .env("KILT_SRC_TEMPLATE")
                .required(true)
                .value_parser(value_parser!(PathBuf))
                .help("Template to patch"),
        )
        .arg(
            Arg::new("output")
                .long("output")
                .env("KILT_OUT_TEMPLATE")
                .value_parser(value_parser!(PathBuf))
                .help("Where to write the patched template (stdout if absent)"),
        )
        .arg(
            Arg::new("parameters")
                .long("parameters")
                .value_parser(value_parser!(PathBuf))
                .help("JSON object of template parameter values"),
        )
        .arg(
            Arg::new("report")
                .long("report")
                .value_parser(value_parser!(PathBuf))
                .help("Write the patch report as JSON"),
        )
        .arg(
            Arg::new("opt-in")
                .long("opt-in")
                .env("KILT_OPT_IN")
                .action(ArgAction::SetTrue)
                .value_parser(FalseyValueParser::new())
                .help("Only patch containers that opt in through tags"),
        )
        .arg(
            Arg::new("parametrize")
                .long("parametrize")
                .env("KILT_PARAMETERIZE_ENVARS")
                .action(ArgAction::SetTrue)
                .value_parser(BoolishValueParser::new())
                .help("Turn new environment variables into template parameters"),
        )
        .arg(
            Arg::new("keep-existing-env")
                .long("keep-existing-env")
                .env("KILT_KEEP_EXISTING_ENV")
                .action(ArgAction::SetTrue)
                .value_parser(BoolishValueParser::new())
                .help("Never overwrite environment variables the container already sets"),
        )
        .arg(
            Arg::new("log-group")
                .long("log-group")
                .env("KILT_LOG_GROUP")
                .help("awslogs group for sidecar logs"),
        )
        .arg(
            Arg::new("image-auth-secret")
                .long("image-auth-secret")
                .env("KILT_IMAGE_AUTH_SECRET")
                .help("Secret holding registry credentials for sidecar images"),
        )
        .arg(
            Arg::new("sidecar-essential")
                .long("sidecar-essential")
                .env("KILT_SIDECAR_ESSENTIAL")
                .value_parser(BoolishValueParser::new())
                .help("Essential flag of injected sidecars"),
        )
        .arg(
            Arg::new("sidecar-cpu")
                .long("sidecar-cpu")
                .env("KILT_SIDECAR_CPU")
                .value_parser(value_parser!(u32))
                .help("CPU units of injected sidecars"),
        )
        .arg(
            Arg::new("sidecar-memory-limit")
                .long("sidecar-memory-limit")
                .env("KILT_SIDECAR_MEMORY_LIMIT")
                .value_parser(value_parser!(u32))
                .help("Hard memory limit of injected sidecars in MiB"),
        )
        .arg(
            Arg::new("sidecar-memory-reservation")
                .long("sidecar-memory-reservation")
                .env("KILT_SIDECAR_MEMORY_RESERVATION")
                .value_parser(value_parser!(u32))
                .help("Soft memory limit of injected sidecars in MiB"),
        )
        .arg(
            Arg::new("sidecar-config")
                .long("sidecar-config")
                .env("KILT_SIDECAR_CONFIG")
                .help("JSON object merged into every injected sidecar"),
        )
        .arg(
            Arg::new("image-metadata")
                .long("image-metadata")
                .value_parser(value_parser!(PathBuf))
                .help("JSON object mapping images to their entry point and command"),
        )
}

fn evaluate_command() -> Command {
    Command::new("evaluate")
        .about("Evaluate a recipe against one container definition")
        .args(recipe_args())
        .arg(
            Arg::new("container")
                .long("container")
                .required(true)
                .value_parser(value_parser!(PathBuf))
                .help("JSON container definition"),
        )
        .arg(
            Arg::new("group")
                .long("group")
                .default_value("")
                .help("Name of the task definition holding the container"),
        )
}
