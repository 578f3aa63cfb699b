//! Subcommand implementations

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::ArgMatches;
use kilt_cfn::{ImageMetadata, PatcherConfig, SidecarSettings, TemplatePatcher};
use kilt_patch::target_context;
use kilt_recipe::Recipe;
use serde_json::{Map, Value};

/// Dispatch a parsed command line
///
/// # Errors
/// Returns error if an input cannot be read, patching fails or an output
/// cannot be written
pub fn run(matches: &ArgMatches) -> Result<()> {
    match matches.subcommand() {
        Some(("patch", args)) => patch(args),
        Some(("evaluate", args)) => evaluate(args),
        Some((other, _)) => bail!("unknown subcommand {other}"),
        None => bail!("no subcommand given"),
    }
}

fn patch(args: &ArgMatches) -> Result<()> {
    let config = patcher_config(args)?;
    let mut patcher = TemplatePatcher::new(config);
    if let Some(path) = args.get_one::<PathBuf>("image-metadata") {
        patcher = patcher.with_metadata_provider(image_metadata(path)?);
    }

    let input = required_path(args, "input")?;
    let template = read(input)?;
    let parameters = match args.get_one::<PathBuf>("parameters") {
        Some(path) => read(path)?,
        None => String::new(),
    };

    let (patched, report) = patcher
        .patch_json(&template, &parameters)
        .with_context(|| format!("failed to patch {}", input.display()))?;

    match args.get_one::<PathBuf>("output") {
        Some(output) => {
            fs::write(output, &patched).with_context(|| format!("cannot write {}", output.display()))?;
            tracing::info!(output = %output.display(), "wrote patched template");
        }
        None => println!("{patched}"),
    }

    if let Some(path) = args.get_one::<PathBuf>("report") {
        let report = serde_json::to_string_pretty(&report)?;
        fs::write(path, report).with_context(|| format!("cannot write {}", path.display()))?;
    }
    Ok(())
}

fn evaluate(args: &ArgMatches) -> Result<()> {
    let recipe = Recipe::new(read(required_path(args, "recipe")?)?).with_config(recipe_config(args)?);

    let path = required_path(args, "container")?;
    let container: Value =
        serde_json::from_str(&read(path)?).with_context(|| format!("{} is not JSON", path.display()))?;
    let group = args.get_one::<String>("group").map_or("", String::as_str);

    let context = target_context(&container, group)?;
    let spec = recipe.evaluate(&context)?;
    println!("{}", serde_json::to_string_pretty(&spec)?);
    Ok(())
}

/// Patcher configuration from `patch` arguments
///
/// # Errors
/// Returns error if the recipe or user configuration cannot be read or
/// the sidecar configuration is not a JSON object
pub fn patcher_config(args: &ArgMatches) -> Result<PatcherConfig> {
    let recipe = read(required_path(args, "recipe")?)?;

    let mut config = PatcherConfig::new(recipe)
        .with_recipe_config(recipe_config(args)?)
        .with_opt_in(args.get_flag("opt-in"))
        .with_parametrize(args.get_flag("parametrize"))
        .with_overwrite_env(!args.get_flag("keep-existing-env"))
        .with_sidecar_settings(SidecarSettings {
            essential: args.get_one::<bool>("sidecar-essential").copied(),
            cpu: args.get_one::<u32>("sidecar-cpu").copied(),
            memory: args.get_one::<u32>("sidecar-memory-limit").copied(),
            memory_reservation: args.get_one::<u32>("sidecar-memory-reservation").copied(),
        });

    if let Some(group) = non_empty(args, "log-group") {
        config = config.with_log_group(group);
    }
    if let Some(secret) = non_empty(args, "image-auth-secret") {
        config = config.with_image_auth_secret(secret);
    }
    if let Some(raw) = non_empty(args, "sidecar-config") {
        config = config.with_sidecar_config(sidecar_config(raw)?);
    }
    Ok(config)
}

fn recipe_config(args: &ArgMatches) -> Result<String> {
    if let Some(path) = args.get_one::<PathBuf>("recipe-config-file") {
        return read(path);
    }
    Ok(args.get_one::<String>("recipe-config").cloned().unwrap_or_default())
}

fn sidecar_config(raw: &str) -> Result<Map<String, Value>> {
    match serde_json::from_str(raw).context("cannot parse sidecar config")? {
        Value::Object(map) => Ok(map),
        other => bail!("sidecar config must be a JSON object, got {other}"),
    }
}

fn image_metadata(path: &Path) -> Result<HashMap<String, ImageMetadata>> {
    serde_json::from_str(&read(path)?).with_context(|| format!("cannot parse image metadata {}", path.display()))
}

fn non_empty<'a>(args: &'a ArgMatches, id: &str) -> Option<&'a str> {
    args.get_one::<String>(id)
        .map(String::as_str)
        .filter(|value| !value.is_empty())
}

fn required_path<'a>(args: &'a ArgMatches, id: &str) -> Result<&'a PathBuf> {
    args.get_one::<PathBuf>(id)
        .with_context(|| format!("missing --{id}"))
}

fn read(path: &Path) -> Result<String> {
    fs::read_to_string(path).with_context(|| format!("cannot read {}", path.display()))
}
