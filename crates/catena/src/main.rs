//! Demo driver: run a loader chain from the command line.
//!
//! Takes a request string (`loader!loader!path`), assembles the effective
//! chain from an optional TOML rule set, runs it against a small registry
//! of built-in transform modules, and prints the primary result.

use std::{cell::RefCell, path::PathBuf, rc::Rc};

use anyhow::{Context as _, Result};
use clap::Parser;

use catena::{
    Config, Content, ModuleRegistry, RunOptions, RunOutput, TransformModule, assemble_loaders,
    run_pipeline,
};

#[derive(Debug, Parser)]
#[command(
    name = "catena",
    version,
    about = "Run a transform-module chain against a resource"
)]
struct Cli {
    /// Request to run: loader identities and the resource joined by `!`,
    /// e.g. `uppercase!banner!notes.txt`. Prefix with `!`, `-!`, or `!!`
    /// to limit which configured rules apply.
    request: String,

    /// Rule-set configuration file (TOML)
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let config = match &cli.config {
        Some(path) => Config::load(path)?,
        None => Config::default(),
    };
    let rules = config.compile()?;
    let resolved = assemble_loaders(&cli.request, &rules);
    log::info!(
        "resource `{}`, chain: [{}]",
        resolved.resource,
        resolved.loaders.join(", ")
    );

    let registry = builtin_modules();
    let outcome: Rc<RefCell<Option<Result<RunOutput>>>> = Rc::new(RefCell::new(None));
    let slot = Rc::clone(&outcome);
    run_pipeline(
        RunOptions::new(resolved.resource, resolved.loaders),
        &registry,
        move |result| {
            *slot.borrow_mut() = Some(result);
        },
    );

    // Built-in modules are synchronous, so the run completes in-stack
    let output = outcome
        .borrow_mut()
        .take()
        .context("pipeline suspended without completing")??;
    if let Some(result) = output.result() {
        println!("{result}");
    }
    Ok(())
}

fn init_logging(verbose: u8) {
    let default = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default)).init();
}

/// The transform modules the demo binary ships with.
fn builtin_modules() -> ModuleRegistry {
    let mut registry = ModuleRegistry::new();

    registry.register(
        "uppercase",
        TransformModule::new(|_ctx, mut args| {
            if let Some(Content::Text(text)) = args.first_mut() {
                *text = text.to_uppercase();
            }
            Ok(args)
        }),
    );

    registry.register(
        "trim",
        TransformModule::new(|_ctx, mut args| {
            if let Some(Content::Text(text)) = args.first_mut() {
                *text = text.trim().to_owned();
            }
            Ok(args)
        }),
    );

    registry.register(
        "banner",
        TransformModule::new(|ctx, mut args| {
            let path = ctx.resource_path();
            if let Some(Content::Text(text)) = args.first_mut() {
                *text = format!("// {path}\n{text}");
            }
            Ok(args)
        }),
    );

    registry.register(
        "hexdump",
        TransformModule::new(|_ctx, mut args| {
            if let Some(first) = args.first_mut() {
                let hex = first
                    .as_bytes()
                    .unwrap_or_default()
                    .iter()
                    .map(|byte| format!("{byte:02x}"))
                    .collect::<Vec<_>>()
                    .join(" ");
                *first = Content::Text(hex);
            }
            Ok(args)
        })
        .binary(),
    );

    // Pitch demo: short-circuits the whole chain when the environment
    // carries an `intercept` value, e.g. seeded by an embedding tool
    registry.register(
        "intercept",
        TransformModule::new(|_ctx, args| Ok(args)).with_pitch(|ctx, _args| {
            let intercepted = ctx.with_environment(|env| env.get("intercept").cloned());
            Ok(vec![intercepted.unwrap_or(Content::Null)])
        }),
    );

    registry
}
