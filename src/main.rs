use anyhow::{bail, Context as _};
use clap::{command, Arg, ArgAction};
use log::LevelFilter;
use std::path::PathBuf;

use config::Config;
use context::Context;

mod config;
mod context;
mod converter;

fn main() -> anyhow::Result<()> {
    let matches = command!()
        .args(&[
            Arg::new("config")
                .short('c')
                .long("config")
                .help("Path of the configuration file")
                .value_parser(clap::value_parser!(PathBuf)),
            Arg::new("verbose")
                .short('v')
                .action(ArgAction::Count)
                .help("Increase log verbosity (-v: info, -vv: debug)"),
        ])
        .get_matches();

    let log_level = match matches.get_count("verbose") {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        _ => LevelFilter::Debug,
    };
    // RUST_LOG still wins over -v when set
    env_logger::Builder::new()
        .filter_level(log_level)
        .parse_default_env()
        .init();

    let config_path = matches
        .get_one::<PathBuf>("config")
        .cloned()
        .or_else(Config::default_path)
        .context("could not determine the configuration file path")?;
    let config = Config::load(&config_path)?;

    if !config.writer_post_dir.is_dir() {
        bail!("writer_post_dir must be a directory.");
    }
    if !config.writer_image_dir.is_dir() {
        bail!("writer_image_dir must be a directory.");
    }
    std::fs::create_dir_all(&config.hugo_post_dir)
        .with_context(|| format!("while creating {:?}", config.hugo_post_dir))?;
    std::fs::create_dir_all(&config.hugo_image_dir)
        .with_context(|| format!("while creating {:?}", config.hugo_image_dir))?;

    Context::init(config);

    converter::run()?;

    Ok(())
}
