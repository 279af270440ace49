use anyhow::{anyhow, Context, Result};
use clap::{Arg, ArgAction, ArgMatches, Command};
use kite_engine::config::Config;
use kite_engine::foundation::logging;
use kite_engine::packer::{state, BinRect, DataValue, MaxRectsPacker, PackingOptions};
use log::{debug, error, info, warn};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

mod manifest;
use manifest::Manifest;

const PAGE_KEY: &str = "page";

#[derive(Debug)]
struct PackConfig {
    manifest: PathBuf,
    options: Option<PathBuf>,
    previous_state: Option<PathBuf>,
    output: PathBuf,
}

impl PackConfig {
    fn from_matches(matches: &ArgMatches) -> Result<Self> {
        let path = |id: &str| matches.get_one::<String>(id).map(PathBuf::from);
        Ok(Self {
            manifest: path("manifest").ok_or_else(|| anyhow!("--manifest is required"))?,
            options: path("options"),
            previous_state: path("state"),
            output: path("output").ok_or_else(|| anyhow!("--output is required"))?,
        })
    }
}

fn cli() -> Command {
    Command::new("atlas_packer")
        .about("Packs a sprite manifest into texture atlas pages and writes the packing state")
        .arg(
            Arg::new("manifest")
                .short('m')
                .long("manifest")
                .value_name("FILE")
                .help("TOML file listing [[sprite]] entries with name, width and height")
                .required(true),
        )
        .arg(
            Arg::new("options")
                .long("options")
                .value_name("FILE")
                .help("Packing options as .toml or .ron"),
        )
        .arg(
            Arg::new("state")
                .long("state")
                .value_name("FILE")
                .help("Previous packing state to extend"),
        )
        .arg(
            Arg::new("output")
                .short('o')
                .long("output")
                .value_name("FILE")
                .help("Where to write the packing state (RON)")
                .required(true),
        )
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .action(ArgAction::Count)
                .help("Increase log verbosity"),
        )
}

fn main() -> Result<()> {
    let matches = cli().get_matches();
    logging::init_with_level(logging::level_for_verbosity(matches.get_count("verbose")));

    let config = PackConfig::from_matches(&matches)?;
    run(&config).map_err(|e| {
        error!("Packing failed: {e:#}");
        e
    })
}

fn run(config: &PackConfig) -> Result<()> {
    let options = load_options(config.options.as_deref())?;
    let manifest = Manifest::load(&config.manifest)?;
    info!("Loaded {} sprites from {}", manifest.sprites.len(), config.manifest.display());

    let mut packer = MaxRectsPacker::new(options);
    if let Some(path) = &config.previous_state {
        let saved = state::load_from_file(path)
            .with_context(|| format!("Failed to load packing state {}", path.display()))?;
        packer.load(&saved);
        info!("Resumed {} pages from {}", packer.bins().len(), path.display());
    }

    let packed: BTreeSet<String> = packer.rects().filter_map(BinRect::tag).map(str::to_owned).collect();
    let pending: Vec<BinRect> = manifest
        .sprites
        .iter()
        .filter(|sprite| {
            let known = packed.contains(&sprite.name);
            if known {
                debug!("Skipping '{}', already packed", sprite.name);
            }
            !known
        })
        .map(manifest::SpriteEntry::to_rect)
        .collect();
    packer.add_all(&pending);
    stamp_pages(&mut packer);

    state::save_to_file(&config.output, &packer.save())
        .with_context(|| format!("Failed to write packing state {}", config.output.display()))?;

    summarize(&packer);
    info!("Wrote {}", config.output.display());
    Ok(())
}

fn load_options(path: Option<&Path>) -> Result<PackingOptions> {
    let options = match path {
        Some(path) => PackingOptions::load_from_file(path)
            .with_context(|| format!("Failed to load packing options {}", path.display()))?,
        None => PackingOptions::default(),
    };
    options.validate().map_err(|reason| anyhow!("Invalid packing options: {reason}"))?;
    Ok(options)
}

/// Record each rect's page index in its data
fn stamp_pages(packer: &mut MaxRectsPacker) {
    for (page, bin) in packer.bins_mut().iter_mut().enumerate() {
        for rect in bin.rects_mut() {
            rect.data_mut().insert(PAGE_KEY.to_owned(), DataValue::from(page));
        }
    }
}

fn summarize(packer: &MaxRectsPacker) {
    for (page, bin) in packer.bins().iter().enumerate() {
        let used: i64 = bin.rects().iter().map(BinRect::area).sum();
        let total = i64::from(bin.width()) * i64::from(bin.height());
        let fill = if total > 0 { used * 100 / total } else { 0 };
        let kind = if bin.is_oversized() { " (oversized)" } else { "" };
        info!(
            "Page {page}: {}x{}{kind}, {} sprites, {fill}% used",
            bin.width(),
            bin.height(),
            bin.rects().len()
        );
        if bin.is_oversized() {
            warn!("Page {page} holds a sprite larger than the page limit");
        }
    }
}
