mod cli;

use m4bkit::{config, probe};

use anyhow::{Context, Result};
use clap::Parser;
use cli::{Cli, Commands};
use std::path::Path;

fn main() -> Result<()> {
    let cli = Cli::parse();

    // RUST_LOG overrides the --verbose defaults
    let env_filter = std::env::var("RUST_LOG").unwrap_or_else(|_| {
        if cli.verbose {
            // Verbose: trace every atom visited
            "m4bkit=trace,m4bkit_media=trace".to_string()
        } else {
            "m4bkit=info,m4bkit_media=warn".to_string()
        }
    });

    // Logs go to stderr so JSON on stdout stays parseable
    tracing_subscriber::fmt()
        .with_env_filter(&env_filter)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Probe {
            file,
            json,
            cover_out,
        } => probe_file(&file, cli.config.as_deref(), json, cover_out.as_deref()),
        Commands::Chapters { file, json } => list_chapters(&file, cli.config.as_deref(), json),
        Commands::Validate {
            config: config_path,
        } => {
            let path = config_path.or(cli.config);
            validate_config(path.as_deref())
        }
        Commands::Version => {
            println!("m4bkit {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    }
}

fn print_json<T: serde::Serialize>(value: &T, pretty: bool) -> Result<()> {
    let json_str = if pretty {
        serde_json::to_string_pretty(value)?
    } else {
        serde_json::to_string(value)?
    };
    println!("{}", json_str);
    Ok(())
}

fn probe_file(
    file: &Path,
    config_path: Option<&Path>,
    json: bool,
    cover_out: Option<&Path>,
) -> Result<()> {
    let config = config::load_config_or_default(config_path)?;

    tracing::debug!("Probing {:?}", file);
    let extraction = probe::probe_file(file, &config.extraction)?;
    let report = probe::ProbeReport::new(file, &extraction);

    if json || config.output.json {
        print_json(&report, config.output.pretty)?;
    } else {
        print!("{}", report.render_text());
    }

    if let Some(out) = cover_out {
        match &extraction.metadata.cover {
            Some(cover) => {
                std::fs::write(out, &cover.data)
                    .with_context(|| format!("Failed to write cover to {:?}", out))?;
                tracing::info!("Wrote {} cover ({} bytes) to {:?}", cover.format, cover.len(), out);
            }
            None => tracing::warn!("No cover art in {:?}", file),
        }
    }

    Ok(())
}

fn list_chapters(file: &Path, config_path: Option<&Path>, json: bool) -> Result<()> {
    let config = config::load_config_or_default(config_path)?;
    let extraction = probe::probe_file(file, &config.extraction)?;
    let report = probe::ProbeReport::new(file, &extraction);

    if json || config.output.json {
        print_json(&report.chapters, config.output.pretty)?;
    } else if report.chapters.is_empty() {
        println!("No chapters found");
    } else {
        print!("{}", report.render_chapters());
    }

    Ok(())
}

fn validate_config(path: Option<&Path>) -> Result<()> {
    let config = match path {
        Some(p) => {
            println!("Validating config: {:?}", p);
            let config = config::load_config(p)?;
            println!("✓ Configuration is valid");
            config
        }
        None => {
            println!("No config file specified, using defaults");
            config::Config::default()
        }
    };

    let extraction = &config.extraction;
    println!("  Max tracks: {}", extraction.max_tracks);
    println!("  Max text samples: {}", extraction.max_text_samples);
    println!("  Max chapter entries: {}", extraction.max_chapter_entries);
    println!("  Segment length: {}s", extraction.segment_secs);
    println!("  JSON output: {}", config.output.json);

    Ok(())
}
