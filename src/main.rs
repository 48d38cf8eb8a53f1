mod cli;

use timeshift::{config, inspect, verify};

use anyhow::Result;
use clap::Parser;
use cli::{Cli, Commands};
use std::path::{Path, PathBuf};

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Respect RUST_LOG env var if set, otherwise use defaults based on verbose flag
    let env_filter = std::env::var("RUST_LOG").unwrap_or_else(|_| {
        if cli.verbose {
            "timeshift=debug,ts_buffer=trace,ts_core=debug".to_string()
        } else {
            "timeshift=info,ts_buffer=warn,ts_core=warn".to_string()
        }
    });

    // Reports go to stdout, so logs stay on stderr
    tracing_subscriber::fmt()
        .with_env_filter(&env_filter)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Inspect { file, json, limit } => {
            inspect_file(&file, cli.config.as_deref(), json, limit)
        }
        Commands::Verify { files, json } => verify_files(&files, cli.config.as_deref(), json),
        Commands::Validate {
            config: config_path,
        } => {
            let path = config_path.or(cli.config);
            validate_config(path.as_deref())
        }
        Commands::Version => {
            println!("timeshift {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    }
}

fn format_ts(ts: Option<i64>) -> String {
    ts.map_or_else(|| "-".to_string(), |us| format!("{us}us"))
}

fn inspect_file(
    file: &Path,
    config_path: Option<&Path>,
    json: bool,
    limit: Option<usize>,
) -> Result<()> {
    let config = config::load_config_or_default(config_path)?;

    if !file.exists() {
        anyhow::bail!("File does not exist: {:?}", file);
    }

    let report = inspect::inspect_file(file, config.buffer.effective_max_sample_size(), limit)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    println!("File: {}", report.path.display());
    println!("Size: {} bytes ({} in complete records)", report.byte_len, report.valid_len);
    println!("Records: {} ({} key frames)", report.record_count, report.key_frames);
    println!(
        "Timestamps: {} .. {}",
        format_ts(report.first_timestamp_us),
        format_ts(report.last_timestamp_us)
    );

    if !report.records.is_empty() {
        println!("\n{:>6}  {:>10}  {:>8}  {:>14}  flags", "index", "offset", "size", "timestamp");
        for record in &report.records {
            println!(
                "{:>6}  {:>10}  {:>8}  {:>14}  {}",
                record.index,
                record.offset,
                record.size,
                record.timestamp_us,
                record.flags.join(",")
            );
        }
        if report.records.len() < report.record_count {
            println!("  ... {} more", report.record_count - report.records.len());
        }
    }

    match report.tail {
        Some(inspect::Tail::Partial {
            offset,
            available,
            needed,
        }) => println!(
            "\nPartial record at offset {offset}: {available} of {needed} bytes present"
        ),
        Some(inspect::Tail::Corrupt { offset, reason }) => {
            println!("\nCorrupt record at offset {offset}: {reason}")
        }
        None => {}
    }

    Ok(())
}

fn verify_files(files: &[PathBuf], config_path: Option<&Path>, json: bool) -> Result<()> {
    let config = config::load_config_or_default(config_path)?;

    for file in files {
        if !file.exists() {
            anyhow::bail!("File does not exist: {:?}", file);
        }
    }

    tracing::info!(files = files.len(), "verifying chunk chain");
    let report = verify::verify_files(files, &config.buffer)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        for chunk in &report.chunks {
            println!(
                "{}  start={}us  samples={}  bytes={}  ts={} .. {}",
                chunk.path.display(),
                chunk.start_position_us,
                chunk.samples,
                chunk.bytes,
                format_ts(chunk.first_timestamp_us),
                format_ts(chunk.last_timestamp_us)
            );
        }
        println!(
            "\nChunks: {}  Samples: {}  Key frames: {}  Bytes: {}",
            report.chunks.len(),
            report.samples,
            report.key_frames,
            report.total_bytes
        );
        for v in &report.violations {
            println!(
                "✗ {} sample {}: {}us after {}us",
                v.path.display(),
                v.index,
                v.timestamp_us,
                v.previous_us
            );
        }
    }

    if !report.is_ok() {
        anyhow::bail!("{} timestamp ordering violation(s)", report.violations.len());
    }
    if !json {
        println!("✓ Chain is consistent");
    }
    Ok(())
}

fn validate_config(path: Option<&Path>) -> Result<()> {
    let config = match path {
        Some(p) => {
            println!("Validating config: {:?}", p);
            config::load_config(p)?
        }
        None => {
            println!("No config file specified, using defaults");
            config::Config::default()
        }
    };

    let warnings = config::validate_config(&config);
    if warnings.is_empty() {
        println!("✓ Configuration is valid");
    } else {
        println!("Configuration has {} warning(s):", warnings.len());
        for warning in &warnings {
            println!("  - {warning}");
        }
    }
    println!("  Max sample size: {} bytes", config.buffer.max_sample_size);
    println!("  Sync on finish: {}", config.buffer.sync_on_finish);
    println!("  Pooled buffers: {}", config.buffer.max_pooled_buffers);

    Ok(())
}
