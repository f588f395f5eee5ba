use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use rayon::prelude::*;
use shiage::config::Config;
use shiage::image_optimizer::probe;
use shiage::{ConversionRequest, Pipeline};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// Shiage - finish product photos into watermarked, size-capped JPEGs
#[derive(Parser, Debug)]
#[command(name = "shiage")]
#[command(version, about, long_about = None)]
struct Args {
    /// Path to configuration file (defaults apply when omitted)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Finish one or more uploads into <out-dir>/<stem>.jpg
    Finish {
        /// Source images
        #[arg(required = true)]
        inputs: Vec<PathBuf>,

        /// Directory for finished JPEGs
        #[arg(short, long)]
        out_dir: PathBuf,

        /// Declared content type applied to every input
        #[arg(long)]
        content_type: Option<String>,
    },

    /// Print the detected format family of each input
    Probe {
        #[arg(required = true)]
        inputs: Vec<PathBuf>,
    },

    /// Validate configuration and exit
    CheckConfig,
}

fn main() {
    let args = Args::parse();

    let config = match load_config(args.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to load configuration: {:#}", e);
            std::process::exit(2);
        }
    };

    if let Err(e) = shiage::logging::init_subscriber(&config.logging) {
        eprintln!("Failed to initialize logging: {}", e);
        std::process::exit(2);
    }

    let outcome = match args.command {
        Command::Finish {
            inputs,
            out_dir,
            content_type,
        } => run_finish(&config, &inputs, &out_dir, content_type.as_deref()),
        Command::Probe { inputs } => run_probe(&inputs),
        Command::CheckConfig => {
            println!("Configuration OK");
            Ok(())
        }
    };

    if let Err(e) = outcome {
        tracing::error!(error = %format!("{:#}", e), "command failed");
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

fn load_config(path: Option<&Path>) -> Result<Config> {
    match path {
        Some(path) => Config::load(path).with_context(|| format!("loading {}", path.display())),
        None => Ok(Config::default()),
    }
}

fn run_finish(
    config: &Config,
    inputs: &[PathBuf],
    out_dir: &Path,
    content_type: Option<&str>,
) -> Result<()> {
    check_distinct_outputs(inputs, out_dir)?;
    let pipeline = Pipeline::from_config(config).context("building finishing pipeline")?;
    std::fs::create_dir_all(out_dir)
        .with_context(|| format!("creating {}", out_dir.display()))?;

    tracing::info!(
        inputs = inputs.len(),
        out_dir = %out_dir.display(),
        "Finishing images"
    );

    // Uploads are independent requests; only the watermark asset is shared
    let failures: Vec<String> = inputs
        .par_iter()
        .filter_map(|input| match finish_one(&pipeline, input, out_dir, content_type) {
            Ok(line) => {
                println!("{}", line);
                None
            }
            Err(e) => {
                let message = format!("{}: {:#}", input.display(), e);
                tracing::error!(input = %input.display(), error = %format!("{:#}", e), "finishing failed");
                Some(message)
            }
        })
        .collect();

    if failures.is_empty() {
        Ok(())
    } else {
        anyhow::bail!(
            "{} of {} inputs failed:\n  {}",
            failures.len(),
            inputs.len(),
            failures.join("\n  ")
        )
    }
}

fn finish_one(
    pipeline: &Pipeline,
    input: &Path,
    out_dir: &Path,
    content_type: Option<&str>,
) -> Result<String> {
    let bytes = std::fs::read(input).with_context(|| format!("reading {}", input.display()))?;

    let mut request = ConversionRequest::new(bytes);
    if let Some(name) = input.file_name().and_then(|n| n.to_str()) {
        request = request.with_filename(name);
    }
    if let Some(content_type) = content_type {
        request = request.with_content_type(content_type);
    }

    let finished = pipeline.finish(&request)?;

    let output = output_path(input, out_dir);
    std::fs::write(&output, &finished.data)
        .with_context(|| format!("writing {}", output.display()))?;

    let mut line = format!(
        "{} -> {} ({}x{}, q{}, {} bytes)",
        input.display(),
        output.display(),
        finished.width,
        finished.height,
        finished.quality,
        finished.data.len()
    );
    if finished.fallback_used {
        line.push_str(" [fallback]");
    }
    if finished.degraded {
        line.push_str(" [over cap]");
    }
    Ok(line)
}

fn output_path(input: &Path, out_dir: &Path) -> PathBuf {
    let stem = input
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("image");
    out_dir.join(format!("{}.jpg", stem))
}

/// Refuse a batch in which two inputs would write the same output file.
fn check_distinct_outputs(inputs: &[PathBuf], out_dir: &Path) -> Result<()> {
    let mut claimed: HashMap<PathBuf, &Path> = HashMap::new();
    for input in inputs {
        let output = output_path(input, out_dir);
        if let Some(first) = claimed.insert(output.clone(), input) {
            anyhow::bail!(
                "{} and {} would both be written to {}",
                first.display(),
                input.display(),
                output.display()
            );
        }
    }
    Ok(())
}

fn run_probe(inputs: &[PathBuf]) -> Result<()> {
    for input in inputs {
        let bytes = std::fs::read(input).with_context(|| format!("reading {}", input.display()))?;
        let filename = input.file_name().and_then(|n| n.to_str());
        println!("{}: {}", input.display(), probe(&bytes, filename, None));
    }
    Ok(())
}
