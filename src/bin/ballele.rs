//! B-allele frequencies of a single sample, one row per passing variant

use anyhow::{Context, Result};
use clap::Parser;
use env_logger::Env;
use mixoploid_rs::{
    ballele::{single_sample_defaults, write_sample_baf},
    utils::validate_file_readable,
    vcf::open_variant_source,
    TrioConfig,
};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "ballele")]
#[command(about = "Per-variant B-allele frequencies (percent ALT reads) of one sample")]
struct Args {
    /// The input VCF file to analyze
    #[arg(value_name = "FILE")]
    input_vcf: PathBuf,

    /// The sample identifier in the VCF
    sample: String,

    /// Output TSV file (standard output if omitted)
    #[arg(short, long, value_name = "FILE")]
    output: Option<PathBuf>,

    /// Minimum read depth to consider a variant
    #[arg(short = 'd', long, default_value_t = single_sample_defaults().min_depth)]
    depth: u32,

    /// Minimum quality to consider a variant
    #[arg(short = 'q', long, default_value_t = single_sample_defaults().min_quality)]
    quality: u32,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let log_level = if args.verbose { "info" } else { "warn" };
    env_logger::Builder::from_env(Env::default().default_filter_or(log_level))
        .format_timestamp_secs()
        .init();

    validate_file_readable(&args.input_vcf)
        .with_context(|| format!("Cannot read file {:?}", args.input_vcf))?;

    let config = TrioConfig {
        min_depth: args.depth,
        min_quality: args.quality,
    };
    let mut source = open_variant_source(&args.input_vcf, &[args.sample.as_str()])
        .with_context(|| format!("Failed to open {:?}", args.input_vcf))?;

    let out: Box<dyn Write> = match &args.output {
        Some(path) => {
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            let file = File::create(path)
                .with_context(|| format!("Failed to create output {:?}", path))?;
            Box::new(BufWriter::new(file))
        }
        None => Box::new(BufWriter::new(std::io::stdout().lock())),
    };

    let written = write_sample_baf(source.as_mut(), &args.sample, &config, out)
        .context("Failed to extract B-allele frequencies")?;
    log::info!("Wrote {} B-allele frequency rows", written);

    Ok(())
}
