//! Diploid/triploid mixture estimation for a trio, one row per chromosome

use clap::Parser;
use env_logger::Env;
use mixoploid_rs::{
    report::{build_mixoploid_report, write_mixoploid_report},
    utils::{command_line, validate_file_readable, Timer},
    validate_trio_samples,
    vcf::open_variant_source,
    TrioConfig, TrioError, TrioResult, TrioSamples,
};
use std::io::BufWriter;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "trio_mixoploid")]
#[command(about = "Estimate the diploid/triploid cell mixture of a proband from trio allele depths")]
#[command(long_about = "
Calculates the fraction of proband cells that are diploid, assuming a mixture
of diploid and triploid cells where the extra copy comes from the maternal line.

Only biallelic SNPs where proband, father and mother all pass the depth and
quality thresholds are used, and only sites where the parents are homozygous
for opposite alleles (0/0 x 1/1 and 1/1 x 0/0) enter the estimate.

A tab-separated table is written to standard output with one row per
chromosome and a final row pooling every numbered chromosome (autosomes).
Chromosomes without both informative site classes are reported as --.

A tabix index (.tbi or .csi) next to the VCF is used when present; otherwise
the file is scanned once per chromosome.
")]
struct Args {
    /// A bgzipped VCF file to analyze (data.vcf.gz)
    #[arg(value_name = "FILE")]
    input_vcf: PathBuf,

    /// Proband identifier in the VCF
    proband: String,

    /// Father identifier in the VCF
    father: String,

    /// Mother identifier in the VCF
    mother: String,

    /// Minimum read depth to consider a variant
    #[arg(short = 'd', long, default_value_t = TrioConfig::default().min_depth)]
    depth: u32,

    /// Minimum quality to consider a variant
    #[arg(short = 'q', long, default_value_t = TrioConfig::default().min_quality)]
    quality: u32,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Enable debug logging
    #[arg(long)]
    debug: bool,
}

fn run() -> TrioResult<()> {
    let args = Args::parse();

    // Initialize logging
    let log_level = if args.debug {
        "debug"
    } else if args.verbose {
        "info"
    } else {
        "warn"
    };

    env_logger::Builder::from_env(Env::default().default_filter_or(log_level))
        .format_timestamp_secs()
        .init();

    log::info!("Starting trio mixoploid analysis");
    log::info!("Input VCF: {:?}", args.input_vcf);

    validate_file_readable(&args.input_vcf)?;

    let samples = TrioSamples::new(args.proband, args.father, args.mother);
    validate_trio_samples(&samples)?;
    let config = TrioConfig {
        min_depth: args.depth,
        min_quality: args.quality,
    };
    log::info!(
        "Trio: proband={}, father={}, mother={}; depth>={}, quality>={}",
        samples.proband,
        samples.father,
        samples.mother,
        config.min_depth,
        config.min_quality
    );

    let mut source = open_variant_source(&args.input_vcf, &samples.labels())?;

    let report = {
        let _timer = Timer::new("Estimating mixture ratios");
        build_mixoploid_report(source.as_mut(), &samples, &config)?
    };

    if !report.skipped.is_empty() {
        log::warn!(
            "{} contigs had no indexed data: {}",
            report.skipped.len(),
            report.skipped.join(", ")
        );
    }

    let stdout = std::io::stdout();
    write_mixoploid_report(BufWriter::new(stdout.lock()), &command_line(), &config, &report)?;

    log::info!("Analysis completed successfully");
    Ok(())
}

/// Handle application errors and provide user-friendly messages
fn handle_error(error: TrioError) -> ! {
    match error {
        TrioError::FileNotFound(path) => {
            eprintln!("Error: Cannot read file '{}'.", path);
            eprintln!("Please check that the file exists and is readable.");
        }
        TrioError::MissingColumn { .. } | TrioError::MissingHeader(_) => {
            eprintln!("Error: {}", error);
            eprintln!("Please check the sample identifiers against the #CHROM header line.");
        }
        TrioError::InvalidConfig(msg) => {
            eprintln!("Error: Invalid configuration: {}", msg);
        }
        TrioError::Htslib(ref e) => {
            eprintln!("Error: VCF index processing error: {}", e);
            eprintln!("Please check that the VCF is bgzipped and its tabix index is current.");
        }
        TrioError::Io(ref e) => {
            eprintln!("Error: I/O error: {}", e);
        }
        TrioError::Csv(ref e) => {
            eprintln!("Error: Failed to write the report: {}", e);
        }
        TrioError::MissingContig(_) | TrioError::InvalidRecord(_) => {
            eprintln!("Error: {}", error);
        }
    }
    std::process::exit(1);
}

fn main() {
    if let Err(e) = run() {
        handle_error(e);
    }
}
