//! Trio genotype-class depth table: proband allele depths for every
//! combination of parental genotypes, per chromosome

use clap::Parser;
use env_logger::Env;
use mixoploid_rs::{
    report::{build_class_table, write_class_table},
    utils::{command_line, validate_file_readable, Timer},
    validate_trio_samples,
    vcf::open_variant_source,
    TrioConfig, TrioError, TrioResult, TrioSamples,
};
use std::io::BufWriter;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "trio_ballele")]
#[command(about = "Summarize proband B-allele depths for each parental genotype combination")]
#[command(long_about = "
For every biallelic SNP where proband, father and mother pass the depth and
quality thresholds, the proband reference and alternate depths are summed
under the (father genotype, mother genotype) class of the site.

The output has one row per chromosome with the reference total, alternate
total and B-allele percentage of each of the nine classes over 0/0, 0/1 and
1/1. The preamble also carries the diploid fraction derived from the
depth-weighted autosomal frequencies of the 0/0 x 1/1 and 1/1 x 0/0 classes.
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

    validate_file_readable(&args.input_vcf)?;

    let samples = TrioSamples::new(args.proband, args.father, args.mother);
    validate_trio_samples(&samples)?;
    let config = TrioConfig {
        min_depth: args.depth,
        min_quality: args.quality,
    };

    let mut source = open_variant_source(&args.input_vcf, &samples.labels())?;
    let table = {
        let _timer = Timer::new("Building genotype-class table");
        build_class_table(source.as_mut(), &samples, &config)?
    };
    log::info!("Summarized {} contigs", table.contigs.len());

    let stdout = std::io::stdout();
    write_class_table(BufWriter::new(stdout.lock()), &command_line(), &config, &table)?;
    Ok(())
}

fn handle_error(error: TrioError) -> ! {
    match error {
        TrioError::FileNotFound(path) => {
            eprintln!("Error: Cannot read file '{}'.", path);
        }
        TrioError::Htslib(ref e) => {
            eprintln!("Error: VCF index processing error: {}", e);
            eprintln!("Please check that the VCF is bgzipped and its tabix index is current.");
        }
        other => {
            eprintln!("Error: {}", other);
        }
    }
    std::process::exit(1);
}

fn main() {
    if let Err(e) = run() {
        handle_error(e);
    }
}
