//! # mixoploid-rs - Trio B-allele frequency and mixoploidy tools
//!
//! Reads a VCF holding a proband and both parents, collects proband allele
//! depths at sites where the parents are homozygous for opposite alleles and
//! estimates the diploid/triploid cell mixture of the proband.

pub mod ballele;
pub mod genotype;
pub mod ratio;
pub mod report;
pub mod tabix;
pub mod trio;
pub mod utils;
pub mod vcf;

use std::path::PathBuf;

/// Sample labels of the trio as they appear in the VCF header
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrioSamples {
    pub proband: String,
    pub father: String,
    pub mother: String,
}

impl TrioSamples {
    pub fn new(proband: String, father: String, mother: String) -> Self {
        Self {
            proband,
            father,
            mother,
        }
    }

    /// Labels in proband, father, mother order
    pub fn labels(&self) -> [&str; 3] {
        [
            self.proband.as_str(),
            self.father.as_str(),
            self.mother.as_str(),
        ]
    }
}

/// Filtering thresholds applied to every sample of a variant
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TrioConfig {
    pub min_depth: u32,   // Minimum sum of allele depths
    pub min_quality: u32, // Minimum genotype quality
}

impl Default for TrioConfig {
    fn default() -> Self {
        Self {
            min_depth: 20,
            min_quality: 20,
        }
    }
}

/// Check that all trio labels are usable column names
pub fn validate_trio_samples(samples: &TrioSamples) -> TrioResult<()> {
    for label in samples.labels() {
        if label.trim().is_empty() {
            return Err(TrioError::InvalidConfig(
                "sample labels must not be empty".to_string(),
            ));
        }
        if label.contains('\t') {
            return Err(TrioError::InvalidConfig(format!(
                "sample label {:?} contains a tab",
                label
            )));
        }
    }
    Ok(())
}

/// Error types for the mixoploid library
#[derive(Debug, thiserror::Error)]
pub enum TrioError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("HTSlib error: {0}")]
    Htslib(#[from] rust_htslib::errors::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("VCF columns not found in {}", .0.display())]
    MissingHeader(PathBuf),

    #[error("Missing required column \"{column}\" in VCF file: {}", .path.display())]
    MissingColumn { column: String, path: PathBuf },

    #[error("No indexed data for contig {0}")]
    MissingContig(String),

    #[error("Invalid VCF record: {0}")]
    InvalidRecord(String),

    #[error("File not found: {0}")]
    FileNotFound(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

pub type TrioResult<T> = Result<T, TrioError>;
