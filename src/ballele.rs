//! Single-sample B-allele frequencies along each contig

use crate::{
    genotype::decode_genotype,
    vcf::{VariantRecord, VariantSource},
    TrioConfig, TrioError, TrioResult,
};
use serde::Serialize;
use std::io::Write;

/// Thresholds used when a single sample is inspected
pub fn single_sample_defaults() -> TrioConfig {
    TrioConfig {
        min_depth: 8,
        min_quality: 0,
    }
}

/// One plotted point: position and alternate read percentage
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BafPoint {
    pub chrom: String,
    pub pos: u64,
    pub baf: f64,
}

/// B-allele percentage of `sample` at `record`, if the call passes `config`
pub fn sample_baf(record: &VariantRecord, sample: &str, config: &TrioConfig) -> Option<BafPoint> {
    if record.is_multiallelic() {
        return None;
    }
    let genotype = decode_genotype(&record.format, record.sample(sample)?);
    let (ref_depth, alt_depth) = genotype.allele_depths?;
    if !genotype.passes(config.min_depth, config.min_quality) {
        return None;
    }
    let total = ref_depth as u64 + alt_depth as u64;
    if total == 0 {
        return None;
    }

    Some(BafPoint {
        chrom: record.chrom.clone(),
        pos: record.pos,
        baf: 100.0 * alt_depth as f64 / total as f64,
    })
}

/// Stream every contig of `source` and write `chrom pos baf` rows to `out`.
///
/// Returns the number of rows written.
pub fn write_sample_baf<W: Write>(
    source: &mut dyn VariantSource,
    sample: &str,
    config: &TrioConfig,
    out: W,
) -> TrioResult<usize> {
    let mut writer = csv::WriterBuilder::new().delimiter(b'\t').from_writer(out);
    let mut written = 0;

    for contig in source.contigs()? {
        let stream = match source.stream(&contig) {
            Ok(stream) => stream,
            Err(TrioError::MissingContig(name)) => {
                log::warn!("Skipping contig {}: no indexed data", name);
                continue;
            }
            Err(e) => return Err(e),
        };

        let mut contig_points = 0;
        for record in stream {
            if let Some(point) = sample_baf(&record?, sample, config) {
                writer.serialize(&point)?;
                contig_points += 1;
            }
        }
        log::info!("{}: {} points", contig, contig_points);
        written += contig_points;
    }

    writer.flush()?;
    Ok(written)
}
