//! Per-contig reports: mixoploid ratio table and trio genotype-class depth table

use crate::{
    ratio::{derived_diploid_fraction, estimate_mixture, MixtureEstimate},
    trio::{
        strip_chr, AutosomeTotals, BucketScope, ClassDepths, ContigAccumulator, GenotypeClass,
        TrioAggregator, GENOTYPE_ORDER,
    },
    vcf::VariantSource,
    TrioConfig, TrioError, TrioResult, TrioSamples,
};
use serde::{Serialize, Serializer};
use std::collections::BTreeMap;
use std::io::Write;

/// Printed in place of a statistic that could not be computed
pub const SENTINEL: &str = "--";

/// Label of the pooled autosome row
pub const AUTOSOMES: &str = "autosomes";

pub const MIXOPLOID_COLUMNS: [&str; 7] = [
    "chrom",
    "diploid_frac",
    "triploid_frac",
    "e",
    "diploid_frac_median",
    "triploid_frac_median",
    "e_median",
];

/// Aggregate one contig, turning a missing contig into a warning
pub fn aggregate_or_skip(
    aggregator: &TrioAggregator<'_>,
    source: &mut dyn VariantSource,
    contig: &str,
) -> TrioResult<Option<ContigAccumulator>> {
    match aggregator.aggregate_contig(source, contig) {
        Ok(acc) => {
            if acc.records_seen == 0 {
                log::warn!("No variants found for contig {}", contig);
            }
            Ok(Some(acc))
        }
        Err(TrioError::MissingContig(name)) => {
            log::warn!("Skipping contig {}: no indexed data", name);
            Ok(None)
        }
        Err(e) => Err(e),
    }
}

/// One line of the mixoploid table
#[derive(Debug, Clone, PartialEq)]
pub struct ReportRow {
    pub label: String,
    pub estimate: Option<MixtureEstimate>,
}

impl ReportRow {
    pub fn from_depths(label: &str, ref_alt: &ClassDepths, alt_ref: &ClassDepths) -> Self {
        Self {
            label: label.to_string(),
            estimate: estimate_mixture(ref_alt, alt_ref),
        }
    }

    pub fn sentinel(label: &str) -> Self {
        Self {
            label: label.to_string(),
            estimate: None,
        }
    }

    fn record(&self) -> RowRecord<'_> {
        let mean = self.estimate.map(|e| e.mean);
        let median = self.estimate.map(|e| e.median);
        RowRecord {
            chrom: &self.label,
            diploid_frac: Stat(mean.map(|r| r.diploid_fraction)),
            triploid_frac: Stat(mean.map(|r| r.triploid_fraction())),
            e: Stat(mean.map(|r| r.error)),
            diploid_frac_median: Stat(median.map(|r| r.diploid_fraction)),
            triploid_frac_median: Stat(median.map(|r| r.triploid_fraction())),
            e_median: Stat(median.map(|r| r.error)),
        }
    }
}

/// A statistic, serialized as [`SENTINEL`] when absent
struct Stat(Option<f64>);

impl Serialize for Stat {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self.0 {
            Some(value) => serializer.serialize_f64(value),
            None => serializer.serialize_str(SENTINEL),
        }
    }
}

#[derive(Serialize)]
struct RowRecord<'a> {
    chrom: &'a str,
    diploid_frac: Stat,
    triploid_frac: Stat,
    e: Stat,
    diploid_frac_median: Stat,
    triploid_frac_median: Stat,
    e_median: Stat,
}

/// All rows of a mixoploid run
#[derive(Debug, Clone, PartialEq)]
pub struct MixoploidReport {
    pub rows: Vec<ReportRow>,
    pub autosomes: ReportRow,
    pub skipped: Vec<String>,
}

/// Walk every contig of `source` and estimate the diploid fraction per contig
/// and for the pooled autosomes
pub fn build_mixoploid_report(
    source: &mut dyn VariantSource,
    samples: &TrioSamples,
    config: &TrioConfig,
) -> TrioResult<MixoploidReport> {
    let aggregator = TrioAggregator::new(samples, *config, BucketScope::Informative);
    let contigs = source.contigs()?;
    log::info!("Processing {} contigs", contigs.len());

    let mut rows = Vec::with_capacity(contigs.len());
    let mut totals = AutosomeTotals::default();
    let mut skipped = Vec::new();

    for contig in &contigs {
        let label = strip_chr(contig);
        let Some(acc) = aggregate_or_skip(&aggregator, source, contig)? else {
            skipped.push(contig.clone());
            rows.push(ReportRow::sentinel(label));
            continue;
        };

        let row = match acc.informative_pair() {
            Some((ref_alt, alt_ref)) => {
                totals.add(&acc);
                ReportRow::from_depths(label, ref_alt, alt_ref)
            }
            None => {
                log::info!("{}: not enough informative sites", contig);
                ReportRow::sentinel(label)
            }
        };
        rows.push(row);
    }

    log::info!(
        "Autosome total pooled from {} contigs ({} + {} informative sites)",
        totals.contigs.len(),
        totals.ref_alt.len(),
        totals.alt_ref.len()
    );
    let autosomes = ReportRow::from_depths(AUTOSOMES, &totals.ref_alt, &totals.alt_ref);

    Ok(MixoploidReport {
        rows,
        autosomes,
        skipped,
    })
}

fn write_parameters<W: Write>(out: &mut W, command: &str, config: &TrioConfig) -> TrioResult<()> {
    writeln!(out, "##COMMAND:")?;
    writeln!(out, "##  {}", command)?;
    writeln!(out, "##PARAMETERS:")?;
    writeln!(
        out,
        "##  MIN_DEPTH = at least {} reads to include variant",
        config.min_depth
    )?;
    writeln!(
        out,
        "##  MIN_QUALITY = at least {} quality score to include variant",
        config.min_quality
    )?;
    Ok(())
}

fn tsv_writer<W: Write>(out: W) -> csv::Writer<W> {
    csv::WriterBuilder::new()
        .delimiter(b'\t')
        .has_headers(false)
        .from_writer(out)
}

/// Write the commented preamble, header and one row per contig plus autosomes
pub fn write_mixoploid_report<W: Write>(
    mut out: W,
    command: &str,
    config: &TrioConfig,
    report: &MixoploidReport,
) -> TrioResult<()> {
    write_parameters(&mut out, command, config)?;
    writeln!(out, "##chrom - the chromosome tested")?;
    writeln!(out, "##diploid_frac - the fraction of cells that are diploid based on the mean statistics")?;
    writeln!(out, "##triploid_frac - the fraction of cells that are triploid based on the mean statistics")?;
    writeln!(out, "##e - the error value from the system using mean statistics, values greater than .01 may indicate an atypical sample")?;
    writeln!(out, "##diploid_frac_median - the fraction of cells that are diploid based on the median statistics")?;
    writeln!(out, "##triploid_frac_median - the fraction of cells that are triploid based on the median statistics")?;
    writeln!(out, "##e_median - the error value from the system using median statistics, values greater than .01 may indicate an atypical sample")?;
    writeln!(out, "#{}", MIXOPLOID_COLUMNS.join("\t"))?;

    let mut writer = tsv_writer(&mut out);
    for row in report.rows.iter().chain(std::iter::once(&report.autosomes)) {
        writer.serialize(row.record())?;
    }
    writer.flush()?;
    Ok(())
}

/// Summed proband depths per genotype class for one contig
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassSummary {
    pub contig: String,
    pub totals: BTreeMap<GenotypeClass, (u64, u64)>,
}

impl ClassSummary {
    fn from_accumulator(acc: &ContigAccumulator) -> Self {
        Self {
            contig: acc.contig.clone(),
            totals: acc
                .buckets
                .iter()
                .map(|(class, depths)| (class.clone(), depths.totals()))
                .collect(),
        }
    }

    /// (ref total, alt total, 100 * alt / (ref + alt)) of one class
    pub fn class_stats(&self, class: &GenotypeClass) -> (u64, u64, Option<f64>) {
        match self.totals.get(class) {
            Some(&(ref_total, alt_total)) if ref_total + alt_total > 0 => (
                ref_total,
                alt_total,
                Some(100.0 * alt_total as f64 / (ref_total + alt_total) as f64),
            ),
            Some(&(ref_total, alt_total)) => (ref_total, alt_total, None),
            None => (0, 0, None),
        }
    }
}

/// Genotype-class table over all contigs
#[derive(Debug, Clone, PartialEq)]
pub struct ClassTable {
    pub contigs: Vec<ClassSummary>,
    pub derived_diploid_fraction: f64,
}

/// The 3x3 parental genotype grid in row-major order
pub fn class_grid() -> Vec<GenotypeClass> {
    GENOTYPE_ORDER
        .iter()
        .flat_map(|p| GENOTYPE_ORDER.iter().map(move |m| GenotypeClass::new(p, m)))
        .collect()
}

/// Bucket every qualifying SNP by parental genotypes and derive the diploid
/// fraction from the pooled autosomal depths of the informative classes
pub fn build_class_table(
    source: &mut dyn VariantSource,
    samples: &TrioSamples,
    config: &TrioConfig,
) -> TrioResult<ClassTable> {
    let aggregator = TrioAggregator::new(samples, *config, BucketScope::All);
    let mut pooled_ref_alt = ClassDepths::default();
    let mut pooled_alt_ref = ClassDepths::default();
    let mut contigs = Vec::new();

    for contig in source.contigs()? {
        let acc = aggregate_or_skip(&aggregator, source, &contig)?
            .unwrap_or_else(|| ContigAccumulator::new(&contig));

        if acc.is_autosome() {
            if let Some(depths) = acc.bucket(&GenotypeClass::ref_alt()) {
                pooled_ref_alt.extend_from(depths);
            }
            if let Some(depths) = acc.bucket(&GenotypeClass::alt_ref()) {
                pooled_alt_ref.extend_from(depths);
            }
        }
        contigs.push(ClassSummary::from_accumulator(&acc));
    }

    let derived = derived_diploid_fraction(&pooled_ref_alt, &pooled_alt_ref);
    log::info!("Derived ratio = {}", derived);

    Ok(ClassTable {
        contigs,
        derived_diploid_fraction: derived,
    })
}

/// Write the class table: preamble, header, one row per contig
pub fn write_class_table<W: Write>(
    mut out: W,
    command: &str,
    config: &TrioConfig,
    table: &ClassTable,
) -> TrioResult<()> {
    write_parameters(&mut out, command, config)?;
    writeln!(out, "##DERIVED_RATIO = {}", table.derived_diploid_fraction)?;
    writeln!(out, "##<father>_<mother>_ref - summed proband reference depth")?;
    writeln!(out, "##<father>_<mother>_alt - summed proband alternate depth")?;
    writeln!(out, "##<father>_<mother>_baf - 100 * alt / (ref + alt), undefined if empty")?;

    let grid = class_grid();
    let mut header = vec!["#chrom".to_string()];
    for class in &grid {
        let label = class.label();
        header.push(format!("{}_ref", label));
        header.push(format!("{}_alt", label));
        header.push(format!("{}_baf", label));
    }

    let mut writer = tsv_writer(&mut out);
    writer.write_record(&header)?;
    for summary in &table.contigs {
        let mut record = vec![summary.contig.clone()];
        for class in &grid {
            let (ref_total, alt_total, baf) = summary.class_stats(class);
            record.push(ref_total.to_string());
            record.push(alt_total.to_string());
            record.push(baf.map_or_else(|| "undefined".to_string(), |b| b.to_string()));
        }
        writer.write_record(&record)?;
    }
    writer.flush()?;
    Ok(())
}
