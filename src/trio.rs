//! Trio filtering and genotype-class aggregation of proband allele depths

use crate::{
    genotype::{decode_genotype, GenotypeRecord, MISSING_GENOTYPE},
    vcf::{VariantRecord, VariantSource},
    TrioConfig, TrioResult, TrioSamples,
};
use std::collections::BTreeMap;

pub const HOM_REF: &str = "0/0";
pub const HET: &str = "0/1";
pub const HOM_ALT: &str = "1/1";

/// Parental genotypes in the order used for the class table
pub const GENOTYPE_ORDER: [&str; 3] = [HOM_REF, HET, HOM_ALT];

/// (paternal genotype, maternal genotype)
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct GenotypeClass {
    pub paternal: String,
    pub maternal: String,
}

impl GenotypeClass {
    pub fn new(paternal: &str, maternal: &str) -> Self {
        Self {
            paternal: paternal.to_string(),
            maternal: maternal.to_string(),
        }
    }

    /// Father 0/0, mother 1/1
    pub fn ref_alt() -> Self {
        Self::new(HOM_REF, HOM_ALT)
    }

    /// Father 1/1, mother 0/0
    pub fn alt_ref() -> Self {
        Self::new(HOM_ALT, HOM_REF)
    }

    /// Parents homozygous for opposite alleles
    pub fn is_informative(&self) -> bool {
        (self.paternal == HOM_REF && self.maternal == HOM_ALT)
            || (self.paternal == HOM_ALT && self.maternal == HOM_REF)
    }

    pub fn label(&self) -> String {
        format!("{}_{}", self.paternal, self.maternal)
    }
}

/// Proband reference/alternate depths, one entry per bucketed variant
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClassDepths {
    pub ref_depths: Vec<u32>,
    pub alt_depths: Vec<u32>,
}

impl ClassDepths {
    pub fn push(&mut self, ref_depth: u32, alt_depth: u32) {
        self.ref_depths.push(ref_depth);
        self.alt_depths.push(alt_depth);
    }

    pub fn extend_from(&mut self, other: &ClassDepths) {
        self.ref_depths.extend_from_slice(&other.ref_depths);
        self.alt_depths.extend_from_slice(&other.alt_depths);
    }

    pub fn len(&self) -> usize {
        self.ref_depths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ref_depths.is_empty()
    }

    /// Per-variant B-allele frequencies; zero-depth entries are left out
    pub fn frequencies(&self) -> Vec<f64> {
        self.ref_depths
            .iter()
            .zip(&self.alt_depths)
            .filter_map(|(&r, &a)| {
                let total = r as u64 + a as u64;
                (total > 0).then(|| a as f64 / total as f64)
            })
            .collect()
    }

    /// Summed (reference, alternate) depth
    pub fn totals(&self) -> (u64, u64) {
        (
            self.ref_depths.iter().map(|&d| d as u64).sum(),
            self.alt_depths.iter().map(|&d| d as u64).sum(),
        )
    }
}

/// Which genotype classes receive depth observations
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BucketScope {
    /// Only (0/0, 1/1) and (1/1, 0/0)
    Informative,
    /// Every (father, mother) combination
    All,
}

/// What happened to one variant
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Observation {
    NotBiallelicSnp,
    BelowThreshold,
    Counted(GenotypeClass),
    Bucketed(GenotypeClass),
}

/// Everything collected for one contig
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContigAccumulator {
    pub contig: String,
    pub buckets: BTreeMap<GenotypeClass, ClassDepths>,
    pub class_counts: BTreeMap<GenotypeClass, usize>,
    pub records_seen: usize,
    pub biallelic_snps: usize,
    pub qualifying: usize,
}

impl ContigAccumulator {
    pub fn new(contig: &str) -> Self {
        Self {
            contig: contig.to_string(),
            buckets: BTreeMap::new(),
            class_counts: BTreeMap::new(),
            records_seen: 0,
            biallelic_snps: 0,
            qualifying: 0,
        }
    }

    pub fn bucket(&self, class: &GenotypeClass) -> Option<&ClassDepths> {
        self.buckets.get(class)
    }

    /// Both informative buckets, when each holds at least one observation
    pub fn informative_pair(&self) -> Option<(&ClassDepths, &ClassDepths)> {
        let ref_alt = self.bucket(&GenotypeClass::ref_alt()).filter(|b| !b.is_empty())?;
        let alt_ref = self.bucket(&GenotypeClass::alt_ref()).filter(|b| !b.is_empty())?;
        Some((ref_alt, alt_ref))
    }

    pub fn is_autosome(&self) -> bool {
        is_autosome(&self.contig)
    }
}

/// Strip an optional `chr` prefix from a contig name
pub fn strip_chr(contig: &str) -> &str {
    contig.strip_prefix("chr").unwrap_or(contig)
}

/// Contig names that are integers once `chr` is stripped
pub fn is_autosome(contig: &str) -> bool {
    strip_chr(contig).parse::<u64>().is_ok()
}

/// Applies the trio thresholds and buckets proband depths per genotype class
#[derive(Debug, Clone)]
pub struct TrioAggregator<'a> {
    samples: &'a TrioSamples,
    config: TrioConfig,
    scope: BucketScope,
}

impl<'a> TrioAggregator<'a> {
    pub fn new(samples: &'a TrioSamples, config: TrioConfig, scope: BucketScope) -> Self {
        Self {
            samples,
            config,
            scope,
        }
    }

    fn genotype(&self, record: &VariantRecord, label: &str) -> GenotypeRecord {
        match record.sample(label) {
            Some(raw) => decode_genotype(&record.format, raw),
            None => GenotypeRecord {
                genotype: MISSING_GENOTYPE.to_string(),
                quality: 0,
                depth: 0,
                allele_depths: None,
            },
        }
    }

    /// Classify one variant and, when it qualifies, record it in `acc`
    pub fn observe(&self, acc: &mut ContigAccumulator, record: &VariantRecord) -> Observation {
        acc.records_seen += 1;

        if !record.is_biallelic_snp() {
            return Observation::NotBiallelicSnp;
        }
        acc.biallelic_snps += 1;

        let proband = self.genotype(record, &self.samples.proband);
        let father = self.genotype(record, &self.samples.father);
        let mother = self.genotype(record, &self.samples.mother);

        let TrioConfig {
            min_depth,
            min_quality,
        } = self.config;
        if ![&proband, &father, &mother]
            .iter()
            .all(|g| g.passes(min_depth, min_quality))
        {
            return Observation::BelowThreshold;
        }
        // A zero depth threshold lets an undecoded proband AD through
        let Some((ref_depth, alt_depth)) = proband.allele_depths else {
            return Observation::BelowThreshold;
        };

        acc.qualifying += 1;
        let class = GenotypeClass::new(&father.genotype, &mother.genotype);
        *acc.class_counts.entry(class.clone()).or_insert(0) += 1;

        if self.scope == BucketScope::Informative && !class.is_informative() {
            return Observation::Counted(class);
        }

        acc.buckets
            .entry(class.clone())
            .or_default()
            .push(ref_depth, alt_depth);
        Observation::Bucketed(class)
    }

    /// Stream one contig from `source` and aggregate it
    pub fn aggregate_contig(
        &self,
        source: &mut dyn VariantSource,
        contig: &str,
    ) -> TrioResult<ContigAccumulator> {
        let mut acc = ContigAccumulator::new(contig);
        for record in source.stream(contig)? {
            let record = record?;
            self.observe(&mut acc, &record);
        }

        log::debug!(
            "{}: {} records, {} biallelic SNPs, {} passing thresholds",
            contig,
            acc.records_seen,
            acc.biallelic_snps,
            acc.qualifying
        );
        Ok(acc)
    }
}

/// Pooled informative-class depths across autosomes
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AutosomeTotals {
    pub ref_alt: ClassDepths,
    pub alt_ref: ClassDepths,
    pub contigs: Vec<String>,
}

impl AutosomeTotals {
    /// Add an autosomal contig whose two informative buckets are both populated
    pub fn add(&mut self, acc: &ContigAccumulator) -> bool {
        if !acc.is_autosome() {
            return false;
        }
        match acc.informative_pair() {
            Some((ref_alt, alt_ref)) => {
                self.ref_alt.extend_from(ref_alt);
                self.alt_ref.extend_from(alt_ref);
                self.contigs.push(acc.contig.clone());
                true
            }
            None => false,
        }
    }
}
