//! Per-sample FORMAT field decoding

use std::num::ParseIntError;

/// Genotype reported when a sample has no GT field
pub const MISSING_GENOTYPE: &str = "./.";

/// FORMAT keys zipped positionally against one sample's values
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SampleFields<'a> {
    entries: Vec<(&'a str, &'a str)>,
}

impl<'a> SampleFields<'a> {
    pub fn get(&self, key: &str) -> Option<&'a str> {
        self.entries
            .iter()
            .find(|(k, _)| *k == key)
            .map(|(_, v)| *v)
    }

    pub fn keys(&self) -> impl Iterator<Item = &'a str> + '_ {
        self.entries.iter().map(|(k, _)| *k)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Pair FORMAT names with the colon-delimited values of a sample.
///
/// When the counts differ the surplus on either side is dropped, so absent
/// keys simply look up as `None`.
pub fn decode<'a, S: AsRef<str>>(format: &'a [S], raw: &'a str) -> SampleFields<'a> {
    let entries = format
        .iter()
        .map(|name| name.as_ref())
        .zip(raw.split(':'))
        .collect();
    SampleFields { entries }
}

/// Why a single FORMAT value could not be used
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FieldError {
    #[error("field is absent")]
    Missing,

    #[error("unparsable value {0:?}")]
    Unparsable(String),

    #[error("expected 2 allele depths, found {0}")]
    WrongArity(usize),
}

impl From<ParseIntError> for FieldError {
    fn from(e: ParseIntError) -> Self {
        FieldError::Unparsable(e.to_string())
    }
}

/// Parse GQ; `.` counts as unparsable
pub fn parse_quality(raw: Option<&str>) -> Result<u32, FieldError> {
    let raw = raw.ok_or(FieldError::Missing)?;
    Ok(raw.trim().parse::<u32>()?)
}

/// Parse AD as a (reference, alternate) pair
pub fn parse_allele_depths(raw: Option<&str>) -> Result<(u32, u32), FieldError> {
    let raw = raw.ok_or(FieldError::Missing)?;
    let depths = raw
        .split(',')
        .map(|d| d.trim().parse::<u32>())
        .collect::<Result<Vec<_>, _>>()?;

    match depths.as_slice() {
        [ref_depth, alt_depth] => Ok((*ref_depth, *alt_depth)),
        other => Err(FieldError::WrongArity(other.len())),
    }
}

/// Typed view of one sample at one variant
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenotypeRecord {
    pub genotype: String,
    pub quality: u32,
    pub depth: u32,
    pub allele_depths: Option<(u32, u32)>,
}

impl GenotypeRecord {
    pub fn passes(&self, min_depth: u32, min_quality: u32) -> bool {
        self.depth >= min_depth && self.quality >= min_quality
    }

    /// Alternate / (reference + alternate), if any reads were counted
    pub fn allele_frequency(&self) -> Option<f64> {
        let (ref_depth, alt_depth) = self.allele_depths?;
        let total = ref_depth as u64 + alt_depth as u64;
        (total > 0).then(|| alt_depth as f64 / total as f64)
    }
}

/// Resolve GT, GQ and AD with their fallbacks: `./.`, 0 and no depths
pub fn extract_genotype_stats(fields: &SampleFields<'_>) -> GenotypeRecord {
    let genotype = fields.get("GT").unwrap_or(MISSING_GENOTYPE).to_string();

    let quality = parse_quality(fields.get("GQ")).unwrap_or_else(|e| {
        log::trace!("GQ defaulted to 0: {}", e);
        0
    });

    let allele_depths = match parse_allele_depths(fields.get("AD")) {
        Ok(depths) => Some(depths),
        Err(e) => {
            log::trace!("AD dropped: {}", e);
            None
        }
    };
    let depth = allele_depths
        .map(|(r, a)| r.saturating_add(a))
        .unwrap_or(0);

    GenotypeRecord {
        genotype,
        quality,
        depth,
        allele_depths,
    }
}

/// Decode a raw sample column straight into a [`GenotypeRecord`]
pub fn decode_genotype<S: AsRef<str>>(format: &[S], raw: &str) -> GenotypeRecord {
    extract_genotype_stats(&decode(format, raw))
}
