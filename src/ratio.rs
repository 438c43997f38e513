//! Diploid/triploid mixture estimation from informative-site allele frequencies
//!
//! At sites where the father is 0/0 and the mother 1/1 (f01), or the reverse
//! (f10), a proband made of a fraction `p` of diploid cells and `1 - p` of
//! triploid cells carrying an extra maternal copy shows
//!
//! ```text
//! f01 + e = 2/3 - p/6   =>   p + 6e = 4 - 6*f01
//! f10 + e = 1/3 + p/6   =>  -p + 6e = 2 - 6*f10
//! ```
//!
//! where `e` absorbs reference/technical bias.

use crate::trio::ClassDepths;

/// Left-hand side of the system, rows for f01 and f10, columns for (p, e)
const SYSTEM_LHS: [[f64; 2]; 2] = [[1.0, 6.0], [-1.0, 6.0]];

/// Solution of the mixture system
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RatioEstimate {
    pub diploid_fraction: f64,
    pub error: f64,
}

impl RatioEstimate {
    pub fn triploid_fraction(&self) -> f64 {
        1.0 - self.diploid_fraction
    }
}

/// Estimates from mean and from median frequencies
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MixtureEstimate {
    pub mean: RatioEstimate,
    pub median: RatioEstimate,
}

/// Solve for (p, e) given the central frequencies of both informative classes
pub fn solve_mixture(freq_ref_alt: f64, freq_alt_ref: f64) -> RatioEstimate {
    let rhs = [4.0 - 6.0 * freq_ref_alt, 2.0 - 6.0 * freq_alt_ref];
    let [[a, b], [c, d]] = SYSTEM_LHS;
    let det = a * d - b * c;

    RatioEstimate {
        diploid_fraction: (rhs[0] * d - b * rhs[1]) / det,
        error: (a * rhs[1] - rhs[0] * c) / det,
    }
}

pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f64>() / values.len() as f64)
}

/// Median; even-length input averages the two middle values
pub fn median(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));

    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        Some((sorted[mid - 1] + sorted[mid]) / 2.0)
    } else {
        Some(sorted[mid])
    }
}

/// Mean and median estimates, or `None` if either class has no usable frequency
pub fn estimate_mixture(ref_alt: &ClassDepths, alt_ref: &ClassDepths) -> Option<MixtureEstimate> {
    let f01 = ref_alt.frequencies();
    let f10 = alt_ref.frequencies();

    let by_mean = solve_mixture(mean(&f01)?, mean(&f10)?);
    let by_median = solve_mixture(median(&f01)?, median(&f10)?);
    Some(MixtureEstimate {
        mean: by_mean,
        median: by_median,
    })
}

/// Depth-weighted frequencies of both informative classes.
///
/// The (0/0, 1/1) ratio is ALT/total and falls back to 0.0 without alternate
/// reads; the (1/1, 0/0) ratio is REF/total and falls back to 1.0.
pub fn combined_frequencies(ref_alt: &ClassDepths, alt_ref: &ClassDepths) -> (f64, f64) {
    let (ref01, alt01) = ref_alt.totals();
    let (ref10, alt10) = alt_ref.totals();

    let ratio01 = if alt01 == 0 {
        log::warn!("no 0/0 and 1/1 alleles detected");
        0.0
    } else {
        alt01 as f64 / (alt01 + ref01) as f64
    };
    let ratio10 = if alt10 == 0 {
        log::warn!("no 1/1 and 0/0 alleles detected");
        1.0
    } else {
        1.0 - alt10 as f64 / (alt10 + ref10) as f64
    };

    (ratio01, ratio10)
}

/// Diploid fraction from pooled depths, assuming no bias term
pub fn derived_diploid_fraction(ref_alt: &ClassDepths, alt_ref: &ClassDepths) -> f64 {
    let (ratio01, ratio10) = combined_frequencies(ref_alt, alt_ref);
    let combined = 0.5 * ratio01 + 0.5 * ratio10;
    4.0 - 6.0 * combined
}
