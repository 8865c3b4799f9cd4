//! Age extraction and distribution statistics.
//!
//! This module turns decoded spreadsheet rows into a validated sample set
//! and computes the frequency distribution and mean for a sample set.

use crate::error::UploadError;
use crate::models::{CellValue, DistributionBucket, DistributionSummary, SampleSet, HEADER_ROWS};
use std::collections::BTreeMap;
use tracing::debug;

/// Pull the ages out of `column_index` of every row after the header.
///
/// Cells that are missing, non-numeric, fractional or outside the accepted
/// range are dropped. Row order is preserved.
pub fn extract_ages<R>(rows: &[R], column_index: usize) -> Result<SampleSet, UploadError>
where
    R: AsRef<[CellValue]>,
{
    let data_rows = rows.len().saturating_sub(HEADER_ROWS);

    let ages: Vec<u32> = rows
        .iter()
        .skip(HEADER_ROWS)
        .filter_map(|row| row.as_ref().get(column_index))
        .filter_map(CellValue::as_age)
        .collect();

    debug!(
        "Accepted {} of {} data rows from column {}",
        ages.len(),
        data_rows,
        column_index
    );

    SampleSet::new(ages).ok_or(UploadError::NoValidData)
}

/// Group a sample set into per-age buckets and compute its mean.
pub fn aggregate(samples: &SampleSet) -> DistributionSummary {
    let mut counts: BTreeMap<u32, usize> = BTreeMap::new();

    for &age in samples.iter() {
        *counts.entry(age).or_default() += 1;
    }

    let total = samples.len();
    let buckets = counts
        .into_iter()
        .map(|(age, count)| DistributionBucket {
            age,
            count,
            percentage: percentage(count, total),
        })
        .collect();

    DistributionSummary {
        buckets,
        total,
        mean: samples.sum() as f64 / total as f64,
    }
}

/// `part / total` as a whole percent, rounding halves up.
pub fn percentage(part: usize, total: usize) -> u32 {
    if total == 0 {
        return 0;
    }
    ((part * 200 + total) / (total * 2)) as u32
}
