//! Data models for the age-distribution pipeline.
//!
//! This module contains the core data structures shared by the decoder,
//! the aggregator and the report generator: cell values, sample sets,
//! distribution buckets, the active source and the final report.

use chrono::{DateTime, Local, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::OnceLock;

/// Smallest accepted age (inclusive).
pub const MIN_AGE: u32 = 1;

/// Largest accepted age (inclusive).
pub const MAX_AGE: u32 = 150;

/// Zero-based index of the age column (column D).
pub const AGE_COLUMN: usize = 3;

/// Number of leading rows skipped as headers.
pub const HEADER_ROWS: usize = 1;

/// Built-in sample set used until a spreadsheet has been loaded.
pub const DEFAULT_AGES: [u32; 34] = [
    7, 9, 11, 8, 10, 6, 12, 7, 9, 11, 8, 10, 6, 12, // first batch
    7, 10, 12, 6, 10, 11, 12, 9, 10, 6, 9, 11, 9, 7, 10, 12, 9, 12, 6, 9,
];

/// A single decoded spreadsheet cell.
#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    /// Missing or blank cell.
    Empty,
    /// Any numeric cell (integers are widened to `f64`).
    Number(f64),
    /// Text that is not a number.
    Text(String),
    /// Boolean cell.
    Bool(bool),
}

impl CellValue {
    /// Interpret free text the way a spreadsheet import would:
    /// blank becomes `Empty`, numeric text becomes `Number`.
    pub fn from_text(raw: &str) -> Self {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return CellValue::Empty;
        }

        match trimmed.parse::<f64>() {
            Ok(n) if n.is_finite() => CellValue::Number(n),
            _ => CellValue::Text(trimmed.to_string()),
        }
    }

    /// Returns the cell as an age if it is a whole number in
    /// `MIN_AGE..=MAX_AGE`.
    pub fn as_age(&self) -> Option<u32> {
        match *self {
            CellValue::Number(n)
                if n.fract() == 0.0 && (MIN_AGE as f64..=MAX_AGE as f64).contains(&n) =>
            {
                Some(n as u32)
            }
            _ => None,
        }
    }
}

/// A non-empty, ordered collection of valid ages.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct SampleSet(Vec<u32>);

impl SampleSet {
    /// Build a sample set. Returns `None` when `ages` is empty or holds an
    /// age outside `MIN_AGE..=MAX_AGE`.
    pub fn new(ages: Vec<u32>) -> Option<Self> {
        if ages.is_empty() || ages.iter().any(|a| !(MIN_AGE..=MAX_AGE).contains(a)) {
            return None;
        }
        Some(Self(ages))
    }

    /// The built-in default sample set.
    pub fn builtin() -> &'static SampleSet {
        static DEFAULT: OnceLock<SampleSet> = OnceLock::new();
        DEFAULT.get_or_init(|| SampleSet(DEFAULT_AGES.to_vec()))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &u32> {
        self.0.iter()
    }

    pub fn sum(&self) -> u64 {
        self.0.iter().map(|&a| u64::from(a)).sum()
    }

    pub fn as_slice(&self) -> &[u32] {
        &self.0
    }
}

/// One age group in the distribution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DistributionBucket {
    /// The age this bucket counts.
    pub age: u32,
    /// Number of samples with exactly this age (always >= 1).
    pub count: usize,
    /// Share of all samples, rounded half-up to a whole percent.
    pub percentage: u32,
}

/// The aggregated view of a sample set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DistributionSummary {
    /// Buckets sorted ascending by age.
    pub buckets: Vec<DistributionBucket>,
    /// Number of samples.
    pub total: usize,
    /// Unrounded arithmetic mean.
    pub mean: f64,
}

impl DistributionSummary {
    /// Mean rounded to two decimals for display.
    pub fn rounded_mean(&self) -> f64 {
        (self.mean * 100.0).round() / 100.0
    }

    /// The bucket sitting at the mean rounded to the nearest whole age.
    ///
    /// `None` when nobody has that exact age; callers draw no marker then.
    pub fn reference_bucket(&self) -> Option<&DistributionBucket> {
        let target = self.mean.round() as u32;
        self.buckets.iter().find(|b| b.age == target)
    }
}

/// Samples taken from a successfully loaded spreadsheet.
#[derive(Debug, Clone, PartialEq)]
pub struct UploadedSamples {
    pub samples: SampleSet,
    /// File name shown to the user.
    pub file_name: String,
    pub loaded_at: DateTime<Local>,
}

/// The sample source currently in effect.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Active {
    #[default]
    Default,
    Uploaded(UploadedSamples),
}

impl Active {
    pub fn samples(&self) -> &SampleSet {
        match self {
            Active::Default => SampleSet::builtin(),
            Active::Uploaded(uploaded) => &uploaded.samples,
        }
    }

    pub fn source_info(&self) -> SourceInfo {
        match self {
            Active::Default => SourceInfo::Default,
            Active::Uploaded(uploaded) => SourceInfo::Uploaded {
                file_name: uploaded.file_name.clone(),
                loaded_at: uploaded.loaded_at,
            },
        }
    }
}

impl fmt::Display for Active {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.source_info().fmt(f)
    }
}

/// Serializable description of where the samples came from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum SourceInfo {
    Default,
    Uploaded {
        file_name: String,
        loaded_at: DateTime<Local>,
    },
}

impl fmt::Display for SourceInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SourceInfo::Default => write!(f, "built-in sample set"),
            SourceInfo::Uploaded {
                file_name,
                loaded_at,
            } => write!(
                f,
                "{} (loaded {})",
                file_name,
                loaded_at.format("%Y-%m-%d %H:%M:%S")
            ),
        }
    }
}

/// Metadata about a generated report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportMetadata {
    pub title: String,
    pub source: SourceInfo,
    pub generated_at: DateTime<Utc>,
}

/// Everything a rendering surface needs to draw the distribution.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Report {
    pub metadata: ReportMetadata,
    pub summary: DistributionSummary,
    /// Mean rounded to two decimals.
    pub average_age: f64,
    /// Age of the bucket that carries the average marker, if any.
    pub reference_age: Option<u32>,
}

impl Report {
    /// Assemble a report for the given source and its summary.
    pub fn new(title: &str, active: &Active, summary: DistributionSummary) -> Self {
        let average_age = summary.rounded_mean();
        let reference_age = summary.reference_bucket().map(|b| b.age);

        Self {
            metadata: ReportMetadata {
                title: title.to_string(),
                source: active.source_info(),
                generated_at: Utc::now(),
            },
            summary,
            average_age,
            reference_age,
        }
    }
}
