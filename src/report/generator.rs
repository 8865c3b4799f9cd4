//! Report generation.
//!
//! This module renders a distribution [`Report`] as Markdown, JSON or
//! plain text. The JSON form is the hand-off format for charting
//! front-ends; the other two are for reading directly.

use crate::cli::OutputFormat;
use crate::config::ReportConfig;
use crate::models::{DistributionBucket, Report, ReportMetadata, SourceInfo};
use anyhow::{Context, Result};
use std::path::Path;

/// Render `report` in the requested format.
pub fn render(report: &Report, format: OutputFormat, options: &ReportConfig) -> Result<String> {
    match format {
        OutputFormat::Markdown => Ok(generate_markdown_report(report, options)),
        OutputFormat::Json => generate_json_report(report, options),
        OutputFormat::Text => Ok(generate_text_report(report, options)),
    }
}

/// Generate a complete Markdown report.
pub fn generate_markdown_report(report: &Report, options: &ReportConfig) -> String {
    let mut output = String::new();

    // Title
    output.push_str(&format!("# {}\n\n", report.metadata.title));

    // Metadata section
    output.push_str(&generate_metadata_section(report));

    // Distribution table
    output.push_str(&generate_distribution_section(report, options));

    // Footer
    output.push_str(&generate_footer(report, options));

    output
}

/// Generate the metadata section.
fn generate_metadata_section(report: &Report) -> String {
    let mut section = String::new();
    let metadata: &ReportMetadata = &report.metadata;

    section.push_str("## Summary\n\n");
    match &metadata.source {
        SourceInfo::Default => section.push_str("- **Source:** built-in sample set\n"),
        SourceInfo::Uploaded {
            file_name,
            loaded_at,
        } => {
            section.push_str(&format!("- **Source:** `{}`\n", file_name));
            section.push_str(&format!(
                "- **Loaded:** {}\n",
                loaded_at.format("%Y-%m-%d %H:%M:%S")
            ));
        }
    }
    section.push_str(&format!("- **Total:** {} people\n", report.summary.total));
    section.push_str(&format!(
        "- **Average age:** {} years\n",
        report.average_age
    ));
    section.push('\n');

    section
}

/// Generate the distribution table.
fn generate_distribution_section(report: &Report, options: &ReportConfig) -> String {
    let mut section = String::new();

    section.push_str("## Distribution\n\n");
    if options.show_percentages {
        section.push_str("| Age | Count | Share |\n");
        section.push_str("|:---:|:---:|:---:|\n");
    } else {
        section.push_str("| Age | Count |\n");
        section.push_str("|:---:|:---:|\n");
    }

    for bucket in &report.summary.buckets {
        let age = if is_marked(report, bucket, options) {
            format!("**{}** ◀ average", bucket.age)
        } else {
            bucket.age.to_string()
        };

        if options.show_percentages {
            section.push_str(&format!(
                "| {} | {} | {}% |\n",
                age, bucket.count, bucket.percentage
            ));
        } else {
            section.push_str(&format!("| {} | {} |\n", age, bucket.count));
        }
    }
    section.push('\n');

    section
}

/// Generate the report footer.
fn generate_footer(report: &Report, options: &ReportConfig) -> String {
    let mut footer = String::new();

    footer.push_str("---\n\n");
    if options.show_reference && report.reference_age.is_some() {
        footer.push_str(&format!(
            "*The marked row is the age group at the average age ({} years).*\n",
            report.average_age
        ));
    }
    footer.push_str(&format!(
        "*Generated {}*\n",
        report.metadata.generated_at.format("%Y-%m-%d %H:%M:%S UTC")
    ));

    footer
}

/// Generate a plain-text report, one line per age.
pub fn generate_text_report(report: &Report, options: &ReportConfig) -> String {
    let mut lines = Vec::new();

    lines.push(report.metadata.title.clone());
    lines.push(format!("Source: {}", report.metadata.source));
    lines.push(format!("Total: {} people", report.summary.total));
    lines.push(format!("Average age: {} years", report.average_age));
    lines.push(String::new());

    for bucket in &report.summary.buckets {
        let mut line = format!("{:>4} years: {:>4}", bucket.age, bucket.count);
        if options.show_percentages {
            line.push_str(&format!(" ({:>3}%)", bucket.percentage));
        }
        if is_marked(report, bucket, options) {
            line.push_str("  <- average");
        }
        lines.push(line);
    }

    let mut text = lines.join("\n");
    text.push('\n');
    text
}

/// Generate a JSON report.
///
/// With `show_percentages` off the buckets carry no `percentage` field;
/// with `show_reference` off `reference_age` is `null`.
pub fn generate_json_report(report: &Report, options: &ReportConfig) -> Result<String> {
    let mut value = serde_json::to_value(report)?;

    if !options.show_reference {
        value["reference_age"] = serde_json::Value::Null;
    }
    if !options.show_percentages {
        if let Some(buckets) = value["summary"]["buckets"].as_array_mut() {
            for bucket in buckets.iter_mut().filter_map(|b| b.as_object_mut()) {
                bucket.remove("percentage");
            }
        }
    }

    serde_json::to_string_pretty(&value).map_err(Into::into)
}

/// Write rendered report content to a file.
pub fn write_report(content: &str, path: &Path) -> Result<()> {
    std::fs::write(path, content)
        .with_context(|| format!("Failed to write report to {}", path.display()))
}

fn is_marked(report: &Report, bucket: &DistributionBucket, options: &ReportConfig) -> bool {
    options.show_reference && report.reference_age == Some(bucket.age)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::aggregate;
    use crate::models::{Active, SampleSet, UploadedSamples};
    use chrono::Local;

    fn default_report() -> Report {
        let active = Active::Default;
        Report::new("Age Distribution", &active, aggregate(active.samples()))
    }

    fn uploaded_report(ages: Vec<u32>) -> Report {
        let active = Active::Uploaded(UploadedSamples {
            samples: SampleSet::new(ages).unwrap(),
            file_name: "klasse.xlsx".to_string(),
            loaded_at: Local::now(),
        });
        Report::new("Klasse 4B", &active, aggregate(active.samples()))
    }

    #[test]
    fn test_generate_markdown_report() {
        let report = default_report();
        let markdown = generate_markdown_report(&report, &ReportConfig::default());

        assert!(markdown.contains("# Age Distribution"));
        assert!(markdown.contains("## Summary"));
        assert!(markdown.contains("built-in sample set"));
        assert!(markdown.contains("- **Total:** 34 people"));
        assert!(markdown.contains("- **Average age:** 9.21 years"));
        assert!(markdown.contains("| **9** ◀ average | 7 | 21% |"));
        assert!(markdown.contains("| 6 | 5 | 15% |"));
        assert!(markdown.contains("average age (9.21 years)"));
    }

    #[test]
    fn test_markdown_without_percentages_or_marker() {
        let report = default_report();
        let options = ReportConfig {
            show_percentages: false,
            show_reference: false,
            ..ReportConfig::default()
        };
        let markdown = generate_markdown_report(&report, &options);

        assert!(markdown.contains("| Age | Count |\n"));
        assert!(markdown.contains("| 9 | 7 |"));
        assert!(!markdown.contains("◀"));
        assert!(!markdown.contains('%'));
    }

    #[test]
    fn test_markdown_uploaded_source() {
        let report = uploaded_report(vec![20, 30]);
        let markdown = generate_markdown_report(&report, &ReportConfig::default());

        assert!(markdown.contains("# Klasse 4B"));
        assert!(markdown.contains("- **Source:** `klasse.xlsx`"));
        assert!(markdown.contains("- **Loaded:** "));
    }

    #[test]
    fn test_missing_reference_bucket_draws_no_marker() {
        // Average is 25 but nobody is 25.
        let report = uploaded_report(vec![20, 30]);
        assert_eq!(report.reference_age, None);

        let markdown = generate_markdown_report(&report, &ReportConfig::default());
        assert!(!markdown.contains("◀"));
        assert!(!markdown.contains("marked row"));

        let text = generate_text_report(&report, &ReportConfig::default());
        assert!(!text.contains("<- average"));
    }

    #[test]
    fn test_generate_text_report() {
        let report = default_report();
        let text = generate_text_report(&report, &ReportConfig::default());

        assert!(text.starts_with("Age Distribution\n"));
        assert!(text.contains("Source: built-in sample set"));
        assert!(text.contains("   9 years:    7 ( 21%)  <- average"));
        assert_eq!(text.lines().filter(|l| l.contains("years:")).count(), 7);
    }

    #[test]
    fn test_generate_json_report() {
        let report = default_report();
        let json = generate_json_report(&report, &ReportConfig::default()).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();

        assert_eq!(value["summary"]["total"], 34);
        assert_eq!(value["average_age"], 9.21);
        assert_eq!(value["reference_age"], 9);
        assert_eq!(value["metadata"]["source"]["kind"], "default");
        assert_eq!(value["summary"]["buckets"][0]["age"], 6);
        assert_eq!(value["summary"]["buckets"][0]["percentage"], 15);
    }

    #[test]
    fn test_json_uploaded_source() {
        let report = uploaded_report(vec![20, 30]);
        let json = generate_json_report(&report, &ReportConfig::default()).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();

        assert_eq!(value["metadata"]["source"]["kind"], "uploaded");
        assert_eq!(value["metadata"]["source"]["file_name"], "klasse.xlsx");
        assert!(value["reference_age"].is_null());
    }

    #[test]
    fn test_json_honours_report_options() {
        let report = default_report();
        let options = ReportConfig {
            show_percentages: false,
            show_reference: false,
            ..ReportConfig::default()
        };
        let value: serde_json::Value =
            serde_json::from_str(&render(&report, OutputFormat::Json, &options).unwrap()).unwrap();

        assert!(value["reference_age"].is_null());
        let buckets = value["summary"]["buckets"].as_array().unwrap();
        assert_eq!(buckets.len(), 7);
        assert!(buckets.iter().all(|b| b.get("percentage").is_none()));
        assert_eq!(buckets[3]["age"], 9);
        assert_eq!(buckets[3]["count"], 7);
        assert_eq!(value["average_age"], 9.21);
    }

    #[test]
    fn test_render_dispatch() {
        let report = default_report();
        let options = ReportConfig::default();

        assert!(render(&report, OutputFormat::Markdown, &options)
            .unwrap()
            .starts_with("# "));
        assert!(render(&report, OutputFormat::Json, &options)
            .unwrap()
            .starts_with('{'));
        assert!(render(&report, OutputFormat::Text, &options)
            .unwrap()
            .starts_with("Age Distribution"));
    }

    #[test]
    fn test_write_report() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("report.md");

        write_report("# Ages\n", &path).unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "# Ages\n");

        let missing = dir.path().join("no/such/dir/report.md");
        assert!(write_report("x", &missing).is_err());
    }
}
