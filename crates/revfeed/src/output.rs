use std::io::IsTerminal;
use std::time::Duration;

use clap::ValueEnum;
use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use revfeed::demux::DemuxOutcome;
use revfeed::SessionReport;
use serde::Serialize;

#[derive(Clone, Debug, Copy, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Pretty,
}

impl OutputFormat {
    pub fn default_for_stdout() -> Self {
        if std::io::stdout().is_terminal() {
            Self::Table
        } else {
            Self::Json
        }
    }
}

#[derive(Serialize)]
struct SummaryOutput<'a> {
    source: &'a str,
    outcome: &'static str,
    pairs: u64,
    revisions: u64,
    registered_revisions: u64,
    missing_metadata: u64,
    mismatched_metadata: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    orphaned_revision: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
    elapsed_ms: u64,
}

impl<'a> SummaryOutput<'a> {
    fn new(report: &'a SessionReport, source: &'a str, elapsed: Duration) -> Self {
        Self {
            source,
            outcome: outcome_name(&report.outcome),
            pairs: report.outcome.pairs(),
            revisions: report.summary.revisions,
            registered_revisions: report.summary.registered_revisions,
            missing_metadata: report.summary.missing_metadata,
            mismatched_metadata: report.summary.mismatched_metadata,
            orphaned_revision: report.outcome.orphaned_revision(),
            error: report.outcome.error().map(ToString::to_string),
            elapsed_ms: u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX),
        }
    }
}

fn outcome_name(outcome: &DemuxOutcome) -> &'static str {
    match outcome {
        DemuxOutcome::Completed { .. } => "completed",
        DemuxOutcome::Inconsistent { .. } => "inconsistent",
        DemuxOutcome::Failed { .. } => "failed",
    }
}

pub fn print_summary(report: &SessionReport, source: &str, elapsed: Duration, format: OutputFormat) {
    let out = SummaryOutput::new(report, source, elapsed);
    match format {
        OutputFormat::Json => {
            println!(
                "{}",
                serde_json::to_string(&out).unwrap_or_else(|_| "{}".to_string())
            );
        }
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec!["FIELD", "VALUE"]);
            let mut rows = vec![
                ("source", out.source.to_string()),
                ("outcome", out.outcome.to_string()),
                ("pairs", out.pairs.to_string()),
                ("revisions", out.revisions.to_string()),
                ("registered revisions", out.registered_revisions.to_string()),
                ("missing metadata", out.missing_metadata.to_string()),
                ("mismatched metadata", out.mismatched_metadata.to_string()),
            ];
            if let Some(revision_id) = out.orphaned_revision {
                rows.push(("orphaned revision", revision_id.to_string()));
            }
            if let Some(error) = &out.error {
                rows.push(("error", error.clone()));
            }
            rows.push(("elapsed", format!("{} ms", out.elapsed_ms)));
            for (field, value) in rows {
                table.add_row(vec![field.to_string(), value]);
            }
            println!("{table}");
        }
        OutputFormat::Pretty => {
            print!(
                "source={} outcome={} pairs={} revisions={} registered={} elapsed_ms={}",
                out.source,
                out.outcome,
                out.pairs,
                out.revisions,
                out.registered_revisions,
                out.elapsed_ms
            );
            if let Some(revision_id) = out.orphaned_revision {
                print!(" orphaned_revision={revision_id}");
            }
            if let Some(error) = &out.error {
                print!(" error={error:?}");
            }
            println!();
        }
    }
}

#[cfg(test)]
mod tests {
    use revfeed::stats::CorpusSummary;

    use super::*;

    #[test]
    fn json_summary_names_the_outcome() {
        let report = SessionReport {
            outcome: DemuxOutcome::Inconsistent {
                pairs: 4,
                revision_id: "17".to_string(),
            },
            summary: CorpusSummary {
                revisions: 4,
                registered_revisions: 1,
                ..CorpusSummary::default()
            },
        };

        let out = SummaryOutput::new(&report, "corpus.bin", Duration::from_millis(1500));
        let json: serde_json::Value = serde_json::to_value(&out).unwrap();

        assert_eq!(json["outcome"], "inconsistent");
        assert_eq!(json["pairs"], 4);
        assert_eq!(json["orphaned_revision"], "17");
        assert_eq!(json["elapsed_ms"], 1500);
        assert!(json.get("error").is_none());
    }
}
