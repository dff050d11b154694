//! Output Formatting

use crate::commands::OutputFormat;
use chrono::{DateTime, Utc};
use rewards_core::{JobReport, RecipientArtifact, WindowArtifact};
use rewards_executor::{IngestSummary, PricingReport};
use serde::Serialize;

/// Everything `run-window` produced
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RunWindowOutput {
    pub ingest: IngestSummary,
    pub pricing: PricingReport,
    pub job: JobReport,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub window: Option<WindowArtifact>,
    pub recipients: Vec<RecipientArtifact>,
}

/// Outcome of checking one recipient proof
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProofCheck {
    pub account_index: u64,
    pub address: String,
    pub amount: String,
    pub valid: bool,
}

/// One schedule version with its digest check
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleCheck {
    pub schedule: &'static str,
    pub version_id: String,
    pub effective_from: DateTime<Utc>,
    pub digest: String,
    pub valid: bool,
    pub content: serde_json::Value,
}

/// Format and print data based on output format
pub fn print_output<T: Serialize>(data: &T, format: OutputFormat) {
    match format {
        OutputFormat::Json => print_json(data),
        // Generic types have no table layout
        OutputFormat::Table => print_json(data),
    }
}

/// Print as JSON
pub fn print_json<T: Serialize>(data: &T) {
    match serde_json::to_string_pretty(data) {
        Ok(json) => println!("{}", json),
        Err(e) => eprintln!("Error formatting JSON: {}", e),
    }
}

/// Print the result of `run-window`
pub fn print_run_window(result: &RunWindowOutput, format: OutputFormat) {
    match format {
        OutputFormat::Json => print_json(result),
        OutputFormat::Table => {
            println!("Ingestion");
            println!("=========");
            print_row("Applied", &result.ingest.applied.to_string());
            print_row("Duplicates", &result.ingest.duplicates.to_string());
            print_row("Parked", &result.ingest.parked.to_string());
            print_row("Ignored", &result.ingest.ignored.to_string());
            println!();

            println!("Pricing");
            println!("=======");
            print_row("Priced", &result.pricing.priced.to_string());
            for gap in &result.pricing.gaps {
                print_warning(&format!("deposit {} unpriced: {}", gap.deposit, gap.reason));
            }
            println!();

            print_job_report(&result.job);

            if let Some(window) = &result.window {
                println!();
                println!("Window Artifact");
                println!("===============");
                print_row("Chain", &window.chain_id.to_string());
                print_row("Contract", window.contract_address.as_str());
                print_row("Window Index", &window.window_index.to_string());
                print_row("Reward Token", window.reward_token.as_str());
                print_row("Rewards To Deposit", &window.rewards_to_deposit);
                print_row("Merkle Root", &window.merkle_root.to_string());
                println!();
                println!("{:<8} {:<44} {}", "Index", "Address", "Amount");
                print_separator();
                for r in &result.recipients {
                    println!("{:<8} {:<44} {}", r.account_index, r.address, r.amount);
                }
            }
        }
    }
}

/// Print a job report as rows
pub fn print_job_report(report: &JobReport) {
    println!("Job");
    println!("===");
    print_row("Job ID", report.job_id.as_str());
    print_row("Window Index", &report.window_index.to_string());
    print_row("Rewards Type", report.rewards_type.name());
    print_row("Status", &report.status.to_string());
    if let Some(error) = &report.error {
        print_row("Error", error);
    }
    if let Some(secs) = report.execution_time_seconds {
        print_row("Execution Time", &format!("{secs:.3}s"));
    }
    if let Some(root) = &report.merkle_root {
        print_row("Merkle Root", &root.to_string());
    }
    print_row("Recipients", &report.recipient_count.to_string());
}

/// Print proof checks
pub fn print_proof_checks(checks: &[ProofCheck], format: OutputFormat) {
    match format {
        OutputFormat::Json => print_json(&checks),
        OutputFormat::Table => {
            println!("{:<8} {:<44} {:<8} {}", "Index", "Address", "Status", "Amount");
            print_separator();
            for c in checks {
                let status = if c.valid { "VALID" } else { "INVALID" };
                println!("{:<8} {:<44} {:<8} {}", c.account_index, c.address, status, c.amount);
            }
        }
    }
}

/// Print warning message
pub fn print_warning(message: &str) {
    eprintln!("Warning: {}", message);
}

/// Print a table row
pub fn print_row(key: &str, value: &str) {
    println!("{:<20} {}", key, value);
}

/// Print a separator line
pub fn print_separator() {
    println!("{}", "-".repeat(72));
}
