//! Command Handlers

use crate::commands::{fee::FeeCommands, verify::VerifyCommands, window::RunWindowArgs, Cli, Commands, OutputFormat};
use crate::error::{CliError, CliResult};
use crate::fixture::LedgerFixture;
use crate::output::{self, ProofCheck, RunWindowOutput, ScheduleCheck};
use rewards_core::{
    compute_pct_values, split_relayer_fee, verify_recipient, Address, JobStatus, MultiplierSchedule,
    RecipientArtifact, ScheduleVersion, TierSchedule, WindowArtifact,
};
use rewards_executor::{DepositPricer, EventIngestor, ExecutorConfig, RewardsWindowExecutor};
use rewards_store::InMemoryLedger;
use serde::Serialize;
use std::path::Path;
use std::sync::Arc;
use tracing::info;

/// Run the CLI with parsed arguments
pub async fn run(cli: Cli) -> CliResult<()> {
    match cli.command {
        Commands::RunWindow(ref args) => {
            let config = executor_config(&cli)?;
            let result = run_window(config, args).await?;
            output::print_run_window(&result, cli.format);
            if result.job.status == JobStatus::Failed {
                return Err(CliError::JobFailed {
                    job_id: result.job.job_id.to_string(),
                    message: result.job.error.clone().unwrap_or_default(),
                });
            }
            Ok(())
        }
        Commands::Verify(cmd) => handle_verify(cmd, cli.format),
        Commands::Fee(cmd) => handle_fee(cmd, cli.format),
        Commands::Schedules => handle_schedules(cli.format),
        Commands::Config => {
            let config = executor_config(&cli)?;
            output::print_output(&config, cli.format);
            Ok(())
        }
    }
}

/// `REWARDS_*` environment, overridden by flags
pub fn executor_config(cli: &Cli) -> CliResult<ExecutorConfig> {
    let mut config = ExecutorConfig::from_env().map_err(|e| CliError::config(e.to_string()))?;

    if let Some(chain_id) = cli.chain_id {
        config.chain_id = chain_id;
    }
    if let Some(contract) = &cli.contract {
        config.contract_address = parse_address("--contract", contract)?;
    }
    if let Some(token) = &cli.reward_token {
        config.reward_token = parse_address("--reward-token", token)?;
    }
    if let Some(decimals) = cli.reward_token_decimals {
        config.reward_token_decimals = decimals;
    }

    config.validate()?;
    Ok(config)
}

fn parse_address(flag: &str, value: &str) -> CliResult<Address> {
    Address::parse(value).map_err(|e| CliError::invalid_arg(format!("{flag}: {e}")))
}

/// Ingest the fixture, price deposits and build the window
pub async fn run_window(config: ExecutorConfig, args: &RunWindowArgs) -> CliResult<RunWindowOutput> {
    let job_config = args.job_config()?;
    let fixture = LedgerFixture::from_file(&args.fixture)?;

    let store = Arc::new(InMemoryLedger::new());
    let ingestor = EventIngestor::new(store.clone(), config.lp_fee_cap()?);
    let ingest = fixture.load(&store, &ingestor).await?;

    let pricing = DepositPricer::new(store.clone(), config.reward_token.clone(), config.chain_id)
        .price_pending()
        .await?;

    let executor = RewardsWindowExecutor::new(store, config)?;
    let job = executor.execute(args.window_index, job_config).await?;

    let (window, recipients) = if job.status == JobStatus::Done {
        let (window, recipients) = executor.artifacts(args.window_index).await?;
        if let Some(dir) = &args.out {
            write_artifacts(dir, &window, &recipients)?;
        }
        (Some(window), recipients)
    } else {
        (None, Vec::new())
    };

    Ok(RunWindowOutput {
        ingest,
        pricing,
        job,
        window,
        recipients,
    })
}

fn write_artifacts(dir: &Path, window: &WindowArtifact, recipients: &[RecipientArtifact]) -> CliResult<()> {
    std::fs::create_dir_all(dir)?;
    write_json(&dir.join("window.json"), window)?;
    write_json(&dir.join("recipients.json"), &recipients)?;
    info!(dir = %dir.display(), recipients = recipients.len(), "artifacts written");
    Ok(())
}

fn write_json<T: Serialize>(path: &Path, value: &T) -> CliResult<()> {
    std::fs::write(path, serde_json::to_string_pretty(value)?)?;
    Ok(())
}

/// Handle verify commands
fn handle_verify(cmd: VerifyCommands, format: OutputFormat) -> CliResult<()> {
    match cmd {
        VerifyCommands::Proofs { window, recipients } => {
            let window: WindowArtifact = serde_json::from_str(&std::fs::read_to_string(window)?)?;
            let recipients: Vec<RecipientArtifact> = serde_json::from_str(&std::fs::read_to_string(recipients)?)?;

            let checks = check_proofs(&window, &recipients)?;
            output::print_proof_checks(&checks, format);

            let failed = checks.iter().filter(|c| !c.valid).count();
            if failed > 0 {
                return Err(CliError::VerificationFailed {
                    failed,
                    total: checks.len(),
                });
            }
            Ok(())
        }
    }
}

/// Check each recipient against the window root
pub fn check_proofs(window: &WindowArtifact, recipients: &[RecipientArtifact]) -> CliResult<Vec<ProofCheck>> {
    recipients
        .iter()
        .map(|r| {
            let valid = r.window_index == window.window_index && verify_recipient(&window.merkle_root, r)?;
            Ok(ProofCheck {
                account_index: r.account_index,
                address: r.address.to_string(),
                amount: r.amount.clone(),
                valid,
            })
        })
        .collect()
}

/// Handle fee commands
fn handle_fee(cmd: FeeCommands, format: OutputFormat) -> CliResult<()> {
    match cmd {
        FeeCommands::Pct {
            wei_pct,
            amount,
            usd_price,
            decimals,
        } => {
            let values = compute_pct_values(&wei_pct, &amount, &usd_price, decimals)?;
            output::print_output(&values.formatted(), format);
        }
        FeeCommands::Split {
            gas_fee_usd,
            relayer_fee_usd,
            relayer_fee_pct,
        } => {
            let split = split_relayer_fee(&gas_fee_usd, &relayer_fee_usd, &relayer_fee_pct)?;
            output::print_output(&split.formatted(), format);
        }
    }
    Ok(())
}

/// Handle the schedules command
fn handle_schedules(format: OutputFormat) -> CliResult<()> {
    let checks = builtin_schedule_checks()?;
    output::print_output(&checks, format);

    let failed = checks.iter().filter(|c| !c.valid).count();
    if failed > 0 {
        return Err(CliError::ScheduleDigestMismatch {
            failed,
            total: checks.len(),
        });
    }
    Ok(())
}

/// Every version of the built-in tier and multiplier schedules
pub fn builtin_schedule_checks() -> CliResult<Vec<ScheduleCheck>> {
    let tiers = TierSchedule::with_default_v1()?;
    let multipliers = MultiplierSchedule::with_default_v1()?;
    let mut checks = schedule_checks("tiers", tiers.versions().versions())?;
    checks.extend(schedule_checks("multipliers", multipliers.versions().versions())?);
    Ok(checks)
}

/// Recompute each version's digest
pub fn schedule_checks<T: Serialize>(
    schedule: &'static str,
    versions: &[ScheduleVersion<T>],
) -> CliResult<Vec<ScheduleCheck>> {
    versions
        .iter()
        .map(|v| {
            Ok(ScheduleCheck {
                schedule,
                version_id: v.version_id.clone(),
                effective_from: v.effective_from,
                digest: v.digest.to_string(),
                valid: v.verify_digest()?,
                content: serde_json::to_value(&v.content)?,
            })
        })
        .collect()
}
