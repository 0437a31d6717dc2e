//! CUSTOS Governance Core — Demo CLI
//!
//! Runs one or all of the four governance scenarios. Each scenario wires
//! real CUSTOS components (constraint store, validator, conflict resolver,
//! escalation gateway, rollback controller, audit ledger) end to end.
//!
//! Usage:
//!   cargo run -p demo -- run-all
//!   cargo run -p demo -- no-harm
//!   cargo run -p demo -- priority-tie
//!   cargo run -p demo -- rollback
//!   cargo run -p demo -- timeout

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use custos_contracts::error::CustosResult;

mod scenarios;

// ── CLI definition ────────────────────────────────────────────────────────────

/// CUSTOS — policy-gated governance core demo.
///
/// Each subcommand runs one or all of the four governance scenarios,
/// demonstrating axiom enforcement, conflict escalation, checkpointed
/// rollback, and audit chain integrity.
#[derive(Parser)]
#[command(
    name = "demo",
    about = "CUSTOS governance core demo",
    long_about = "Runs CUSTOS governance scenarios showing axiom enforcement,\n\
                  priority-tie escalation, checkpointed rollback, and the\n\
                  hash-chained audit ledger."
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run all four governance scenarios in sequence.
    RunAll,
    /// Scenario 1: a hard axiom rejects a harmful intent with a full
    /// reasoning chain.
    NoHarm,
    /// Scenario 2: an exact priority tie escalates; a human verdict settles
    /// it.
    PriorityTie,
    /// Scenario 3: checkpoint, commit, and digest-verified rollback.
    Rollback,
    /// Scenario 4: an escalation deadline passes and the default Reject
    /// applies.
    Timeout,
}

// ── Entry point ───────────────────────────────────────────────────────────────

fn main() {
    // Structured logging. Set RUST_LOG=debug for verbose output.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_target(false)
        .compact()
        .init();

    let cli = Cli::parse();

    print_banner();

    let result = match cli.command {
        Command::RunAll => run_all(),
        Command::NoHarm => scenarios::no_harm::run_scenario(),
        Command::PriorityTie => scenarios::priority_tie::run_scenario(),
        Command::Rollback => scenarios::rollback::run_scenario(),
        Command::Timeout => scenarios::timeout::run_scenario(),
    };

    match result {
        Ok(()) => {
            println!("All selected scenarios completed successfully.");
        }
        Err(e) => {
            eprintln!("Demo error: {}", e);
            std::process::exit(1);
        }
    }
}

fn run_all() -> CustosResult<()> {
    scenarios::no_harm::run_scenario()?;
    scenarios::priority_tie::run_scenario()?;
    scenarios::rollback::run_scenario()?;
    scenarios::timeout::run_scenario()?;
    Ok(())
}

// ── Banner ────────────────────────────────────────────────────────────────────

fn print_banner() {
    println!();
    println!("CUSTOS — Policy-Gated Governance Core");
    println!("=====================================");
    println!();
    println!("Decision pipeline per intent:");
    println!("  [1] Intake check: structure, scope root, declared priority");
    println!("  [2] Axiom evaluation in priority order — every check joins the reasoning chain");
    println!("  [3] Canon lineage: objective must exist, priority capped by ancestry");
    println!("  [4] Conflict reconciliation — strict winner or escalation, never a silent tie-break");
    println!("  [5] Checkpoint-bracketed release; immutable audit record per operation");
    println!();
}
