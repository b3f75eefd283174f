//! Scenario Simulator CLI
//!
//! Runs the Monte Carlo scenario model from a config/weights file and writes
//! the raw per-trial CSV plus an optional summary.

#[cfg(feature = "cli")]
use anyhow::Result;
#[cfg(feature = "cli")]
use clap::{Args, Parser, Subcommand, ValueEnum};
#[cfg(feature = "cli")]
use std::path::PathBuf;

#[cfg(feature = "cli")]
#[derive(Parser)]
#[command(name = "scenario-sim")]
#[command(about = "Monte Carlo scenario simulator (actor postures → outcome / humanitarian impact)", long_about = None)]
struct Cli {
    /// Emit logs as JSON
    #[arg(long, global = true, default_value = "false")]
    log_json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[cfg(feature = "cli")]
#[derive(Clone, Copy, ValueEnum)]
enum ScaleArg {
    Auto,
    Percent,
    Probability,
}

#[cfg(feature = "cli")]
impl From<ScaleArg> for scenario_core::WeightScale {
    fn from(arg: ScaleArg) -> Self {
        match arg {
            ScaleArg::Auto => scenario_core::WeightScale::Auto,
            ScaleArg::Percent => scenario_core::WeightScale::Percent,
            ScaleArg::Probability => scenario_core::WeightScale::Probability,
        }
    }
}

#[cfg(feature = "cli")]
#[derive(Args)]
struct InputArgs {
    /// Scenario config file (JSON or YAML); falls back to SCENARIO_CONFIG_PATH
    #[arg(long)]
    config: Option<PathBuf>,

    /// Actor → posture → weight file (JSON or YAML), replaces config distributions
    #[arg(long)]
    weights: Option<PathBuf>,

    /// Weight scale (percent when omitted)
    #[arg(long, value_enum)]
    scale: Option<ScaleArg>,

    /// Rule table YAML (built-in table when omitted)
    #[arg(long)]
    rules: Option<PathBuf>,
}

#[cfg(feature = "cli")]
#[derive(Subcommand)]
enum Commands {
    /// Run the simulation
    Run {
        #[command(flatten)]
        input: InputArgs,

        /// Number of trials
        #[arg(long)]
        trials: Option<usize>,

        /// Random seed (random when omitted; printed for replay)
        #[arg(long)]
        seed: Option<u64>,

        /// Parallel chunks on the rayon pool (1 = sequential)
        #[arg(long)]
        workers: Option<usize>,

        /// Raw per-trial CSV output
        #[arg(long, default_value = scenario_core::export::DEFAULT_EXPORT_FILE)]
        out: PathBuf,

        /// Skip writing the raw per-trial CSV
        #[arg(long, default_value = "false")]
        no_table: bool,

        /// Summary output (.json → JSON, otherwise CSV)
        #[arg(long)]
        summary: Option<PathBuf>,
    },

    /// Check distributions without running
    Validate {
        #[command(flatten)]
        input: InputArgs,
    },

    /// Print the rule table with per-rule trial coverage
    Rules {
        /// Rule table YAML (built-in table when omitted)
        #[arg(long)]
        rules: Option<PathBuf>,

        /// Print as YAML instead of a listing
        #[arg(long, default_value = "false")]
        yaml: bool,
    },
}

#[cfg(feature = "cli")]
fn overrides(input: &InputArgs) -> scenario_cli::RunOverrides {
    scenario_cli::RunOverrides {
        weights: input.weights.clone(),
        scale: input.scale.map(Into::into),
        rules: input.rules.clone(),
        ..Default::default()
    }
}

#[cfg(feature = "cli")]
fn main() -> Result<()> {
    use scenario_core::ScenarioModel;

    let cli = Cli::parse();
    scenario_cli::init_tracing(cli.log_json);
    let model = ScenarioModel::myanmar();

    match cli.command {
        Commands::Run {
            input,
            trials,
            seed,
            workers,
            out,
            no_table,
            summary,
        } => {
            let mut overrides = overrides(&input);
            overrides.trials = trials;
            overrides.seed = seed;
            overrides.workers = workers;
            let config = scenario_cli::load_config(input.config.as_deref(), &overrides)?;

            println!("🚀 Running simulation...");
            println!("   Trials:  {}", config.trials);
            println!("   Workers: {}", config.workers);

            let report = scenario_cli::execute(&model, &config)?;
            println!("✅ Simulation completed! (seed {})", report.seed);

            println!("\n📊 Scenario Outcomes");
            println!("{}", scenario_cli::render_percentages(&report.result.outcomes_ranked()));
            println!("\n🚨 Humanitarian Impact");
            println!("{}", scenario_cli::render_percentages(&report.result.impacts_ranked()));

            if !no_table {
                scenario_cli::write_table_file(&model, &report.result, &out)?;
                println!("\n⬇️  Raw data saved to: {}", out.display());
            }
            if let Some(path) = summary {
                scenario_cli::write_summary_file(&report, &path)?;
                println!("📄 Summary saved to: {}", path.display());
            }
        }

        Commands::Validate { input } => {
            let config = scenario_cli::load_config(input.config.as_deref(), &overrides(&input))?;
            let messages = scenario_cli::check_distributions(&model, &config);
            if messages.is_empty() {
                println!("✅ All {} distributions are valid", model.len());
            } else {
                for message in &messages {
                    println!("⚠️  {}", message);
                }
                anyhow::bail!("{} distribution issue(s)", messages.len());
            }
        }

        Commands::Rules { rules, yaml } => {
            let config = scenario_core::SimConfig { rules_path: rules, ..Default::default() };
            let table = config.load_rules(&model)?;
            if yaml {
                print!("{}", serde_yaml::to_string(&table.to_specs(&model))?);
            } else {
                println!("{}", scenario_cli::describe_rules(&model, &table));
            }
        }
    }

    Ok(())
}

#[cfg(not(feature = "cli"))]
fn main() {
    eprintln!("scenario-sim CLI is not available. Enable the 'cli' feature to use it.");
    std::process::exit(1);
}

#[cfg(all(test, feature = "cli"))]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_workers_help_describes_chunks() {
        let cli = Cli::command();
        let run = cli.find_subcommand("run").unwrap();
        let workers = run.get_arguments().find(|a| a.get_id() == "workers").unwrap();
        let help = workers.get_help().unwrap().to_string();
        assert!(help.starts_with("Parallel chunks"));
    }

    #[test]
    fn test_run_parses_worker_count() {
        let cli = Cli::try_parse_from(["scenario-sim", "run", "--workers", "4", "--no-table"]).unwrap();
        match cli.command {
            Commands::Run { workers, no_table, .. } => {
                assert_eq!(workers, Some(4));
                assert!(no_table);
            }
            _ => panic!("expected run"),
        }
    }
}
