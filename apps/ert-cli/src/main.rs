use clap::{Parser, Subcommand};
use ert_config::ErtConfig;
use ert_fs::CaseStore;
use ert_obs::ActiveList;
use ert_run::{RunResult, build_local_config, observations_from_config, parameters_from_config};
use ert_state::RealizationState;
use std::ops::RangeInclusive;
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "ert-cli")]
#[command(about = "Ensemble run inspection tool", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate a run configuration file
    Validate {
        /// Path to the YAML or JSON config
        config_path: PathBuf,
    },
    /// List cases in the configured storage
    Cases {
        /// Path to the YAML or JSON config
        config_path: PathBuf,
    },
    /// Show the realization states of one case
    StateMap {
        /// Path to the YAML or JSON config
        config_path: PathBuf,
        /// Case name
        case: String,
    },
    /// Show the local configuration (ministeps) used by updates
    LocalConfig {
        /// Path to the YAML or JSON config
        config_path: PathBuf,
    },
}

fn main() -> RunResult<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Validate { config_path } => cmd_validate(&config_path),
        Commands::Cases { config_path } => cmd_cases(&config_path),
        Commands::StateMap { config_path, case } => cmd_state_map(&config_path, &case),
        Commands::LocalConfig { config_path } => cmd_local_config(&config_path),
    }
}

fn cmd_validate(config_path: &Path) -> RunResult<()> {
    println!("Validating config: {}", config_path.display());
    let config = load_config(config_path)?;
    println!("✓ Config is valid");
    println!("  Ensemble size: {}", config.ensemble_size);
    println!("  Observations: {}", config.observations.len());
    println!("  Parameters: {}", config.parameters.len());
    let iteration = &config.analysis.iteration;
    println!(
        "  Iterations: {} (retries per iteration: {}, first case: {})",
        iteration.num_iterations,
        iteration.num_retries_per_iteration,
        iteration.case_name(0)
    );
    Ok(())
}

fn cmd_cases(config_path: &Path) -> RunResult<()> {
    let config = load_config(config_path)?;
    let store = open_store(config_path, &config)?;

    let cases = store.list_cases()?;
    if cases.is_empty() {
        println!("No cases found in {}", store.root_dir().display());
        return Ok(());
    }

    println!("Cases in {}:", store.root_dir().display());
    for name in cases {
        let marker = if name == config.current_case { "*" } else { " " };
        let iteration = store.case_config(&name)?.iteration_number;
        let map = store.load_read_only_state_map(&name)?;
        println!(
            "{marker} {name} (iteration {iteration}, {} realizations, {} with data)",
            map.len(),
            map.count_matching(RealizationState::HasData)
        );
    }
    Ok(())
}

fn cmd_state_map(config_path: &Path, case: &str) -> RunResult<()> {
    let config = load_config(config_path)?;
    let store = open_store(config_path, &config)?;
    let map = store.load_read_only_state_map(case)?;

    println!("State map for case '{case}' ({} realizations):", map.len());
    for state in RealizationState::ALL {
        let indices = map.realization_list(state);
        if !indices.is_empty() {
            println!("  {state}: {}", format_indices(&indices));
        }
    }
    Ok(())
}

fn cmd_local_config(config_path: &Path) -> RunResult<()> {
    let config = load_config(config_path)?;
    let observations = observations_from_config(&config);
    let parameters = parameters_from_config(&config);
    let local_config = build_local_config(&config, &observations, &parameters)?;

    let update_step = local_config.update_step();
    println!("Update step '{}':", update_step.name());
    for ministep in local_config.update_selection().ministeps() {
        println!("  Ministep {}", ministep.name);
        for node in &ministep.observations {
            let steps = if node.all_timesteps_active() {
                "all steps".to_string()
            } else {
                format!("steps {}", format_ranges(node.ranges()))
            };
            println!("    obs   {} ({steps})", node.key());
        }
        for (key, active) in &ministep.parameters {
            println!("    param {key} ({})", describe_active(active));
        }
    }
    Ok(())
}

fn load_config(config_path: &Path) -> RunResult<ErtConfig> {
    let config = ert_config::load(config_path)?;
    debug!(
        path = %config_path.display(),
        ensemble_size = config.ensemble_size,
        "Loaded config"
    );
    Ok(config)
}

fn open_store(config_path: &Path, config: &ErtConfig) -> RunResult<CaseStore> {
    let root = match config_path.parent() {
        Some(dir) if config.storage.is_relative() => dir.join(&config.storage),
        _ => config.storage.clone(),
    };
    info!(root = %root.display(), "Opening case store");
    Ok(CaseStore::new(root)?)
}

fn describe_active(active: &ActiveList) -> String {
    match active {
        ActiveList::PartlyActive(indices) => {
            let indices: Vec<usize> = indices.iter().copied().collect();
            format!("{} {}", active.mode_name(), format_indices(&indices))
        }
        _ => active.mode_name().to_string(),
    }
}

/// Compact "0-3,5,7-8" rendering of ascending indices.
fn format_indices(indices: &[usize]) -> String {
    let mut ranges = Vec::new();
    let mut iter = indices.iter().copied().peekable();
    while let Some(start) = iter.next() {
        let mut end = start;
        while iter.peek() == Some(&(end + 1)) {
            end += 1;
            iter.next();
        }
        ranges.push(start..=end);
    }
    format_ranges(&ranges)
}

fn format_ranges(ranges: &[RangeInclusive<usize>]) -> String {
    ranges
        .iter()
        .map(|range| {
            if range.start() == range.end() {
                range.start().to_string()
            } else {
                format!("{}-{}", range.start(), range.end())
            }
        })
        .collect::<Vec<_>>()
        .join(",")
}
