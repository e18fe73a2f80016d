//! Glitchfield CLI: drive the glitch aggregator with a synthetic population.
//!
//! Usage:
//!   glitchfield simulate [--agents 5] [--steps 600] [--seed N] [--json]
//!   glitchfield run [--agents 5] [--duration-secs N] [--tick-ms 16]
//!   glitchfield config <show|path|init> [--config path]

use clap::{Parser, Subcommand};
use glitchfield::{
    AggregatorConfig, Environment, GlitchAggregator, GlitchResult, InteractionKind,
    InteractionOptions, RecordingSink, SyntheticPopulation, TracingSink,
};
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::info;

#[derive(Parser)]
#[command(
    name = "glitchfield",
    version,
    about = "Collective glitch aggregation engine"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a fixed number of steps as fast as possible and print a summary
    Simulate {
        /// Number of synthetic agents
        #[arg(long, default_value_t = 5)]
        agents: usize,
        /// Number of steps to run
        #[arg(long, default_value_t = 600)]
        steps: usize,
        /// Simulated milliseconds per step
        #[arg(long, default_value_t = 16.0)]
        delta_ms: f64,
        /// Seed for both the population and the aggregator
        #[arg(long)]
        seed: Option<u64>,
        /// Environment preset (default, forest, digital, abstract)
        #[arg(long, default_value_t = Environment::Default)]
        environment: Environment,
        /// Harvest the most intense entity every N steps
        #[arg(long)]
        harvest_every: Option<usize>,
        /// Print the summary as JSON
        #[arg(long)]
        json: bool,
        /// Path to a YAML config file
        #[arg(long)]
        config: Option<PathBuf>,
    },
    /// Run in real time until Ctrl-C or the duration elapses
    Run {
        /// Number of synthetic agents
        #[arg(long, default_value_t = 5)]
        agents: usize,
        /// Stop after this many seconds
        #[arg(long)]
        duration_secs: Option<u64>,
        /// Milliseconds between ticks
        #[arg(long, default_value_t = 16)]
        tick_ms: u64,
        /// Seed for both the population and the aggregator
        #[arg(long)]
        seed: Option<u64>,
        /// Environment preset (default, forest, digital, abstract)
        #[arg(long, default_value_t = Environment::Default)]
        environment: Environment,
        /// Path to a YAML config file
        #[arg(long)]
        config: Option<PathBuf>,
    },
    /// Inspect or create the configuration file
    Config {
        #[command(subcommand)]
        action: ConfigAction,
        /// Path to a YAML config file
        #[arg(long, global = true)]
        config: Option<PathBuf>,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Print the effective configuration as YAML
    Show,
    /// Print the default config file location
    Path,
    /// Write the default configuration to the config file
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

/// End-of-run numbers for `simulate`
#[derive(Serialize)]
struct Summary {
    elapsed_ms: f64,
    agents: usize,
    environment: Environment,
    global_intensity: f64,
    nodes: usize,
    active_entities: usize,
    harvested_entities: usize,
    history_records: usize,
    max_generation: u32,
    events: BTreeMap<&'static str, usize>,
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .try_init();
}

fn load_config(path: Option<&Path>, seed: Option<u64>) -> GlitchResult<AggregatorConfig> {
    let config = AggregatorConfig::load(path)?;
    Ok(match seed {
        Some(seed) => config.with_seed(seed),
        None => config,
    })
}

fn build(
    agents: usize,
    seed: Option<u64>,
    config: Option<&Path>,
) -> GlitchResult<(SyntheticPopulation, GlitchAggregator, RecordingSink)> {
    let config = load_config(config, seed)?;
    let population = SyntheticPopulation::new(agents, config.rng_seed);
    let recording = RecordingSink::new();
    let aggregator = GlitchAggregator::new(config)?
        .with_registry(population.registry())
        .with_sink((TracingSink, recording.clone()));
    Ok((population, aggregator, recording))
}

#[allow(clippy::too_many_arguments)]
fn cmd_simulate(
    agents: usize,
    steps: usize,
    delta_ms: f64,
    seed: Option<u64>,
    environment: Environment,
    harvest_every: Option<usize>,
    json: bool,
    config: Option<&Path>,
) -> GlitchResult<()> {
    let (mut population, mut aggregator, recording) = build(agents, seed, config)?;
    if environment != Environment::Default {
        population.set_environment(&mut aggregator, environment);
    }

    let mut events: BTreeMap<&'static str, usize> = BTreeMap::new();
    for step in 1..=steps {
        population.step(&mut aggregator, delta_ms);
        if harvest_every.is_some_and(|n| n > 0 && step % n == 0) {
            harvest_strongest(&mut aggregator);
        }
        for event in recording.drain() {
            *events.entry(event.name()).or_default() += 1;
        }
    }

    let summary = Summary {
        elapsed_ms: aggregator.elapsed_ms(),
        agents,
        environment,
        global_intensity: aggregator.global_intensity(),
        nodes: aggregator.node_count(),
        active_entities: aggregator.active_count(),
        harvested_entities: aggregator.harvested_entities().len(),
        history_records: aggregator.history().len(),
        max_generation: aggregator
            .history()
            .iter()
            .map(|r| r.entity.generation)
            .max()
            .unwrap_or(0),
        events,
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        print_summary(&summary);
    }
    Ok(())
}

fn harvest_strongest(aggregator: &mut GlitchAggregator) {
    let strongest = aggregator
        .active_entities()
        .into_iter()
        .max_by(|a, b| a.intensity.total_cmp(&b.intensity));
    if let Some(entity) = strongest {
        aggregator.apply_user_interaction(
            &entity.id,
            InteractionKind::Harvest,
            InteractionOptions::new().with_user("cli"),
        );
    }
}

fn print_summary(summary: &Summary) {
    println!("Simulated {:.0} ms with {} agents ({} environment)", summary.elapsed_ms, summary.agents, summary.environment);
    println!("  global intensity: {:.2}", summary.global_intensity);
    println!("  nodes:            {}", summary.nodes);
    println!("  active entities:  {}", summary.active_entities);
    println!("  harvested:        {}", summary.harvested_entities);
    println!("  history records:  {}", summary.history_records);
    println!("  max generation:   {}", summary.max_generation);
    if !summary.events.is_empty() {
        println!("  events:");
        for (name, count) in &summary.events {
            println!("    {:<22} {}", name, count);
        }
    }
}

fn cmd_run(
    agents: usize,
    duration_secs: Option<u64>,
    tick_ms: u64,
    seed: Option<u64>,
    environment: Environment,
    config: Option<&Path>,
) -> i32 {
    let (mut population, mut aggregator, recording) = match build(agents, seed, config) {
        Ok(parts) => parts,
        Err(e) => {
            eprintln!("Error: {}", e);
            return 1;
        }
    };

    let rt = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("failed to create tokio runtime: {}", e);
            return 1;
        }
    };

    rt.block_on(async {
        if environment != Environment::Default {
            population.set_environment(&mut aggregator, environment);
        }

        let tick_ms = tick_ms.max(1);
        let mut interval = tokio::time::interval(Duration::from_millis(tick_ms));
        let deadline = duration_secs.map(|secs| tokio::time::Instant::now() + Duration::from_secs(secs));
        info!(agents, tick_ms, %environment, "glitchfield running");

        loop {
            let sleep_until = async {
                match deadline {
                    Some(deadline) => tokio::time::sleep_until(deadline).await,
                    None => std::future::pending().await,
                }
            };
            tokio::select! {
                _ = interval.tick() => {
                    population.step(&mut aggregator, tick_ms as f64);
                    recording.drain();
                }
                _ = tokio::signal::ctrl_c() => {
                    info!("interrupted");
                    break;
                }
                _ = sleep_until => {
                    break;
                }
            }
        }

        info!(
            elapsed_ms = aggregator.elapsed_ms(),
            active = aggregator.active_count(),
            history = aggregator.history().len(),
            "glitchfield stopped"
        );
        0
    })
}

fn cmd_config(action: ConfigAction, path: Option<&Path>) -> GlitchResult<()> {
    match action {
        ConfigAction::Show => {
            let config = AggregatorConfig::load(path)?;
            print!("{}", config.to_yaml_string()?);
        }
        ConfigAction::Path => match path.map(Path::to_path_buf).or_else(AggregatorConfig::default_path) {
            Some(path) => println!("{}", path.display()),
            None => eprintln!("no config directory on this platform"),
        },
        ConfigAction::Init { force } => {
            let Some(target) = path.map(Path::to_path_buf).or_else(AggregatorConfig::default_path) else {
                eprintln!("no config directory on this platform");
                return Ok(());
            };
            if target.exists() && !force {
                eprintln!("{} already exists (use --force to overwrite)", target.display());
                return Ok(());
            }
            if let Some(parent) = target.parent() {
                std::fs::create_dir_all(parent)?;
            }
            std::fs::write(&target, AggregatorConfig::default().to_yaml_string()?)?;
            println!("Wrote {}", target.display());
        }
    }
    Ok(())
}

fn exit_on_error(result: GlitchResult<()>) -> i32 {
    match result {
        Ok(()) => 0,
        Err(e) => {
            eprintln!("Error: {}", e);
            1
        }
    }
}

fn main() {
    init_tracing();
    let cli = Cli::parse();
    let code = match cli.command {
        Commands::Simulate {
            agents,
            steps,
            delta_ms,
            seed,
            environment,
            harvest_every,
            json,
            config,
        } => exit_on_error(cmd_simulate(
            agents,
            steps,
            delta_ms,
            seed,
            environment,
            harvest_every,
            json,
            config.as_deref(),
        )),
        Commands::Run {
            agents,
            duration_secs,
            tick_ms,
            seed,
            environment,
            config,
        } => cmd_run(agents, duration_secs, tick_ms, seed, environment, config.as_deref()),
        Commands::Config { action, config } => exit_on_error(cmd_config(action, config.as_deref())),
    };
    std::process::exit(code);
}
