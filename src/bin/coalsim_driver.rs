//! Demonstration CLI driving the simulator end to end: load a config, run to
//! completion, optionally drop mutations, and print a chosen view of the
//! result. Not a reimplementation of the legacy `ms` argument grammar.

use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand};
use env_logger::{Builder, Env};
use log::{error, info, LevelFilter};
use rand::SeedableRng;

use coalsim::config::SimulationConfig;
use coalsim::rng::RngSource;
use coalsim::simulator::{RunLimits, Simulator};
use coalsim::sparsetree::TreeFlags;
use coalsim::{Result, SimError};

#[derive(Parser)]
#[command(name = "coalsim-driver", about = "Run a coalescent-with-recombination simulation")]
struct Cli {
    /// Path to a JSON `SimulationConfig`; built-in defaults are used if omitted.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Increase log verbosity (repeatable).
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Print the tree sequence's summary columns.
    Summary,
    /// Print the haplotype matrix, one row per sample.
    Haplotypes,
    /// Print one Newick string per marginal tree.
    Newick,
}

fn init_logger(verbosity: u8) {
    let level = match verbosity {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        2 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    };
    Builder::new().filter_level(level).parse_env(Env::default().filter("COALSIM_LOG")).init();
}

fn load_config(path: Option<PathBuf>) -> Result<SimulationConfig> {
    match path {
        None => Ok(SimulationConfig::default()),
        Some(p) => {
            let text = std::fs::read_to_string(&p)?;
            serde_json::from_str(&text).map_err(|e| SimError::FileFormat(e.to_string()))
        }
    }
}

fn run(cli: Cli) -> Result<()> {
    let config = load_config(cli.config)?;
    info!("running with sample_size={} num_loci={}", config.sample_size, config.num_loci);

    let params = config.to_sim_params();
    let rng = RngSource::new(rand_chacha::ChaCha8Rng::seed_from_u64(config.random_seed));
    let mut sim = Simulator::new(params, rng)?;
    let status = sim.run(RunLimits::default())?;
    info!("simulation finished: {:?}", status);

    let (n, m, records) = sim.finish();
    let mut ts = coalsim::TreeSequence::from_records(n, m, records);

    if config.mutation_rate > 0.0 {
        let mut mut_rng = RngSource::new(rand_chacha::ChaCha8Rng::seed_from_u64(config.random_seed.wrapping_add(1)));
        ts.generate_mutations(config.mutation_rate, &mut mut_rng)?;
    }

    match cli.command {
        Command::Summary => {
            println!("samples={}", ts.get_num_samples());
            println!("loci={}", ts.get_num_loci());
            println!("nodes={}", ts.get_num_nodes());
            println!("records={}", ts.get_num_records());
            println!("mutations={}", ts.get_num_mutations());
        }
        Command::Haplotypes => {
            let hap = coalsim::haplotypes::build_haplotypes(&ts);
            for sample in 1..=ts.get_num_samples() {
                println!("{}", hap.row_as_string(sample));
            }
        }
        Command::Newick => {
            use streaming_iterator::StreamingIterator;
            let mut trees = ts.trees(TreeFlags::empty());
            while let Some(tree) = trees.next() {
                println!("{}", coalsim::newick::to_newick(tree, 1 << 20)?);
            }
        }
    }
    Ok(())
}

fn main() {
    let cli = Cli::parse();
    init_logger(cli.verbose);
    if let Err(e) = run(cli) {
        error!("{e}");
        process::exit(1);
    }
}
