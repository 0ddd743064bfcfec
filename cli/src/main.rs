mod report;
mod scene;

use std::fs;
use std::path::PathBuf;

use clap::{Parser, Subcommand};
use log::info;

#[derive(Parser)]
#[command(name = "rbconstraint", about = "Constraint construction and update core")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build the constraint set for a scene file and print a row summary.
    Build {
        /// Path to a scene JSON file.
        scene: PathBuf,
        /// Print every row's solver-facing fields, not just the summary.
        #[arg(long)]
        verbose: bool,
    },
    /// Build the constraint set and dump every row's fields unconditionally.
    Inspect {
        /// Path to a scene JSON file.
        scene: PathBuf,
    },
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Build { scene, verbose } => run_build(scene, verbose),
        Commands::Inspect { scene } => run_build(scene, true),
    }
}

fn run_build(path: PathBuf, verbose: bool) -> anyhow::Result<()> {
    let text = fs::read_to_string(&path)
        .map_err(|e| anyhow::anyhow!("failed to read scene file {}: {e}", path.display()))?;
    let scene_file: scene::SceneFile = serde_json::from_str(&text)
        .map_err(|e| anyhow::anyhow!("failed to parse scene file {}: {e}", path.display()))?;
    let (model, mut data) = scene::build(&scene_file)?;

    info!("loaded scene from {}", path.display());
    let (ne, nf, nl, nc) = rbconstraint_core::make_constraint(&model, &mut data)?;
    info!("built {} rows (ne={ne} nf={nf} nl={nl} nc={nc})", ne + nf + nl + nc);

    let total_cost = report::evaluate_unconstrained(&mut data);
    report::print_summary(&data);
    println!("total cost (unconstrained trial force): {total_cost:.6}");
    if verbose {
        report::print_rows(&data);
    }
    Ok(())
}
