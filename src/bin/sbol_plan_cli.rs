use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use sbol_assembly_planner::{
    AssemblyPlan, PlannerConfig, SbolDocument, Topology, get_assembly_plan,
};
use serde::Serialize;
use std::{fs, path::PathBuf};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "sbol_plan_cli",
    version,
    about = "Extract a DNA assembly plan from an SBOL design"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Print the full assembly plan as JSON
    Plan {
        #[command(flatten)]
        planner: PlannerArgs,
        /// Write the JSON to this file instead of stdout
        #[arg(long, short)]
        output: Option<PathBuf>,
    },
    /// Print one line of JSON summary per construct
    Summary {
        #[command(flatten)]
        planner: PlannerArgs,
    },
}

#[derive(Args)]
struct PlannerArgs {
    /// SBOL 2 RDF/XML design file
    input: PathBuf,
    /// Planner config JSON; flags below override its values
    #[arg(long)]
    config: Option<PathBuf>,
    #[arg(long)]
    parallel: bool,
    #[arg(long)]
    min_length: Option<usize>,
    #[arg(long)]
    max_length: Option<usize>,
    #[arg(long)]
    max_sub_parts: Option<usize>,
}

impl PlannerArgs {
    fn config(&self) -> Result<PlannerConfig> {
        let mut config = match &self.config {
            Some(path) => PlannerConfig::from_json_file(path)?,
            None => PlannerConfig::default(),
        };
        config.parallel_refactor |= self.parallel;
        if let Some(value) = self.min_length {
            config.refactor.min_part_length = value;
        }
        if let Some(value) = self.max_length {
            config.refactor.max_part_length = value;
        }
        if let Some(value) = self.max_sub_parts {
            config.refactor.max_sub_parts = value;
        }
        Ok(config)
    }

    fn run(&self) -> Result<AssemblyPlan> {
        let config = self.config()?;
        let doc = SbolDocument::from_file(&self.input)?;
        tracing::debug!(
            definitions = doc.definition_count(),
            sequences = doc.sequence_count(),
            "loaded design"
        );
        get_assembly_plan(&doc, &config)
            .with_context(|| format!("Could not plan '{}'", self.input.display()))
    }
}

#[derive(Serialize)]
struct ConstructSummary<'a> {
    id: &'a str,
    topology: Topology,
    length: usize,
    parts: &'a [String],
}

fn summarize(plan: &AssemblyPlan) -> Vec<ConstructSummary<'_>> {
    plan.construct_parts
        .iter()
        .map(|(id, parts)| ConstructSummary {
            id,
            topology: plan
                .construct_topologies
                .get(id)
                .copied()
                .unwrap_or_default(),
            length: plan.construct_sequences.get(id).map_or(0, String::len),
            parts,
        })
        .collect()
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    if let Err(e) = run() {
        eprintln!("{e:#}");
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    match Cli::parse().command {
        Command::Plan { planner, output } => {
            let plan = planner.run()?;
            let text = serde_json::to_string_pretty(&plan)
                .context("Could not serialize assembly plan")?;
            match output {
                Some(path) => {
                    fs::write(&path, text)
                        .with_context(|| format!("Could not write '{}'", path.display()))?;
                    println!(
                        "Wrote plan for {} constructs to '{}'",
                        plan.construct_parts.len(),
                        path.display()
                    );
                }
                None => println!("{text}"),
            }
        }
        Command::Summary { planner } => {
            let plan = planner.run()?;
            for summary in summarize(&plan) {
                println!("{}", serde_json::to_string(&summary)?);
            }
        }
    }
    Ok(())
}
