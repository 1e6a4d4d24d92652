mod correlation;
mod error;
mod evaluators;
mod input;
mod learn;
mod logging;
mod model;
mod network;
mod pipeline;
mod report;

#[cfg(test)]
#[path = "../tests/src_inline/fixtures.rs"]
mod fixtures;

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use clap::{Args, Parser, Subcommand};

use crate::error::{EvalError, Result};
use crate::evaluators::{
    ClusteringEvaluator, Evaluator, EvaluatorKind, SignalEvaluator, SyntheticEvaluator,
};
use crate::input::dataset::{Dataset, FoldedData, SyntheticData, load_json};
use crate::input::synthetic::{SyntheticConfig, generate_synthetic};
use crate::learn::spectral::SpectralParams;
use crate::learn::svm::SvmParams;
use crate::model::checkpoint::Checkpoint;
use crate::network::artifact::FsModelLoader;
use crate::pipeline::stage1_discover::run_stage1;
use crate::pipeline::stage2_evaluate::validate_all;
use crate::pipeline::stage3_aggregate::run_stage3;
use crate::pipeline::stage4_report::{Stage4Input, write_reports};
use crate::report::text::render_table_text;
use crate::report::to_table;

#[derive(Debug, Parser)]
#[command(
    name = "mvcca-eval",
    version,
    about = "Score and compare trained two-view CCA encoders across training runs"
)]
struct Cli {
    /// Debug-level logging (RUST_LOG overrides).
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Canonical correlations and ground-truth subspace similarity.
    Synthetic {
        #[command(flatten)]
        session: SessionArgs,
        /// Checkpoint to restore: view0, view1, avg or latest.
        #[arg(long, default_value = "latest")]
        weights: String,
    },
    /// Spectral clustering accuracy of the first view's latent codes.
    Clustering {
        #[command(flatten)]
        session: SessionArgs,
        /// Defaults to the number of classes in the data.
        #[arg(long)]
        clusters: Option<usize>,
        #[arg(long, default_value_t = 10)]
        neighbors: usize,
        #[arg(long, default_value_t = 10)]
        n_init: usize,
        #[arg(long, default_value_t = 33)]
        seed: u64,
    },
    /// Cross-validated linear SVM accuracy on the second view's latent codes.
    Signal {
        #[command(flatten)]
        session: SessionArgs,
        #[arg(long, default_value_t = 333)]
        seed: u64,
        #[arg(long, default_value_t = 1.0)]
        svm_c: f64,
    },
    /// Write a seeded synthetic two-view dataset with its ground truth.
    Generate(GenerateArgs),
}

#[derive(Debug, Args)]
struct SessionArgs {
    /// Directory holding one subdirectory per competitor.
    #[arg(long)]
    experiment_dir: PathBuf,
    /// Held-out data (JSON).
    #[arg(long)]
    data: PathBuf,
    /// Keep only competitors whose name contains this substring.
    #[arg(long)]
    filter: Option<String>,
    #[arg(long, default_value = "mvcca_eval_out")]
    out: PathBuf,
    /// Also render comparison.svg.
    #[arg(long)]
    plot: bool,
}

#[derive(Debug, Args)]
struct GenerateArgs {
    #[arg(long)]
    out: PathBuf,
    #[arg(long, default_value_t = 1000)]
    n_train: usize,
    #[arg(long, default_value_t = 200)]
    n_test: usize,
    #[arg(long, default_value_t = 250)]
    batch_size: usize,
    #[arg(long, default_value_t = 2)]
    true_dim: usize,
    #[arg(long, default_value_t = 2)]
    private_dim: usize,
    #[arg(long, default_value_t = 8)]
    dim_v0: usize,
    #[arg(long, default_value_t = 8)]
    dim_v1: usize,
    #[arg(long, default_value_t = 0.05)]
    noise: f64,
    #[arg(long, default_value_t = 42)]
    seed: u64,
}

#[derive(Debug, Clone)]
struct SessionConfig {
    experiment_dir: PathBuf,
    data: PathBuf,
    filter: Option<String>,
    out: PathBuf,
    plot: bool,
}

impl From<SessionArgs> for SessionConfig {
    fn from(args: SessionArgs) -> Self {
        Self {
            experiment_dir: args.experiment_dir,
            data: args.data,
            filter: args.filter,
            out: args.out,
            plot: args.plot,
        }
    }
}

impl From<GenerateArgs> for SyntheticConfig {
    fn from(args: GenerateArgs) -> Self {
        Self {
            n_train: args.n_train,
            n_test: args.n_test,
            batch_size: args.batch_size,
            true_dim: args.true_dim,
            private_dim: args.private_dim,
            view_dims: [args.dim_v0, args.dim_v1],
            noise: args.noise,
            seed: args.seed,
        }
    }
}

fn main() {
    let cli = Cli::parse();
    logging::init_tracing(cli.verbose);
    if let Err(err) = run(cli) {
        eprintln!("error: {err}");
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Command::Synthetic { session, weights } => {
            // Reject a bad selector before touching any file.
            let checkpoint: Checkpoint = weights.parse()?;
            let config = SessionConfig::from(session);
            let data: SyntheticData = load_json(&config.data)?;
            data.validate()?;
            let evaluator = EvaluatorKind::Synthetic(SyntheticEvaluator::new(&data, checkpoint));
            run_session(&config, &evaluator, false)
        }
        Command::Clustering {
            session,
            clusters,
            neighbors,
            n_init,
            seed,
        } => {
            let config = SessionConfig::from(session);
            let data: Dataset = load_json(&config.data)?;
            data.validate()?;
            let n_clusters = clusters.unwrap_or_else(|| data.num_classes());
            if n_clusters == 0 {
                return Err(EvalError::precondition(
                    "cannot infer the number of clusters from unlabelled data; pass --clusters",
                ));
            }
            let params = SpectralParams {
                n_clusters,
                n_neighbors: neighbors,
                n_init,
                seed,
            };
            let evaluator = EvaluatorKind::Clustering(ClusteringEvaluator::new(&data, params));
            run_session(&config, &evaluator, false)
        }
        Command::Signal {
            session,
            seed,
            svm_c,
        } => {
            if !(svm_c > 0.0 && svm_c.is_finite()) {
                return Err(EvalError::precondition(format!(
                    "--svm-c must be positive, got {svm_c}"
                )));
            }
            let config = SessionConfig::from(session);
            let data: FoldedData = load_json(&config.data)?;
            data.validate()?;
            let params = SvmParams {
                c: svm_c,
                seed,
                ..SvmParams::default()
            };
            let evaluator = EvaluatorKind::Signal(SignalEvaluator::new(&data, params));
            run_session(&config, &evaluator, true)
        }
        Command::Generate(args) => {
            let out = args.out.clone();
            generate(&SyntheticConfig::from(args), &out)
        }
    }
}

fn run_session(config: &SessionConfig, evaluator: &EvaluatorKind<'_>, group_folds: bool) -> Result<()> {
    let stage1 = run_stage1(&config.experiment_dir, config.filter.as_deref())?;
    let stage2 = validate_all(&stage1.competitors, &FsModelLoader, evaluator)?;
    let stage3 = run_stage3(&stage2.results, group_folds)?;
    let table = to_table(&stage3.rows);

    print!("{}", render_table_text(&table, evaluator.name()));

    write_reports(
        &Stage4Input {
            evaluator: evaluator.name(),
            experiment_dir: &config.experiment_dir,
            table: &table,
            run_results: &stage2.results,
            skipped: &stage2.skipped,
            plot: config.plot,
        },
        &config.out,
    )?;
    tracing::info!(
        competitors = table.rows.len(),
        skipped_runs = stage2.skipped.len(),
        "evaluation finished"
    );
    Ok(())
}

fn generate(cfg: &SyntheticConfig, out: &Path) -> Result<()> {
    let data = generate_synthetic(cfg)?;
    if let Some(parent) = out.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    let mut w = BufWriter::new(File::create(out)?);
    serde_json::to_writer(&mut w, &data)?;
    w.flush()?;
    tracing::info!(
        n_train = cfg.n_train,
        n_test = cfg.n_test,
        true_dim = cfg.true_dim,
        "wrote synthetic data to {}",
        out.display()
    );
    Ok(())
}

#[cfg(test)]
#[path = "../tests/src_inline/main_inline.rs"]
mod tests;
