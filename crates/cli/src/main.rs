use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};
use stlc_core::agents::{self, AgentKind, GenerationAgent};
use stlc_core::backend;
use stlc_core::config::StlcCfg;
use stlc_core::pipeline::ValidationPipeline;
use stlc_core::types::ReportSummary;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Validate test coverage of requirements, or generate test cases and SQL
/// from documents, with a local or hosted language model.
#[derive(Parser)]
#[command(name = "stlc", version)]
struct Args {
    /// JSON config file; `STLC_*` environment variables override it.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Also write JSON logs to this file.
    #[arg(long, global = true)]
    log_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Match each requirement to a test case, judge it, write the report.
    Validate {
        /// Mapping table with Requirement_ID and Requirement_Description.
        #[arg(long)]
        mapping: PathBuf,
        /// Test-case table with TestCase_Description.
        #[arg(long)]
        testcases: PathBuf,
        /// Report path (overrides config `report_path`).
        #[arg(long)]
        report: Option<PathBuf>,
    },
    /// Generate test cases or SQL scripts from a document.
    Generate {
        #[command(subcommand)]
        kind: GenerateKind,
    },
    /// Print the effective configuration.
    Config,
}

#[derive(Subcommand)]
enum GenerateKind {
    /// Test cases (TestCaseID | Title | Steps | Expected Result) from requirements.
    TestCases(GenerateArgs),
    /// CREATE TABLE / INSERT SELECT scripts from a mapping document.
    Sql(GenerateArgs),
}

#[derive(clap::Args)]
struct GenerateArgs {
    /// Input document (.txt, .csv, .xlsx).
    document: PathBuf,
    /// Output directory (overrides config `outputs_dir`).
    #[arg(long)]
    out_dir: Option<PathBuf>,
    /// Print the generated text to stdout.
    #[arg(long)]
    print: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    init_tracing(args.log_file.as_ref())?;

    let cfg = StlcCfg::load(args.config.as_deref()).context("loading configuration")?;

    match args.command {
        Command::Validate { mapping, testcases, report } => {
            let (llm, embedder) = backend::from_env(&cfg)?;
            let pipeline = ValidationPipeline::from_cfg(&cfg, embedder, llm);
            let report_path = report.unwrap_or_else(|| cfg.report_path.clone());
            let (report, path) = pipeline
                .validate_files(&mapping, &testcases, &report_path)
                .await?;
            print_summary(&report.summary());
            println!("report: {}", path.display());
        }
        Command::Generate { kind } => {
            let (kind, gen_args) = match kind {
                GenerateKind::TestCases(a) => (AgentKind::TestCases, a),
                GenerateKind::Sql(a) => (AgentKind::SqlScripts, a),
            };
            let llm = backend::build_llm(&cfg, std::env::var(backend::ENV_LLM_API_KEY).ok())?;
            let document = agents::read_document(&gen_args.document)
                .with_context(|| format!("reading {}", gen_args.document.display()))?;
            let agent = GenerationAgent::from_cfg(kind, llm, &cfg);
            let out_dir = gen_args.out_dir.unwrap_or_else(|| cfg.outputs_dir.clone());
            let (text, path) = agent.generate_to_file(&document, &out_dir).await?;
            if gen_args.print {
                println!("{text}");
            }
            println!("written: {}", path.display());
        }
        Command::Config => {
            for (key, value, desc) in cfg.entries() {
                println!("{key:<24} {value:<36} # {desc}");
            }
        }
    }
    Ok(())
}

/// Human-readable logs on stderr; JSON to `log_file` when given.
/// `RUST_LOG` overrides the default `info` filter.
fn init_tracing(log_file: Option<&PathBuf>) -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let json_layer = match log_file {
        Some(path) => {
            let file = std::fs::File::create(path)
                .with_context(|| format!("creating log file {}", path.display()))?;
            Some(fmt::layer().json().with_target(true).with_writer(file))
        }
        None => None,
    };
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(json_layer)
        .init();
    Ok(())
}

fn print_summary(s: &ReportSummary) {
    println!("Validation Summary");
    println!("==================");
    println!("requirements: {}", s.total);
    println!("pass:         {}", s.pass);
    println!("warn:         {}", s.warn);
    println!("fail:         {}", s.fail);
    if s.failed_rows > 0 {
        println!("  of which {} could not be validated", s.failed_rows);
    }
}
