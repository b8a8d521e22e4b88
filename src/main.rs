use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::Parser;

use docx_tidy::semantic::ResponseFileClassifier;
use docx_tidy::{Config, Error, Mode};

#[derive(Parser)]
#[command(name = "docx-tidy", version, about = "Repair the structure of a DOCX file")]
struct Cli {
    /// Input .docx file
    input: PathBuf,
    /// Output .docx file (defaults to <input stem>.formatted.docx)
    output: Option<PathBuf>,
    /// JSON settings file
    #[arg(long)]
    config: Option<PathBuf>,
    /// Labeling policy
    #[arg(long, value_parser = parse_mode)]
    mode: Option<Mode>,
    /// Captured semantic classifier response (JSON) used for llm/hybrid labels
    #[arg(long)]
    labels: Option<PathBuf>,
    /// Shortest typed-marker run converted to native numbering
    #[arg(long)]
    min_run_len: Option<usize>,
    /// Keep typed list markers as text
    #[arg(long)]
    no_convert_lists: bool,
    /// Report path (defaults to <output stem>.report.json)
    #[arg(long, conflicts_with = "no_report")]
    report: Option<PathBuf>,
    /// Do not write a report file
    #[arg(long)]
    no_report: bool,
}

fn parse_mode(s: &str) -> Result<Mode, String> {
    s.parse()
}

fn with_suffix(path: &Path, suffix: &str) -> PathBuf {
    let stem = path.file_stem().and_then(|s| s.to_str()).unwrap_or("output");
    path.with_file_name(format!("{stem}{suffix}"))
}

fn run(cli: Cli) -> Result<(), Error> {
    let mut config = match &cli.config {
        Some(path) => Config::from_json_file(path)?,
        None => Config::default(),
    };
    if let Some(mode) = cli.mode {
        config.mode = mode;
    }
    if let Some(n) = cli.min_run_len {
        config.list_item.min_run_len = n;
    }
    if cli.no_convert_lists {
        config.list_item.convert_text_numbers = false;
    }

    let classifier = match &cli.labels {
        Some(path) => Some(ResponseFileClassifier::from_file(path)?),
        None => None,
    };

    let output = cli
        .output
        .clone()
        .unwrap_or_else(|| with_suffix(&cli.input, ".formatted.docx"));
    let report = docx_tidy::tidy_docx(
        &cli.input,
        &output,
        &config,
        classifier.as_ref().map(|c| c as &dyn docx_tidy::semantic::SemanticClassifier),
    )?;

    log::info!("{}", report.summary());
    println!("Done: {}", output.display());

    if !cli.no_report {
        let report_path = cli
            .report
            .clone()
            .unwrap_or_else(|| with_suffix(&output, ".report.json"));
        report.write(&report_path)?;
        println!("Report: {}", report_path.display());
    }
    Ok(())
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    match run(Cli::parse()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}
