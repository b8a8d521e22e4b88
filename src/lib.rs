pub mod classify;
pub mod config;
pub mod docx;
mod error;
pub mod format;
pub mod lists;
pub mod model;
pub mod pipeline;
pub mod reconcile;
pub mod report;
pub mod semantic;
pub mod split;
pub mod xml;

pub use config::Config;
pub use error::Error;
pub use reconcile::Mode;
pub use report::Report;

use std::path::Path;
use std::time::Instant;

use semantic::SemanticClassifier;

pub fn tidy_docx(
    input: &Path,
    output: &Path,
    config: &Config,
    classifier: Option<&dyn SemanticClassifier>,
) -> Result<Report, Error> {
    let t0 = Instant::now();

    let mut doc = docx::Docx::open(input)?;
    let t_parse = t0.elapsed();

    let report = pipeline::run(&mut doc, config, classifier);
    let t_tidy = t0.elapsed();

    let bytes = doc.to_bytes()?;
    std::fs::write(output, &bytes).map_err(Error::Io)?;
    let t_total = t0.elapsed();

    log::info!(
        "Timing: parse={:.1}ms, tidy={:.1}ms, write={:.1}ms, total={:.1}ms (output {} bytes)",
        t_parse.as_secs_f64() * 1000.0,
        (t_tidy - t_parse).as_secs_f64() * 1000.0,
        (t_total - t_tidy).as_secs_f64() * 1000.0,
        t_total.as_secs_f64() * 1000.0,
        bytes.len(),
    );

    Ok(report)
}

/// In-memory variant of [`tidy_docx`]: returns the rewritten package bytes.
pub fn tidy_docx_bytes(
    input: &[u8],
    config: &Config,
    classifier: Option<&dyn SemanticClassifier>,
) -> Result<(Vec<u8>, Report), Error> {
    let t0 = Instant::now();

    let mut doc = docx::Docx::from_bytes(input)?;
    let t_parse = t0.elapsed();

    let report = pipeline::run(&mut doc, config, classifier);
    let t_tidy = t0.elapsed();

    let bytes = doc.to_bytes()?;
    let t_total = t0.elapsed();

    log::info!(
        "Timing: parse={:.1}ms, tidy={:.1}ms, serialize={:.1}ms, total={:.1}ms (output {} bytes)",
        t_parse.as_secs_f64() * 1000.0,
        (t_tidy - t_parse).as_secs_f64() * 1000.0,
        (t_total - t_tidy).as_secs_f64() * 1000.0,
        t_total.as_secs_f64() * 1000.0,
        bytes.len(),
    );

    Ok((bytes, report))
}
