//! Batch stamping
//!
//! Every name is stamped onto every template. A pair that fails is logged and
//! recorded, and the batch moves on; only failures that would affect every
//! remaining pair (the font) stop it.

use crate::config::StampConfig;
use crate::error::{Result, StampError};
use crate::names::read_names;
use crate::naming::output_path;
use crate::templates::list_templates;
use chrono::NaiveDate;
use overlay_composer::{CertificateComposer, FontRegistry};
use std::fs;
use std::path::{Path, PathBuf};

/// A (template, name) pair that could not be stamped.
#[derive(Debug)]
pub struct PairFailure {
    pub template: PathBuf,
    pub text: String,
    pub error: overlay_composer::Error,
}

/// Outcome of a batch run.
#[derive(Debug, Default)]
pub struct BatchReport {
    pub generated: Vec<PathBuf>,
    pub failures: Vec<PairFailure>,
}

impl BatchReport {
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

fn build_composer(config: &StampConfig, registry: &mut FontRegistry) -> Result<CertificateComposer> {
    config.validate()?;
    registry.register(&config.font_name, &config.font_path)?;
    let composer = CertificateComposer::new(registry, &config.font_name, config.composition_options()?)?;
    Ok(composer)
}

/// Stamp every name from `config.names_file` onto every template in `config.template_dir`.
///
/// `today` supplies the footer date when the config does not fix one.
pub fn run_batch(config: &StampConfig, registry: &mut FontRegistry, today: NaiveDate) -> Result<BatchReport> {
    let composer = build_composer(config, registry)?;
    let footer_date = config.resolved_footer_date(today);

    let names = read_names(&config.names_file)?;
    let templates = list_templates(&config.template_dir)?;
    if templates.is_empty() {
        log::warn!("No templates found in {}", config.template_dir.display());
    }

    fs::create_dir_all(&config.output_dir).map_err(|source| StampError::OutputDir {
        path: config.output_dir.clone(),
        source,
    })?;

    let mut report = BatchReport::default();
    for name in &names {
        for template in &templates {
            let output = output_path(&config.output_dir, template, name);
            match composer.compose_to_file(template, name, &footer_date, &output) {
                Ok(_) => {
                    log::info!("Generated {}", output.display());
                    report.generated.push(output);
                }
                Err(error) if error.is_batch_fatal() => {
                    log::error!("Stopping batch at {:?} on {}: {}", name, template.display(), error);
                    return Err(error.into());
                }
                Err(error) => {
                    log::warn!("Skipping {:?} on {}: {}", name, template.display(), error);
                    report.failures.push(PairFailure {
                        template: template.clone(),
                        text: name.clone(),
                        error,
                    });
                }
            }
        }
    }

    log::info!(
        "Batch finished: {} generated, {} failed",
        report.generated.len(),
        report.failures.len()
    );
    Ok(report)
}

/// Stamp a single `text` onto `template`.
///
/// Without `output` the file is named as in a batch run and placed in
/// `config.output_dir`.
pub fn stamp_single(
    config: &StampConfig,
    registry: &mut FontRegistry,
    template: &Path,
    text: &str,
    output: Option<&Path>,
    today: NaiveDate,
) -> Result<PathBuf> {
    let composer = build_composer(config, registry)?;
    let footer_date = config.resolved_footer_date(today);

    let output = match output {
        Some(path) => path.to_path_buf(),
        None => {
            fs::create_dir_all(&config.output_dir).map_err(|source| StampError::OutputDir {
                path: config.output_dir.clone(),
                source,
            })?;
            output_path(&config.output_dir, template, text)
        }
    };

    composer.compose_to_file(template, text, &footer_date, &output)?;
    log::info!("Generated {}", output.display());
    Ok(output)
}
