//! `validate` command handler
//!
//! Loads each file through the normal loader and reports errors and
//! warnings without starting a game.

use std::path::Path;

use serde_json::json;

use crate::cli::args::{OutputFormat, ValidateArgs};
use crate::config::{ConfigLoader, LoaderOptions};
use crate::error::{ConfigError, PhaseLoopError, Severity, ValidationIssue};

/// Result of validating one file.
#[derive(Debug)]
struct FileReport {
    file: String,
    errors: Vec<String>,
    warnings: Vec<String>,
}

/// Validate configuration files.
///
/// Every file is checked and reported; the first failure is returned
/// afterwards.
///
/// # Errors
///
/// Returns the first config or I/O error encountered, or a validation
/// error for warnings when `--strict` is set.
pub fn run(args: &ValidateArgs) -> Result<(), PhaseLoopError> {
    let loader = ConfigLoader::new(LoaderOptions::default());
    let mut reports = Vec::with_capacity(args.files.len());
    let mut first_error: Option<ConfigError> = None;

    for path in &args.files {
        tracing::info!(file = %path.display(), "validating configuration");
        let (report, error) = check(&loader, path, args.strict);
        if let Some(error) = error {
            first_error.get_or_insert(error);
        } else {
            tracing::info!(file = %path.display(), "configuration valid");
        }
        reports.push(report);
    }

    match args.format {
        OutputFormat::Human => print_human(&reports),
        OutputFormat::Json => print_json(&reports)?,
    }

    first_error.map_or(Ok(()), |e| Err(e.into()))
}

fn check(loader: &ConfigLoader, path: &Path, strict: bool) -> (FileReport, Option<ConfigError>) {
    let file = path.display().to_string();
    match loader.load(path) {
        Ok(result) => {
            let warnings: Vec<String> = result.warnings.iter().map(ToString::to_string).collect();
            for warning in &result.warnings {
                tracing::warn!(
                    location = warning.location.as_deref().unwrap_or("<unknown>"),
                    "{}",
                    warning.message
                );
            }
            let error = (strict && !warnings.is_empty()).then(|| ConfigError::ValidationError {
                path: file.clone(),
                errors: result
                    .warnings
                    .iter()
                    .map(|w| ValidationIssue {
                        path: w.location.clone().unwrap_or_default(),
                        message: w.message.clone(),
                        severity: Severity::Warning,
                    })
                    .collect(),
            });
            let errors = if error.is_some() {
                vec!["warnings are errors in strict mode".to_string()]
            } else {
                Vec::new()
            };
            (
                FileReport {
                    file,
                    errors,
                    warnings,
                },
                error,
            )
        }
        Err(e) => {
            let errors = match &e {
                ConfigError::ValidationError { errors, .. } => {
                    errors.iter().map(ToString::to_string).collect()
                }
                other => vec![other.to_string()],
            };
            (
                FileReport {
                    file,
                    errors,
                    warnings: Vec::new(),
                },
                Some(e),
            )
        }
    }
}

fn print_human(reports: &[FileReport]) {
    for report in reports {
        if report.errors.is_empty() {
            println!("ok: {}", report.file);
        } else {
            println!("invalid: {}", report.file);
            for error in &report.errors {
                println!("  {error}");
            }
        }
        for warning in &report.warnings {
            println!("  warning: {warning}");
        }
    }
}

fn print_json(reports: &[FileReport]) -> Result<(), PhaseLoopError> {
    let files: Vec<serde_json::Value> = reports
        .iter()
        .map(|r| {
            json!({
                "file": r.file,
                "valid": r.errors.is_empty(),
                "errors": r.errors,
                "warnings": r.warnings,
            })
        })
        .collect();
    println!("{}", serde_json::to_string_pretty(&json!({ "files": files }))?);
    Ok(())
}
