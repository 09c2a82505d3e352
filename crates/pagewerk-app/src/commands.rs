// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Command handlers.

use std::path::Path;
use std::process::ExitCode;
use std::sync::Arc;

use pagewerk_core::{
    Document, ExecutionStrategy, LanguageCode, PageMetadata, PageSource, PipelineConfig,
    PipelineError, PreprocessingProfile, Result,
};
use pagewerk_document::{assemble_document, write_json, write_text};
use pagewerk_pipeline::{
    BatchOutcome, ExecutionContext, OcrService, PipelineScheduler, ResourceSnapshot, plan,
};
use pagewerk_preprocess::ProfileResolver;
use tracing::{info, warn};

use crate::cli::{ProfileCommand, RunArgs};

fn load_config(path: Option<&Path>) -> Result<PipelineConfig> {
    match path {
        Some(path) => PipelineConfig::load(path),
        None => Ok(PipelineConfig::default()),
    }
}

/// Command-line flags win over the configuration file.
fn apply_overrides(config: &mut PipelineConfig, args: &RunArgs) {
    if !args.languages.is_empty() {
        config.active_languages = args.languages.iter().map(LanguageCode::new).collect();
    }
    if let Some(profile) = &args.profile {
        config.preprocessing_profile = profile.clone();
    }
    if args.sequential {
        config.execution_strategy = ExecutionStrategy::Sequential;
    }
    if let Some(mode) = args.data_mode {
        config.data_mode = mode.into();
    }
}

// -- run -------------------------------------------------------------------------

pub fn run(config_path: Option<&Path>, args: RunArgs) -> Result<ExitCode> {
    let mut config = load_config(config_path)?;
    apply_overrides(&mut config, &args);
    config.validate()?;

    let mut document = Document::new(config.typography.clone());
    for image in &args.images {
        document.push(PageSource::Path(image.clone()), PageMetadata::default());
    }

    let plan = plan(document.len(), &ResourceSnapshot::probe(), &config)?;
    let ctx = ExecutionContext::from_config(&config)?;
    let ocr = ocr_service(args.models.as_deref(), &config.active_languages)?;

    let total = document.len();
    let mut finished = 0usize;
    let mut batch = PipelineScheduler::new(ocr).run(document, plan, ctx)?;
    for update in batch.by_ref() {
        if !update.status.is_terminal() {
            continue;
        }
        finished += 1;
        match &update.error {
            Some(err) => warn!(
                page = %update.page_id,
                status = ?update.status,
                error = %err,
                "Page finished with error ({finished}/{total})"
            ),
            None => info!(page = %update.page_id, "Page done ({finished}/{total})"),
        }
    }
    let (document, report) = batch.finish();
    report.check_aborted()?;

    let model = assemble_document(&document, &config.active_languages)?;
    write_text(&model, &args.output)?;
    if let Some(path) = &args.model_json {
        write_json(&model, path)?;
    }

    info!(
        outcome = ?report.outcome,
        output = %args.output.display(),
        paragraphs = model.paragraphs().count(),
        "Done"
    );
    Ok(match report.outcome {
        BatchOutcome::Completed => ExitCode::SUCCESS,
        BatchOutcome::CompletedWithErrors | BatchOutcome::Cancelled => ExitCode::from(2),
        BatchOutcome::Aborted => ExitCode::FAILURE,
    })
}

#[cfg(feature = "ocr")]
fn ocr_service(models: Option<&Path>, languages: &[LanguageCode]) -> Result<Arc<dyn OcrService>> {
    use pagewerk_pipeline::{OcrsConfig, OcrsService};

    let config = models.map(OcrsConfig::from_dir).unwrap_or_default();
    Ok(Arc::new(OcrsService::load(&config, languages)?))
}

#[cfg(not(feature = "ocr"))]
fn ocr_service(_models: Option<&Path>, _languages: &[LanguageCode]) -> Result<Arc<dyn OcrService>> {
    Err(PipelineError::Config(
        "built without OCR support; rebuild with `--features ocr`".into(),
    ))
}

// -- profile ---------------------------------------------------------------------

pub fn profile(config_path: Option<&Path>, command: ProfileCommand) -> Result<ExitCode> {
    let profile = match command {
        ProfileCommand::Show { name } => {
            let config = load_config(config_path)?;
            ProfileResolver::with_overrides(config.control_level, config.custom_profiles)?
                .lookup(&name)?
        }
        ProfileCommand::Set {
            name,
            stage,
            field,
            value,
        } => edit(config_path, |resolver| {
            resolver.edit_parameter(&name, stage, &field, value)
        })?,
        ProfileCommand::Enable {
            name,
            stage,
            enabled,
        } => edit(config_path, |resolver| {
            resolver.set_stage_enabled(&name, stage, enabled)
        })?,
        ProfileCommand::Reset { name } => edit(config_path, |resolver| resolver.reset(&name))?,
    };
    println!("{}", serde_json::to_string_pretty(&profile)?);
    Ok(ExitCode::SUCCESS)
}

/// Apply one resolver edit and persist the resulting overrides.
fn edit(
    config_path: Option<&Path>,
    change: impl FnOnce(&mut ProfileResolver) -> Result<PreprocessingProfile>,
) -> Result<PreprocessingProfile> {
    let path = config_path.ok_or_else(|| {
        PipelineError::Config("profile edits are stored in a config file; pass --config".into())
    })?;
    let mut config = if path.exists() {
        PipelineConfig::load(path)?
    } else {
        PipelineConfig::default()
    };

    let mut resolver =
        ProfileResolver::with_overrides(config.control_level, config.custom_profiles.clone())?;
    let profile = change(&mut resolver)?;
    config.custom_profiles = resolver.overrides().cloned().collect();
    config.save(path)?;

    info!(name = %profile.name, version = profile.version, path = %path.display(), "Profile stored");
    Ok(profile)
}

// -- init-config -----------------------------------------------------------------

pub fn init_config(path: &Path) -> Result<ExitCode> {
    PipelineConfig::default().save(path)?;
    info!(path = %path.display(), "Default configuration written");
    Ok(ExitCode::SUCCESS)
}
