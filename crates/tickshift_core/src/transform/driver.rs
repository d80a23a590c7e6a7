//! Stage-by-stage transform over storage backends.

use super::verify::{verify_output, Fingerprints};
use super::{TransformPlan, TransformReport, TransformStage};
use crate::capacity::CapacityFormula;
use crate::config::TransformConfig;
use crate::error::{CoreError, CoreResult};
use crate::layout::FileFamily;
use crate::resize::{resize, ResizeOutcome};
use crate::types::TickDuration;
use std::fs;
use std::path::{Path, PathBuf};
use tickshift_storage::{FileBackend, StorageBackend, StorageError};
use tracing::{debug, info, warn};

/// Transforms files of one family between tick durations.
pub struct Transformer<'a> {
    family: &'a dyn FileFamily,
    formula: &'a dyn CapacityFormula,
    config: TransformConfig,
}

impl<'a> Transformer<'a> {
    /// Creates a transformer with the default configuration.
    #[must_use]
    pub fn new(family: &'a dyn FileFamily, formula: &'a dyn CapacityFormula) -> Self {
        Self {
            family,
            formula,
            config: TransformConfig::default(),
        }
    }

    /// Replaces the configuration.
    #[must_use]
    pub fn with_config(mut self, config: TransformConfig) -> Self {
        self.config = config;
        self
    }

    /// Returns the configuration.
    #[must_use]
    pub const fn config(&self) -> &TransformConfig {
        &self.config
    }

    /// Computes capacities and layouts for a transform from `old` to `new`.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::InvalidDuration`] or [`CoreError::LayoutOverflow`]
    /// if either side has no valid layout.
    pub fn plan(&self, old: TickDuration, new: TickDuration) -> CoreResult<TransformPlan> {
        let old_capacity = self.formula.capacity_for(old)?;
        let new_capacity = self.formula.capacity_for(new)?;
        let old_layout = self.family.instantiate(old_capacity)?;
        let new_layout = self.family.instantiate(new_capacity)?;
        old_layout.check_compatible(&new_layout)?;

        Ok(TransformPlan {
            family: self.family.name(),
            old_duration: old,
            new_duration: new,
            old_capacity,
            new_capacity,
            old_layout,
            new_layout,
        })
    }

    /// Runs the transform from `input` to `output`, copying the original
    /// bytes to `backup` first if one is given.
    ///
    /// The backup is assumed to live on the output's volume, so the output
    /// must have room for both files.
    ///
    /// # Errors
    ///
    /// Nothing is written to `backup` or `output` if the input length is
    /// wrong ([`CoreError::CorruptInput`]), resources are short
    /// ([`CoreError::InsufficientResources`]), or the backup cannot be made
    /// ([`CoreError::BackupFailed`]). A failed output write is
    /// [`CoreError::WriteFailed`]; an output that does not match the new
    /// layout is [`CoreError::VerificationFailed`].
    pub fn run(
        &self,
        old: TickDuration,
        new: TickDuration,
        input: &dyn StorageBackend,
        mut backup: Option<&mut dyn StorageBackend>,
        output: &mut dyn StorageBackend,
    ) -> CoreResult<TransformReport> {
        let input_location = input.location();
        let plan = self
            .plan(old, new)
            .map_err(|e| e.at(input_location.as_str()))?;
        let output_location = output.location();
        let mut stages = Vec::with_capacity(5);

        info!(
            family = plan.family,
            input = %input_location,
            old_capacity = plan.old_capacity,
            new_capacity = plan.new_capacity,
            "transform planned"
        );

        // Loaded
        plan.old_layout.check_length(&input_location, input.size()?)?;
        if let Some(backup) = backup.as_deref() {
            self.check_backup_target(backup)?;
        }
        check_disk_space(&plan, backup.as_deref(), &*output)?;

        let original = input
            .read_all()
            .map_err(|e| memory_error(e, &input_location))?;
        plan.old_layout
            .check_length(&input_location, original.len() as u64)?;
        stages.push(TransformStage::Loaded);
        info!(bytes = original.len(), "input loaded");

        let fingerprints = self
            .config
            .verify_fingerprints
            .then(|| Fingerprints::capture(&original, &plan.old_layout, &plan.new_layout))
            .transpose()
            .map_err(|e| e.at(input_location.as_str()))?;

        // Resized
        let ResizeOutcome { buffer, changes } =
            resize(&original, &plan.old_layout, &plan.new_layout)
                .map_err(|e| e.at(input_location.as_str()))?;
        stages.push(TransformStage::Resized);
        let data_loss = changes.iter().any(|c| c.is_lossy());
        info!(bytes = buffer.len(), data_loss, "buffer resized");

        // BackedUp
        let backup_location = match backup.as_deref_mut() {
            Some(backup) => {
                let location = write_backup(backup, &original)?;
                stages.push(TransformStage::BackedUp);
                info!(backup = %location, "original copied to backup");
                Some(location)
            }
            None => {
                debug!("backup skipped");
                None
            }
        };
        drop(original);

        // Written
        output
            .replace(&buffer)
            .map_err(|source| CoreError::WriteFailed {
                location: output_location.clone(),
                source,
            })?;
        stages.push(TransformStage::Written);
        info!(output = %output_location, bytes = buffer.len(), "output written");
        drop(buffer);

        // Verified
        let written = output
            .read_all()
            .map_err(|e| match e {
                StorageError::OutOfMemory { .. } => memory_error(e, &output_location),
                other => CoreError::verification_failed(
                    &output_location,
                    format!("cannot re-read output: {other}"),
                ),
            })?;
        let verification = verify_output(
            &output_location,
            &written,
            &plan.new_layout,
            fingerprints.as_ref(),
        )?;
        stages.push(TransformStage::Verified);
        info!(
            regions = verification.regions_checked,
            fingerprinted = verification.bytes_fingerprinted,
            "output verified"
        );

        if data_loss {
            warn!(
                family = plan.family,
                backup = backup_location.as_deref().unwrap_or("none"),
                "truncation discarded non-zero data"
            );
        }

        Ok(TransformReport {
            family: plan.family,
            old_duration: plan.old_duration,
            new_duration: plan.new_duration,
            old_capacity: plan.old_capacity,
            new_capacity: plan.new_capacity,
            input_location,
            output_location,
            backup_location,
            old_length: plan.old_length(),
            new_length: plan.new_length(),
            changes,
            stages,
            verification,
            data_loss,
        })
    }

    fn check_backup_target(&self, backup: &dyn StorageBackend) -> CoreResult<()> {
        if backup.exists() && !self.config.overwrite_backup {
            return Err(CoreError::backup_failed(
                backup.location(),
                "backup already exists and overwriting it is disabled",
            ));
        }
        Ok(())
    }
}

fn write_backup(backup: &mut dyn StorageBackend, original: &[u8]) -> CoreResult<String> {
    let location = backup.location();
    backup
        .replace(original)
        .map_err(|e| CoreError::backup_failed(&location, e.to_string()))?;

    let size = backup
        .size()
        .map_err(|e| CoreError::backup_failed(&location, e.to_string()))?;
    if size != original.len() as u64 {
        return Err(CoreError::backup_failed(
            &location,
            format!("backup holds {size} bytes, original is {}", original.len()),
        ));
    }
    Ok(location)
}

fn check_disk_space(
    plan: &TransformPlan,
    backup: Option<&dyn StorageBackend>,
    output: &dyn StorageBackend,
) -> CoreResult<()> {
    let backup_bytes = if backup.is_some() { plan.old_length() } else { 0 };
    ensure_space(output, plan.new_length().saturating_add(backup_bytes))?;
    if let Some(backup) = backup {
        ensure_space(backup, plan.old_length())?;
    }
    Ok(())
}

fn ensure_space(backend: &dyn StorageBackend, needed: u64) -> CoreResult<()> {
    match backend.available_space()? {
        Some(available) if available < needed => Err(CoreError::InsufficientResources {
            resource: "disk",
            location: backend.location(),
            needed,
            available,
        }),
        _ => Ok(()),
    }
}

fn memory_error(error: StorageError, location: &str) -> CoreError {
    match error {
        StorageError::OutOfMemory { requested } | StorageError::TooLarge { size: requested } => {
            CoreError::InsufficientResources {
                resource: "memory",
                location: location.to_string(),
                needed: requested,
                available: 0,
            }
        }
        other => other.into(),
    }
}

/// Transforms the file at `input` in place or into `output`.
///
/// The output defaults to the input path. Both paths are resolved through
/// symlinks first, so an in-place run through a link rewrites the link's
/// target and leaves the link itself alone. A backup at
/// [`TransformConfig::backup_path_for`] is taken next to the resolved input
/// only when the output is the input and [`TransformConfig::backup`] is set.
///
/// # Errors
///
/// Returns [`CoreError::Storage`] if the input does not exist, and otherwise
/// the errors of [`Transformer::run`].
pub fn transform_file(
    family: &dyn FileFamily,
    formula: &dyn CapacityFormula,
    config: &TransformConfig,
    old: TickDuration,
    new: TickDuration,
    input: &Path,
    output: Option<&Path>,
) -> CoreResult<TransformReport> {
    let input = resolve(input);
    let output_path = output.map_or_else(|| input.clone(), resolve);
    let in_place = input == output_path;

    let input_backend = FileBackend::open(&input)?;
    let mut backup = (in_place && config.backup)
        .then(|| FileBackend::new(&config.backup_path_for(&input)));
    let mut output_backend = FileBackend::new(&output_path);

    debug!(
        input = %input.display(),
        output = %output_path.display(),
        in_place,
        backup = backup.is_some(),
        "resolved paths"
    );

    Transformer::new(family, formula)
        .with_config(config.clone())
        .run(
            old,
            new,
            &input_backend,
            backup.as_mut().map(|b| b as &mut dyn StorageBackend),
            &mut output_backend,
        )
}

/// Follows symlinks for paths that exist; others are kept as given.
fn resolve(path: &Path) -> PathBuf {
    fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf())
}
