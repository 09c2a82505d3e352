// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Execution planner — sizes the worker pool and picks the data mode for one
// batch from the configuration and a snapshot of machine resources.

use std::path::PathBuf;

use pagewerk_core::{
    DataMode, DataModeSetting, ExecutionStrategy, PipelineConfig, PipelineError, Result,
};
use sysinfo::System;
use tracing::{debug, info, instrument};

/// Memory kept free for the OS and the host application when the budget is
/// derived from probed availability.
pub const MEMORY_RESERVE_BYTES: u64 = 1024 * 1024 * 1024;

/// What the machine can offer right now.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResourceSnapshot {
    pub available_cores: usize,
    /// Zero when the platform does not report available memory.
    pub available_memory_bytes: u64,
}

impl ResourceSnapshot {
    /// Probe logical cores and currently available memory.
    pub fn probe() -> Self {
        let mut sys = System::new();
        sys.refresh_memory();
        let snapshot = Self {
            available_cores: num_cpus::get().max(1),
            available_memory_bytes: sys.available_memory(),
        };
        debug!(
            cores = snapshot.available_cores,
            available_mb = snapshot.available_memory_bytes / (1024 * 1024),
            "Resources probed"
        );
        snapshot
    }
}

/// How one batch will be executed. Built by [`plan`], consumed by a single
/// scheduler run.
#[derive(Debug, PartialEq, Eq)]
pub struct ExecutionPlan {
    strategy: ExecutionStrategy,
    data_mode: DataMode,
    workers: usize,
    batch_size: usize,
    spill_root: Option<PathBuf>,
}

impl ExecutionPlan {
    pub fn strategy(&self) -> ExecutionStrategy {
        self.strategy
    }

    pub fn data_mode(&self) -> DataMode {
        self.data_mode
    }

    pub fn workers(&self) -> usize {
        self.workers
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    /// Directory spill files are created under; set only for `DiskAssisted`.
    pub fn spill_root(&self) -> Option<&PathBuf> {
        self.spill_root.as_ref()
    }
}

/// Produce the plan for a batch of `batch_size` pages.
#[instrument(skip(resources, config), fields(strategy = ?config.execution_strategy))]
pub fn plan(
    batch_size: usize,
    resources: &ResourceSnapshot,
    config: &PipelineConfig,
) -> Result<ExecutionPlan> {
    let workers = match config.execution_strategy {
        ExecutionStrategy::Sequential => 1,
        ExecutionStrategy::Automatic => {
            let cap = config.max_workers.unwrap_or(usize::MAX);
            resources.available_cores.min(batch_size).min(cap).max(1)
        }
    };

    let data_mode = match config.data_mode {
        DataModeSetting::MemoryOnly => DataMode::MemoryOnly,
        DataModeSetting::DiskAssisted => DataMode::DiskAssisted,
        DataModeSetting::Automatic => {
            let needed = (batch_size as u64).saturating_mul(config.average_page_buffer_bytes);
            match memory_budget(resources, config) {
                Some(budget) if needed <= budget => DataMode::MemoryOnly,
                _ => DataMode::DiskAssisted,
            }
        }
    };

    let spill_root = match data_mode {
        DataMode::MemoryOnly => None,
        DataMode::DiskAssisted => {
            let root = config
                .spill_root
                .clone()
                .unwrap_or_else(std::env::temp_dir);
            std::fs::create_dir_all(&root).map_err(|err| {
                PipelineError::Storage(format!(
                    "cannot create spill directory {}: {}",
                    root.display(),
                    err
                ))
            })?;
            Some(root)
        }
    };

    info!(workers, batch_size, ?data_mode, "Execution plan ready");
    Ok(ExecutionPlan {
        strategy: config.execution_strategy,
        data_mode,
        workers,
        batch_size,
        spill_root,
    })
}

/// The configured budget, or probed availability minus the reserve.
/// `None` when neither is known.
fn memory_budget(resources: &ResourceSnapshot, config: &PipelineConfig) -> Option<u64> {
    match config.memory_budget_bytes {
        Some(budget) => Some(budget),
        None if resources.available_memory_bytes > 0 => Some(
            resources
                .available_memory_bytes
                .saturating_sub(MEMORY_RESERVE_BYTES),
        ),
        None => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const GIB: u64 = 1024 * 1024 * 1024;

    fn machine(cores: usize, memory: u64) -> ResourceSnapshot {
        ResourceSnapshot {
            available_cores: cores,
            available_memory_bytes: memory,
        }
    }

    #[test]
    fn automatic_uses_min_of_cores_and_batch() {
        let config = PipelineConfig::default();
        assert_eq!(plan(3, &machine(8, 64 * GIB), &config).unwrap().workers(), 3);
        assert_eq!(plan(40, &machine(8, 64 * GIB), &config).unwrap().workers(), 8);
    }

    #[test]
    fn worker_cap_is_respected() {
        let config = PipelineConfig {
            max_workers: Some(2),
            ..Default::default()
        };
        assert_eq!(plan(40, &machine(16, 64 * GIB), &config).unwrap().workers(), 2);
    }

    #[test]
    fn never_below_one_worker() {
        let config = PipelineConfig::default();
        assert_eq!(plan(0, &machine(8, 64 * GIB), &config).unwrap().workers(), 1);
        assert_eq!(plan(5, &machine(0, 64 * GIB), &config).unwrap().workers(), 1);
    }

    #[test]
    fn sequential_is_single_worker() {
        let config = PipelineConfig {
            execution_strategy: ExecutionStrategy::Sequential,
            ..Default::default()
        };
        let plan = plan(12, &machine(8, 64 * GIB), &config).unwrap();
        assert_eq!(plan.workers(), 1);
        assert_eq!(plan.strategy(), ExecutionStrategy::Sequential);
    }

    #[test]
    fn small_batch_stays_in_memory() {
        let config = PipelineConfig::default();
        let plan = plan(10, &machine(4, 8 * GIB), &config).unwrap();
        assert_eq!(plan.data_mode(), DataMode::MemoryOnly);
        assert!(plan.spill_root().is_none());
    }

    #[test]
    fn oversized_batch_spills_to_disk() {
        let dir = tempfile::tempdir().unwrap();
        let config = PipelineConfig {
            memory_budget_bytes: Some(100 * 1024 * 1024),
            spill_root: Some(dir.path().join("spill")),
            ..Default::default()
        };
        let plan = plan(10, &machine(4, 64 * GIB), &config).unwrap();
        assert_eq!(plan.data_mode(), DataMode::DiskAssisted);
        assert_eq!(plan.spill_root(), Some(&dir.path().join("spill")));
        assert!(dir.path().join("spill").is_dir());
    }

    #[test]
    fn unknown_memory_spills_to_disk() {
        let dir = tempfile::tempdir().unwrap();
        let config = PipelineConfig {
            spill_root: Some(dir.path().to_path_buf()),
            ..Default::default()
        };
        let plan = plan(1, &machine(4, 0), &config).unwrap();
        assert_eq!(plan.data_mode(), DataMode::DiskAssisted);
    }

    #[test]
    fn forced_memory_only_ignores_budget() {
        let config = PipelineConfig {
            data_mode: DataModeSetting::MemoryOnly,
            memory_budget_bytes: Some(1),
            ..Default::default()
        };
        assert_eq!(
            plan(100, &machine(4, 0), &config).unwrap().data_mode(),
            DataMode::MemoryOnly
        );
    }

    #[test]
    fn uncreatable_spill_root_is_storage_error() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("occupied");
        std::fs::write(&file, b"not a directory").unwrap();
        let config = PipelineConfig {
            data_mode: DataModeSetting::DiskAssisted,
            spill_root: Some(file.join("below")),
            ..Default::default()
        };
        assert!(matches!(
            plan(1, &machine(4, 64 * GIB), &config),
            Err(PipelineError::Storage(_))
        ));
    }

    #[test]
    fn probe_reports_at_least_one_core() {
        assert!(ResourceSnapshot::probe().available_cores >= 1);
    }
}
