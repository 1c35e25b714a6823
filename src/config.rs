// Copyright (C) 2026 Michael Wilson <mike@mdwn.dev>
//
// This program is free software: you can redistribute it and/or modify it under
// the terms of the GNU General Public License as published by the Free Software
// Foundation, version 3.
//
// This program is distributed in the hope that it will be useful, but WITHOUT
// ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS
// FOR A PARTICULAR PURPOSE. See the GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License along with
// this program. If not, see <https://www.gnu.org/licenses/>.
//
use std::path::Path;

use config::{Config, File};
use serde::Deserialize;
use tracing::debug;

use crate::convert::ConversionMode;

mod error;

pub use error::ConfigError;

/// Settings for an export run. Every field has a default, so an empty
/// file (or no file at all) is a valid configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ExportConfig {
    /// How looped samples are written.
    mode: ConversionMode,

    /// Whether samples without a loop are exported as well.
    include_unlooped: bool,

    /// Number of samples converted in parallel. Defaults to the number of CPUs.
    jobs: Option<usize>,

    /// Leave the extracted archive in place after the run, for debugging.
    keep_work_dir: bool,
}

impl Default for ExportConfig {
    fn default() -> Self {
        ExportConfig {
            mode: ConversionMode::default(),
            include_unlooped: true,
            jobs: None,
            keep_work_dir: false,
        }
    }
}

impl ExportConfig {
    /// Loads the config from a file. The format is picked from the extension.
    pub fn load(path: &Path) -> Result<ExportConfig, ConfigError> {
        let config: ExportConfig = Config::builder()
            .add_source(File::from(path))
            .build()?
            .try_deserialize()?;
        config.validate()?;

        debug!(path = ?path, config = ?config, "Loaded export config");
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.jobs == Some(0) {
            return Err(ConfigError::Invalid("jobs must be at least 1".to_string()));
        }
        Ok(())
    }

    pub fn mode(&self) -> ConversionMode {
        self.mode
    }

    pub fn include_unlooped(&self) -> bool {
        self.include_unlooped
    }

    pub fn jobs(&self) -> Option<usize> {
        self.jobs
    }

    pub fn keep_work_dir(&self) -> bool {
        self.keep_work_dir
    }

    pub fn with_mode(mut self, mode: ConversionMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_include_unlooped(mut self, include_unlooped: bool) -> Self {
        self.include_unlooped = include_unlooped;
        self
    }

    /// Sets the worker count. Zero is treated as "pick automatically".
    pub fn with_jobs(mut self, jobs: usize) -> Self {
        self.jobs = (jobs > 0).then_some(jobs);
        self
    }

    pub fn with_keep_work_dir(mut self, keep_work_dir: bool) -> Self {
        self.keep_work_dir = keep_work_dir;
        self
    }
}
