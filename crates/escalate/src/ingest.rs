// SPDX-FileCopyrightText: 2026 Escalate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `escalate ingest` command implementation.
//!
//! Each file is stored whole as one claim document, so later questions get
//! it back as retrieved context. Every file is read before anything is
//! stored: a missing or empty file aborts the run with nothing written.

use std::path::{Path, PathBuf};

use colored::Colorize;
use escalate_config::model::EscalateConfig;
use escalate_config::ConfigError;
use escalate_core::{EscalateError, SimilarityIndex};
use escalate_tools::builtin::ingest_document;

use crate::bootstrap::{self, StartupError};

/// Trimmed content of `path`. Missing and blank files are configuration errors.
pub fn read_document(path: &Path) -> Result<String, StartupError> {
    if !path.is_file() {
        return Err(ConfigError::Other(format!(
            "claim document `{}` not found",
            path.display()
        ))
        .into());
    }
    let content = std::fs::read_to_string(path).map_err(|e| EscalateError::Storage {
        source: Box::new(e),
    })?;
    let content = content.trim();
    if content.is_empty() {
        return Err(ConfigError::Other(format!(
            "claim document `{}` is empty",
            path.display()
        ))
        .into());
    }
    Ok(content.to_string())
}

/// Store every file in `paths`; returns `(path, id)` in input order.
pub async fn ingest_files(
    index: &dyn SimilarityIndex,
    paths: &[PathBuf],
) -> Result<Vec<(PathBuf, String)>, StartupError> {
    let documents = paths
        .iter()
        .map(|path| read_document(path).map(|text| (path, text)))
        .collect::<Result<Vec<_>, _>>()?;

    let mut stored = Vec::with_capacity(documents.len());
    for (path, text) in documents {
        let id = ingest_document(index, &path.display().to_string(), &text).await?;
        stored.push((path.clone(), id));
    }
    Ok(stored)
}

pub async fn run_ingest(config: EscalateConfig, paths: &[PathBuf]) -> Result<(), StartupError> {
    let index = bootstrap::claim_index(&config).await?;
    let stored = ingest_files(index.as_ref(), paths).await?;
    for (path, id) in &stored {
        println!(
            "{} {}  |  ID: {}",
            "✓".green(),
            path.display(),
            id.as_str().bold()
        );
    }
    println!(
        "{}",
        format!(
            "{} document(s) stored in {}",
            stored.len(),
            config.memory.database_path
        )
        .dimmed()
    );
    Ok(())
}
