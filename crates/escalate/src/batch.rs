// SPDX-FileCopyrightText: 2026 Escalate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `escalate batch` command implementation.
//!
//! Reads one query per line, runs them through the claim pipeline on a
//! bounded worker pool and writes one CSV row per query, in input order.
//! A failed query never aborts the batch: its row keeps the query and the
//! error, with the answer columns left empty.

use std::path::Path;

use colored::Colorize;
use escalate_agent::{Pipeline, PipelineResult};
use escalate_config::model::EscalateConfig;
use escalate_config::ConfigError;
use escalate_core::{EscalateError, Transcript};
use futures::stream::{self, StreamExt};
use serde::Serialize;
use tracing::{info, warn};

use crate::bootstrap::{self, Backends, StartupError};

/// One output row.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BatchRow {
    pub index: usize,
    pub query: String,
    pub handler: String,
    pub answer: Option<String>,
    pub iterations: Option<usize>,
    pub verdict: Option<String>,
    pub error: Option<String>,
}

impl BatchRow {
    fn from_result(index: usize, result: &PipelineResult) -> Self {
        let handler = result.decision.handler.name.clone();
        if result.is_failure() {
            return Self {
                index,
                query: result.query.clone(),
                handler,
                answer: None,
                iterations: None,
                verdict: None,
                error: Some(result.answer().to_string()),
            };
        }
        Self {
            index,
            query: result.query.clone(),
            handler,
            answer: Some(result.answer().to_string()),
            iterations: Some(result.report.invocations),
            verdict: result.report.final_verdict().map(|v| v.to_string()),
            error: None,
        }
    }

    pub fn is_failure(&self) -> bool {
        self.error.is_some()
    }
}

/// Non-blank lines of `path`, trimmed. A missing file is a configuration error.
pub fn read_queries(path: &Path) -> Result<Vec<String>, StartupError> {
    if !path.is_file() {
        return Err(ConfigError::Other(format!(
            "batch input file `{}` not found",
            path.display()
        ))
        .into());
    }
    let content = std::fs::read_to_string(path).map_err(|e| EscalateError::Storage {
        source: Box::new(e),
    })?;
    Ok(content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect())
}

/// Run every query with at most `workers` in flight. Rows come back in
/// input order.
pub async fn process(pipeline: &Pipeline, queries: Vec<String>, workers: usize) -> Vec<BatchRow> {
    let mut rows: Vec<BatchRow> = stream::iter(queries.into_iter().enumerate())
        .map(|(index, query)| async move {
            let result = pipeline.run(&query, &Transcript::new()).await;
            let row = BatchRow::from_result(index, &result);
            if row.is_failure() {
                warn!(index, "batch query failed");
            }
            row
        })
        .buffer_unordered(workers.max(1))
        .collect()
        .await;
    rows.sort_by_key(|row| row.index);
    rows
}

pub fn write_rows(path: &Path, rows: &[BatchRow]) -> Result<(), EscalateError> {
    let storage = |e: csv::Error| EscalateError::Storage {
        source: Box::new(e),
    };
    let mut writer = csv::Writer::from_path(path).map_err(storage)?;
    for row in rows {
        writer.serialize(row).map_err(storage)?;
    }
    writer.flush().map_err(|e| EscalateError::Storage {
        source: Box::new(e),
    })?;
    Ok(())
}

pub async fn run_batch(config: EscalateConfig, input: &Path, output: &Path) -> Result<(), StartupError> {
    let queries = read_queries(input)?;
    let backends = Backends::connect(&config)?;
    let index = bootstrap::claim_index(&config).await?;
    let pipeline = bootstrap::claim_pipeline(&config, &backends, index)?;

    info!(
        queries = queries.len(),
        workers = config.batch.max_workers,
        "starting batch"
    );
    let rows = process(&pipeline, queries, config.batch.max_workers).await;
    write_rows(output, &rows)?;

    let failed = rows.iter().filter(|r| r.is_failure()).count();
    let summary = format!(
        "{} queries, {} answered, {} failed -> {}",
        rows.len(),
        rows.len() - failed,
        failed,
        output.display()
    );
    if failed > 0 {
        println!("{}", summary.yellow());
    } else {
        println!("{}", summary.green());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use escalate_test_utils::{FailureKind, MockProvider, TestHarness};

    #[test]
    fn blank_lines_are_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("queries.txt");
        std::fs::write(&path, "first\n\n   \n second \n").unwrap();
        assert_eq!(read_queries(&path).unwrap(), vec!["first", "second"]);
    }

    #[test]
    fn missing_input_is_a_config_error() {
        let err = read_queries(Path::new("/nonexistent/escalate-batch.txt")).unwrap_err();
        match err {
            StartupError::Config(errors) => {
                assert!(errors[0].to_string().contains("escalate-batch.txt"));
            }
            StartupError::Runtime(e) => panic!("unexpected runtime error: {e}"),
        }
    }

    #[tokio::test]
    async fn rows_keep_input_order() {
        let harness = TestHarness::new().await.unwrap();
        let queries = vec![
            "What is the deductible on POLICY123?".to_string(),
            "Who carries liability for the collision?".to_string(),
            "Is hail covered?".to_string(),
        ];
        let rows = process(&harness.pipeline, queries, 2).await;

        assert_eq!(rows.len(), 3);
        assert_eq!(rows.iter().map(|r| r.index).collect::<Vec<_>>(), vec![0, 1, 2]);
        assert_eq!(rows[1].handler, "gemini");
        assert_eq!(rows[2].handler, "ollama");
        assert!(rows.iter().all(|r| r.answer.as_deref() == Some("mock response")));
    }

    #[tokio::test]
    async fn failed_query_leaves_answer_empty_and_batch_continues() {
        let harness = TestHarness::builder()
            .with_cloud(MockProvider::named("gemini").then_failure(FailureKind::Rejected))
            .build()
            .await
            .unwrap();
        let queries = vec!["Explain liability here".to_string(), "Is hail covered?".to_string()];
        let rows = process(&harness.pipeline, queries, 1).await;

        assert!(rows[0].is_failure());
        assert_eq!(rows[0].answer, None);
        assert_eq!(rows[0].iterations, None);
        assert!(!rows[1].is_failure());

        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("out.csv");
        write_rows(&out, &rows).unwrap();
        let written = std::fs::read_to_string(&out).unwrap();
        let mut lines = written.lines();
        assert_eq!(
            lines.next(),
            Some("index,query,handler,answer,iterations,verdict,error")
        );
        assert!(lines.next().unwrap().starts_with("0,Explain liability here,gemini,,,,"));
    }
}
