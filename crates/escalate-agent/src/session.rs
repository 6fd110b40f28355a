// SPDX-FileCopyrightText: 2026 Escalate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Conversation memory across interactive turns.

use escalate_core::{Transcript, Turn};
use tracing::debug;

use crate::pipeline::{Pipeline, PipelineResult};

/// A transcript carried from one query to the next.
///
/// Only the user query and the final answer of each exchange are kept.
/// Tool turns and critique turns stay inside the pipeline run that made them.
#[derive(Debug, Clone, Default)]
pub struct Conversation {
    transcript: Transcript,
    exchanges: usize,
}

impl Conversation {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn transcript(&self) -> &Transcript {
        &self.transcript
    }

    /// Completed exchanges.
    pub fn exchanges(&self) -> usize {
        self.exchanges
    }

    pub fn clear(&mut self) {
        self.transcript = Transcript::new();
        self.exchanges = 0;
    }

    /// Run `message` through `pipeline` with this conversation as history,
    /// then record the exchange.
    pub async fn ask(&mut self, pipeline: &Pipeline, message: &str) -> PipelineResult {
        let result = pipeline.run(message, &self.transcript).await;
        self.record(&result);
        result
    }

    /// Append one exchange. Failed exchanges are not remembered.
    pub fn record(&mut self, result: &PipelineResult) {
        if result.is_failure() {
            debug!("failed exchange left out of conversation history");
            return;
        }
        self.transcript.push(Turn::user(result.query.clone()));
        self.transcript.push(Turn::assistant(result.answer()));
        self.exchanges += 1;
    }
}
