// SPDX-FileCopyrightText: 2026 Escalate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Query pipeline for Escalate.
//!
//! A [`Pipeline`] classifies each query, routes it to the local or cloud
//! [`Handler`], drives the handler through the [`ToolLoop`] and, when
//! reflection is enabled, through the critique-driven [`QualityLoop`].
//! Transient backend failures are absorbed by [`RetryPolicy`] inside each
//! handler; whatever still fails comes back as a failure [`Outcome`].
//!
//! [`Outcome`]: escalate_core::Outcome

pub mod handler;
pub mod news;
pub mod pipeline;
pub mod reflect;
pub mod retry;
pub mod session;
pub mod tool_loop;

pub use handler::{BackendHandler, Handler, HandlerSet};
pub use news::{NewsAgent, NewsDigest, NEWS_REVIEWER};
pub use pipeline::{Pipeline, PipelineBuilder, PipelineResult};
pub use reflect::{
    interpret_reply, parse_verdict, Critic, Critique, HandlerProducer, LlmCritic, LoopState,
    Producer, QualityLoop, ReflectionReport, Verdict,
};
pub use retry::RetryPolicy;
pub use session::Conversation;
pub use tool_loop::{ToolLoop, ToolLoopResult};
