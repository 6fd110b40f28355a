// SPDX-FileCopyrightText: 2026 Escalate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Tool executor boundary for Escalate.
//!
//! Tools take a name plus an argument map and return text. Failures are text
//! too (`Tool error: ...`), so a misbehaving tool never aborts a request.

pub mod builtin;
pub mod tool;

pub use tool::{Tool, ToolOutput, ToolRegistry, TOOL_ERROR_PREFIX};
