// SPDX-FileCopyrightText: 2026 Escalate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Policy lookup against a fixed in-process policy table.

use std::collections::HashMap;

use async_trait::async_trait;
use escalate_core::EscalateError;
use serde::Serialize;

use crate::tool::{required_str, Tool, ToolOutput};

/// Reply when no policy matches.
pub const POLICY_NOT_FOUND: &str = "Policy not found.";

/// One insurance policy record.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Policy {
    pub holder: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub coverage: String,
    pub deductible: u32,
    pub status: String,
}

/// Mock policy service. Ids are matched case-insensitively.
#[derive(Debug, Clone)]
pub struct PolicyService {
    policies: HashMap<String, Policy>,
}

impl PolicyService {
    /// The two demo policies.
    pub fn mock() -> Self {
        let policies = HashMap::from([
            (
                "POLICY123".to_string(),
                Policy {
                    holder: "John Doe".into(),
                    kind: "Auto".into(),
                    coverage: "Comprehensive".into(),
                    deductible: 500,
                    status: "Active".into(),
                },
            ),
            (
                "POLICY456".to_string(),
                Policy {
                    holder: "Jane Smith".into(),
                    kind: "Home".into(),
                    coverage: "All-risk".into(),
                    deductible: 1000,
                    status: "Active".into(),
                },
            ),
        ]);
        Self { policies }
    }

    pub fn get(&self, policy_id: &str) -> Option<&Policy> {
        self.policies.get(&policy_id.trim().to_uppercase())
    }
}

/// `get_policy_details(policy_id)`.
pub struct PolicyTool {
    service: PolicyService,
}

impl PolicyTool {
    pub fn new(service: PolicyService) -> Self {
        Self { service }
    }
}

#[async_trait]
impl Tool for PolicyTool {
    fn name(&self) -> &str {
        "get_policy_details"
    }

    fn description(&self) -> &str {
        "Get details of an insurance policy by ID"
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "policy_id": {
                    "type": "string",
                    "description": "Policy identifier, e.g. POLICY123"
                }
            },
            "required": ["policy_id"]
        })
    }

    async fn invoke(&self, input: serde_json::Value) -> Result<ToolOutput, EscalateError> {
        let policy_id = required_str(&input, self.name(), "policy_id")?;
        match self.service.get(policy_id) {
            Some(policy) => {
                let rendered = serde_json::to_string(policy).map_err(|e| EscalateError::Tool {
                    name: self.name().to_string(),
                    message: format!("failed to render policy: {e}"),
                })?;
                Ok(ToolOutput::text(rendered))
            }
            None => Ok(ToolOutput::text(POLICY_NOT_FOUND)),
        }
    }
}
