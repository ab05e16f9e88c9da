// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::security_context::CorrelationId;

/// Diagnostic record emitted while a request is being authorized.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuntimeEvent {
    pub correlation_id: CorrelationId,
    pub message: String,
    /// Set on timing events only.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_in_ms: Option<u64>,
    pub occurred_at: DateTime<Utc>,
}

impl RuntimeEvent {
    pub fn new(correlation_id: CorrelationId, message: impl Into<String>) -> Self {
        Self {
            correlation_id,
            message: message.into(),
            completed_in_ms: None,
            occurred_at: Utc::now(),
        }
    }

    pub fn timed(correlation_id: CorrelationId, message: impl Into<String>, completed_in_ms: u64) -> Self {
        Self {
            completed_in_ms: Some(completed_in_ms),
            ..Self::new(correlation_id, message)
        }
    }

    pub fn is_timing(&self) -> bool {
        self.completed_in_ms.is_some()
    }
}
