// SPDX-License-Identifier: MIT
//
// Copyright (c) 2025 Noderr Protocol Foundation
//
// Permission is hereby granted, free of charge, to any person obtaining a copy
// of this software and associated documentation files (the "Software"), to deal
// in the Software without restriction, including without limitation the rights
// to use, copy, modify, merge, publish, distribute, sublicense, and/or sell
// copies of the Software, and to permit persons to whom the Software is
// furnished to do so, subject to the following conditions:
//
// The above copyright notice and this permission notice shall be included in all
// copies or substantial portions of the Software.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::market::AssetId;
use crate::strategy::StrategyId;

/// Failures raised by the engine components.
///
/// The set is closed: the orchestrator decides between retry, abort and
/// fallback by matching on these variants, so components must never wrap
/// arbitrary errors into a catch-all.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EngineError {
    #[error("Insufficient data: need {required} snapshots per asset, have {actual}")]
    InsufficientData { required: usize, actual: usize },

    #[error("Insufficient history for strategy {strategy_id}: need {required} returns, have {actual}")]
    InsufficientHistory {
        strategy_id: StrategyId,
        required: usize,
        actual: usize,
    },

    #[error("Data unavailable for {asset_id}: {reason}")]
    DataUnavailable { asset_id: AssetId, reason: String },

    #[error("Execution submission failed: {0}")]
    ExecutionSubmission(String),

    #[error("{operation} timed out after {timeout_ms}ms")]
    Timeout { operation: String, timeout_ms: u64 },

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Scope {0} already has a cycle in flight")]
    ScopeBusy(String),
}

/// Result type for engine operations
pub type EngineResult<T> = Result<T, EngineError>;

/// Serializable discriminant of [`EngineError`], carried by alerts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    InsufficientData,
    InsufficientHistory,
    DataUnavailable,
    ExecutionSubmission,
    Timeout,
    InvalidInput,
    ScopeBusy,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorKind::InsufficientData => write!(f, "INSUFFICIENT_DATA"),
            ErrorKind::InsufficientHistory => write!(f, "INSUFFICIENT_HISTORY"),
            ErrorKind::DataUnavailable => write!(f, "DATA_UNAVAILABLE"),
            ErrorKind::ExecutionSubmission => write!(f, "EXECUTION_SUBMISSION"),
            ErrorKind::Timeout => write!(f, "TIMEOUT"),
            ErrorKind::InvalidInput => write!(f, "INVALID_INPUT"),
            ErrorKind::ScopeBusy => write!(f, "SCOPE_BUSY"),
        }
    }
}

impl EngineError {
    /// Classify the error for alerting and retry decisions
    pub fn kind(&self) -> ErrorKind {
        match self {
            EngineError::InsufficientData { .. } => ErrorKind::InsufficientData,
            EngineError::InsufficientHistory { .. } => ErrorKind::InsufficientHistory,
            EngineError::DataUnavailable { .. } => ErrorKind::DataUnavailable,
            EngineError::ExecutionSubmission(_) => ErrorKind::ExecutionSubmission,
            EngineError::Timeout { .. } => ErrorKind::Timeout,
            EngineError::InvalidInput(_) => ErrorKind::InvalidInput,
            EngineError::ScopeBusy(_) => ErrorKind::ScopeBusy,
        }
    }

    /// Whether the failure comes from an external dependency that may recover
    /// on its own (as opposed to a problem with the inputs or configuration).
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            EngineError::DataUnavailable { .. }
                | EngineError::Timeout { .. }
                | EngineError::ExecutionSubmission(_)
                | EngineError::ScopeBusy(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_mapping() {
        let err = EngineError::DataUnavailable {
            asset_id: "SPY".to_string(),
            reason: "offline".to_string(),
        };
        assert_eq!(err.kind(), ErrorKind::DataUnavailable);
        assert!(err.is_transient());

        let err = EngineError::InsufficientHistory {
            strategy_id: "carry".to_string(),
            required: 30,
            actual: 4,
        };
        assert_eq!(err.kind(), ErrorKind::InsufficientHistory);
        assert!(!err.is_transient());
        assert!(err.to_string().contains("need 30 returns, have 4"));
    }

    #[test]
    fn test_kind_serializes_snake_case() {
        let json = serde_json::to_string(&ErrorKind::ExecutionSubmission).unwrap();
        assert_eq!(json, "\"execution_submission\"");
        assert_eq!(ErrorKind::Timeout.to_string(), "TIMEOUT");
    }
}
