// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! CLI subsystem: colored reporting and exit codes

pub mod reporter;

pub use reporter::{BoundsFields, Reporter};

use crate::error::{BoundsError, CombineError, StoreError};

/// Process exit status of the `booltree` binary
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitStatus {
    Success,
    /// Bad arguments, including unknown operators
    Usage,
    /// The database file could not be opened
    DatabaseOpen,
    /// The command ran and failed
    Failure,
}

impl ExitStatus {
    pub fn code(self) -> i32 {
        match self {
            Self::Success => 0,
            Self::Usage => 1,
            Self::DatabaseOpen => 2,
            Self::Failure => 3,
        }
    }
}

impl From<&CombineError> for ExitStatus {
    fn from(err: &CombineError) -> Self {
        match err {
            CombineError::UnrecognizedOperator { .. } => Self::Usage,
            _ => Self::Failure,
        }
    }
}

impl From<&BoundsError> for ExitStatus {
    fn from(err: &BoundsError) -> Self {
        match err {
            BoundsError::NoObjects => Self::Usage,
            _ => Self::Failure,
        }
    }
}

impl From<&StoreError> for ExitStatus {
    fn from(_: &StoreError) -> Self {
        Self::DatabaseOpen
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_codes() {
        assert_eq!(ExitStatus::Success.code(), 0);
        assert_eq!(ExitStatus::Usage.code(), 1);
        assert_eq!(ExitStatus::DatabaseOpen.code(), 2);
        assert_eq!(ExitStatus::Failure.code(), 3);
    }

    #[test]
    fn test_operator_errors_are_usage_errors() {
        let err = CombineError::UnrecognizedOperator {
            token: "xor".into(),
            root_index: 1,
        };
        assert_eq!(ExitStatus::from(&err), ExitStatus::Usage);
        assert_eq!(
            ExitStatus::from(&CombineError::NothingToEvaluate),
            ExitStatus::Failure
        );
    }
}
