// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Error types for boolean evaluation

use thiserror::Error;

/// Errors reported synchronously by the evaluator.
///
/// Any of these aborts the evaluation; no partial result is produced.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CsgError {
    /// Non-finite coordinates, out-of-range indices or, in strict mode,
    /// operands that are not closed manifold solids
    #[error("invalid geometry: {0}")]
    InvalidGeometry(String),

    /// Operator name outside the supported set
    #[error("unsupported boolean operator `{0}`")]
    UnsupportedOperator(String),

    /// Intersection could not be resolved within tolerance
    #[error("numerical degeneracy: {0}")]
    NumericalDegeneracy(String),
}

pub type CsgResult<T> = Result<T, CsgError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = CsgError::UnsupportedOperator("xor".to_string());
        assert_eq!(err.to_string(), "unsupported boolean operator `xor`");

        let err = CsgError::InvalidGeometry("vertex 3 has non-finite position".to_string());
        assert!(err.to_string().starts_with("invalid geometry"));
    }
}
