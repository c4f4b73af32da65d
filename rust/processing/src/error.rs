// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Error types for the round-trip pipeline.

use meshattr_core::{DecodeError, EncodeError};

use crate::pipeline::Stage;
use crate::verify::VerificationError;

/// Why a single pipeline step failed.
#[derive(Debug, thiserror::Error)]
pub enum StageError {
    #[error(transparent)]
    Encode(#[from] EncodeError),

    #[error(transparent)]
    Decode(#[from] DecodeError),

    #[error("I/O error on {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("reloaded {reloaded} bytes, {persisted} were persisted")]
    SizeMismatch { persisted: usize, reloaded: usize },

    #[error(transparent)]
    Verification(#[from] VerificationError),
}

/// Errors returned by [`crate::RoundTripDriver`].
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    /// A step ran and failed; the pipeline is now halted.
    #[error("{} step failed: {source}", .stage.step_name())]
    Failed {
        stage: Stage,
        #[source]
        source: StageError,
    },

    /// A step was requested after an earlier step failed.
    #[error("pipeline halted after {} step failed: {reason}", .stage.step_name())]
    Halted { stage: Stage, reason: String },

    /// A step was requested out of order.
    #[error("cannot move from {from} to {to}")]
    InvalidTransition { from: Stage, to: Stage },
}

impl PipelineError {
    /// The stage the error is attributed to.
    pub fn stage(&self) -> Stage {
        match self {
            PipelineError::Failed { stage, .. } | PipelineError::Halted { stage, .. } => *stage,
            PipelineError::InvalidTransition { to, .. } => *to,
        }
    }
}
