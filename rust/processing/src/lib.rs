// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Round-trip pipeline for meshattr meshes.
//!
//! [`RoundTripDriver`] walks a mesh through
//! `Built → Encoded → Persisted → Reloaded → Decoded → Verified`.
//! The first failing step moves the driver to `Failed` and every later step
//! is refused; nothing is retried.
//!
//! Verification never trusts attribute ids from before the round trip. Each
//! original attribute is found again in the decoded mesh by its metadata, or
//! by its position among attributes of the same semantic when it has none.

pub mod error;
pub mod pipeline;
pub mod report;
pub mod scenario;
pub mod verify;

pub use error::{PipelineError, StageError};
pub use pipeline::{RoundTripDriver, Stage};
pub use report::RoundTripReport;
pub use verify::{verify_round_trip, Resolution, ResolvedAttribute, VerificationError};
