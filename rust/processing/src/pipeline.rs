// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Round-trip state machine.

use std::ffi::OsString;
use std::fmt;
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

use bytes::Bytes;
use meshattr_core::{Codec, Mesh, MetadataValue, StreamHeader};
use serde::Serialize;

use crate::error::{PipelineError, StageError};
use crate::report::RoundTripReport;
use crate::verify::verify_round_trip;

/// Where a [`RoundTripDriver`] is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Built,
    Encoded,
    Persisted,
    Reloaded,
    Decoded,
    Verified,
    Failed,
}

impl Stage {
    /// The stage that follows this one on success.
    pub fn next(self) -> Option<Stage> {
        match self {
            Stage::Built => Some(Stage::Encoded),
            Stage::Encoded => Some(Stage::Persisted),
            Stage::Persisted => Some(Stage::Reloaded),
            Stage::Reloaded => Some(Stage::Decoded),
            Stage::Decoded => Some(Stage::Verified),
            Stage::Verified | Stage::Failed => None,
        }
    }

    /// Name of the step that reaches this stage.
    pub fn step_name(self) -> &'static str {
        match self {
            Stage::Built => "build",
            Stage::Encoded => "encode",
            Stage::Persisted => "persist",
            Stage::Reloaded => "reload",
            Stage::Decoded => "decode",
            Stage::Verified => "verify",
            Stage::Failed => "fail",
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Stage::Built => "built",
            Stage::Encoded => "encoded",
            Stage::Persisted => "persisted",
            Stage::Reloaded => "reloaded",
            Stage::Decoded => "decoded",
            Stage::Verified => "verified",
            Stage::Failed => "failed",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

enum State {
    Built,
    Encoded(Bytes),
    Persisted { size: usize },
    Reloaded {
        bytes: Bytes,
        header: Option<StreamHeader>,
    },
    Decoded {
        header: Option<StreamHeader>,
        compressed_size: usize,
    },
    Verified(RoundTripReport),
    Failed { stage: Stage, reason: String },
}

impl State {
    fn stage(&self) -> Stage {
        match self {
            State::Built => Stage::Built,
            State::Encoded(_) => Stage::Encoded,
            State::Persisted { .. } => Stage::Persisted,
            State::Reloaded { .. } => Stage::Reloaded,
            State::Decoded { .. } => Stage::Decoded,
            State::Verified(_) => Stage::Verified,
            State::Failed { .. } => Stage::Failed,
        }
    }
}

/// Drives one mesh through encode, persist, reload, decode and verify.
///
/// Steps must be called in order, each at most once. A failing step moves the
/// driver to [`Stage::Failed`]; every step requested after that returns
/// [`PipelineError::Halted`].
pub struct RoundTripDriver<C> {
    codec: C,
    path: PathBuf,
    original: Mesh,
    lookup: Option<(String, MetadataValue)>,
    decoded: Option<Mesh>,
    state: State,
}

impl<C: Codec> RoundTripDriver<C> {
    /// Creates a driver for `mesh` that persists to `path`.
    pub fn new(codec: C, mesh: Mesh, path: impl Into<PathBuf>) -> Self {
        Self {
            codec,
            path: path.into(),
            original: mesh,
            lookup: None,
            decoded: None,
            state: State::Built,
        }
    }

    /// Metadata pair whose attribute is reported as `uvs2`.
    pub fn with_lookup(mut self, key: impl Into<String>, value: impl Into<MetadataValue>) -> Self {
        self.lookup = Some((key.into(), value.into()));
        self
    }

    pub fn stage(&self) -> Stage {
        self.state.stage()
    }

    /// Reason recorded by the step that failed, if any.
    pub fn failure(&self) -> Option<(Stage, &str)> {
        match &self.state {
            State::Failed { stage, reason } => Some((*stage, reason.as_str())),
            _ => None,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn original(&self) -> &Mesh {
        &self.original
    }

    /// The decoded mesh, once the decode step has succeeded.
    pub fn decoded(&self) -> Option<&Mesh> {
        self.decoded.as_ref()
    }

    pub fn report(&self) -> Option<&RoundTripReport> {
        match &self.state {
            State::Verified(report) => Some(report),
            _ => None,
        }
    }

    /// Runs every remaining step and returns the verification report.
    pub fn run(&mut self) -> Result<&RoundTripReport, PipelineError> {
        self.encode()?;
        self.persist()?;
        self.reload()?;
        self.decode()?;
        self.verify()
    }

    pub fn encode(&mut self) -> Result<(), PipelineError> {
        if !matches!(self.state, State::Built) {
            return Err(self.refuse(Stage::Encoded));
        }
        let outcome = self.codec.encode(&self.original).map_err(StageError::from);
        let outcome = outcome.map(|bytes| {
            tracing::info!(
                size = bytes.len(),
                points = self.original.point_count(),
                attributes = self.original.registry().len(),
                "Encoded mesh"
            );
            State::Encoded(bytes)
        });
        self.settle(Stage::Encoded, outcome)
    }

    pub fn persist(&mut self) -> Result<(), PipelineError> {
        let bytes = match &self.state {
            State::Encoded(bytes) => bytes.clone(),
            _ => return Err(self.refuse(Stage::Persisted)),
        };
        let outcome = write_file(&self.path, &bytes).map(|()| {
            tracing::info!(path = %self.path.display(), size = bytes.len(), "Persisted encoded mesh");
            State::Persisted { size: bytes.len() }
        });
        self.settle(Stage::Persisted, outcome)
    }

    pub fn reload(&mut self) -> Result<(), PipelineError> {
        let persisted = match &self.state {
            State::Persisted { size } => *size,
            _ => return Err(self.refuse(Stage::Reloaded)),
        };
        let outcome = read_file(&self.path).and_then(|bytes| {
            if bytes.len() != persisted {
                return Err(StageError::SizeMismatch {
                    persisted,
                    reloaded: bytes.len(),
                });
            }
            let header = self.codec.describe(&bytes);
            match &header {
                Some(header) => tracing::info!(
                    size = bytes.len(),
                    geometry = ?header.geometry,
                    version = %format_args!("{}.{}", header.major, header.minor),
                    compressed = header.compressed,
                    "Reloaded encoded mesh"
                ),
                None => tracing::info!(size = bytes.len(), "Reloaded encoded mesh"),
            }
            Ok(State::Reloaded { bytes, header })
        });
        self.settle(Stage::Reloaded, outcome)
    }

    pub fn decode(&mut self) -> Result<(), PipelineError> {
        let (bytes, header) = match &self.state {
            State::Reloaded { bytes, header } => (bytes.clone(), *header),
            _ => return Err(self.refuse(Stage::Decoded)),
        };
        let outcome = match self.codec.decode(&bytes) {
            Ok(mesh) => {
                tracing::info!(
                    points = mesh.point_count(),
                    faces = mesh.num_faces(),
                    attributes = mesh.registry().len(),
                    "Decoded mesh"
                );
                self.decoded = Some(mesh);
                Ok(State::Decoded {
                    header,
                    compressed_size: bytes.len(),
                })
            }
            Err(err) => Err(StageError::from(err)),
        };
        self.settle(Stage::Decoded, outcome)
    }

    pub fn verify(&mut self) -> Result<&RoundTripReport, PipelineError> {
        let (header, compressed_size) = match &self.state {
            State::Decoded {
                header,
                compressed_size,
            } => (*header, *compressed_size),
            _ => return Err(self.refuse(Stage::Verified)),
        };
        let outcome = match self.decoded.as_ref() {
            Some(decoded) => verify_round_trip(&self.original, decoded)
                .map(|resolved| {
                    tracing::info!(resolved = resolved.len(), "Verified round trip");
                    State::Verified(RoundTripReport::new(
                        decoded,
                        header,
                        compressed_size,
                        resolved,
                        self.lookup.as_ref(),
                    ))
                })
                .map_err(StageError::from),
            None => return Err(self.refuse(Stage::Verified)),
        };
        self.settle(Stage::Verified, outcome)?;
        match &self.state {
            State::Verified(report) => Ok(report),
            _ => Err(self.refuse(Stage::Verified)),
        }
    }

    fn refuse(&self, to: Stage) -> PipelineError {
        match &self.state {
            State::Failed { stage, reason } => PipelineError::Halted {
                stage: *stage,
                reason: reason.clone(),
            },
            other => PipelineError::InvalidTransition {
                from: other.stage(),
                to,
            },
        }
    }

    fn settle(&mut self, stage: Stage, outcome: Result<State, StageError>) -> Result<(), PipelineError> {
        match outcome {
            Ok(next) => {
                self.state = next;
                Ok(())
            }
            Err(source) => {
                tracing::warn!(step = stage.step_name(), error = %source, "Round-trip step failed");
                self.state = State::Failed {
                    stage,
                    reason: source.to_string(),
                };
                Err(PipelineError::Failed { stage, source })
            }
        }
    }
}

/// Sibling of `path` that receives the bytes before the rename.
fn partial_path(path: &Path) -> PathBuf {
    let mut name = OsString::from(path.as_os_str());
    name.push(".partial");
    PathBuf::from(name)
}

/// Writes `bytes` next to `path` and renames into place, so an interrupted
/// write never leaves a complete-looking file behind.
fn write_file(path: &Path, bytes: &[u8]) -> Result<(), StageError> {
    let partial = partial_path(path);
    let written = File::create(&partial).and_then(|mut file| {
        file.write_all(bytes)?;
        file.sync_all()
    });
    let renamed = written.and_then(|()| fs::rename(&partial, path));
    renamed.map_err(|source| {
        let _ = fs::remove_file(&partial);
        io_error(path, source)
    })
}

fn read_file(path: &Path) -> Result<Bytes, StageError> {
    fs::read(path)
        .map(Bytes::from)
        .map_err(|source| io_error(path, source))
}

fn io_error(path: &Path, source: std::io::Error) -> StageError {
    StageError::Io {
        path: path.display().to_string(),
        source,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scenario;
    use meshattr_core::{CodecOptions, ZlibCodec};

    fn driver(dir: &tempfile::TempDir) -> RoundTripDriver<ZlibCodec> {
        let demo = scenario::demo_mesh().unwrap();
        RoundTripDriver::new(ZlibCodec::default(), demo.mesh, dir.path().join("mesh.bin"))
    }

    #[test]
    fn test_stage_order() {
        let mut stage = Stage::Built;
        let mut seen = vec![stage];
        while let Some(next) = stage.next() {
            seen.push(next);
            stage = next;
        }
        assert_eq!(
            seen,
            vec![
                Stage::Built,
                Stage::Encoded,
                Stage::Persisted,
                Stage::Reloaded,
                Stage::Decoded,
                Stage::Verified
            ]
        );
        assert_eq!(Stage::Failed.next(), None);
    }

    #[test]
    fn test_steps_advance_stage() {
        let dir = tempfile::tempdir().unwrap();
        let mut driver = driver(&dir);
        assert_eq!(driver.stage(), Stage::Built);
        driver.encode().unwrap();
        assert_eq!(driver.stage(), Stage::Encoded);
        driver.persist().unwrap();
        assert_eq!(driver.stage(), Stage::Persisted);
        assert!(driver.path().exists());
        assert!(!partial_path(driver.path()).exists());
        driver.reload().unwrap();
        assert_eq!(driver.stage(), Stage::Reloaded);
        assert!(driver.decoded().is_none());
        driver.decode().unwrap();
        assert_eq!(driver.stage(), Stage::Decoded);
        assert!(driver.decoded().is_some());
        let report = driver.verify().unwrap();
        assert_eq!(report.stage, Stage::Verified);
        assert_eq!(driver.stage(), Stage::Verified);
    }

    #[test]
    fn test_out_of_order_step_is_rejected_without_failing() {
        let dir = tempfile::tempdir().unwrap();
        let mut driver = driver(&dir);
        let err = driver.persist().unwrap_err();
        assert!(matches!(
            err,
            PipelineError::InvalidTransition {
                from: Stage::Built,
                to: Stage::Persisted
            }
        ));
        assert_eq!(driver.stage(), Stage::Built);
        driver.encode().unwrap();
        assert!(matches!(
            driver.encode(),
            Err(PipelineError::InvalidTransition { .. })
        ));
    }

    #[test]
    fn test_encode_failure_halts() {
        let dir = tempfile::tempdir().unwrap();
        let mut driver = RoundTripDriver::new(
            ZlibCodec::new(CodecOptions::default()),
            Mesh::new(),
            dir.path().join("mesh.bin"),
        );
        let err = driver.encode().unwrap_err();
        assert!(matches!(
            err,
            PipelineError::Failed {
                stage: Stage::Encoded,
                source: StageError::Encode(_)
            }
        ));
        assert_eq!(driver.stage(), Stage::Failed);
        assert_eq!(driver.failure().map(|(stage, _)| stage), Some(Stage::Encoded));

        let err = driver.persist().unwrap_err();
        assert!(matches!(
            err,
            PipelineError::Halted {
                stage: Stage::Encoded,
                ..
            }
        ));
        assert_eq!(err.stage(), Stage::Encoded);
        assert!(!driver.path().exists());
    }

    #[test]
    fn test_persist_into_missing_directory_fails() {
        let dir = tempfile::tempdir().unwrap();
        let demo = scenario::demo_mesh().unwrap();
        let mut driver = RoundTripDriver::new(
            ZlibCodec::default(),
            demo.mesh,
            dir.path().join("missing").join("mesh.bin"),
        );
        driver.encode().unwrap();
        let err = driver.persist().unwrap_err();
        assert!(matches!(
            err,
            PipelineError::Failed {
                stage: Stage::Persisted,
                source: StageError::Io { .. }
            }
        ));
        assert!(err.to_string().starts_with("persist step failed"));
    }

    #[test]
    fn test_partial_path_keeps_extension() {
        assert_eq!(
            partial_path(Path::new("out/mesh.bin")),
            PathBuf::from("out/mesh.bin.partial")
        );
        assert_ne!(
            partial_path(Path::new("mesh.bin")),
            partial_path(Path::new("mesh.drc"))
        );
        assert_eq!(partial_path(Path::new("mesh")), PathBuf::from("mesh.partial"));
    }

    #[test]
    fn test_persist_leaves_sibling_files_alone() {
        let dir = tempfile::tempdir().unwrap();
        let sibling = dir.path().join("mesh.partial");
        fs::write(&sibling, b"unrelated").unwrap();

        let mut driver = driver(&dir);
        driver.encode().unwrap();
        driver.persist().unwrap();
        assert_eq!(fs::read(&sibling).unwrap(), b"unrelated");
        assert!(!dir.path().join("mesh.bin.partial").exists());
    }
}
