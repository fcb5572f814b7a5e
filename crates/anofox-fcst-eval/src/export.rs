//! Interface to model export backends.
//!
//! Export (ONNX, TensorRT and similar packaging) lives outside this crate.
//! Callers that chain export with evaluation implement [`ModelExporter`] for
//! their backend; the evaluator itself never calls it.

use std::path::{Path, PathBuf};

use crate::error::Result;

/// Portable artifact produced by an exporter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExportArtifact {
    /// Artifact written to disk
    File(PathBuf),
    /// Serialized artifact kept in memory
    InMemory(Vec<u8>),
}

impl ExportArtifact {
    /// Path of the artifact, if it was written to disk.
    pub fn path(&self) -> Option<&Path> {
        match self {
            ExportArtifact::File(path) => Some(path),
            ExportArtifact::InMemory(_) => None,
        }
    }
}

/// Produces a portable artifact from a trained model and a processed input batch.
pub trait ModelExporter {
    type Model;
    type Batch;

    /// Export `model`, tracing it with `batch`.
    ///
    /// With `save_path` set the artifact is written there and returned as
    /// [`ExportArtifact::File`]; otherwise it is kept in memory.
    fn export(
        &self,
        model: &Self::Model,
        batch: &Self::Batch,
        save_path: Option<&Path>,
    ) -> Result<ExportArtifact>;
}
