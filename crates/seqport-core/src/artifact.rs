use std::path::{Path, PathBuf};

/// Where a model comes from. The file format belongs to the engine.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ModelArtifact {
    OnnxPath(PathBuf),
}

impl ModelArtifact {
    pub fn path(&self) -> &Path {
        match self {
            ModelArtifact::OnnxPath(p) => p,
        }
    }
}
