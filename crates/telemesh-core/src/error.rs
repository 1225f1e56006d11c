//! Error types for the mesh relay engine.

use thiserror::Error;

use telemesh_proto::CodecError;

/// Errors surfaced by the mesh engine.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MeshError {
    /// A packet failed to encode or decode.
    #[error("codec error: {0}")]
    Codec(#[from] CodecError),

    /// The node has no parent and cannot move traffic upstream.
    #[error("no route: node is orphaned")]
    NoRoute,
}
