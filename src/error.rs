use thiserror::Error;

use crate::dna_sequence::Topology;

#[derive(Debug, Error)]
pub enum DnaError {
    #[error("{operation} requires a {required} molecule")]
    Topology {
        operation: &'static str,
        required: Topology,
    },

    #[error("ends are not ligation-compatible: {left} / {right}")]
    IncompatibleEnds { left: String, right: String },

    #[error("there is no anchored overlap between the sequences")]
    NoOverlap,

    #[error("expected exactly one fragment, digestion produced {count}")]
    AmbiguousDigestion { count: usize },

    #[error("the cut sites do not cut the molecule")]
    NoCut,

    #[error("range {start}..{end} is invalid for a molecule of length {len}")]
    InvalidRange { start: usize, end: usize, len: usize },

    #[error("invalid molecule: {0}")]
    InvalidMolecule(String),

    #[error("invalid location: {0}")]
    InvalidLocation(String),

    #[error("feature index {index} out of bounds ({count} features)")]
    NoSuchFeature { index: usize, count: usize },

    #[error("the description carries no SEGUID stamp")]
    NoStamp,

    #[error("codec error: {0}")]
    Codec(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, DnaError>;

impl From<String> for DnaError {
    fn from(err: String) -> Self {
        DnaError::Codec(err)
    }
}
