pub mod digest;
pub mod dna_record;
pub mod dna_sequence;
pub mod engine;
pub mod enzymes;
pub mod error;
pub mod feature;
pub mod feature_location;
pub mod genbank;
pub mod interval;
pub mod iupac_code;
pub mod matcher;
pub mod restriction_enzyme;
pub mod rotation;
pub mod seguid;

pub use digest::{CutSite, DigestSiteProvider, Fragment};
pub use dna_record::DNArecord;
pub use dna_sequence::{DNAsequence, Topology};
pub use error::{DnaError, Result};
pub use feature::Feature;
pub use interval::{Interval, Location, Strand};
