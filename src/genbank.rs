//! Reading and writing records as GenBank and FASTA.
//!
//! GenBank has no way to express single-stranded ends, so only blunt
//! molecules are written.

use crate::{
    dna_record::DNArecord,
    dna_sequence::{DNAsequence, Topology},
    error::{DnaError, Result},
    feature::{Feature, Qualifiers},
    feature_location::{location_from_genbank, location_to_genbank},
};
use bio::io::fasta;
use gb_io::seq::{Feature as GbFeature, Seq, Topology as GbTopology};
use std::{fs::File, path::Path};

impl DNArecord {
    pub fn from_genbank_seq(seq: Seq) -> Result<Self> {
        let topology = match seq.topology {
            GbTopology::Linear => Topology::Linear,
            GbTopology::Circular => Topology::Circular,
        };
        let len = seq.seq.len();
        let molecule = DNAsequence::from_sequence_with_topology(
            &String::from_utf8_lossy(&seq.seq),
            topology,
        );
        let mut ret = Self::from_molecule(molecule);
        if let Some(name) = &seq.name {
            ret.name = name.clone();
        }
        ret.id = seq
            .accession
            .clone()
            .or_else(|| seq.name.clone())
            .unwrap_or_else(|| ret.id.clone());
        if let Some(definition) = &seq.definition {
            ret.description = definition.clone();
        }
        for feature in &seq.features {
            let location = location_from_genbank(&feature.location, len)?;
            let mut qualifiers = Qualifiers::new();
            for (key, value) in &feature.qualifiers {
                qualifiers
                    .entry(key.to_string())
                    .or_default()
                    .push(value.clone().unwrap_or_default());
            }
            ret.push_feature(Feature {
                kind: feature.kind.to_string(),
                location,
                qualifiers,
            })?;
        }
        Ok(ret)
    }

    pub fn to_genbank_seq(&self) -> Result<Seq> {
        let seq = self.seq();
        if seq.five_prime_end().is_sticky() || seq.three_prime_end().is_sticky() {
            log::warn!("{} has single-stranded ends; GenBank cannot hold them", self.name);
            return Err(DnaError::Codec(format!(
                "{} has single-stranded ends ({} / {})",
                self.name,
                seq.five_prime_end(),
                seq.three_prime_end()
            )));
        }
        let topology = match self.topology() {
            Topology::Linear => GbTopology::Linear,
            Topology::Circular => GbTopology::Circular,
        };
        let features = self
            .features()
            .iter()
            .map(|f| GbFeature {
                kind: f.kind.clone().into(),
                location: location_to_genbank(&f.location),
                qualifiers: f
                    .qualifiers
                    .iter()
                    .flat_map(|(key, values)| {
                        values
                            .iter()
                            .map(move |value| (key.clone().into(), Some(value.clone())))
                    })
                    .collect(),
            })
            .collect();
        Ok(Seq {
            name: Some(self.name.clone()),
            topology,
            date: None,
            len: Some(seq.len()),
            molecule_type: Some("DNA".to_string()),
            division: String::new(),
            definition: Some(self.description.clone()),
            accession: Some(self.id.clone()),
            version: None,
            source: None,
            dblink: None,
            keywords: None,
            references: vec![],
            comments: vec![],
            seq: seq.full_watson(),
            contig: None,
            features,
        })
    }

    pub fn from_genbank_file<P: AsRef<Path>>(path: P) -> Result<Vec<Self>> {
        gb_io::reader::parse_file(path)
            .map_err(|e| DnaError::Codec(e.to_string()))?
            .into_iter()
            .map(Self::from_genbank_seq)
            .collect()
    }

    pub fn write_genbank_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let seq = self.to_genbank_seq()?;
        let file = File::create(path)?;
        gb_io::writer::write(file, &seq).map_err(|e| DnaError::Codec(e.to_string()))?;
        Ok(())
    }

    pub fn from_fasta_record(record: &fasta::Record) -> Self {
        let molecule = DNAsequence::from_sequence(&String::from_utf8_lossy(record.seq()));
        let mut ret = Self::from_molecule(molecule);
        ret.name = record.id().to_string();
        ret.id = record.id().to_string();
        if let Some(desc) = record.desc() {
            ret.description = desc.to_string();
        }
        ret
    }

    pub fn from_fasta_file<P: AsRef<Path>>(path: P) -> Result<Vec<Self>> {
        let file = File::open(path)?;
        fasta::Reader::new(file)
            .records()
            .map(|record| {
                record
                    .map(|r| Self::from_fasta_record(&r))
                    .map_err(|e| DnaError::Codec(e.to_string()))
            })
            .collect()
    }

    /// Top strand as FASTA.
    pub fn write_fasta_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let file = File::create(path)?;
        let mut writer = fasta::Writer::new(file);
        let header = self.name.replace(' ', "_");
        writer.write(&header, Some(self.description.as_str()), &self.seq().full_watson())?;
        writer.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interval::{Interval, Location, Strand};

    fn plasmid() -> DNArecord {
        let mut record =
            DNArecord::from_sequence_with_topology("aaaGGATCCgggTTTccc", Topology::Circular)
                .with_name("pTEST");
        record
            .push_feature(
                Feature::from_interval("misc_feature", 3, 9, Strand::Reverse)
                    .with_qualifier("label", "BamHI site"),
            )
            .unwrap();
        let wrap =
            Location::new(vec![Interval::forward(15, 18), Interval::forward(0, 3)]).unwrap();
        record
            .push_feature(Feature::new("gene", wrap).with_qualifier("gene", "wrap"))
            .unwrap();
        record
    }

    #[test]
    fn test_genbank_seq_roundtrip() {
        let record = plasmid();
        let seq = record.to_genbank_seq().unwrap();
        assert_eq!(seq.topology, GbTopology::Circular);
        assert_eq!(seq.features.len(), 2);
        assert_eq!(seq.features[0].kind.to_string(), "misc_feature");
        assert_eq!(seq.features[0].qualifiers[0].0.to_string(), "label");
        assert_eq!(
            seq.features[0].qualifiers[0].1.as_deref(),
            Some("BamHI site")
        );
        let back = DNArecord::from_genbank_seq(seq).unwrap();
        assert_eq!(back.seq(), record.seq());
        assert_eq!(back.features(), record.features());
        assert_eq!(back.name, "pTEST");
    }

    #[test]
    fn test_genbank_file_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ptest.gb");
        let record = plasmid();
        record.write_genbank_file(&path).unwrap();
        let back = DNArecord::from_genbank_file(&path).unwrap();
        assert_eq!(back.len(), 1);
        assert!(back[0].is_circular());
        assert_eq!(
            back[0].seq().watson_string().to_uppercase(),
            record.seq().watson_string().to_uppercase()
        );
        assert_eq!(back[0].features().len(), 2);
        assert!(back[0].features()[1].location.is_origin_split(18));
    }

    #[test]
    fn test_point_at_circle_end_reads_as_origin() {
        let mut seq = plasmid().to_genbank_seq().unwrap();
        seq.features.push(GbFeature {
            kind: "misc_feature".into(),
            location: gb_io::seq::Location::Between(17, 18),
            qualifiers: vec![],
        });
        let record = DNArecord::from_genbank_seq(seq).unwrap();
        let point = &record.features()[2];
        assert_eq!(point.location.parts(), &[Interval::forward(0, 0)]);
        let back = record.rotated(5).unwrap().rotated(13).unwrap();
        assert!(back.features().iter().any(|f| f == point));
    }

    #[test]
    fn test_sticky_ends_rejected() {
        let record = DNArecord::from_molecule(DNAsequence::from_strands("GATCCaaa", "tttG", -4));
        assert!(matches!(record.to_genbank_seq(), Err(DnaError::Codec(_))));
    }

    #[test]
    fn test_fasta_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("x.fa");
        let record = DNArecord::from_sequence("acgtACGT").with_name("x");
        record.write_fasta_file(&path).unwrap();
        let back = DNArecord::from_fasta_file(&path).unwrap();
        assert_eq!(back[0].seq(), record.seq());
        assert_eq!(back[0].name, "x");
    }
}
