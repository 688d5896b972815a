use crate::{
    dna_record::{DNArecord, RecordSource},
    dna_sequence::Topology,
    enzymes::{load_restriction_enzymes_from_path, normalized},
    error::DnaError,
    feature::Feature,
    interval::Strand,
    restriction_enzyme::RestrictionEnzyme,
};
use serde::{Deserialize, Serialize};
use std::{collections::HashMap, error::Error, fmt, path::Path};

pub type SeqId = String;
pub type OpId = String;
pub type RunId = String;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineParameters {
    /// Minimum anchored match length used by `Sync`.
    pub sync_min_match: usize,
    pub max_fragments: usize,
}

impl Default for EngineParameters {
    fn default() -> Self {
        Self {
            sync_min_match: 25,
            max_fragments: 10_000,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProjectState {
    pub sequences: HashMap<SeqId, DNArecord>,
    #[serde(default)]
    pub parameters: EngineParameters,
}

impl ProjectState {
    pub fn load_from_path(path: &str) -> Result<Self, EngineError> {
        let text = std::fs::read_to_string(path).map_err(|e| EngineError {
            code: ErrorCode::Io,
            message: format!("Could not read state file '{path}': {e}"),
        })?;
        serde_json::from_str(&text).map_err(|e| EngineError {
            code: ErrorCode::InvalidInput,
            message: format!("Could not parse state JSON '{path}': {e}"),
        })
    }

    pub fn save_to_path(&self, path: &str) -> Result<(), EngineError> {
        let text = serde_json::to_string_pretty(self).map_err(|e| EngineError {
            code: ErrorCode::Internal,
            message: format!("Could not serialize state: {e}"),
        })?;
        std::fs::write(path, text).map_err(|e| EngineError {
            code: ErrorCode::Io,
            message: format!("Could not write state file '{path}': {e}"),
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum ExportFormat {
    GenBank,
    Fasta,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Operation {
    LoadFile {
        path: String,
        as_id: Option<SeqId>,
    },
    SaveFile {
        seq_id: SeqId,
        path: String,
        format: ExportFormat,
    },
    AddSequence {
        sequence: String,
        circular: bool,
        as_id: Option<SeqId>,
    },
    AddFeature {
        seq_id: SeqId,
        start: usize,
        end: usize,
        reverse: bool,
        kind: String,
        label: Option<String>,
    },
    Rotate {
        input: SeqId,
        shift: isize,
        output_id: Option<SeqId>,
    },
    Sync {
        input: SeqId,
        reference: SeqId,
        output_id: Option<SeqId>,
    },
    Digest {
        input: SeqId,
        #[serde(default)]
        enzymes: Vec<RestrictionEnzyme>,
        #[serde(default)]
        enzymes_file: Option<String>,
        output_prefix: Option<String>,
    },
    Linearize {
        input: SeqId,
        #[serde(default)]
        enzymes: Vec<RestrictionEnzyme>,
        #[serde(default)]
        enzymes_file: Option<String>,
        output_id: Option<SeqId>,
    },
    ReverseComplement {
        input: SeqId,
        output_id: Option<SeqId>,
    },
    Loop {
        input: SeqId,
        output_id: Option<SeqId>,
    },
    Ligate {
        inputs: Vec<SeqId>,
        circularize: bool,
        output_id: Option<SeqId>,
    },
    ExtractRegion {
        input: SeqId,
        from: usize,
        to: usize,
        output_id: Option<SeqId>,
    },
    SetParameter {
        name: String,
        value: serde_json::Value,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Workflow {
    pub run_id: RunId,
    pub ops: Vec<Operation>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpResult {
    pub op_id: OpId,
    pub created_seq_ids: Vec<SeqId>,
    pub changed_seq_ids: Vec<SeqId>,
    pub warnings: Vec<String>,
    pub messages: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OperationRecord {
    pub run_id: RunId,
    pub op: Operation,
    pub result: OpResult,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorCode {
    InvalidInput,
    NotFound,
    Unsupported,
    Io,
    Internal,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineError {
    pub code: ErrorCode,
    pub message: String,
}

impl fmt::Display for EngineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}: {}", self.code, self.message)
    }
}

impl Error for EngineError {}

impl From<DnaError> for EngineError {
    fn from(e: DnaError) -> Self {
        let code = match &e {
            DnaError::Topology { .. } => ErrorCode::Unsupported,
            DnaError::NoSuchFeature { .. } => ErrorCode::NotFound,
            DnaError::Io(_) => ErrorCode::Io,
            DnaError::Json(_) => ErrorCode::Internal,
            _ => ErrorCode::InvalidInput,
        };
        Self {
            code,
            message: e.to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Capabilities {
    pub protocol_version: String,
    pub supported_operations: Vec<String>,
    pub supported_export_formats: Vec<String>,
    pub deterministic_operation_log: bool,
}

pub trait Engine {
    fn apply(&mut self, op: Operation) -> Result<OpResult, EngineError>;
    fn apply_workflow(&mut self, wf: Workflow) -> Result<Vec<OpResult>, EngineError>;
    fn snapshot(&self) -> &ProjectState;
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DnaEngine {
    state: ProjectState,
    journal: Vec<OperationRecord>,
    op_counter: u64,
}

impl DnaEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_state(state: ProjectState) -> Self {
        Self {
            state,
            ..Self::default()
        }
    }

    pub fn state(&self) -> &ProjectState {
        &self.state
    }

    pub fn state_mut(&mut self) -> &mut ProjectState {
        &mut self.state
    }

    pub fn capabilities() -> Capabilities {
        Capabilities {
            protocol_version: "v1".to_string(),
            supported_operations: [
                "LoadFile",
                "SaveFile",
                "AddSequence",
                "AddFeature",
                "Rotate",
                "Sync",
                "Digest",
                "Linearize",
                "ReverseComplement",
                "Loop",
                "Ligate",
                "ExtractRegion",
                "SetParameter",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
            supported_export_formats: vec!["GenBank".to_string(), "Fasta".to_string()],
            deterministic_operation_log: true,
        }
    }

    pub fn operation_log(&self) -> &[OperationRecord] {
        &self.journal
    }

    fn next_op_id(&mut self) -> OpId {
        self.op_counter += 1;
        format!("op-{}", self.op_counter)
    }

    fn derive_seq_id(path: &str) -> SeqId {
        Path::new(path)
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| "sequence".to_string())
    }

    fn unique_seq_id(&self, base: &str) -> SeqId {
        if !self.state.sequences.contains_key(base) {
            return base.to_string();
        }
        let mut i = 2usize;
        loop {
            let candidate = format!("{base}_{i}");
            if !self.state.sequences.contains_key(&candidate) {
                return candidate;
            }
            i += 1;
        }
    }

    fn record(&self, seq_id: &str) -> Result<&DNArecord, EngineError> {
        self.state.sequences.get(seq_id).ok_or_else(|| EngineError {
            code: ErrorCode::NotFound,
            message: format!("Sequence '{seq_id}' not found"),
        })
    }

    fn store(&mut self, base: &str, record: DNArecord, result: &mut OpResult) -> SeqId {
        let seq_id = self.unique_seq_id(base);
        self.state.sequences.insert(seq_id.clone(), record);
        result.created_seq_ids.push(seq_id.clone());
        seq_id
    }

    fn load_records(path: &str) -> Result<Vec<DNArecord>, EngineError> {
        match DNArecord::from_genbank_file(path) {
            Ok(records) if !records.is_empty() => return Ok(records),
            Ok(_) => {}
            Err(e) => log::debug!("'{path}' is not GenBank: {e}"),
        }
        let records = DNArecord::from_fasta_file(path)?;
        if records.is_empty() {
            return Err(EngineError {
                code: ErrorCode::InvalidInput,
                message: format!("No sequences found in '{path}'"),
            });
        }
        Ok(records)
    }

    fn collect_enzymes(
        enzymes: &[RestrictionEnzyme],
        enzymes_file: Option<&str>,
    ) -> Result<Vec<RestrictionEnzyme>, EngineError> {
        let mut ret = normalized(enzymes);
        if let Some(path) = enzymes_file {
            ret.extend(load_restriction_enzymes_from_path(path)?);
        }
        if ret.is_empty() {
            return Err(EngineError {
                code: ErrorCode::InvalidInput,
                message: "At least one enzyme is required".to_string(),
            });
        }
        Ok(ret)
    }

    fn set_parameter(&mut self, name: &str, value: &serde_json::Value) -> Result<(), EngineError> {
        let number = value
            .as_u64()
            .and_then(|v| usize::try_from(v).ok())
            .ok_or_else(|| EngineError {
                code: ErrorCode::InvalidInput,
                message: format!("Parameter '{name}' needs a non-negative integer, got {value}"),
            })?;
        match name {
            "sync_min_match" => self.state.parameters.sync_min_match = number,
            "max_fragments" => self.state.parameters.max_fragments = number,
            _ => {
                return Err(EngineError {
                    code: ErrorCode::NotFound,
                    message: format!("Unknown parameter '{name}'"),
                });
            }
        }
        Ok(())
    }

    fn apply_internal(&mut self, op: Operation) -> Result<OpResult, EngineError> {
        let op_id = self.next_op_id();
        let mut result = OpResult {
            op_id,
            created_seq_ids: vec![],
            changed_seq_ids: vec![],
            warnings: vec![],
            messages: vec![],
        };

        match op {
            Operation::LoadFile { path, as_id } => {
                let records = Self::load_records(&path)?;
                let base = as_id.unwrap_or_else(|| Self::derive_seq_id(&path));
                for record in records {
                    let seq_id = self.store(&base, record, &mut result);
                    result
                        .messages
                        .push(format!("Loaded '{path}' as '{seq_id}'"));
                }
            }
            Operation::SaveFile {
                seq_id,
                path,
                format,
            } => {
                let record = self.record(&seq_id)?;
                match format {
                    ExportFormat::GenBank => record.write_genbank_file(&path)?,
                    ExportFormat::Fasta => record.write_fasta_file(&path)?,
                }
                result.changed_seq_ids.push(seq_id.clone());
                result
                    .messages
                    .push(format!("Wrote '{seq_id}' to '{path}'"));
            }
            Operation::AddSequence {
                sequence,
                circular,
                as_id,
            } => {
                let topology = if circular {
                    Topology::Circular
                } else {
                    Topology::Linear
                };
                let record = DNArecord::new(RecordSource::Text(sequence), Some(topology))?;
                let seq_id = self.store(
                    as_id.as_deref().unwrap_or("sequence"),
                    record,
                    &mut result,
                );
                result.messages.push(format!("Added '{seq_id}'"));
            }
            Operation::AddFeature {
                seq_id,
                start,
                end,
                reverse,
                kind,
                label,
            } => {
                let mut record = self.record(&seq_id)?.clone();
                let strand = if reverse {
                    Strand::Reverse
                } else {
                    Strand::Forward
                };
                let mut feature = Feature::from_interval(&kind, start, end, strand);
                if let Some(label) = label {
                    feature.add_qualifier("label", &label);
                }
                record.push_feature(feature)?;
                self.state.sequences.insert(seq_id.clone(), record);
                result.changed_seq_ids.push(seq_id);
            }
            Operation::Rotate {
                input,
                shift,
                output_id,
            } => {
                let rotated = self.record(&input)?.rotated(shift)?;
                let base = output_id.unwrap_or_else(|| format!("{input}_rot"));
                self.store(&base, rotated, &mut result);
            }
            Operation::Sync {
                input,
                reference,
                output_id,
            } => {
                let reference = self.record(&reference)?.seq().watson_string();
                let limit = self.state.parameters.sync_min_match;
                let synced = self.record(&input)?.synced(&reference, limit)?;
                let base = output_id.unwrap_or_else(|| format!("{input}_synced"));
                self.store(&base, synced, &mut result);
            }
            Operation::Digest {
                input,
                enzymes,
                enzymes_file,
                output_prefix,
            } => {
                let enzymes = Self::collect_enzymes(&enzymes, enzymes_file.as_deref())?;
                let fragments = self.record(&input)?.digest(enzymes.as_slice());
                let max_fragments = self.state.parameters.max_fragments;
                if fragments.len() > max_fragments {
                    return Err(EngineError {
                        code: ErrorCode::InvalidInput,
                        message: format!(
                            "Digest produced {} fragments, more than max_fragments={max_fragments}",
                            fragments.len()
                        ),
                    });
                }
                let prefix = output_prefix.unwrap_or_else(|| format!("{input}_digest"));
                for (i, fragment) in fragments.into_iter().enumerate() {
                    self.store(&format!("{}_{}", prefix, i + 1), fragment.record, &mut result);
                }
                result.messages.push(format!(
                    "Digest created {} fragment(s)",
                    result.created_seq_ids.len()
                ));
            }
            Operation::Linearize {
                input,
                enzymes,
                enzymes_file,
                output_id,
            } => {
                let enzymes = Self::collect_enzymes(&enzymes, enzymes_file.as_deref())?;
                let linear = self.record(&input)?.linearize_with(enzymes.as_slice())?;
                let base = output_id.unwrap_or_else(|| linear.id.clone());
                self.store(&base, linear, &mut result);
            }
            Operation::ReverseComplement { input, output_id } => {
                let rc = self.record(&input)?.reverse_complement();
                let base = output_id.unwrap_or_else(|| format!("{input}_rc"));
                self.store(&base, rc, &mut result);
            }
            Operation::Loop { input, output_id } => {
                let looped = self.record(&input)?.looped()?;
                let base = output_id.unwrap_or_else(|| format!("{input}_circ"));
                self.store(&base, looped, &mut result);
            }
            Operation::Ligate {
                inputs,
                circularize,
                output_id,
            } => {
                if inputs.is_empty() {
                    return Err(EngineError {
                        code: ErrorCode::InvalidInput,
                        message: "Ligate requires at least one input sequence".to_string(),
                    });
                }
                if inputs.len() > self.state.parameters.max_fragments {
                    return Err(EngineError {
                        code: ErrorCode::InvalidInput,
                        message: format!(
                            "Ligate input count {} exceeds max_fragments={}",
                            inputs.len(),
                            self.state.parameters.max_fragments
                        ),
                    });
                }
                let mut product = self.record(&inputs[0])?.clone();
                for input in &inputs[1..] {
                    product = product.ligated(self.record(input)?)?;
                }
                if circularize {
                    product = product.looped()?;
                }
                let base = output_id.unwrap_or_else(|| "ligation".to_string());
                self.store(&base, product, &mut result);
            }
            Operation::ExtractRegion {
                input,
                from,
                to,
                output_id,
            } => {
                let part = self.record(&input)?.extract(from..to)?;
                let base = output_id.unwrap_or_else(|| part.id.clone());
                self.store(&base, part, &mut result);
            }
            Operation::SetParameter { name, value } => {
                self.set_parameter(&name, &value)?;
                result.messages.push(format!("Set {name} = {value}"));
            }
        }

        for seq_id in &result.created_seq_ids {
            if let Some(record) = self.state.sequences.get(seq_id) {
                log::debug!("{} created {seq_id}: {record}", result.op_id);
            }
        }
        Ok(result)
    }
}

impl Engine for DnaEngine {
    fn apply(&mut self, op: Operation) -> Result<OpResult, EngineError> {
        let run_id = "interactive".to_string();
        let result = self.apply_internal(op.clone())?;
        self.journal.push(OperationRecord {
            run_id,
            op,
            result: result.clone(),
        });
        Ok(result)
    }

    fn apply_workflow(&mut self, wf: Workflow) -> Result<Vec<OpResult>, EngineError> {
        let mut results = Vec::new();
        for op in &wf.ops {
            let result = self.apply_internal(op.clone())?;
            self.journal.push(OperationRecord {
                run_id: wf.run_id.clone(),
                op: op.clone(),
                result: result.clone(),
            });
            results.push(result);
        }
        Ok(results)
    }

    fn snapshot(&self) -> &ProjectState {
        &self.state
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bamhi() -> RestrictionEnzyme {
        RestrictionEnzyme::new("BamHI", "GGATCC", 1, 4)
    }

    fn engine_with(id: &str, sequence: &str, circular: bool) -> DnaEngine {
        let mut engine = DnaEngine::new();
        engine
            .apply(Operation::AddSequence {
                sequence: sequence.to_string(),
                circular,
                as_id: Some(id.to_string()),
            })
            .unwrap();
        engine
    }

    #[test]
    fn test_add_and_rotate() {
        let mut engine = engine_with("p", "aaat", true);
        let res = engine
            .apply(Operation::Rotate {
                input: "p".to_string(),
                shift: 1,
                output_id: None,
            })
            .unwrap();
        assert_eq!(res.created_seq_ids, vec!["p_rot".to_string()]);
        assert_eq!(engine.state().sequences["p_rot"].seq().watson(), b"aata");
        assert_eq!(engine.operation_log().len(), 2);
    }

    #[test]
    fn test_rotate_linear_is_unsupported() {
        let mut engine = engine_with("x", "aaat", false);
        let err = engine
            .apply(Operation::Rotate {
                input: "x".to_string(),
                shift: 1,
                output_id: None,
            })
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::Unsupported);
        assert_eq!(engine.operation_log().len(), 1);
    }

    #[test]
    fn test_digest_and_ligate() {
        let mut engine = engine_with("x", "aaaaGGATCCtttt", false);
        let res = engine
            .apply(Operation::Digest {
                input: "x".to_string(),
                enzymes: vec![bamhi()],
                enzymes_file: None,
                output_prefix: None,
            })
            .unwrap();
        assert_eq!(res.created_seq_ids, vec![
            "x_digest_1".to_string(),
            "x_digest_2".to_string()
        ]);
        engine
            .apply(Operation::Ligate {
                inputs: res.created_seq_ids.clone(),
                circularize: false,
                output_id: Some("joined".to_string()),
            })
            .unwrap();
        let state = engine.state();
        assert_eq!(state.sequences["joined"].seq(), state.sequences["x"].seq());
    }

    #[test]
    fn test_digest_guard() {
        let mut engine = engine_with("x", "GGATCCGGATCCGGATCC", false);
        engine
            .apply(Operation::SetParameter {
                name: "max_fragments".to_string(),
                value: serde_json::json!(2),
            })
            .unwrap();
        let err = engine
            .apply(Operation::Digest {
                input: "x".to_string(),
                enzymes: vec![bamhi()],
                enzymes_file: None,
                output_prefix: None,
            })
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::InvalidInput);
    }

    #[test]
    fn test_linearize() {
        let mut engine = engine_with("p", "ATGGATCCGC", true);
        let res = engine
            .apply(Operation::Linearize {
                input: "p".to_string(),
                enzymes: vec![bamhi()],
                enzymes_file: None,
                output_id: None,
            })
            .unwrap();
        assert_eq!(res.created_seq_ids, vec!["name_lin".to_string()]);
        assert!(engine.state().sequences["name_lin"].is_linear());
    }

    #[test]
    fn test_sync_uses_parameter() {
        let mut engine = engine_with("ref", "gaat", true);
        engine
            .apply(Operation::AddSequence {
                sequence: "atgaCCC".to_string(),
                circular: true,
                as_id: Some("rec".to_string()),
            })
            .unwrap();
        engine
            .apply(Operation::Sync {
                input: "rec".to_string(),
                reference: "ref".to_string(),
                output_id: None,
            })
            .unwrap();
        assert_eq!(engine.state().sequences["rec_synced"].seq().watson(), b"gaCCCat");
    }

    #[test]
    fn test_set_parameter_errors() {
        let mut engine = DnaEngine::new();
        assert!(engine
            .apply(Operation::SetParameter {
                name: "nope".to_string(),
                value: serde_json::json!(1),
            })
            .is_err());
        assert!(engine
            .apply(Operation::SetParameter {
                name: "sync_min_match".to_string(),
                value: serde_json::json!("ten"),
            })
            .is_err());
        engine
            .apply(Operation::SetParameter {
                name: "sync_min_match".to_string(),
                value: serde_json::json!(10),
            })
            .unwrap();
        assert_eq!(engine.state().parameters.sync_min_match, 10);
    }

    #[test]
    fn test_extract_region_and_features() {
        let mut engine = engine_with("x", &"ATGC".repeat(10), false);
        engine
            .apply(Operation::AddFeature {
                seq_id: "x".to_string(),
                start: 4,
                end: 8,
                reverse: false,
                kind: "misc_feature".to_string(),
                label: Some("box".to_string()),
            })
            .unwrap();
        let res = engine
            .apply(Operation::ExtractRegion {
                input: "x".to_string(),
                from: 2,
                to: 10,
                output_id: None,
            })
            .unwrap();
        assert_eq!(res.created_seq_ids, vec!["box".to_string()]);
        let part = &engine.state().sequences["box"];
        assert_eq!(part.seq().watson(), b"GCATGCAT");
        assert_eq!(part.features().len(), 1);
    }

    #[test]
    fn test_file_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let mut engine = engine_with("p", "aaaGGATCCgggTTTccc", true);
        for (format, name) in [(ExportFormat::GenBank, "p.gb"), (ExportFormat::Fasta, "p.fa")] {
            let path = dir.path().join(name).to_string_lossy().to_string();
            engine
                .apply(Operation::SaveFile {
                    seq_id: "p".to_string(),
                    path: path.clone(),
                    format,
                })
                .unwrap();
            let res = engine
                .apply(Operation::LoadFile { path, as_id: None })
                .unwrap();
            assert_eq!(res.created_seq_ids.len(), 1);
        }
        assert!(engine.state().sequences["p"].is_circular());
        assert_eq!(engine.state().sequences.len(), 3);
    }

    #[test]
    fn test_state_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.json").to_string_lossy().to_string();
        let engine = engine_with("p", "aaat", true);
        engine.state().save_to_path(&path).unwrap();
        let state = ProjectState::load_from_path(&path).unwrap();
        assert_eq!(state.sequences["p"], engine.state().sequences["p"]);
        assert_eq!(state.parameters.sync_min_match, 25);
    }
}
