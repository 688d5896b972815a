//! Restriction enzyme lists supplied by the caller as JSON.

use crate::{
    error::{DnaError, Result},
    restriction_enzyme::RestrictionEnzyme,
};
use std::{fs, path::Path};

/// Parses a JSON array of enzymes. Rows with a `type` other than
/// `"restriction"` are skipped; rows without one are taken as restriction
/// enzymes.
pub fn load_restriction_enzymes_from_json_text(json_text: &str) -> Result<Vec<RestrictionEnzyme>> {
    let res: serde_json::Value = serde_json::from_str(json_text)?;
    let arr = res
        .as_array()
        .ok_or_else(|| DnaError::Codec("enzymes file is not a JSON array".to_string()))?;
    let mut ret = vec![];
    for row in arr {
        match row.get("type").and_then(|t| t.as_str()) {
            None | Some("restriction") => {}
            Some(other) => {
                log::debug!("skipping enzyme of type '{other}'");
                continue;
            }
        }
        let mut re: RestrictionEnzyme = serde_json::from_value(row.clone())
            .map_err(|e| DnaError::Codec(format!("bad restriction enzyme {row}: {e}")))?;
        re.sequence = re.sequence.to_ascii_uppercase();
        re.check_palindromic();
        ret.push(re);
    }
    Ok(ret)
}

pub fn load_restriction_enzymes_from_path<P: AsRef<Path>>(path: P) -> Result<Vec<RestrictionEnzyme>> {
    let text = fs::read_to_string(path)?;
    load_restriction_enzymes_from_json_text(&text)
}

/// Prepares enzymes that arrived through serde, which skips the cached
/// palindrome flag.
pub fn normalized(enzymes: &[RestrictionEnzyme]) -> Vec<RestrictionEnzyme> {
    enzymes
        .iter()
        .cloned()
        .map(|mut re| {
            re.sequence = re.sequence.to_ascii_uppercase();
            re.check_palindromic();
            re
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const JSON: &str = r#"[
        {"type": "restriction", "name": "EcoRI", "sequence": "GAATTC", "note": null, "cut": 1, "overlap": 4},
        {"name": "BsaI", "sequence": "ggtctc", "note": "type IIS", "cut": 7, "overlap": 4},
        {"type": "protease", "name": "Clostripain", "sequence": "R", "cut": 1}
    ]"#;

    #[test]
    fn test_from_json_text() {
        let enzymes = load_restriction_enzymes_from_json_text(JSON).unwrap();
        assert_eq!(enzymes.len(), 2);
        assert_eq!(enzymes[0].name, "EcoRI");
        assert!(enzymes[0].is_palindromic());
        assert_eq!(enzymes[1].sequence, "GGTCTC");
        assert!(!enzymes[1].is_palindromic());
    }

    #[test]
    fn test_bad_json() {
        assert!(load_restriction_enzymes_from_json_text("{}").is_err());
        assert!(load_restriction_enzymes_from_json_text(r#"[{"name": "X"}]"#).is_err());
    }

    #[test]
    fn test_from_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("enzymes.json");
        fs::write(&path, JSON).unwrap();
        assert_eq!(load_restriction_enzymes_from_path(&path).unwrap().len(), 2);
    }
}
