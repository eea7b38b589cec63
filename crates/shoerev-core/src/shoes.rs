use std::collections::HashSet;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::ConfigError;

/// A catalog shoe as referenced by the collector. Identity is immutable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Shoe {
    pub id: i64,
    pub brand: String,
    pub model_name: String,
    pub category: Option<String>,
    /// Extra names the shoe is known by (e.g. a Japanese brand spelling).
    pub aliases: Vec<String>,
}

/// One entry of `config/shoes.yaml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShoeConfig {
    pub brand: String,
    pub model: String,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub aliases: Vec<String>,
    #[serde(default)]
    pub release_year: Option<i16>,
}

#[derive(Debug, Deserialize)]
pub struct ShoesFile {
    pub shoes: Vec<ShoeConfig>,
}

/// Load and validate the shoe catalog seed file.
///
/// # Errors
///
/// Returns `ConfigError` if the file cannot be read, parsed, or fails validation.
pub fn load_shoes(path: &Path) -> Result<ShoesFile, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ShoesFileIo {
        path: path.display().to_string(),
        source: e,
    })?;

    let shoes_file: ShoesFile = serde_yaml::from_str(&content)?;
    validate_shoes(&shoes_file)?;

    Ok(shoes_file)
}

fn validate_shoes(shoes_file: &ShoesFile) -> Result<(), ConfigError> {
    let mut seen = HashSet::new();

    for shoe in &shoes_file.shoes {
        if shoe.brand.trim().is_empty() || shoe.model.trim().is_empty() {
            return Err(ConfigError::Validation(format!(
                "shoe entries need a non-empty brand and model (got brand '{}', model '{}')",
                shoe.brand, shoe.model
            )));
        }

        let key = (shoe.brand.trim().to_lowercase(), shoe.model.trim().to_lowercase());
        if !seen.insert(key) {
            return Err(ConfigError::Validation(format!(
                "duplicate shoe: '{} {}'",
                shoe.brand, shoe.model
            )));
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(brand: &str, model: &str) -> ShoeConfig {
        ShoeConfig {
            brand: brand.to_string(),
            model: model.to_string(),
            category: None,
            aliases: Vec::new(),
            release_year: None,
        }
    }

    #[test]
    fn parses_yaml_with_optional_fields() {
        let yaml = r"
shoes:
  - brand: Nike
    model: Pegasus 41
    category: running
    aliases: [ナイキ ペガサス]
  - brand: ASICS
    model: Novablast 5
";
        let file: ShoesFile = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(file.shoes.len(), 2);
        assert_eq!(file.shoes[0].aliases, vec!["ナイキ ペガサス".to_string()]);
        assert!(file.shoes[1].category.is_none());
        validate_shoes(&file).unwrap();
    }

    #[test]
    fn validate_rejects_blank_model() {
        let file = ShoesFile {
            shoes: vec![entry("Nike", "  ")],
        };
        let err = validate_shoes(&file).unwrap_err();
        assert!(err.to_string().contains("non-empty"));
    }

    #[test]
    fn validate_rejects_case_insensitive_duplicates() {
        let file = ShoesFile {
            shoes: vec![entry("Nike", "Pegasus 41"), entry("nike", "PEGASUS 41")],
        };
        let err = validate_shoes(&file).unwrap_err();
        assert!(err.to_string().contains("duplicate shoe"));
    }
}
