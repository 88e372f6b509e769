use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::file_format::SerdeFormat;

pub type Result<T> = anyhow::Result<T>;

/// Serialize to text, always ending with a single `\n`.
pub fn serialize<T: Serialize>(value: &T, format: SerdeFormat) -> Result<String> {
    let mut text = match format {
        SerdeFormat::Yaml => serde_yml::to_string(value)?,
        SerdeFormat::Json => serde_json::to_string_pretty(value)?,
    };
    if !text.ends_with('\n') {
        text.push('\n');
    }
    Ok(text)
}

pub fn deserialize<T: DeserializeOwned>(serialized: &str, format: SerdeFormat) -> Result<T> {
    match format {
        SerdeFormat::Yaml => Ok(serde_yml::from_str(serialized)?),
        SerdeFormat::Json => Ok(serde_json::from_str(serialized)?),
    }
}

#[cfg(test)]
mod tests {
    use serde::Deserialize;

    use super::*;

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Settings {
        name: String,
        radius: u8,
        weight: f64,
        enabled: Option<bool>,
    }

    #[test]
    fn test_text_formats_preserve_values() {
        let settings = Settings {
            name: "slower".to_string(),
            radius: 2,
            weight: 0.25,
            enabled: None,
        };
        for format in SerdeFormat::all() {
            let text = serialize(&settings, format).unwrap();
            assert!(text.ends_with('\n'), "{format:?} output must end with newline");
            let restored: Settings = deserialize(&text, format).unwrap();
            assert_eq!(restored, settings, "{format:?}");
        }
    }

    #[test]
    fn test_deserialize_reports_malformed_input() {
        let result: Result<Settings> = deserialize("{ not json", SerdeFormat::Json);
        assert!(result.is_err());
    }
}
