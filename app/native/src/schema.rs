//! JSON Schema generation for the configuration file.

use crate::config::StarConfig;

/// Schema identifier embedded as `$id`.
const SCHEMA_ID: &str =
    "https://raw.githubusercontent.com/starterm/starshell/main/starshell.schema.json";

/// Generates a JSON Schema for the Starshell configuration.
#[must_use]
pub fn generate_schema() -> schemars::Schema {
    let mut schema = schemars::schema_for!(StarConfig);

    if let Some(obj) = schema.as_object_mut() {
        obj.insert("$id".to_string(), serde_json::json!(SCHEMA_ID));
    }

    schema
}

/// Generates a pretty-printed JSON Schema string for the configuration.
#[must_use]
pub fn print_schema() -> String {
    serde_json::to_string_pretty(&generate_schema()).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_schema_produces_valid_json() {
        let parsed: serde_json::Value = serde_json::from_str(&print_schema()).unwrap();

        assert!(parsed["$id"].as_str().unwrap().ends_with("starshell.schema.json"));
        assert_eq!(parsed["title"], "StarConfig");
        assert!(parsed["properties"]["objectStore"].is_object());
        assert!(parsed["properties"]["tabCache"].is_object());
        assert!(parsed["properties"]["window"].is_object());
    }

    #[test]
    fn test_schema_has_id_field() {
        let schema = generate_schema();
        assert!(schema.as_object().unwrap().contains_key("$id"));
    }
}
