use schemars::gen::SchemaGenerator;
use schemars::JsonSchema;
use serde::de::DeserializeOwned;

/// A JSON document the vision model is asked to produce.
///
/// The schema is embedded in the prompt so the model knows the exact shape to return.
pub trait StructuredOutput: DeserializeOwned + JsonSchema {
    fn json_schema_string() -> String {
        let mut gen = SchemaGenerator::default();
        let schema = gen.root_schema_for::<Self>();
        serde_json::to_string_pretty(&schema).unwrap_or_else(|_| "{}".to_string())
    }

    /// Semantic checks serde cannot express; `Err` marks the output malformed
    fn check(&self) -> Result<(), String> {
        Ok(())
    }
}
