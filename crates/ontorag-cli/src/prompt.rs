//! Prompt templates for the two extraction passes.
//!
//! A template carries exactly two placeholders, substituted with compact
//! JSON (no newlines inside substituted values). Built-in defaults cover
//! both passes; `--prompt` swaps in a file, which must contain both
//! placeholders.

use anyhow::{anyhow, Context, Result};
use std::path::Path;

pub const CHUNK_PLACEHOLDER: &str = "{{CHUNK_DTO_JSON}}";
pub const SCHEMA_CARD_PLACEHOLDER: &str = "{{SCHEMA_CARD_JSON}}";

pub const SCHEMA_SYSTEM_PROMPT: &str =
    "You are a careful ontology induction engine. Output JSON only.";

pub const INSTANCE_SYSTEM_PROMPT: &str =
    "You are a careful knowledge extraction engine. Output JSON only.";

pub const DEFAULT_SCHEMA_PROMPT: &str = r#"You are an ontology induction engine.

CHUNK DTO (JSON):
{{CHUNK_DTO_JSON}}

CURRENT SCHEMA CARD (JSON):
{{SCHEMA_CARD_JSON}}

Return STRICT JSON with this structure:
{
  "chunk_id": "",
  "proposed_additions": {
    "classes": [],
    "datatype_properties": [],
    "object_properties": [],
    "events": []
  },
  "reuse_instead_of_create": [],
  "alias_or_merge_suggestions": [],
  "warnings": []
}

Rules:
- Do not invent facts.
- Prefer generic names over examples.
- Reuse existing schema items when possible.
- Evidence quotes must be short (<= 25 words) and copied from the chunk.
- Output JSON only. No extra text.
"#;

pub const DEFAULT_INSTANCE_PROMPT: &str = r#"You are an instance extraction engine.

CHUNK DTO (JSON):
{{CHUNK_DTO_JSON}}

CURRENT SCHEMA CARD (JSON):
{{SCHEMA_CARD_JSON}}

Return STRICT JSON with this structure:
{
  "chunk_id": "",
  "instances": [
    {
      "local_id": "",
      "class": "",
      "datatype_values": {},
      "object_values": {},
      "evidence": []
    }
  ],
  "warnings": []
}

Rules:
- Only use classes and properties present in the schema card.
- local_id must be stable for the same real-world entity across chunks.
- object_values map a property to another instance's local_id.
- Evidence quotes must be short (<= 25 words) and copied from the chunk.
- Output JSON only. No extra text.
"#;

/// Load a template override from disk, or fall back to the built-in.
pub fn load_template(path: Option<&Path>, default: &str) -> Result<String> {
    let template = match path {
        Some(path) => std::fs::read_to_string(path)
            .with_context(|| format!("failed to read prompt template {}", path.display()))?,
        None => default.to_string(),
    };
    for placeholder in [CHUNK_PLACEHOLDER, SCHEMA_CARD_PLACEHOLDER] {
        if !template.contains(placeholder) {
            return Err(anyhow!(
                "configuration error: prompt template is missing the {placeholder} placeholder"
            ));
        }
    }
    Ok(template)
}

/// Substitute both placeholders with compact JSON.
pub fn render_prompt(template: &str, chunk_json: &str, card_json: &str) -> String {
    template
        .replace(CHUNK_PLACEHOLDER, chunk_json)
        .replace(SCHEMA_CARD_PLACEHOLDER, card_json)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_templates_carry_both_placeholders() {
        assert!(load_template(None, DEFAULT_SCHEMA_PROMPT).is_ok());
        assert!(load_template(None, DEFAULT_INSTANCE_PROMPT).is_ok());
    }

    #[test]
    fn template_without_placeholders_is_a_configuration_error() {
        let err = load_template(None, "no placeholders here").expect_err("must reject");
        assert!(err.to_string().contains("configuration error"));
    }

    #[test]
    fn render_substitutes_compact_json() {
        let template = "A {{CHUNK_DTO_JSON}} B {{SCHEMA_CARD_JSON}} C";
        let rendered = render_prompt(template, "{\"chunk\":1}", "{\"card\":2}");
        assert_eq!(rendered, "A {\"chunk\":1} B {\"card\":2} C");
    }
}
