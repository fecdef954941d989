//! Extraction prompt built from the schema

use crate::schema::{FieldKind, FieldSpec, Schema};

pub const SYSTEM_PROMPT: &str = "You are an expert data extraction AI. \
Extract structured company information from website content. \
Return ONLY a valid JSON object with the requested fields.";

const INSTRUCTION: &str =
    "Analyze the following website content and extract structured information about this company.";

const RULES: &[&str] = &[
    "Only extract information that is EXPLICITLY stated in the content. Do not guess or infer.",
    "For fields with allowed values, return ONLY one of the values shown.",
    "For list fields, return an empty list [] if no information is found.",
    "For other fields, return \"unknown\" if the information is not available.",
    "Return ONLY valid JSON, no markdown formatting, no extra text.",
];

fn type_label(field: &FieldSpec) -> String {
    if !field.allowed.is_empty() {
        let values: Vec<String> = field.allowed.iter().map(|v| format!("\"{}\"", v)).collect();
        return format!("one of [{}]", values.join(", "));
    }
    match field.kind {
        FieldKind::List => "list[string]".to_string(),
        kind => kind.as_str().to_string(),
    }
}

/// Instructions and field list preceding the page content
pub fn build_prompt(schema: &Schema) -> String {
    let mut lines = vec![
        INSTRUCTION.to_string(),
        String::new(),
        "Return a JSON object with exactly the fields below.".to_string(),
        String::new(),
        "RULES:".to_string(),
    ];
    let numbered = RULES
        .iter()
        .enumerate()
        .map(|(i, rule)| format!("{}. {}", i + 1, rule));
    lines.extend(numbered);
    lines.push(String::new());
    lines.push("FIELDS:".to_string());

    for field in schema.fields() {
        if field.description.is_empty() {
            lines.push(format!("- {} ({})", field.name, type_label(field)));
        } else {
            lines.push(format!(
                "- {} ({}): {}",
                field.name,
                type_label(field),
                field.description
            ));
        }
    }

    lines.push(String::new());
    lines.push("Website content to analyze:".to_string());
    lines.join("\n")
}
