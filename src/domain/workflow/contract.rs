//! The fixed response contract the language model must satisfy.
//!
//! Model output is untrusted text. [`ContractParser`] turns it into a typed
//! [`LmContract`] or a [`ContractViolation`] precise enough to be quoted
//! back to the model in a corrective prompt. Nothing downstream of this
//! module ever sees raw model text.

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::collections::BTreeMap;
use thiserror::Error;

use crate::domain::foundation::DocumentId;

use super::{DeviceFacts, Mcq, Stage};

/// Top-level keys every response must carry, even when null.
pub const REQUIRED_FIELDS: [&str; 7] = [
    "information",
    "user_facts",
    "file_facts",
    "chat_message",
    "mcq",
    "progress",
    "generated_code",
];

/// Facts the model attributed to one uploaded document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileFacts {
    pub document_id: DocumentId,
    #[serde(default)]
    pub devices: DeviceFacts,
    #[serde(default)]
    pub summary: String,
}

/// Validated, typed model output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LmContract {
    /// Regenerated requirements narrative, superseding the previous one.
    pub information: String,
    /// Facts stated by the user this turn.
    pub user_facts: DeviceFacts,
    /// Facts inferred from uploaded documents.
    pub file_facts: Vec<FileFacts>,
    pub chat_message: String,
    pub mcq: Option<Mcq>,
    /// Self-reported completeness, unclamped.
    pub progress: Option<f64>,
    pub generated_code: Option<String>,
}

impl LmContract {
    /// JSON description of the contract, embedded in every prompt.
    pub fn schema() -> Value {
        json!({
            "information": "string: complete updated markdown summary of all requirements and decisions",
            "user_facts": {"<device name>": {"<property>": "value stated by the user this turn"}},
            "file_facts": [{
                "document_id": "string: id of the uploaded document",
                "devices": {"<device name>": {"<property>": "value found in the document"}},
                "summary": "string: one-line summary of what the document contributed"
            }],
            "chat_message": "string: message shown to the user",
            "mcq": "null or {\"question\": string, \"options\": [string], \"is_multiselect\": bool}",
            "progress": "null or number between 0.0 and 1.0",
            "generated_code": "null or string: complete IEC 61131-3 Structured Text"
        })
    }
}

/// Why a model response was rejected.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ContractViolation {
    #[error("response contains no JSON object")]
    NoJson,

    #[error("response is not valid JSON: {0}")]
    MalformedJson(String),

    #[error("top-level JSON value must be an object")]
    NotAnObject,

    #[error("required field '{0}' is missing")]
    MissingField(&'static str),

    #[error("field '{field}' must be {expected}")]
    WrongType {
        field: String,
        expected: &'static str,
    },

    #[error("property '{device}.{property}' must not be null; omit unknown properties")]
    NullFactValue { device: String, property: String },

    #[error("at most one MCQ is allowed per response, got {0}")]
    MultipleMcqs(usize),

    #[error("mcq is incomplete: {0}")]
    IncompleteMcq(&'static str),

    #[error("chat_message must not be empty")]
    EmptyChatMessage,

    #[error("generated_code must contain the complete program in the code_generation stage")]
    MissingGeneratedCode,

    #[error("user_facts must be empty when the user provided no message or MCQ answer; put document facts in file_facts")]
    UnexpectedUserFacts,

    #[error("file_facts references unknown document '{0}'")]
    UnknownDocument(String),

    #[error("information must not be emptied; the previous summary had {0} characters")]
    InformationErased(usize),
}

/// What the current interaction requires of a response beyond its shape.
#[derive(Debug, Clone, PartialEq)]
pub struct ContractExpectations {
    pub stage: Stage,
    pub has_user_input: bool,
    pub known_documents: Vec<DocumentId>,
    pub prior_information_len: usize,
}

impl ContractExpectations {
    /// Expectations with no documents and no prior narrative.
    pub fn for_stage(stage: Stage) -> Self {
        Self {
            stage,
            has_user_input: true,
            known_documents: Vec::new(),
            prior_information_len: 0,
        }
    }
}

/// Parses and validates raw model output.
#[derive(Debug, Clone, Default)]
pub struct ContractParser;

impl ContractParser {
    pub fn new() -> Self {
        Self
    }

    /// Parses raw model text into a validated contract.
    pub fn parse(
        &self,
        raw: &str,
        expectations: &ContractExpectations,
    ) -> Result<LmContract, ContractViolation> {
        let json_text = extract_json_object(raw).ok_or(ContractViolation::NoJson)?;
        let value: Value = serde_json::from_str(json_text)
            .map_err(|e| ContractViolation::MalformedJson(e.to_string()))?;
        let Value::Object(mut object) = value else {
            return Err(ContractViolation::NotAnObject);
        };

        for field in REQUIRED_FIELDS {
            if !object.contains_key(field) {
                return Err(ContractViolation::MissingField(field));
            }
        }

        let information = take_string(&mut object, "information")?;
        let user_facts = take_device_facts(&mut object, "user_facts")?;
        let file_facts = take_file_facts(&mut object)?;
        let chat_message = take_string(&mut object, "chat_message")?;
        let mcq = take_mcq(&mut object)?;
        let progress = take_optional_number(&mut object, "progress")?;
        let generated_code = take_optional_string(&mut object, "generated_code")?;

        let contract = LmContract {
            information,
            user_facts,
            file_facts,
            chat_message,
            mcq,
            progress,
            generated_code,
        };
        check_expectations(&contract, expectations)?;
        Ok(contract)
    }
}

fn check_expectations(
    contract: &LmContract,
    expectations: &ContractExpectations,
) -> Result<(), ContractViolation> {
    if contract.chat_message.trim().is_empty() {
        return Err(ContractViolation::EmptyChatMessage);
    }

    if expectations.stage == Stage::CodeGeneration
        && contract
            .generated_code
            .as_deref()
            .map_or(true, |code| code.trim().is_empty())
    {
        return Err(ContractViolation::MissingGeneratedCode);
    }

    if !expectations.has_user_input && !contract.user_facts.is_empty() {
        return Err(ContractViolation::UnexpectedUserFacts);
    }

    for facts in &contract.file_facts {
        if !expectations.known_documents.contains(&facts.document_id) {
            return Err(ContractViolation::UnknownDocument(
                facts.document_id.to_string(),
            ));
        }
    }

    if expectations.prior_information_len > 0 && contract.information.trim().is_empty() {
        return Err(ContractViolation::InformationErased(
            expectations.prior_information_len,
        ));
    }

    Ok(())
}

fn take_string(object: &mut Map<String, Value>, field: &'static str) -> Result<String, ContractViolation> {
    match object.remove(field) {
        Some(Value::String(s)) => Ok(s),
        _ => Err(ContractViolation::WrongType {
            field: field.to_string(),
            expected: "a string",
        }),
    }
}

fn take_optional_string(
    object: &mut Map<String, Value>,
    field: &'static str,
) -> Result<Option<String>, ContractViolation> {
    match object.remove(field) {
        Some(Value::Null) | None => Ok(None),
        Some(Value::String(s)) => Ok(Some(s)),
        Some(_) => Err(ContractViolation::WrongType {
            field: field.to_string(),
            expected: "null or a string",
        }),
    }
}

fn take_optional_number(
    object: &mut Map<String, Value>,
    field: &'static str,
) -> Result<Option<f64>, ContractViolation> {
    match object.remove(field) {
        Some(Value::Null) | None => Ok(None),
        Some(Value::Number(n)) => Ok(n.as_f64()),
        Some(_) => Err(ContractViolation::WrongType {
            field: field.to_string(),
            expected: "null or a number",
        }),
    }
}

fn device_facts_from(value: Value, field: &str) -> Result<DeviceFacts, ContractViolation> {
    let wrong_type = || ContractViolation::WrongType {
        field: field.to_string(),
        expected: "an object mapping device names to property objects",
    };
    let Value::Object(devices) = value else {
        return Err(wrong_type());
    };

    let mut facts = BTreeMap::new();
    for (device, properties) in devices {
        let Value::Object(properties) = properties else {
            return Err(ContractViolation::WrongType {
                field: format!("{}.{}", field, device),
                expected: "an object mapping property names to values",
            });
        };
        let mut props = BTreeMap::new();
        for (property, value) in properties {
            if value.is_null() {
                return Err(ContractViolation::NullFactValue { device, property });
            }
            if contains_array(&value) {
                return Err(ContractViolation::WrongType {
                    field: format!("{}.{}.{}", field, device, property),
                    expected: "a string, number, boolean or object",
                });
            }
            props.insert(property, value);
        }
        if !props.is_empty() {
            facts.insert(device, props);
        }
    }
    Ok(facts)
}

fn contains_array(value: &Value) -> bool {
    match value {
        Value::Array(_) => true,
        Value::Object(map) => map.values().any(contains_array),
        _ => false,
    }
}

fn take_device_facts(
    object: &mut Map<String, Value>,
    field: &'static str,
) -> Result<DeviceFacts, ContractViolation> {
    match object.remove(field) {
        Some(Value::Null) => Err(ContractViolation::WrongType {
            field: field.to_string(),
            expected: "an object",
        }),
        None => Ok(DeviceFacts::new()),
        Some(value) => device_facts_from(value, field),
    }
}

fn take_file_facts(object: &mut Map<String, Value>) -> Result<Vec<FileFacts>, ContractViolation> {
    let entries = match object.remove("file_facts") {
        None => return Ok(Vec::new()),
        Some(Value::Array(entries)) => entries,
        Some(_) => {
            return Err(ContractViolation::WrongType {
                field: "file_facts".to_string(),
                expected: "an array",
            })
        }
    };

    entries
        .into_iter()
        .enumerate()
        .map(|(i, entry)| {
            let Value::Object(mut entry) = entry else {
                return Err(ContractViolation::WrongType {
                    field: format!("file_facts[{}]", i),
                    expected: "an object",
                });
            };
            let document_id = match entry.remove("document_id") {
                Some(Value::String(id)) => DocumentId::new(id).map_err(|_| {
                    ContractViolation::WrongType {
                        field: format!("file_facts[{}].document_id", i),
                        expected: "a non-empty document id",
                    }
                })?,
                _ => {
                    return Err(ContractViolation::WrongType {
                        field: format!("file_facts[{}].document_id", i),
                        expected: "a string",
                    })
                }
            };
            let devices = match entry.remove("devices") {
                Some(Value::Null) | None => DeviceFacts::new(),
                Some(value) => device_facts_from(value, &format!("file_facts[{}].devices", i))?,
            };
            let summary = match entry.remove("summary") {
                Some(Value::String(s)) => s,
                Some(Value::Null) | None => String::new(),
                Some(_) => {
                    return Err(ContractViolation::WrongType {
                        field: format!("file_facts[{}].summary", i),
                        expected: "a string",
                    })
                }
            };
            Ok(FileFacts {
                document_id,
                devices,
                summary,
            })
        })
        .collect()
}

fn take_mcq(object: &mut Map<String, Value>) -> Result<Option<Mcq>, ContractViolation> {
    let value = match object.remove("mcq") {
        Some(Value::Null) | None => return Ok(None),
        // A single question wrapped in an array is unwrapped rather than rejected.
        Some(Value::Array(mut items)) => match items.len() {
            0 => return Ok(None),
            1 => items.remove(0),
            n => return Err(ContractViolation::MultipleMcqs(n)),
        },
        Some(value) => value,
    };

    let Value::Object(mut mcq) = value else {
        return Err(ContractViolation::WrongType {
            field: "mcq".to_string(),
            expected: "null or an object",
        });
    };

    let question = match mcq.remove("question") {
        Some(Value::String(q)) if !q.trim().is_empty() => q,
        Some(Value::String(_)) | None | Some(Value::Null) => {
            return Err(ContractViolation::IncompleteMcq("question is empty"))
        }
        Some(_) => {
            return Err(ContractViolation::WrongType {
                field: "mcq.question".to_string(),
                expected: "a string",
            })
        }
    };

    let options = match mcq.remove("options") {
        Some(Value::Array(items)) => items
            .into_iter()
            .map(|item| match item {
                Value::String(s) => Ok(s),
                _ => Err(ContractViolation::WrongType {
                    field: "mcq.options".to_string(),
                    expected: "an array of strings",
                }),
            })
            .collect::<Result<Vec<_>, _>>()?,
        _ => {
            return Err(ContractViolation::WrongType {
                field: "mcq.options".to_string(),
                expected: "an array of strings",
            })
        }
    };
    if options.iter().all(|o| o.trim().is_empty()) {
        return Err(ContractViolation::IncompleteMcq("options are empty"));
    }

    let is_multiselect = match mcq.remove("is_multiselect") {
        Some(Value::Bool(b)) => b,
        Some(Value::Null) | None => false,
        Some(_) => {
            return Err(ContractViolation::WrongType {
                field: "mcq.is_multiselect".to_string(),
                expected: "a boolean",
            })
        }
    };

    Ok(Some(Mcq {
        question,
        options,
        is_multiselect,
    }))
}

/// Locates the JSON object in a response that may wrap it in prose or a
/// markdown code block.
pub fn extract_json_object(response: &str) -> Option<&str> {
    let trimmed = response.trim();
    // A bare object wins over fences quoted inside its strings
    if trimmed.starts_with('{') {
        if let Some(object) = extract_balanced(trimmed, 0) {
            return Some(object);
        }
    }
    if let Some(block) = extract_from_code_block(trimmed) {
        return Some(block);
    }
    let start = trimmed.find('{')?;
    extract_balanced(trimmed, start).or(Some(&trimmed[start..]))
}

fn extract_from_code_block(s: &str) -> Option<&str> {
    for fence in ["```json", "```JSON", "```"] {
        if let Some(start) = s.find(fence) {
            let body_start = start + fence.len();
            if let Some(end) = s[body_start..].find("```") {
                let body = s[body_start..body_start + end].trim();
                if body.starts_with('{') {
                    return Some(body);
                }
            }
        }
    }
    None
}

fn extract_balanced(s: &str, start: usize) -> Option<&str> {
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escape_next = false;

    for (i, c) in s[start..].char_indices() {
        if escape_next {
            escape_next = false;
            continue;
        }
        match c {
            '\\' if in_string => escape_next = true,
            '"' => in_string = !in_string,
            _ if in_string => {}
            '{' => depth += 1,
            '}' => {
                depth = depth.saturating_sub(1);
                if depth == 0 {
                    return Some(&s[start..start + i + 1]);
                }
            }
            _ => {}
        }
    }
    None
}
