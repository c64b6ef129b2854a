//! Prompt strategy selection and assembly.
//!
//! Template choice is a closed set of variants crossed with [`Stage`].
//! Assembly is a pure function of the request, so every combination can be
//! enumerated in tests without a model.

use serde::{Deserialize, Serialize};
use std::fmt::Write as _;

use super::templates::{
    self, COMMON_RULES, FILE_SEPARATOR, FILE_SUPPLEMENTED_RULES, MCQ_ANSWER_GUIDANCE,
    OFF_TOPIC_HANDLING, STARTER_PROJECTS, STARTER_SELECTION_GUIDANCE, SYSTEM_PREAMBLE,
    TRUNCATION_MARKER, USER_ONLY_RULES,
};
use super::{ExtractedDocument, InteractionRequest, LmContract, Stage};

/// Default cap on combined file text embedded in a prompt.
pub const DEFAULT_FILE_TEXT_CAP: usize = 8000;

/// Mutually exclusive prompt strategies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TemplateFamily {
    /// No documents attached; lean prompt without file handling.
    UserOnly,
    /// One or more documents attached; user text stays authoritative.
    FileSupplemented,
}

impl TemplateFamily {
    /// Picks the template family from whether documents are attached.
    ///
    /// User text, MCQ answers and stage shape the sections inside the
    /// family (see [`PromptBuilder::build`]), never the family itself.
    pub fn select(has_files: bool) -> Self {
        if has_files {
            Self::FileSupplemented
        } else {
            Self::UserOnly
        }
    }
}

/// A fully assembled prompt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Prompt {
    pub family: TemplateFamily,
    pub stage: Stage,
    /// Standing instructions sent as the system message.
    pub system: String,
    /// Per-interaction content sent as the user message.
    pub user: String,
}

/// Assembles prompts from requests.
#[derive(Debug, Clone, Copy)]
pub struct PromptBuilder {
    file_text_cap: usize,
}

impl PromptBuilder {
    pub fn new(file_text_cap: usize) -> Self {
        Self { file_text_cap }
    }

    /// Builds the prompt for `request` running in `stage`.
    pub fn build(&self, request: &InteractionRequest, stage: Stage) -> Prompt {
        let family = TemplateFamily::select(request.has_files());

        let mut user = String::new();
        self.write_context(&mut user, request, stage);
        self.write_user_input(&mut user, request);
        let _ = writeln!(user, "{}\n", templates::stage_instructions(stage));
        self.write_special_handling(&mut user, request, stage);
        self.write_response_format(&mut user, request, family);
        if family == TemplateFamily::FileSupplemented {
            self.write_files(&mut user, &request.documents);
        }

        Prompt {
            family,
            stage,
            system: SYSTEM_PREAMBLE.to_string(),
            user: user.trim_end().to_string(),
        }
    }

    fn write_context(&self, out: &mut String, request: &InteractionRequest, stage: Stage) {
        let context = &request.current_context;
        let context_json = serde_json::to_string_pretty(context)
            .unwrap_or_else(|_| String::from("{}"));
        let _ = writeln!(out, "CURRENT CONTEXT:\n{}\n", context_json);
        let _ = writeln!(
            out,
            "The current information summary is {} characters long. Your `information` replaces it, so rewrite it in full rather than shortening it.\n",
            context.information_len()
        );

        if stage == Stage::RefinementTesting {
            if let Some(code) = request.current_code.as_deref().filter(|c| !c.trim().is_empty()) {
                let _ = writeln!(out, "CURRENT CODE:\n{}\n", code);
            }
        }

        if let Some(previous) = request
            .previous_copilot_message
            .as_deref()
            .filter(|m| !m.trim().is_empty())
        {
            let _ = writeln!(
                out,
                "CONVERSATION CONTEXT: your previous message was:\n{}\n",
                previous
            );
        }
    }

    fn write_user_input(&self, out: &mut String, request: &InteractionRequest) {
        let _ = writeln!(out, "USER INPUT:");
        let _ = writeln!(out, "Message: {}", request.user_text().unwrap_or("(none)"));
        if request.has_mcq_answers() {
            let answers = serde_json::to_string(&request.mcq_responses)
                .unwrap_or_else(|_| request.mcq_responses.join(", "));
            let _ = writeln!(out, "MCQ answers: {}", answers);
            let _ = writeln!(out, "{}", MCQ_ANSWER_GUIDANCE);
        }
        out.push('\n');
    }

    fn write_special_handling(&self, out: &mut String, request: &InteractionRequest, stage: Stage) {
        if stage != Stage::GatheringRequirements || !request.current_context.is_empty() {
            return;
        }

        if !request.has_mcq_answers() && !request.has_files() {
            let _ = writeln!(out, "{}", OFF_TOPIC_HANDLING);
            for project in STARTER_PROJECTS {
                let _ = writeln!(out, "  - \"{}\"", project);
            }
            out.push('\n');
        } else if request
            .mcq_responses
            .iter()
            .any(|answer| STARTER_PROJECTS.contains(&answer.trim()))
        {
            let _ = writeln!(out, "{}\n", STARTER_SELECTION_GUIDANCE);
        }
    }

    fn write_response_format(&self, out: &mut String, request: &InteractionRequest, family: TemplateFamily) {
        let schema = serde_json::to_string_pretty(&LmContract::schema())
            .unwrap_or_else(|_| String::from("{}"));
        let _ = writeln!(
            out,
            "RESPONSE: return ONLY a JSON object with exactly these keys (use null where allowed):\n{}\n",
            schema
        );

        let family_rules = match family {
            TemplateFamily::UserOnly => USER_ONLY_RULES,
            TemplateFamily::FileSupplemented => FILE_SUPPLEMENTED_RULES,
        };
        let _ = writeln!(out, "RULES:\n{}\n{}", family_rules, COMMON_RULES);
        if !request.has_user_input() {
            let _ = writeln!(
                out,
                "- The user sent no message this turn: `user_facts` must be an empty object."
            );
        }
        out.push('\n');
    }

    /// Renders every document under its own header. The cap applies to
    /// each document's raw text, so one large upload cannot hide the rest.
    fn write_files(&self, out: &mut String, documents: &[ExtractedDocument]) {
        let combined = documents
            .iter()
            .map(|doc| {
                let body = match doc
                    .structured_summary
                    .as_deref()
                    .filter(|s| !s.trim().is_empty())
                {
                    Some(summary) => summary.trim().to_string(),
                    None => truncate_chars(doc.raw_text.trim(), self.file_text_cap),
                };
                format!("[document_id: {}] {}\n{}", doc.id, doc.name, body)
            })
            .collect::<Vec<_>>()
            .join(FILE_SEPARATOR);

        let _ = writeln!(out, "=== SUPPLEMENTARY FILE DATA ===");
        let _ = writeln!(
            out,
            "NOTE: the user's message and MCQ answers above outrank everything below. Use file content as additional context only.\n"
        );
        let _ = writeln!(out, "{}", combined);
    }
}

impl Default for PromptBuilder {
    fn default() -> Self {
        Self::new(DEFAULT_FILE_TEXT_CAP)
    }
}

/// Cuts `text` to at most `cap` characters, marking the cut.
pub fn truncate_chars(text: &str, cap: usize) -> String {
    match text.char_indices().nth(cap) {
        Some((byte_index, _)) => format!("{}{}", &text[..byte_index], TRUNCATION_MARKER),
        None => text.to_string(),
    }
}
