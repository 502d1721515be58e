//! Typed prompt/response steps.
//!
//! A [`Signature`] names the inputs a step receives and the outputs it must
//! produce. A [`Predictor`] renders a signature into chat messages using
//! `[[ ## field ## ]]` section markers and parses the model's reply back into a
//! [`Prediction`].

use std::collections::HashMap;
use std::fmt::Write as _;

use once_cell::sync::Lazy;
use regex::Regex;
use tracing::debug;

use crate::clients::{ChatMessage, LanguageModel};
use crate::error::{Result, SavantError};

static FIELD_MARKER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\[\[\s*##\s*(\w+)\s*##\s*\]\]").expect("field marker regex"));

static LIST_BULLET: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\s*(?:[-*•]|\d+[.)])\s*").expect("list bullet regex"));

const COMPLETED: &str = "completed";

#[derive(Debug, Clone, Copy)]
pub struct Field {
    pub name: &'static str,
    pub desc: &'static str,
}

#[derive(Debug, Clone, Copy)]
pub struct Signature {
    pub name: &'static str,
    pub instructions: &'static str,
    pub inputs: &'static [Field],
    pub outputs: &'static [Field],
}

pub const PROBLEM_ANALYSIS: Signature = Signature {
    name: "ProblemAnalysis",
    instructions: "Analyze an optimization problem description and extract structured information.",
    inputs: &[Field {
        name: "problem_description",
        desc: "Natural language description of an optimization problem",
    }],
    outputs: &[Field {
        name: "analysis",
        desc: "Structured analysis of the problem including domain, variables, constraints, and objective",
    }],
};

pub const PROBLEM_VALIDATION: Signature = Signature {
    name: "ProblemValidation",
    instructions: "Validate if a problem description can be converted to a solvable ASP program.",
    inputs: &[Field {
        name: "problem_description",
        desc: "Natural language description of an optimization problem",
    }],
    outputs: &[
        Field {
            name: "is_valid",
            desc: "Boolean indicating if the problem can be solved with ASP",
        },
        Field {
            name: "reason",
            desc: "Explanation of why the problem is or isn't valid for ASP solving",
        },
    ],
};

pub const GAP_IDENTIFICATION: Signature = Signature {
    name: "GapIdentification",
    instructions: "Identify gaps and missing information in an optimization problem description.",
    inputs: &[Field {
        name: "problem_description",
        desc: "Natural language description of an optimization problem",
    }],
    outputs: &[
        Field {
            name: "has_gaps",
            desc: "Boolean indicating if there are gaps in the problem description",
        },
        Field {
            name: "gaps",
            desc: "List of specific information gaps in the problem description",
        },
        Field {
            name: "questions",
            desc: "List of questions to ask the user to fill the gaps",
        },
    ],
};

pub const PROGRAM_GENERATION: Signature = Signature {
    name: "ProgramGeneration",
    instructions: "Generate ASP program components from problem analysis.",
    inputs: &[Field {
        name: "analysis",
        desc: "Structured analysis of an optimization problem",
    }],
    outputs: &[Field {
        name: "program_components",
        desc: "JSON structure with predicates, facts, constraints, and optimization statement for ASP",
    }],
};

pub const PROBLEM_REFINEMENT: Signature = Signature {
    name: "ProblemRefinement",
    instructions: "Refine a problem description with additional information.",
    inputs: &[
        Field {
            name: "original_problem",
            desc: "Original problem description",
        },
        Field {
            name: "additional_info",
            desc: "Additional information provided by the user",
        },
    ],
    outputs: &[Field {
        name: "refined_problem",
        desc: "Refined problem description with additional information incorporated",
    }],
};

fn marker(name: &str) -> String {
    format!("[[ ## {} ## ]]", name)
}

impl Signature {
    /// System message: field inventory, reply structure and objective
    pub fn system_prompt(&self) -> String {
        let mut out = String::new();
        out.push_str("Your input fields are:\n");
        for (i, f) in self.inputs.iter().enumerate() {
            let _ = writeln!(out, "{}. `{}` (str): {}", i + 1, f.name, f.desc);
        }
        out.push_str("Your output fields are:\n");
        for (i, f) in self.outputs.iter().enumerate() {
            let _ = writeln!(out, "{}. `{}` (str): {}", i + 1, f.name, f.desc);
        }
        out.push_str(
            "All interactions will be structured in the following way, with the appropriate values filled in.\n\n",
        );
        for f in self.inputs.iter().chain(self.outputs.iter()) {
            let _ = write!(out, "{}\n{{{}}}\n\n", marker(f.name), f.name);
        }
        out.push_str(&marker(COMPLETED));
        let _ = write!(
            out,
            "\nIn adhering to this structure, your objective is: \n        {}",
            self.instructions
        );
        out
    }

    /// User message carrying the input values
    pub fn user_prompt(&self, inputs: &HashMap<&str, &str>) -> Result<String> {
        let mut out = String::new();
        for f in self.inputs {
            let value = inputs.get(f.name).ok_or_else(|| SavantError::Pipeline {
                message: format!("{}: missing input field '{}'", self.name, f.name),
            })?;
            let _ = write!(out, "{}\n{}\n\n", marker(f.name), value);
        }
        let fields = self
            .outputs
            .iter()
            .map(|f| format!("`{}`", marker(f.name)))
            .collect::<Vec<_>>();
        let _ = write!(
            out,
            "Respond with the corresponding output fields, starting with the field {}, and then ending with the marker for `{}`.",
            fields.join(", then "),
            marker(COMPLETED)
        );
        Ok(out)
    }

    /// Split a reply into output fields. Unknown sections are ignored.
    pub fn parse_reply(&self, reply: &str) -> Result<Prediction> {
        let mut fields: HashMap<String, String> = HashMap::new();
        let markers: Vec<_> = FIELD_MARKER.captures_iter(reply).collect();

        if markers.is_empty() && self.outputs.len() == 1 {
            // Single-output steps tolerate a bare reply
            fields.insert(self.outputs[0].name.to_string(), reply.trim().to_string());
        } else {
            for (i, caps) in markers.iter().enumerate() {
                let (Some(whole), Some(name)) = (caps.get(0), caps.get(1)) else {
                    continue;
                };
                let end = markers
                    .get(i + 1)
                    .and_then(|next| next.get(0))
                    .map(|m| m.start())
                    .unwrap_or(reply.len());
                let name = name.as_str();
                if name == COMPLETED || !self.outputs.iter().any(|f| f.name == name) {
                    continue;
                }
                fields
                    .entry(name.to_string())
                    .or_insert_with(|| reply[whole.end()..end].trim().to_string());
            }
        }

        for f in self.outputs {
            if !fields.contains_key(f.name) {
                return Err(SavantError::Pipeline {
                    message: format!("{}: reply is missing output field '{}'", self.name, f.name),
                });
            }
        }

        Ok(Prediction {
            signature: self.name,
            fields,
        })
    }
}

/// Parsed output fields of one step
#[derive(Debug, Clone)]
pub struct Prediction {
    pub signature: &'static str,
    fields: HashMap<String, String>,
}

impl Prediction {
    pub fn get(&self, field: &str) -> Result<&str> {
        self.fields
            .get(field)
            .map(String::as_str)
            .ok_or_else(|| SavantError::Pipeline {
                message: format!("{}: no output field '{}'", self.signature, field),
            })
    }

    /// True iff the field reads as the literal `true` (case-insensitive).
    pub fn flag(&self, field: &str) -> Result<bool> {
        Ok(parse_flag(self.get(field)?))
    }

    pub fn list(&self, field: &str) -> Result<Vec<String>> {
        Ok(parse_list(self.get(field)?))
    }
}

pub fn parse_flag(raw: &str) -> bool {
    raw.trim()
        .trim_matches(|c: char| c == '"' || c == '\'' || c == '`' || c == '.')
        .trim()
        .eq_ignore_ascii_case("true")
}

/// A JSON array if the text is one, otherwise the non-empty lines with bullets removed.
pub fn parse_list(raw: &str) -> Vec<String> {
    let trimmed = raw.trim();
    if let Ok(values) = serde_json::from_str::<Vec<serde_json::Value>>(trimmed) {
        return values
            .into_iter()
            .map(|v| match v {
                serde_json::Value::String(s) => s,
                other => other.to_string(),
            })
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();
    }
    trimmed
        .lines()
        .map(|line| LIST_BULLET.replace(line, "").trim().to_string())
        .filter(|line| !line.is_empty())
        .collect()
}

/// Runs one signature against a model
pub struct Predictor<'a> {
    signature: &'static Signature,
    model: &'a dyn LanguageModel,
}

impl<'a> Predictor<'a> {
    pub fn new(signature: &'static Signature, model: &'a dyn LanguageModel) -> Self {
        Self { signature, model }
    }

    pub async fn call(&self, inputs: &[(&str, &str)]) -> Result<Prediction> {
        let inputs: HashMap<&str, &str> = inputs.iter().copied().collect();
        let messages = [
            ChatMessage::system(self.signature.system_prompt()),
            ChatMessage::user(self.signature.user_prompt(&inputs)?),
        ];
        debug!(signature = self.signature.name, "calling language model");
        let reply = self.model.complete(&messages).await?;
        self.signature.parse_reply(&reply)
    }
}
