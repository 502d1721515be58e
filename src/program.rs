//! ASP program assembly from LLM-produced components.
//!
//! The generation step returns JSON shaped like
//! `{"predicates": [...], "facts": [...], "constraints": [...], "optimize": "..."}`.
//! Predicates declare typed fields; facts are checked against those
//! declarations before anything reaches the solver.

use std::fmt;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use tracing::warn;

use crate::error::{Result, SavantError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldKind {
    Constant,
    Integer,
    String,
}

impl FieldKind {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim() {
            "ConstantField" | "constant" | "Constant" | "const" => Some(Self::Constant),
            "IntegerField" | "integer" | "Integer" | "int" => Some(Self::Integer),
            "StringField" | "string" | "String" | "str" => Some(Self::String),
            _ => None,
        }
    }
}

impl fmt::Display for FieldKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Constant => "constant",
            Self::Integer => "integer",
            Self::String => "string",
        };
        f.write_str(s)
    }
}

/// One declared predicate; field order is argument order
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PredicateSpec {
    pub name: String,
    pub fields: Vec<(String, FieldKind)>,
}

impl PredicateSpec {
    /// Name used inside the ASP program (`Task` → `task`)
    pub fn asp_name(&self) -> String {
        let mut chars = self.name.chars();
        match chars.next() {
            Some(first) => first.to_lowercase().chain(chars).collect(),
            None => String::new(),
        }
    }

    pub fn arity(&self) -> usize {
        self.fields.len()
    }
}

#[derive(Deserialize)]
struct RawPredicate {
    name: String,
    #[serde(default)]
    fields: serde_json::Map<String, Value>,
}

impl<'de> Deserialize<'de> for PredicateSpec {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        use serde::de::Error;
        let raw = RawPredicate::deserialize(deserializer)?;
        if raw.name.trim().is_empty() {
            return Err(D::Error::custom("predicate name cannot be empty"));
        }
        let mut fields = Vec::with_capacity(raw.fields.len());
        for (field, kind) in raw.fields {
            let kind_str = kind.as_str().unwrap_or_default();
            let kind = FieldKind::parse(kind_str).ok_or_else(|| {
                D::Error::custom(format!(
                    "predicate {}: field '{}' has unsupported type '{}'",
                    raw.name, field, kind
                ))
            })?;
            fields.push((field, kind));
        }
        Ok(Self {
            name: raw.name.trim().to_string(),
            fields,
        })
    }
}

fn statements<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s,
        Some(Value::Array(items)) => items
            .into_iter()
            .map(|v| match v {
                Value::String(s) => s,
                other => other.to_string(),
            })
            .collect::<Vec<_>>()
            .join("\n"),
        Some(other) => other.to_string(),
    })
}

/// Program components produced by the generation step
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgramComponents {
    #[serde(default)]
    pub predicates: Vec<PredicateSpec>,
    #[serde(default)]
    pub facts: Vec<String>,
    #[serde(default)]
    pub constraints: Vec<String>,
    #[serde(default, deserialize_with = "statements")]
    pub optimize: String,
}

impl ProgramComponents {
    /// Decode components from raw model output, tolerating code fences and prose around the JSON.
    pub fn from_llm_output(raw: &str) -> Result<Self> {
        let body = extract_json_object(raw).ok_or_else(|| SavantError::ComponentParse {
            message: "Failed to parse program components from LLM output: no JSON object found"
                .into(),
        })?;
        Ok(serde_json::from_str(body)?)
    }
}

/// The outermost `{...}` span of the text; fences and surrounding prose fall outside it
pub fn extract_json_object(raw: &str) -> Option<&str> {
    let start = raw.find('{')?;
    let end = raw.rfind('}')?;
    (end > start).then(|| &raw[start..=end])
}

/// Constraint and optimization text handed to the solver verbatim
pub fn assemble_program(components: &ProgramComponents) -> String {
    let constraints = components.constraints.join("\n");
    format!(
        "\n{}\n\n{}\n\n#show.\n",
        constraints, components.optimize
    )
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Term {
    Integer(i64),
    Constant(String),
    Str(String),
}

impl fmt::Display for Term {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Term::Integer(n) => write!(f, "{}", n),
            Term::Constant(c) => f.write_str(c),
            Term::Str(s) => {
                f.write_str("\"")?;
                for ch in s.chars() {
                    match ch {
                        '"' => f.write_str("\\\"")?,
                        '\\' => f.write_str("\\\\")?,
                        '\n' => f.write_str("\\n")?,
                        c => write!(f, "{}", c)?,
                    }
                }
                f.write_str("\"")
            }
        }
    }
}

/// A fact typed against its predicate declaration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fact {
    pub predicate: String,
    pub args: Vec<Term>,
}

impl fmt::Display for Fact {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.args.is_empty() {
            return write!(f, "{}.", self.predicate);
        }
        let args = self
            .args
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(",");
        write!(f, "{}({}).", self.predicate, args)
    }
}

/// Split `a, "b,c", f(x,y)` on top-level commas
pub fn split_args(raw: &str) -> Vec<String> {
    let mut args = Vec::new();
    let mut current = String::new();
    let mut depth = 0usize;
    let mut in_quotes = false;
    let mut escaped = false;

    for ch in raw.chars() {
        if in_quotes {
            current.push(ch);
            if escaped {
                escaped = false;
            } else if ch == '\\' {
                escaped = true;
            } else if ch == '"' {
                in_quotes = false;
            }
            continue;
        }
        match ch {
            '"' => {
                in_quotes = true;
                current.push(ch);
            }
            '(' => {
                depth += 1;
                current.push(ch);
            }
            ')' => {
                depth = depth.saturating_sub(1);
                current.push(ch);
            }
            ',' if depth == 0 => {
                args.push(current.trim().to_string());
                current.clear();
            }
            _ => current.push(ch),
        }
    }
    if !current.trim().is_empty() || !args.is_empty() {
        args.push(current.trim().to_string());
    }
    args
}

fn unquote(raw: &str) -> Option<&str> {
    raw.strip_prefix('"')
        .and_then(|s| s.strip_suffix('"'))
        .or_else(|| raw.strip_prefix('\'').and_then(|s| s.strip_suffix('\'')))
}

/// Text of a string argument. Double-quoted ASP strings have `\"`, `\\` and `\n` decoded.
fn string_value(raw: &str) -> String {
    let Some(inner) = raw.strip_prefix('"').and_then(|s| s.strip_suffix('"')) else {
        return unquote(raw).unwrap_or(raw).to_string();
    };
    let mut out = String::with_capacity(inner.len());
    let mut chars = inner.chars();
    while let Some(ch) = chars.next() {
        if ch != '\\' {
            out.push(ch);
            continue;
        }
        match chars.next() {
            Some('"') => out.push('"'),
            Some('\\') => out.push('\\'),
            Some('n') => out.push('\n'),
            Some(other) => {
                out.push('\\');
                out.push(other);
            }
            None => out.push('\\'),
        }
    }
    out
}

fn is_asp_constant(raw: &str) -> bool {
    let mut chars = raw.chars();
    match chars.next() {
        Some(c) if c.is_ascii_lowercase() || c == '_' => {
            chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '\'')
        }
        _ => false,
    }
}

/// Lower-case the first character and replace characters ASP identifiers cannot hold.
fn to_asp_constant(raw: &str) -> Option<String> {
    let cleaned: String = raw
        .trim()
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect();
    let mut chars = cleaned.chars();
    let first = chars.next()?;
    if !first.is_ascii_alphabetic() {
        return None;
    }
    let out: String = first.to_ascii_lowercase().to_string() + chars.as_str();
    is_asp_constant(&out).then_some(out)
}

/// Declared predicate schemas used to type facts and filter reported atoms
#[derive(Debug, Clone, Default)]
pub struct Unifier {
    predicates: Vec<PredicateSpec>,
}

impl Unifier {
    pub fn new(predicates: &[PredicateSpec]) -> Result<Self> {
        let mut seen = std::collections::HashSet::new();
        for p in predicates {
            if !seen.insert((p.asp_name(), p.arity())) {
                return Err(SavantError::Unification {
                    message: format!("predicate {}/{} declared twice", p.asp_name(), p.arity()),
                });
            }
        }
        Ok(Self {
            predicates: predicates.to_vec(),
        })
    }

    pub fn predicates(&self) -> &[PredicateSpec] {
        &self.predicates
    }

    fn lookup(&self, name: &str, arity: usize) -> Option<&PredicateSpec> {
        self.predicates
            .iter()
            .find(|p| (p.asp_name() == name || p.name == name) && p.arity() == arity)
    }

    /// Parse and type-check one fact. `Ok(None)` for text that is not a `name(args)` atom.
    pub fn unify_fact(&self, raw: &str) -> Result<Option<Fact>> {
        let text = raw.trim().trim_end_matches('.').trim();
        let (Some(open), true) = (text.find('('), text.ends_with(')')) else {
            warn!(fact = raw, "skipping fact without an argument list");
            return Ok(None);
        };

        let name = text[..open].trim();
        let inner = &text[open + 1..text.len() - 1];
        let raw_args = split_args(inner);

        let spec = self.lookup(name, raw_args.len()).ok_or_else(|| {
            let known = self.describe();
            SavantError::Unification {
                message: format!(
                    "fact '{}' matches no declared predicate {}/{} (declared: {})",
                    raw,
                    name,
                    raw_args.len(),
                    if known.is_empty() { "none".to_string() } else { known.join(", ") }
                ),
            }
        })?;

        let mut args = Vec::with_capacity(raw_args.len());
        for ((field, kind), arg) in spec.fields.iter().zip(raw_args.iter()) {
            let term = match kind {
                FieldKind::Integer => arg
                    .parse::<i64>()
                    .map(Term::Integer)
                    .map_err(|_| SavantError::Unification {
                        message: format!(
                            "fact '{}': field '{}' expects an integer, got '{}'",
                            raw, field, arg
                        ),
                    })?,
                FieldKind::String => Term::Str(string_value(arg)),
                FieldKind::Constant => {
                    let value = unquote(arg).unwrap_or(arg);
                    if is_asp_constant(value) {
                        Term::Constant(value.to_string())
                    } else {
                        to_asp_constant(value).map(Term::Constant).ok_or_else(|| {
                            SavantError::Unification {
                                message: format!(
                                    "fact '{}': field '{}' expects a constant, got '{}'",
                                    raw, field, arg
                                ),
                            }
                        })?
                    }
                }
            };
            args.push(term);
        }

        Ok(Some(Fact {
            predicate: spec.asp_name(),
            args,
        }))
    }

    /// Type every fact, skipping the ones that are not atoms
    pub fn unify_facts(&self, facts: &[String]) -> Result<Vec<Fact>> {
        let mut out = Vec::with_capacity(facts.len());
        for raw in facts {
            if let Some(fact) = self.unify_fact(raw)? {
                out.push(fact);
            }
        }
        Ok(out)
    }

    /// `#show name/arity.` per declared predicate
    pub fn show_directives(&self) -> String {
        self.predicates
            .iter()
            .map(|p| format!("#show {}/{}.", p.asp_name(), p.arity()))
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// e.g. `task(name: constant, duration: integer)`
    pub fn describe(&self) -> Vec<String> {
        self.predicates
            .iter()
            .map(|p| {
                let fields = p
                    .fields
                    .iter()
                    .map(|(name, kind)| format!("{}: {}", name, kind))
                    .collect::<Vec<_>>()
                    .join(", ");
                format!("{}({})", p.asp_name(), fields)
            })
            .collect()
    }
}

/// Full solver input: typed facts, the assembled program, then show directives
pub fn build_solver_input(components: &ProgramComponents) -> Result<(Unifier, String)> {
    let unifier = Unifier::new(&components.predicates)?;
    let facts = unifier.unify_facts(&components.facts)?;

    let mut text = String::new();
    for fact in &facts {
        text.push_str(&fact.to_string());
        text.push('\n');
    }
    text.push_str(&assemble_program(components));
    let shows = unifier.show_directives();
    if !shows.is_empty() {
        text.push_str(&shows);
        text.push('\n');
    }
    Ok((unifier, text))
}
