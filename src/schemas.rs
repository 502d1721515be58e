use serde_json::{Map, Value, json};
use std::sync::Arc;

fn object(schema: Value) -> Arc<Map<String, Value>> {
    Arc::new(schema.as_object().cloned().unwrap_or_else(Map::new))
}

pub fn solve_optimization_schema() -> Arc<Map<String, Value>> {
    object(json!({
        "type": "object",
        "properties": {
            "problem": {"type": "string", "description": "The optimization problem description"},
            "additional_info": {"type": "string", "description": "Answers to previously asked clarification questions"}
        },
        "required": ["problem"]
    }))
}

pub fn solve_optimization_output_schema() -> Arc<Map<String, Value>> {
    object(json!({
        "type": "object",
        "properties": {
            "status": {"type": "string", "enum": ["solved", "needs_more_info", "error"]},
            "solution": {"type": "string"},
            "program": {"type": "string"},
            "questions": {"type": "array", "items": {"type": "string"}},
            "error": {"type": "string"},
            "text": {"type": "string"}
        },
        "required": ["status", "text"]
    }))
}

pub fn detailed_help_schema() -> Arc<Map<String, Value>> {
    object(json!({
        "type": "object",
        "properties": {
            "tool": {"type": "string", "enum": ["solve_optimization", "detailed_help"]},
            "format": {"type": "string", "enum": ["full", "compact"], "default": "full"}
        },
        "required": ["tool"]
    }))
}

pub fn detailed_help_output_schema() -> Arc<Map<String, Value>> {
    object(json!({
        "type": "object",
        "properties": {
            "name": {"type": "string"},
            "tool": {"type": "string"},
            "description": {"type": "string"},
            "summary": {"type": "string"},
            "arguments": {"type": "object"},
            "returns": {"type": "object"}
        }
    }))
}
