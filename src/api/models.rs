use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::error::ApiError;

#[derive(Debug, Serialize, Deserialize)]
pub struct AskRequest {
    pub pergunta: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AskResponse {
    pub resposta: String,
}

/// A validated, non-blank question. The text is kept exactly as sent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Question(String);

impl Question {
    pub fn from_payload(payload: &Value) -> Result<Question, ApiError> {
        let object = payload
            .as_object()
            .ok_or(ApiError::BadRequest("Request body must be a JSON object."))?;

        match object.get("pergunta") {
            None | Some(Value::Null) => Err(ApiError::BadRequest("Field `pergunta` is required.")),
            Some(Value::String(text)) if text.trim().is_empty() => {
                Err(ApiError::BadRequest("Field `pergunta` cannot be empty."))
            }
            Some(Value::String(text)) => Ok(Question(text.clone())),
            Some(_) => Err(ApiError::BadRequest("Field `pergunta` must be a string.")),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn rejected(payload: Value) -> &'static str {
        match Question::from_payload(&payload) {
            Err(ApiError::BadRequest(msg)) => msg,
            other => panic!("expected BadRequest, got {other:?}"),
        }
    }

    #[test]
    fn accepts_string_question_verbatim() {
        let q = Question::from_payload(&json!({ "pergunta": "  Como configurar a VPN? " })).unwrap();
        assert_eq!(q.as_str(), "  Como configurar a VPN? ");
    }

    #[test]
    fn ignores_unknown_fields() {
        let q = Question::from_payload(&json!({ "pergunta": "X", "extra": 1 })).unwrap();
        assert_eq!(q.as_str(), "X");
    }

    #[test]
    fn rejects_invalid_payloads() {
        assert_eq!(rejected(json!({})), "Field `pergunta` is required.");
        assert_eq!(rejected(json!({ "pergunta": null })), "Field `pergunta` is required.");
        assert_eq!(rejected(json!({ "pergunta": 42 })), "Field `pergunta` must be a string.");
        assert_eq!(rejected(json!({ "pergunta": ["a"] })), "Field `pergunta` must be a string.");
        assert_eq!(rejected(json!({ "pergunta": "" })), "Field `pergunta` cannot be empty.");
        assert_eq!(rejected(json!({ "pergunta": " \n\t" })), "Field `pergunta` cannot be empty.");
        assert_eq!(rejected(json!("pergunta")), "Request body must be a JSON object.");
        assert_eq!(rejected(json!([{ "pergunta": "X" }])), "Request body must be a JSON object.");
    }
}
