//! Request and response bodies of the backend HTTP API.

use serde::{Deserialize, Serialize};

use crate::session::Turn;

/// `POST /login` response: `{ "access_token" }`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginResponse {
    pub access_token: String,
}

/// `POST /signup` body: `{ "username", "password" }`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignupRequest {
    pub username: String,
    pub password: String,
}

/// Whatever the backend said after a successful signup.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SignupConfirmation {
    /// `message` field of a JSON body, or the raw body when it is not JSON.
    pub message: Option<String>,
}

impl SignupConfirmation {
    /// Parse a signup response body. Never fails: the backend's confirmation shape is not fixed.
    pub fn from_body(body: &str) -> Self {
        let body = body.trim();
        if body.is_empty() {
            return Self::default();
        }
        match serde_json::from_str::<serde_json::Value>(body) {
            Ok(v) => Self {
                message: v
                    .get("message")
                    .and_then(|m| m.as_str())
                    .map(|s| s.to_string()),
            },
            Err(_) => Self {
                message: Some(body.to_string()),
            },
        }
    }
}

/// `GET /get_uploaded_files` and `POST /upload_files` response: `{ "uploaded_files": [...] }`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadedFilesResponse {
    pub uploaded_files: Vec<String>,
}

/// `DELETE /delete_file` response: `{ "message" }`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeleteFileResponse {
    pub message: String,
}

/// `POST /ask_question` body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AskRequest {
    pub question: String,
    pub session_id: String,
}

/// `POST /ask_question` response: `{ "answer" }`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AskResponse {
    pub answer: String,
}

/// `GET /gethistory` response: `{ "history": [{ "session_id", "messages" }] }`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryResponse {
    pub history: Vec<SessionHistory>,
}

/// One server-side session with its turns in chronological order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionHistory {
    pub session_id: String,
    #[serde(default)]
    pub messages: Vec<Turn>,
}
