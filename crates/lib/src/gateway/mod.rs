//! Gateway: typed access to the question-answering backend over HTTP.
//!
//! [`Backend`] is the seam the stores and controller talk to; [`RemoteGateway`] is the
//! HTTP implementation that attaches the bearer token from the [`crate::auth::AuthGate`].

mod client;
mod protocol;

pub use client::{RemoteGateway, UploadFile};
pub use protocol::{
    AskRequest, AskResponse, DeleteFileResponse, HistoryResponse, LoginResponse,
    SessionHistory, SignupConfirmation, SignupRequest, UploadedFilesResponse,
};

use async_trait::async_trait;

/// Failure of a backend call: transport, status, or response shape.
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),
    /// 401 from the backend: missing or invalid credential.
    #[error("unauthorized")]
    Unauthorized,
    #[error("backend returned {status}: {body}")]
    Status { status: u16, body: String },
    #[error("malformed response: {0}")]
    Decode(String),
}

impl GatewayError {
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, GatewayError::Unauthorized)
    }
}

/// Operations offered by the backend.
#[async_trait]
pub trait Backend: Send + Sync {
    /// `POST /login` (form-encoded). Returns the access token.
    async fn login(&self, username: &str, password: &str) -> Result<String, GatewayError>;

    /// `POST /signup` (JSON). Does not authenticate.
    async fn signup(
        &self,
        username: &str,
        password: &str,
    ) -> Result<SignupConfirmation, GatewayError>;

    /// `GET /get_uploaded_files`.
    async fn list_uploaded_files(&self) -> Result<Vec<String>, GatewayError>;

    /// `POST /upload_files` (multipart, all files in one request). Returns canonical names.
    async fn upload_files(&self, files: Vec<UploadFile>) -> Result<Vec<String>, GatewayError>;

    /// `DELETE /delete_file?file_id=...`. Returns the status message.
    async fn delete_file(&self, file_id: &str) -> Result<String, GatewayError>;

    /// `POST /ask_question`. Returns the answer text.
    async fn ask_question(&self, question: &str, session_id: &str)
        -> Result<String, GatewayError>;

    /// `GET /gethistory`.
    async fn get_history(&self) -> Result<Vec<SessionHistory>, GatewayError>;
}
