//! HTTP client for the backend (http://127.0.0.1:8000 by default).

use async_trait::async_trait;
use reqwest::{Method, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use std::path::Path;

use super::protocol::{
    AskRequest, AskResponse, DeleteFileResponse, HistoryResponse, LoginResponse,
    SessionHistory, SignupConfirmation, SignupRequest, UploadedFilesResponse,
};
use super::{Backend, GatewayError};
use crate::auth::AuthGate;

const DEFAULT_BASE_URL: &str = "http://127.0.0.1:8000";

/// A file to upload: display name plus contents.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadFile {
    pub name: String,
    pub bytes: Vec<u8>,
    /// Content type sent with the part, if known.
    pub mime: Option<String>,
}

impl UploadFile {
    pub fn new(name: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            name: name.into(),
            bytes: bytes.into(),
            mime: None,
        }
    }

    /// Read a file from disk; the part name is the file's base name.
    pub async fn from_path(path: impl AsRef<Path>) -> std::io::Result<Self> {
        let path = path.as_ref();
        let bytes = tokio::fs::read(path).await?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        Ok(Self {
            name,
            bytes,
            mime: None,
        })
    }
}

/// Client for the backend HTTP API. Every request carries the gate's current token when present.
#[derive(Clone)]
pub struct RemoteGateway {
    base_url: String,
    client: reqwest::Client,
    auth: AuthGate,
}

impl RemoteGateway {
    pub fn new(base_url: Option<String>, auth: AuthGate) -> Self {
        let base_url = base_url
            .map(|u| u.trim_end_matches('/').to_string())
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());
        Self {
            base_url,
            client: reqwest::Client::new(),
            auth,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let url = format!("{}{}", self.base_url, path);
        let req = self.client.request(method, &url);
        match self.auth.token() {
            Some(token) => req.bearer_auth(token),
            None => req,
        }
    }
}

/// Map non-2xx to an error; 401 is reported separately.
async fn check_status(res: Response) -> Result<Response, GatewayError> {
    let status = res.status();
    if status == reqwest::StatusCode::UNAUTHORIZED {
        return Err(GatewayError::Unauthorized);
    }
    if !status.is_success() {
        let body = res.text().await.unwrap_or_default();
        return Err(GatewayError::Status {
            status: status.as_u16(),
            body,
        });
    }
    Ok(res)
}

/// Read the body and parse it as `T`; shape mismatches become [`GatewayError::Decode`].
async fn read_json<T: DeserializeOwned>(res: Response) -> Result<T, GatewayError> {
    let res = check_status(res).await?;
    let text = res.text().await?;
    serde_json::from_str(&text).map_err(|e| GatewayError::Decode(e.to_string()))
}

#[async_trait]
impl Backend for RemoteGateway {
    async fn login(&self, username: &str, password: &str) -> Result<String, GatewayError> {
        let res = self
            .request(Method::POST, "/login")
            .form(&[("username", username), ("password", password)])
            .send()
            .await?;
        let data: LoginResponse = read_json(res).await?;
        if data.access_token.trim().is_empty() {
            return Err(GatewayError::Decode("empty access_token".to_string()));
        }
        Ok(data.access_token)
    }

    async fn signup(
        &self,
        username: &str,
        password: &str,
    ) -> Result<SignupConfirmation, GatewayError> {
        let body = SignupRequest {
            username: username.to_string(),
            password: password.to_string(),
        };
        let res = self
            .request(Method::POST, "/signup")
            .json(&body)
            .send()
            .await?;
        let res = check_status(res).await?;
        let text = res.text().await?;
        Ok(SignupConfirmation::from_body(&text))
    }

    async fn list_uploaded_files(&self) -> Result<Vec<String>, GatewayError> {
        let res = self
            .request(Method::GET, "/get_uploaded_files")
            .send()
            .await?;
        let data: UploadedFilesResponse = read_json(res).await?;
        Ok(data.uploaded_files)
    }

    async fn upload_files(&self, files: Vec<UploadFile>) -> Result<Vec<String>, GatewayError> {
        let mut form = reqwest::multipart::Form::new();
        for file in files {
            let mut part = reqwest::multipart::Part::bytes(file.bytes).file_name(file.name);
            if let Some(mime) = file.mime.as_deref() {
                part = part.mime_str(mime)?;
            }
            form = form.part("files", part);
        }
        let res = self
            .request(Method::POST, "/upload_files")
            .multipart(form)
            .send()
            .await?;
        let data: UploadedFilesResponse = read_json(res).await?;
        Ok(data.uploaded_files)
    }

    async fn delete_file(&self, file_id: &str) -> Result<String, GatewayError> {
        let res = self
            .request(Method::DELETE, "/delete_file")
            .query(&[("file_id", file_id)])
            .send()
            .await?;
        let data: DeleteFileResponse = read_json(res).await?;
        Ok(data.message)
    }

    async fn ask_question(
        &self,
        question: &str,
        session_id: &str,
    ) -> Result<String, GatewayError> {
        let body = AskRequest {
            question: question.to_string(),
            session_id: session_id.to_string(),
        };
        let res = self
            .request(Method::POST, "/ask_question")
            .json(&body)
            .send()
            .await?;
        let data: AskResponse = read_json(res).await?;
        Ok(data.answer)
    }

    async fn get_history(&self) -> Result<Vec<SessionHistory>, GatewayError> {
        let res = self.request(Method::GET, "/gethistory").send().await?;
        let data: HistoryResponse = read_json(res).await?;
        Ok(data.history)
    }
}
