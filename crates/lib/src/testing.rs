//! In-process backend used by unit tests.

use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use crate::gateway::{Backend, GatewayError, SessionHistory, SignupConfirmation, UploadFile};
use crate::session::Turn;
use crate::token::TokenStore;

pub(crate) const FAKE_TOKEN: &str = "fake-token";

/// Token store whose writes always fail, e.g. an unwritable token file.
pub(crate) struct ReadOnlyTokenStore;

impl TokenStore for ReadOnlyTokenStore {
    fn load(&self) -> Option<String> {
        None
    }

    fn save(&self, _token: &str) -> anyhow::Result<()> {
        anyhow::bail!("read-only token store")
    }

    fn clear(&self) -> anyhow::Result<()> {
        Ok(())
    }
}

/// Backend with scripted state. Reads and writes can be switched to fail independently.
#[derive(Default)]
pub(crate) struct FakeBackend {
    files: Mutex<Vec<String>>,
    history: Mutex<Vec<SessionHistory>>,
    users: Mutex<Vec<(String, String)>>,
    calls: Mutex<Vec<&'static str>>,
    fail_reads: AtomicBool,
    fail_writes: AtomicBool,
    unauthorized: AtomicBool,
    unauthorized_reads: AtomicBool,
}

fn server_error() -> GatewayError {
    GatewayError::Status {
        status: 500,
        body: "boom".to_string(),
    }
}

impl FakeBackend {
    pub(crate) fn new() -> Self {
        let b = Self::default();
        b.users
            .lock()
            .unwrap()
            .push(("alice".to_string(), "secret".to_string()));
        b
    }

    pub(crate) fn set_files(&self, files: &[&str]) {
        *self.files.lock().unwrap() = files.iter().map(|s| s.to_string()).collect();
    }

    pub(crate) fn set_history(&self, history: Vec<SessionHistory>) {
        *self.history.lock().unwrap() = history;
    }

    pub(crate) fn fail_reads(&self, on: bool) {
        self.fail_reads.store(on, Ordering::SeqCst);
    }

    pub(crate) fn fail_writes(&self, on: bool) {
        self.fail_writes.store(on, Ordering::SeqCst);
    }

    pub(crate) fn reject_token(&self, on: bool) {
        self.unauthorized.store(on, Ordering::SeqCst);
    }

    /// Reject the token on reads only, so writes still go through.
    pub(crate) fn reject_token_on_reads(&self, on: bool) {
        self.unauthorized_reads.store(on, Ordering::SeqCst);
    }

    /// Names of the operations called so far, in order.
    pub(crate) fn calls(&self) -> Vec<&'static str> {
        self.calls.lock().unwrap().clone()
    }

    fn record(&self, op: &'static str) {
        self.calls.lock().unwrap().push(op);
    }

    fn check_read(&self) -> Result<(), GatewayError> {
        if self.unauthorized.load(Ordering::SeqCst)
            || self.unauthorized_reads.load(Ordering::SeqCst)
        {
            return Err(GatewayError::Unauthorized);
        }
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(server_error());
        }
        Ok(())
    }

    fn check_write(&self) -> Result<(), GatewayError> {
        if self.unauthorized.load(Ordering::SeqCst) {
            return Err(GatewayError::Unauthorized);
        }
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(server_error());
        }
        Ok(())
    }
}

#[async_trait]
impl Backend for FakeBackend {
    async fn login(&self, username: &str, password: &str) -> Result<String, GatewayError> {
        self.record("login");
        let users = self.users.lock().unwrap();
        if users.iter().any(|(u, p)| u == username && p == password) {
            Ok(FAKE_TOKEN.to_string())
        } else {
            Err(GatewayError::Unauthorized)
        }
    }

    async fn signup(
        &self,
        username: &str,
        password: &str,
    ) -> Result<SignupConfirmation, GatewayError> {
        self.record("signup");
        let mut users = self.users.lock().unwrap();
        if users.iter().any(|(u, _)| u == username) {
            return Err(GatewayError::Status {
                status: 400,
                body: "Username already registered".to_string(),
            });
        }
        users.push((username.to_string(), password.to_string()));
        Ok(SignupConfirmation {
            message: Some("User created successfully".to_string()),
        })
    }

    async fn list_uploaded_files(&self) -> Result<Vec<String>, GatewayError> {
        self.record("list_uploaded_files");
        self.check_read()?;
        Ok(self.files.lock().unwrap().clone())
    }

    async fn upload_files(&self, files: Vec<UploadFile>) -> Result<Vec<String>, GatewayError> {
        self.record("upload_files");
        self.check_write()?;
        let names: Vec<String> = files.into_iter().map(|f| f.name).collect();
        self.files.lock().unwrap().extend(names.iter().cloned());
        Ok(names)
    }

    async fn delete_file(&self, file_id: &str) -> Result<String, GatewayError> {
        self.record("delete_file");
        self.check_write()?;
        let mut files = self.files.lock().unwrap();
        let Some(pos) = files.iter().position(|f| f == file_id) else {
            return Err(GatewayError::Status {
                status: 404,
                body: "File not found".to_string(),
            });
        };
        files.remove(pos);
        Ok(format!("File {} deleted successfully", file_id))
    }

    async fn ask_question(
        &self,
        question: &str,
        session_id: &str,
    ) -> Result<String, GatewayError> {
        self.record("ask_question");
        self.check_write()?;
        let answer = format!("answer to {}", question);
        let mut history = self.history.lock().unwrap();
        let turn = Turn::new(question, answer.clone());
        match history.iter_mut().find(|s| s.session_id == session_id) {
            Some(s) => s.messages.push(turn),
            None => history.push(SessionHistory {
                session_id: session_id.to_string(),
                messages: vec![turn],
            }),
        }
        Ok(answer)
    }

    async fn get_history(&self) -> Result<Vec<SessionHistory>, GatewayError> {
        self.record("get_history");
        self.check_read()?;
        Ok(self.history.lock().unwrap().clone())
    }
}
