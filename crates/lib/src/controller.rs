//! View controller: turns user intents into calls on the auth gate, session store and
//! document registry, and exposes a read-only [`ViewState`] for rendering.
//!
//! Every backend failure is handled here. Reads degrade per store policy; writes leave
//! state as it was and set a [`Notice`]. A 401 from the backend logs the user out.

use std::sync::{Arc, Mutex, MutexGuard};

use crate::auth::{AuthGate, View};
use crate::documents::{DocumentError, DocumentRegistry};
use crate::gateway::{Backend, GatewayError, UploadFile};
use crate::session::{SessionId, SessionSnapshot, SessionStore};

pub const LOGIN_FAILED: &str = "Invalid username or password";
pub const SIGNUP_OK: &str = "Signup successful! Please login.";
pub const SIGNUP_FAILED: &str = "Signup failed. Username might already exist.";
pub const UPLOAD_OK: &str = "Files uploaded successfully!";
pub const UPLOAD_FAILED: &str = "Failed to upload files. Please try again.";
pub const UPLOAD_EMPTY: &str = "Select at least one file to upload.";
pub const DELETE_FAILED: &str = "Failed to delete the file. Please try again.";
pub const ASK_FAILED: &str = "Failed to fetch answer. Please try again.";
pub const SESSION_EXPIRED: &str = "Your session has expired. Please login again.";

/// Chatbot sidebar tabs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Tab {
    #[default]
    Chat,
    Upload,
    Documents,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    Info,
    Error,
}

/// User-visible message from the last action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub level: NoticeLevel,
    pub text: String,
}

impl Notice {
    pub fn info(text: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Info,
            text: text.into(),
        }
    }

    pub fn error(text: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Error,
            text: text.into(),
        }
    }
}

/// Something the user asked for.
#[derive(Debug, Clone)]
pub enum Intent {
    Navigate(View),
    Login { username: String, password: String },
    Signup { username: String, password: String },
    Logout,
    SwitchTab(Tab),
    SubmitQuestion(String),
    SelectSession(SessionId),
    CreateSession,
    UploadFiles(Vec<UploadFile>),
    DeleteFile(String),
}

/// Snapshot of everything a renderer shows.
#[derive(Debug, Clone)]
pub struct ViewState {
    pub view: View,
    pub tab: Tab,
    pub authenticated: bool,
    pub sessions: SessionSnapshot,
    pub files: Vec<String>,
    /// Answer to the last question asked in this process.
    pub answer: Option<String>,
    pub notice: Option<Notice>,
}

#[derive(Debug, Default)]
struct UiState {
    view: View,
    tab: Tab,
    answer: Option<String>,
    notice: Option<Notice>,
}

pub struct ViewController {
    auth: AuthGate,
    backend: Arc<dyn Backend>,
    sessions: SessionStore,
    documents: DocumentRegistry,
    ui: Mutex<UiState>,
}

impl ViewController {
    pub fn new(auth: AuthGate, backend: Arc<dyn Backend>) -> Self {
        Self {
            auth,
            backend,
            sessions: SessionStore::new(),
            documents: DocumentRegistry::new(),
            ui: Mutex::new(UiState::default()),
        }
    }

    pub fn auth(&self) -> &AuthGate {
        &self.auth
    }

    pub fn sessions(&self) -> &SessionStore {
        &self.sessions
    }

    pub fn documents(&self) -> &DocumentRegistry {
        &self.documents
    }

    fn ui(&self) -> MutexGuard<'_, UiState> {
        self.ui.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn notify(&self, notice: Notice) {
        self.ui().notice = Some(notice);
    }

    fn show(&self, view: View) {
        self.ui().view = view;
    }

    /// Enter a view. Protected views re-read the token first and redirect to login without it;
    /// the chatbot view then loads documents and history. Returns the view actually shown.
    pub async fn mount(&self, view: View) -> View {
        if view.is_protected() {
            self.auth.reload();
        }
        if let Err(e) = self.auth.guard(view) {
            let target = e.redirect();
            log::info!("controller: {:?} requires login, redirecting to {:?}", view, target);
            self.show(target);
            return target;
        }
        self.show(view);
        if view == View::Chatbot {
            // Read failures degrade inside the stores; only a rejected token changes the view.
            if let Err(e) = self.documents.refresh(self.backend.as_ref()).await {
                if e.is_unauthorized() {
                    self.expire().await;
                    return View::Login;
                }
            }
            if let Err(e) = self.sessions.refresh(self.backend.as_ref()).await {
                if e.is_unauthorized() {
                    self.expire().await;
                    return View::Login;
                }
            }
        }
        view
    }

    pub async fn dispatch(&self, intent: Intent) {
        match intent {
            Intent::Navigate(view) => {
                self.mount(view).await;
            }
            Intent::Login { username, password } => self.login(&username, &password).await,
            Intent::Signup { username, password } => self.signup(&username, &password).await,
            Intent::Logout => self.logout().await,
            Intent::SwitchTab(tab) => {
                self.ui().tab = tab;
            }
            Intent::SubmitQuestion(question) => self.ask(&question).await,
            Intent::SelectSession(id) => self.sessions.select_session(id).await,
            Intent::CreateSession => {
                if self.require_auth() {
                    let id = self.sessions.create_session().await;
                    self.notify(Notice::info(format!("New session created: {}", id)));
                }
            }
            Intent::UploadFiles(files) => self.upload(files).await,
            Intent::DeleteFile(file_id) => self.delete(&file_id).await,
        }
    }

    /// Current state for rendering.
    pub async fn state(&self) -> ViewState {
        let sessions = self.sessions.snapshot().await;
        let files = self.documents.files().await;
        let ui = self.ui();
        ViewState {
            view: ui.view,
            tab: ui.tab,
            authenticated: self.auth.has_token(),
            sessions,
            files,
            answer: ui.answer.clone(),
            notice: ui.notice.clone(),
        }
    }

    /// Take the pending notice, leaving none.
    pub fn take_notice(&self) -> Option<Notice> {
        self.ui().notice.take()
    }

    /// False (and redirected to login) when there is no token; no request is made.
    fn require_auth(&self) -> bool {
        if self.auth.has_token() {
            return true;
        }
        log::info!("controller: action requires login");
        self.show(View::Login);
        false
    }

    async fn login(&self, username: &str, password: &str) {
        match self.backend.login(username, password).await {
            Ok(token) => {
                if let Err(e) = self.auth.set_token(&token) {
                    log::warn!("controller: storing token failed: {}", e);
                    self.notify(Notice::error(LOGIN_FAILED));
                    return;
                }
                self.ui().notice = None;
                self.mount(View::Chatbot).await;
            }
            Err(e) => {
                log::warn!("controller: login failed: {}", e);
                self.notify(Notice::error(LOGIN_FAILED));
            }
        }
    }

    async fn signup(&self, username: &str, password: &str) {
        match self.backend.signup(username, password).await {
            Ok(confirmation) => {
                log::info!(
                    "controller: signup ok ({})",
                    confirmation.message.as_deref().unwrap_or("no message")
                );
                self.notify(Notice::info(SIGNUP_OK));
                self.show(View::Login);
            }
            Err(e) => {
                log::warn!("controller: signup failed: {}", e);
                self.notify(Notice::error(SIGNUP_FAILED));
            }
        }
    }

    /// Clear the token and every cache, then go to the welcome view.
    async fn logout(&self) {
        self.teardown().await;
        let mut ui = self.ui();
        *ui = UiState::default();
        ui.view = View::Welcome;
    }

    async fn teardown(&self) {
        if let Err(e) = self.auth.clear_token() {
            log::warn!("controller: clearing stored token failed: {}", e);
        }
        self.sessions.clear().await;
        self.documents.clear().await;
    }

    /// Report a failed write. A 401 means the credential is no longer valid: log out to the login view.
    async fn write_failed(&self, e: &GatewayError, text: &str) {
        log::warn!("controller: {}: {}", text, e);
        if e.is_unauthorized() {
            self.expire().await;
            return;
        }
        self.notify(Notice::error(text));
    }

    /// The backend rejected the token: tear down and go to the login view.
    async fn expire(&self) {
        log::info!("controller: token rejected by backend, logging out");
        self.teardown().await;
        let mut ui = self.ui();
        *ui = UiState::default();
        ui.view = View::Login;
        ui.notice = Some(Notice::error(SESSION_EXPIRED));
    }

    async fn ask(&self, question: &str) {
        if question.trim().is_empty() || !self.require_auth() {
            return;
        }
        let session_id = self.sessions.current_session_id().await;
        // Only the fallback pointer of an empty store may be materialized on answer.
        let materialize = !self.sessions.contains(&session_id).await;
        match self.backend.ask_question(question, &session_id).await {
            Ok(answer) => {
                if materialize && self.sessions.is_empty().await {
                    self.sessions.get_or_create(session_id.clone()).await;
                }
                if let Err(e) = self
                    .sessions
                    .append_turn(&session_id, question, answer.clone())
                    .await
                {
                    log::warn!("controller: answer not recorded: {}", e);
                    self.sessions.current_session_id().await;
                    self.notify(Notice::error(format!(
                        "Answer received for {}, which is no longer loaded.",
                        session_id
                    )));
                }
                self.ui().answer = Some(answer);
            }
            Err(e) => self.write_failed(&e, ASK_FAILED).await,
        }
    }

    async fn upload(&self, files: Vec<UploadFile>) {
        if !self.require_auth() {
            return;
        }
        match self.documents.upload(self.backend.as_ref(), files).await {
            Ok(_) => self.notify(Notice::info(UPLOAD_OK)),
            Err(DocumentError::NoFiles) => self.notify(Notice::error(UPLOAD_EMPTY)),
            Err(DocumentError::Gateway(e)) => self.write_failed(&e, UPLOAD_FAILED).await,
        }
    }

    async fn delete(&self, file_id: &str) {
        if !self.require_auth() {
            return;
        }
        match self.documents.delete(self.backend.as_ref(), file_id).await {
            Ok(message) => self.notify(Notice::info(message)),
            Err(DocumentError::NoFiles) => self.notify(Notice::error(DELETE_FAILED)),
            Err(DocumentError::Gateway(e)) => self.write_failed(&e, DELETE_FAILED).await,
        }
    }
}
