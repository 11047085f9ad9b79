use askdoc::auth::{AuthGate, View};
use askdoc::controller::{Intent, NoticeLevel, Tab, ViewController, ViewState};
use askdoc::gateway::{RemoteGateway, UploadFile};
use askdoc::token::{FileTokenStore, TokenStore};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "askdoc")]
#[command(about = "Ask questions about your uploaded documents", long_about = None)]
struct Cli {
    /// Config file path (default: ASKDOC_CONFIG_PATH or ~/.askdoc/config.json)
    #[arg(long, short, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Backend base URL (default from ASKDOC_BACKEND_URL, config, or http://127.0.0.1:8000)
    #[arg(long, global = true, value_name = "URL")]
    backend: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Show version
    Version,

    /// Log in and store the access token.
    Login {
        #[arg(long, short)]
        username: String,
        /// Password (read from stdin when omitted)
        #[arg(long, short)]
        password: Option<String>,
    },

    /// Create an account. Does not log in.
    Signup {
        #[arg(long, short)]
        username: String,
        /// Password (read from stdin when omitted)
        #[arg(long, short)]
        password: Option<String>,
    },

    /// Forget the stored access token.
    Logout,

    /// Ask one question.
    Ask {
        question: String,

        /// Session to ask in (default: the first session from history, or default_session).
        #[arg(long, value_name = "ID")]
        session: Option<String>,
    },

    /// List sessions, or show the turns of one session.
    Sessions {
        /// Session whose turns to print.
        #[arg(long, value_name = "ID")]
        show: Option<String>,
    },

    /// Manage uploaded documents.
    Files {
        #[command(subcommand)]
        command: FilesCommand,
    },

    /// Interactive chat (type /help for commands).
    Chat {
        /// Session to start in.
        #[arg(long, value_name = "ID")]
        session: Option<String>,
    },
}

#[derive(Subcommand)]
enum FilesCommand {
    /// List uploaded documents.
    List,
    /// Upload one or more files in a single request.
    Upload {
        #[arg(required = true, value_name = "PATH")]
        paths: Vec<PathBuf>,
    },
    /// Delete an uploaded document by name.
    Delete { file_id: String },
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let cli = Cli::parse();
    let Some(command) = cli.command else {
        println!("Run with --help for usage");
        return;
    };
    if let Commands::Version = command {
        println!("askdoc {}", env!("CARGO_PKG_VERSION"));
        return;
    }

    let controller = match build_controller(cli.config, cli.backend) {
        Ok(c) => c,
        Err(e) => {
            log::error!("startup failed: {:#}", e);
            std::process::exit(1);
        }
    };
    if let Err(e) = run(&controller, command).await {
        log::error!("{:#}", e);
        std::process::exit(1);
    }
}

fn build_controller(
    config_path: Option<PathBuf>,
    backend: Option<String>,
) -> anyhow::Result<ViewController> {
    let (config, path) = askdoc::config::load_config(config_path)?;
    let token_path = askdoc::config::resolve_token_path(&config, &path);
    log::debug!("token file: {}", token_path.display());
    let store: Arc<dyn TokenStore> = Arc::new(FileTokenStore::new(token_path));
    let auth = AuthGate::load(store);
    let url = backend.unwrap_or_else(|| askdoc::config::resolve_backend_url(&config));
    let gateway = RemoteGateway::new(Some(url), auth.clone());
    Ok(ViewController::new(auth, Arc::new(gateway)))
}

async fn run(c: &ViewController, command: Commands) -> anyhow::Result<()> {
    match command {
        Commands::Version => {}
        Commands::Login { username, password } => {
            let password = password_or_prompt(password)?;
            c.dispatch(Intent::Login { username, password }).await;
            report(c)?;
            println!("logged in");
        }
        Commands::Signup { username, password } => {
            let password = password_or_prompt(password)?;
            c.dispatch(Intent::Signup { username, password }).await;
            report(c)?;
        }
        Commands::Logout => {
            c.dispatch(Intent::Logout).await;
            println!("logged out");
        }
        Commands::Ask { question, session } => {
            enter_chatbot(c).await?;
            if let Some(id) = session {
                use_session(c, id).await;
            }
            c.dispatch(Intent::SubmitQuestion(question)).await;
            report(c)?;
            if let Some(answer) = c.state().await.answer {
                println!("{}", answer);
            }
        }
        Commands::Sessions { show } => {
            enter_chatbot(c).await?;
            match show {
                Some(id) => {
                    if !c.sessions().contains(&id).await {
                        anyhow::bail!("session {} not found", id);
                    }
                    c.dispatch(Intent::SelectSession(id)).await;
                    print_turns(&c.state().await);
                }
                None => print_sessions(&c.state().await),
            }
        }
        Commands::Files { command } => {
            enter_chatbot(c).await?;
            c.dispatch(Intent::SwitchTab(Tab::Documents)).await;
            match command {
                FilesCommand::List => {}
                FilesCommand::Upload { paths } => {
                    let files = read_files(&paths).await?;
                    c.dispatch(Intent::UploadFiles(files)).await;
                    report(c)?;
                }
                FilesCommand::Delete { file_id } => {
                    c.dispatch(Intent::DeleteFile(file_id)).await;
                    report(c)?;
                }
            }
            print_files(&c.state().await);
        }
        Commands::Chat { session } => {
            enter_chatbot(c).await?;
            if let Some(id) = session {
                use_session(c, id).await;
            }
            run_chat(c).await?;
        }
    }
    Ok(())
}

/// Mount the chatbot view; fails when the gate redirects to login.
async fn enter_chatbot(c: &ViewController) -> anyhow::Result<()> {
    if c.mount(View::Chatbot).await != View::Chatbot {
        anyhow::bail!("not logged in; run `askdoc login` first");
    }
    Ok(())
}

/// Switch to `id`. An id with no history yet is started empty; the backend creates it on the first question.
async fn use_session(c: &ViewController, id: String) {
    if !c.sessions().contains(&id).await {
        eprintln!("session {} not found; starting it", id);
        c.sessions().get_or_create(id.as_str()).await;
    }
    c.dispatch(Intent::SelectSession(id)).await;
}

/// Print the pending notice. Error notices become the command's error.
fn report(c: &ViewController) -> anyhow::Result<()> {
    match c.take_notice() {
        Some(n) if n.level == NoticeLevel::Error => anyhow::bail!("{}", n.text),
        Some(n) => println!("{}", n.text),
        None => {}
    }
    Ok(())
}

fn password_or_prompt(password: Option<String>) -> anyhow::Result<String> {
    use std::io::Write;

    if let Some(p) = password {
        return Ok(p);
    }
    print!("password: ");
    std::io::stdout().flush()?;
    let mut line = String::new();
    std::io::stdin().read_line(&mut line)?;
    Ok(line.trim_end_matches(['\r', '\n']).to_string())
}

async fn read_files(paths: &[PathBuf]) -> anyhow::Result<Vec<UploadFile>> {
    let mut files = Vec::with_capacity(paths.len());
    for p in paths {
        let f = UploadFile::from_path(p)
            .await
            .map_err(|e| anyhow::anyhow!("reading {}: {}", p.display(), e))?;
        files.push(f);
    }
    Ok(files)
}

fn print_sessions(state: &ViewState) {
    if state.sessions.ids.is_empty() {
        println!("(no sessions; current: {})", state.sessions.current);
        return;
    }
    for id in &state.sessions.ids {
        let marker = if *id == state.sessions.current { "*" } else { " " };
        println!("{} {}", marker, id);
    }
}

fn print_turns(state: &ViewState) {
    println!("session {}", state.sessions.current);
    if state.sessions.turns.is_empty() {
        println!("(no messages yet)");
    }
    for t in &state.sessions.turns {
        println!("Q: {}", t.question);
        println!("A: {}", t.answer);
        println!();
    }
}

fn print_files(state: &ViewState) {
    if state.files.is_empty() {
        println!("(no documents)");
    }
    for f in &state.files {
        println!("{}", f);
    }
}

fn render_tab(state: &ViewState) {
    match state.tab {
        Tab::Chat => {
            print_sessions(state);
            print_turns(state);
        }
        Tab::Upload => println!("upload files with /upload <path>..."),
        Tab::Documents => print_files(state),
    }
}

const CHAT_HELP: &str = "\
commands:
  <text>              ask a question in the current session
  /new                create a session
  /sessions           list sessions
  /use <id>           switch session
  /history            show the current session
  /tab <chat|upload|documents>
  /files              list documents
  /upload <path>...   upload files
  /delete <name>      delete a document
  /logout             log out and quit
  /exit               quit";

async fn run_chat(c: &ViewController) -> anyhow::Result<()> {
    use std::io::{self, Write};

    let stdin = io::stdin();
    let mut stdout = io::stdout();
    println!("current session: {}  (/help for commands)", c.sessions().current_session_id().await);

    loop {
        write!(stdout, "> ")?;
        stdout.flush()?;
        let mut line = String::new();
        if stdin.read_line(&mut line)? == 0 {
            break;
        }
        let input = line.trim();
        if input.is_empty() {
            continue;
        }
        let (cmd, rest) = match input.split_once(char::is_whitespace) {
            Some((cmd, rest)) => (cmd, rest.trim()),
            None => (input, ""),
        };
        match cmd {
            "/exit" | "/quit" => break,
            "/help" => println!("{}", CHAT_HELP),
            "/new" => c.dispatch(Intent::CreateSession).await,
            "/sessions" => print_sessions(&c.state().await),
            "/use" if !rest.is_empty() => {
                use_session(c, rest.to_string()).await;
                print_turns(&c.state().await);
            }
            "/history" => print_turns(&c.state().await),
            "/tab" => {
                let tab = match rest {
                    "chat" => Tab::Chat,
                    "upload" => Tab::Upload,
                    "documents" => Tab::Documents,
                    _ => {
                        eprintln!("unknown tab: {}", rest);
                        continue;
                    }
                };
                c.dispatch(Intent::SwitchTab(tab)).await;
                render_tab(&c.state().await);
            }
            "/files" => print_files(&c.state().await),
            "/upload" if !rest.is_empty() => {
                let paths: Vec<PathBuf> = rest.split_whitespace().map(PathBuf::from).collect();
                match read_files(&paths).await {
                    Ok(files) => c.dispatch(Intent::UploadFiles(files)).await,
                    Err(e) => eprintln!("{}", e),
                }
            }
            "/delete" if !rest.is_empty() => {
                c.dispatch(Intent::DeleteFile(rest.to_string())).await;
            }
            "/logout" => {
                c.dispatch(Intent::Logout).await;
                println!("logged out");
                break;
            }
            _ if cmd.starts_with('/') => eprintln!("unknown command; /help for commands"),
            _ => {
                c.dispatch(Intent::SubmitQuestion(input.to_string())).await;
                let state = c.state().await;
                if state.notice.is_none() {
                    if let Some(answer) = &state.answer {
                        println!("< {}", answer.trim());
                    }
                }
            }
        }

        if let Some(n) = c.take_notice() {
            match n.level {
                NoticeLevel::Info => println!("{}", n.text),
                NoticeLevel::Error => eprintln!("{}", n.text),
            }
        }
        if c.state().await.view != View::Chatbot {
            eprintln!("not logged in; run `askdoc login` first");
            break;
        }
    }

    Ok(())
}
