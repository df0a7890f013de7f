//!
//! Terminal front-end
//! ------------------
//! A line-oriented shell over the router: `login`, `open <view>`, `ask <question>` and so on.
//! Each command yields the text to print, so the shell is driven the same way from the
//! interactive prompt and from tests.

pub mod outputformatter;

use std::sync::Arc;

use anyhow::Result;
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;
use serde_json::Value;
use tracing::{debug, warn};

pub use outputformatter::{format_display, format_menu};

use crate::api::ApiClient;
use crate::error::ClientError;
use crate::identity::{RegistrationRequest, Role, SessionStore};
use crate::router::{auth_form_display, AuthForm, Phase, Rendered, ViewRouter};
use crate::views::{self, ViewParams};

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Login { username: String, password: String },
    Register(RegistrationRequest),
    Logout,
    Menu,
    Open { view: String, params: ViewParams },
    Refresh,
    Ask(String),
    WhoAmI,
    Status,
    Help,
    Quit,
}

impl Command {
    /// Parse one input line. A bare view key is shorthand for `open <key>`.
    pub fn parse(line: &str) -> Result<Command, String> {
        let parts: Vec<&str> = line.split_whitespace().collect();
        let Some(head) = parts.first() else { return Err("empty command".into()) };
        let args = &parts[1..];
        match head.to_ascii_lowercase().as_str() {
            "login" => match args {
                [u, p] => Ok(Command::Login { username: u.to_string(), password: p.to_string() }),
                _ => Err("usage: login <username> <password>".into()),
            },
            "register" => {
                if args.len() < 4 || args.len() > 6 {
                    return Err("usage: register <username> <email> <password> <student|parent> [first] [last]".into());
                }
                let role: Role = args[3].parse().map_err(|e: ClientError| e.message().to_string())?;
                Ok(Command::Register(RegistrationRequest {
                    username: args[0].to_string(),
                    email: args[1].to_string(),
                    password: args[2].to_string(),
                    role,
                    first_name: args.get(4).map(|s| s.to_string()),
                    last_name: args.get(5).map(|s| s.to_string()),
                }))
            }
            "logout" => Ok(Command::Logout),
            "menu" => Ok(Command::Menu),
            "open" => match args.split_first() {
                Some((view, rest)) => Ok(Command::Open { view: view.to_string(), params: parse_params(rest)? }),
                None => Err("usage: open <view> [key=value ...]".into()),
            },
            "refresh" => Ok(Command::Refresh),
            "ask" => {
                let msg = line.trim_start()[head.len()..].trim();
                if msg.is_empty() { Err("usage: ask <question>".into()) } else { Ok(Command::Ask(msg.to_string())) }
            }
            "whoami" => Ok(Command::WhoAmI),
            "status" => Ok(Command::Status),
            "help" => Ok(Command::Help),
            "quit" | "exit" => Ok(Command::Quit),
            key if views::lookup(key).is_some() => Ok(Command::Open { view: key.to_string(), params: parse_params(args)? }),
            other => Err(format!("unknown command '{}'; type 'help'", other)),
        }
    }
}

/// `student=4 page=2`; integer values are passed as numbers.
fn parse_params(args: &[&str]) -> Result<ViewParams, String> {
    let mut params = ViewParams::new();
    for a in args {
        let Some((k, v)) = a.split_once('=') else { return Err(format!("expected key=value, got '{}'", a)) };
        if k.is_empty() { return Err(format!("expected key=value, got '{}'", a)); }
        let value = v.parse::<i64>().map(Value::from).unwrap_or_else(|_| Value::String(v.to_string()));
        params.insert(k.to_string(), value);
    }
    Ok(params)
}

pub enum Reply {
    Print(String),
    Quit,
}

pub const HELP: &str = "Commands:
  login <username> <password>                     sign in
  register <username> <email> <password> <role>   create a student or parent account
  logout                                          sign out and clear the saved session
  menu                                            list the views available to you
  open <view> [key=value ...]                     show a view, e.g. open grades student=4
  <view> [key=value ...]                          same as open
  refresh                                         reload the current view
  ask <question>                                  ask the AI academic advisor
  whoami | status | help | quit";

pub struct Shell {
    client: ApiClient,
    router: ViewRouter,
}

impl Shell {
    pub fn new(client: ApiClient) -> Self {
        let router = ViewRouter::new(client.session().clone());
        Self { client, router }
    }

    pub fn router(&self) -> &ViewRouter { &self.router }
    pub fn session(&self) -> &Arc<SessionStore> { self.client.session() }

    /// Initial screen: the login form, or the dashboard of a restored session.
    pub async fn start(&self) -> String {
        self.show_current().await
    }

    pub async fn execute(&self, line: &str) -> Reply {
        match Command::parse(line) {
            Ok(cmd) => self.run(cmd).await,
            Err(msg) => Reply::Print(msg),
        }
    }

    pub async fn run(&self, cmd: Command) -> Reply {
        debug!(target: "sims::cli", "command {:?}", redact(&cmd));
        let out = match cmd {
            Command::Quit => return Reply::Quit,
            Command::Help => HELP.to_string(),
            Command::Login { username, password } => self.login(&username, &password).await,
            Command::Register(req) => self.register(req).await,
            Command::Logout => {
                self.router.sign_out();
                format!("Signed out.\n\n{}", format_display(&auth_form_display(AuthForm::Login)))
            }
            Command::WhoAmI => match self.session().user() {
                Some(u) => format!("{} ({}) - {}", u.display_name, u.username, u.role.label()),
                None => "not signed in".to_string(),
            },
            Command::Status => self.status(),
            Command::Menu => match self.session().user() {
                Some(_) => self
                    .router
                    .menu()
                    .iter()
                    .map(|e| format!("  {:<14} {}", e.key, e.label))
                    .collect::<Vec<_>>()
                    .join("\n"),
                None => "Sign in to see the menu.".to_string(),
            },
            Command::Open { view, params } => {
                if self.router.phase() != Phase::Authenticated { return Reply::Print("Please log in first.".into()); }
                let res = self.router.navigate(&self.client, &view, params).await;
                self.present(res)
            }
            Command::Refresh => self.show_current().await,
            Command::Ask(msg) => self.ask(&msg).await,
        };
        Reply::Print(out)
    }

    async fn login(&self, username: &str, password: &str) -> String {
        match self.session().login(&self.client, username, password).await {
            Ok(user) => {
                self.router.enter_authenticated();
                format!("Signed in as {} ({}).\n\n{}", user.display_name, user.role.label(), self.show_current().await)
            }
            Err(e) => format!("Login failed: {}", e.message()),
        }
    }

    async fn register(&self, req: RegistrationRequest) -> String {
        self.router.show_form(AuthForm::Register);
        match self.session().register(&self.client, &req).await {
            Ok(_) => {
                self.router.show_form(AuthForm::Login);
                format!("Account '{}' created. Please log in.", req.username)
            }
            Err(e) => format!("Registration failed: {}", e.message()),
        }
    }

    async fn ask(&self, msg: &str) -> String {
        if self.router.phase() != Phase::Authenticated { return "Please log in first.".into(); }
        let exchange = async {
            let id = self.client.ensure_conversation().await?;
            let reply = self.client.send_message(id, msg).await?;
            Ok::<_, ClientError>((id, reply))
        };
        match exchange.await {
            Ok((id, reply)) => {
                let mut params = ViewParams::new();
                params.insert("conversation".into(), Value::from(id));
                match self.router.navigate(&self.client, "ai-advisor", params).await {
                    Ok(Rendered::Discarded) => format!("advisor> {}", reply.ai_response),
                    other => self.present(other),
                }
            }
            Err(ClientError::AuthExpired) => self.present(Err(ClientError::AuthExpired)),
            Err(e) => format!("[error] {}", e.message()),
        }
    }

    async fn show_current(&self) -> String {
        let res = self.router.render_current(&self.client).await;
        self.present(res)
    }

    fn present(&self, res: Result<Rendered, ClientError>) -> String {
        match res {
            Ok(Rendered::Applied(d)) => match self.router.phase() {
                Phase::Authenticated => {
                    format!("{}\n\n{}", format_menu(&self.router.menu(), &d.view), format_display(&d))
                }
                Phase::Unauthenticated(_) => format_display(&d),
            },
            Ok(Rendered::Discarded) => String::new(),
            Err(ClientError::AuthExpired) => {
                if self.router.phase() == Phase::Authenticated {
                    self.router.sign_out();
                }
                format!(
                    "Your session has expired. Please log in again.\n\n{}",
                    format_display(&auth_form_display(AuthForm::Login))
                )
            }
            Err(e) => format!("[error] {}", e),
        }
    }

    fn status(&self) -> String {
        let user = self.session().user().map(|u| u.username).unwrap_or_else(|| "(none)".into());
        let view = self.router.current_view();
        format!(
            "server: {}\nsigned in: {}\nuser: {}\nview: {}",
            self.client.base(),
            self.session().is_authenticated(),
            user,
            view.active
        )
    }
}

fn redact(cmd: &Command) -> String {
    match cmd {
        Command::Login { username, .. } => format!("Login {{ username: {:?} }}", username),
        Command::Register(r) => format!("Register {{ username: {:?}, role: {} }}", r.username, r.role),
        other => format!("{:?}", other),
    }
}

/// Lines carrying a password never reach the history, whatever their case.
fn keeps_history(line: &str) -> bool {
    let head = line.split_whitespace().next().unwrap_or_default().to_ascii_lowercase();
    head != "login" && head != "register"
}

/// Interactive loop over a blocking runtime.
pub fn run_repl(rt: &tokio::runtime::Runtime, shell: &Shell) -> Result<()> {
    let mut rl = DefaultEditor::new()?;
    println!("{}", rt.block_on(shell.start()));
    println!("\nType 'help' for commands.");
    loop {
        let line = match rl.readline("sims> ") {
            Ok(l) => l,
            Err(ReadlineError::Interrupted) | Err(ReadlineError::Eof) => break,
            Err(e) => {
                warn!(target: "sims::cli", "readline error: {}", e);
                break;
            }
        };
        let line = line.trim();
        if line.is_empty() { continue; }
        if keeps_history(line) {
            let _ = rl.add_history_entry(line);
        }
        match rt.block_on(shell.execute(line)) {
            Reply::Quit => break,
            Reply::Print(s) if s.is_empty() => {}
            Reply::Print(s) => println!("{}\n", s),
        }
    }
    Ok(())
}
