//!
//! sims-portal
//! -----------
//! Terminal client for the school information backend. Signs in, keeps the session on disk,
//! and shows the views the signed-in role is offered.

use std::env;
use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

use sims_portal::api::ApiClient;
use sims_portal::cli::{run_repl, Command, Reply, Shell};
use sims_portal::config::{parse_timeout, PortalConfig};
use sims_portal::identity::{FileStorage, SessionStore};

fn print_usage(program: &str) {
    eprintln!(
        "Usage:\n  {program} [--api <url>] [--session-file <path>] [--timeout-ms <ms>] [--user <u> --password <p>] [--view <key>]\n\nFlags:\n  --api <url>              Backend base URL (env SIMS_API_BASE, default http://localhost:8000/api)\n  --session-file <path>    Where the session is kept (env SIMS_SESSION_FILE, default ~/.sims/session.json)\n  --timeout-ms <ms>        HTTP request timeout (env SIMS_HTTP_TIMEOUT_MS, default 30000)\n  --user <u>               Sign in on startup (requires --password)\n  --password <p>           Password for --user\n  --view <key>             Print one view and exit instead of starting the shell\n  -h, --help               Show this help\n\nLogging is controlled with RUST_LOG (default: warn)."
    );
}

fn take_value(args: &[String], i: usize, flag: &str, program: &str) -> String {
    match args.get(i + 1) {
        Some(v) => v.clone(),
        None => {
            eprintln!("{} requires a value", flag);
            print_usage(program);
            std::process::exit(2);
        }
    }
}

fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = fmt().with_env_filter(filter).with_writer(std::io::stderr).try_init();

    let mut args: Vec<String> = env::args().collect();
    let program = args.remove(0);

    let mut config = PortalConfig::from_env()?;
    let mut user: Option<String> = None;
    let mut password: Option<String> = None;
    let mut one_shot: Option<String> = None;

    let mut i = 0;
    while i < args.len() {
        match args[i].as_str() {
            "--api" => { config = config.with_api_base(&take_value(&args, i, "--api", &program))?; i += 2; }
            "--session-file" => { config = config.with_session_file(take_value(&args, i, "--session-file", &program)); i += 2; }
            "--timeout-ms" => {
                let ms = parse_timeout(&take_value(&args, i, "--timeout-ms", &program))?;
                config = config.with_timeout_ms(ms);
                i += 2;
            }
            "--user" => { user = Some(take_value(&args, i, "--user", &program)); i += 2; }
            "--password" => { password = Some(take_value(&args, i, "--password", &program)); i += 2; }
            "--view" => { one_shot = Some(take_value(&args, i, "--view", &program)); i += 2; }
            "-h" | "--help" => {
                print_usage(&program);
                return Ok(());
            }
            unk => {
                eprintln!("Unrecognized argument: {}", unk);
                print_usage(&program);
                std::process::exit(2);
            }
        }
    }

    info!(
        target: "sims::cli",
        "starting: api_base={}, session_file='{}', timeout_ms={}",
        config.api_base,
        config.session_file.display(),
        config.request_timeout.as_millis()
    );

    let storage = Arc::new(FileStorage::new(config.session_file.clone()));
    let session = Arc::new(SessionStore::restore(storage));
    let client = ApiClient::new(&config, session)?;
    let shell = Shell::new(client);

    let rt = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("Failed to build Tokio runtime")?;

    match (user, password) {
        (Some(u), Some(p)) => {
            if let Reply::Print(s) = rt.block_on(shell.run(Command::Login { username: u, password: p })) {
                println!("{}\n", s);
            }
        }
        (None, None) => {}
        _ => {
            eprintln!("--user and --password must be given together");
            std::process::exit(2);
        }
    }

    if let Some(view) = one_shot {
        if let Reply::Print(s) = rt.block_on(shell.run(Command::Open { view, params: Default::default() })) {
            println!("{}", s);
        }
        return Ok(());
    }

    run_repl(&rt, &shell)
}
