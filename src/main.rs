mod app;
mod config;
mod core;
mod domain;
mod infrastructure;
mod logger;
mod store;
mod ui;
mod wallet;

use std::fs;
use std::io;
use std::path::PathBuf;
use std::time::{Duration, Instant};

use alloy::primitives::Address;
use anyhow::{Context, Result};
use clap::Parser;
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use crossterm::execute;
use crossterm::terminal::{
    disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen,
};
use ratatui::backend::CrosstermBackend;
use ratatui::Terminal;

use crate::app::{App, InputMode, Request, StatusLevel};
use crate::domain::Operation;
use crate::infrastructure::ethereum::{Connector, ProviderConfig};
use crate::infrastructure::runtime::{RuntimeBridge, RuntimeCommand, RuntimeEvent, WorkerSettings};
use crate::store::{KeyValueStore, MemoryStore, SqliteStore};

#[derive(Debug, Parser)]
#[command(
    name = "namereg",
    version,
    about = "namereg: connect a wallet and register, renew or cancel names on-chain"
)]
struct Args {
    /// Config file (TOML, or JSON when the extension is .json)
    #[arg(long)]
    config: Option<PathBuf>,

    /// HTTP JSON-RPC endpoint (e.g. http://localhost:8545)
    #[arg(long)]
    rpc: Option<String>,

    /// WebSocket endpoint (e.g. ws://localhost:8546)
    #[arg(long)]
    ws: Option<String>,

    /// IPC path (e.g. ~/.ethereum/geth.ipc). Unix only.
    #[arg(long)]
    ipc: Option<PathBuf>,

    /// Chain id the wallet must be on before connecting
    #[arg(long)]
    chain_id: Option<u64>,

    /// Registry contract address
    #[arg(long)]
    contract: Option<String>,

    /// Wallet connector: injected or local
    #[arg(long)]
    connector: Option<String>,
}

fn main() -> Result<()> {
    let args = Args::parse();
    let (config, config_error) = match args.config.as_deref() {
        Some(path) => (
            config::read(path).with_context(|| format!("load config {}", path.display()))?,
            None,
        ),
        None => config::load(),
    };
    if let Err(err) = logger::initialize(&config.log, config::log_path().as_deref()) {
        eprintln!("logging disabled: {err:#}");
    }
    let config_warning = config_error.map(|err| {
        tracing::warn!(error = %err, "using default config");
        format!("Config ignored, using defaults: {err}")
    });

    let settings = worker_settings(&args, &config)?;
    let (store, store_warning) = open_store();

    let mut app = App::new(
        settings.endpoint.display(),
        settings.target_chain_id,
        settings.contract,
        settings.connector,
    );
    app.set_status("Starting…", StatusLevel::Info);
    for warning in config_warning.into_iter().chain(store_warning) {
        app.set_status(warning.clone(), StatusLevel::Warn);
        app.log(StatusLevel::Warn, warning);
    }

    tracing::info!(
        endpoint = %settings.endpoint.display(),
        chain_id = settings.target_chain_id,
        contract = %settings.contract,
        connector = %settings.connector,
        "starting namereg"
    );

    let mut stdout = io::stdout();
    enable_raw_mode()?;
    execute!(stdout, EnterAlternateScreen)?;

    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let runtime = RuntimeBridge::new(settings, store);
    let res = run_app(&mut terminal, app, runtime);

    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    if let Err(err) = res {
        tracing::error!(error = %format!("{err:#}"), "ui loop failed");
        eprintln!("{err:?}");
    }

    Ok(())
}

fn run_app<B: ratatui::backend::Backend>(
    terminal: &mut Terminal<B>,
    mut app: App,
    runtime: RuntimeBridge,
) -> Result<()> {
    let tick_rate = Duration::from_millis(200);
    let mut last_tick = Instant::now();

    loop {
        pump_background(&mut app, &runtime);
        terminal.draw(|f| ui::draw(f, &app))?;
        if app.should_quit {
            let _ = runtime.send(RuntimeCommand::Shutdown);
            return Ok(());
        }

        let timeout = tick_rate
            .checked_sub(last_tick.elapsed())
            .unwrap_or_else(|| Duration::from_secs(0));

        if event::poll(timeout)? {
            if let Event::Key(key) = event::read()? {
                handle_key(&mut app, key);
            }
        }

        if last_tick.elapsed() >= tick_rate {
            app.on_tick();
            last_tick = Instant::now();
        }

        pump_background(&mut app, &runtime);
    }
}

fn pump_background(app: &mut App, runtime: &RuntimeBridge) {
    for event in runtime.poll_events() {
        match event {
            RuntimeEvent::Ready { endpoint } => app.apply_ready(endpoint),
            RuntimeEvent::Connection(snapshot) => app.apply_connection(
                snapshot.account,
                snapshot.user_disconnected,
                snapshot.phase,
                snapshot.reconnect_attempts,
            ),
            RuntimeEvent::ChainSwitchRequested { current, target } => {
                app.apply_chain_switch(current, target)
            }
            RuntimeEvent::TxConfirmed { operation, outcome } => {
                app.apply_tx_confirmed(operation, outcome)
            }
            RuntimeEvent::TxFailed { operation, message } => {
                app.apply_tx_failed(operation, message)
            }
            RuntimeEvent::TxRejected { operation, message } => {
                app.apply_tx_rejected(operation, message)
            }
            RuntimeEvent::Error { message } => app.apply_error(message),
        }
    }

    for request in app.take_requests() {
        let (cmd, operation) = match request {
            Request::Toggle => (RuntimeCommand::Toggle, None),
            Request::Submit { operation, inputs } => {
                (RuntimeCommand::Submit { operation, inputs }, Some(operation))
            }
        };
        if let Err(err) = runtime.send(cmd) {
            match operation {
                Some(operation) => app.apply_tx_failed(operation, format!("{err:#}")),
                None => app.apply_error(format!("{err:#}")),
            }
        }
    }

    if let Some(text) = app.take_copy_request() {
        copy_to_clipboard(app, text);
    }
}

fn handle_key(app: &mut App, key: KeyEvent) {
    if key.kind != KeyEventKind::Press {
        return;
    }
    if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
        app.should_quit = true;
        return;
    }

    match app.input_mode {
        InputMode::Editing(_) | InputMode::Command => match key.code {
            KeyCode::Esc => app.cancel_input(),
            KeyCode::Enter => app.commit_input(),
            KeyCode::Backspace => app.pop_char(),
            KeyCode::Char(c) => app.push_char(c),
            _ => {}
        },
        InputMode::Normal => match key.code {
            KeyCode::Char('q') => app.should_quit = true,
            KeyCode::Tab | KeyCode::Down | KeyCode::Char('j') => app.focus_next(),
            KeyCode::BackTab | KeyCode::Up | KeyCode::Char('k') => app.focus_prev(),
            KeyCode::Enter => app.activate(),
            KeyCode::Char('c') => app.request_toggle(),
            KeyCode::Char('r') => app.submit(Operation::Register),
            KeyCode::Char('n') => app.submit(Operation::Renew),
            KeyCode::Char('x') => app.submit(Operation::Cancel),
            KeyCode::Char('y') => app.copy_requested = true,
            KeyCode::Char(':') => app.open_command(),
            _ => {}
        },
    }
}

fn copy_to_clipboard(app: &mut App, text: String) {
    use arboard::Clipboard;

    match Clipboard::new() {
        Ok(mut clipboard) => {
            if clipboard.set_text(&text).is_ok() {
                app.set_status(format!("Copied: {text}"), StatusLevel::Info);
            } else {
                app.set_status("Failed to copy to clipboard", StatusLevel::Error);
            }
        }
        Err(_) => {
            app.set_status("Clipboard not available", StatusLevel::Error);
        }
    }
}

fn open_store() -> (Box<dyn KeyValueStore>, Option<String>) {
    let Some(db_path) = config::state_db_path() else {
        return (
            Box::new(MemoryStore::new()),
            Some("No data dir; connection flag will not persist".to_string()),
        );
    };
    if let Some(parent) = db_path.parent() {
        let _ = fs::create_dir_all(parent);
    }
    match SqliteStore::open(&db_path) {
        Ok(store) => (Box::new(store), None),
        Err(err) => {
            tracing::warn!(error = %format!("{err:#}"), "state db disabled");
            (
                Box::new(MemoryStore::new()),
                Some(format!("State DB disabled: {err}")),
            )
        }
    }
}

fn worker_settings(args: &Args, config: &config::Config) -> Result<WorkerSettings> {
    let endpoint = endpoint_from_args_and_config(args, config)?;

    let contract: Address = match args.contract.as_deref() {
        Some(raw) => raw
            .trim()
            .parse()
            .with_context(|| format!("invalid contract address {raw:?}"))?,
        None => config.contract.parsed_address()?,
    };

    let connector: Connector = args
        .connector
        .as_deref()
        .unwrap_or(&config.wallet.connector)
        .parse()?;

    Ok(WorkerSettings {
        endpoint,
        target_chain_id: args.chain_id.unwrap_or(config.mainnet.chain_id),
        contract,
        gas_limit: config.contract.gas_limit,
        connector,
        private_key_env: config.wallet.private_key_env.clone(),
    })
}

fn endpoint_from_args_and_config(args: &Args, config: &config::Config) -> Result<ProviderConfig> {
    fn non_empty(value: Option<&str>) -> Option<&str> {
        value.map(str::trim).filter(|s| !s.is_empty())
    }

    // CLI arguments take precedence
    if let Some(ipc) = args.ipc.clone() {
        return ipc_endpoint(ipc);
    }
    if let Some(ws) = non_empty(args.ws.as_deref()) {
        return Ok(ProviderConfig::WebSocket(ws.to_string()));
    }
    if let Some(rpc) = non_empty(args.rpc.as_deref()) {
        return Ok(ProviderConfig::Http(normalize_http_endpoint(rpc)));
    }

    let network = &config.mainnet;
    if let Some(ipc) = non_empty(network.ipc.as_deref()).and_then(expand_path) {
        return ipc_endpoint(ipc);
    }
    if let Some(ws) = non_empty(network.ws.as_deref()) {
        return Ok(ProviderConfig::WebSocket(ws.to_string()));
    }
    if let Some(rpc) = non_empty(network.rpc.as_deref()) {
        return Ok(ProviderConfig::Http(normalize_http_endpoint(rpc)));
    }

    Ok(ProviderConfig::Http(normalize_http_endpoint("localhost:8545")))
}

#[cfg(unix)]
fn ipc_endpoint(path: PathBuf) -> Result<ProviderConfig> {
    Ok(ProviderConfig::Ipc(path))
}

#[cfg(not(unix))]
fn ipc_endpoint(_path: PathBuf) -> Result<ProviderConfig> {
    Err(anyhow::anyhow!("IPC is not supported on this platform"))
}

fn normalize_http_endpoint(endpoint: &str) -> String {
    let trimmed = endpoint.trim();
    if trimmed.starts_with("http://") || trimmed.starts_with("https://") {
        trimmed.to_string()
    } else {
        format!("http://{}", trimmed)
    }
}

fn expand_path(path: &str) -> Option<PathBuf> {
    let trimmed = path.trim();
    if trimmed.is_empty() {
        return None;
    }

    if let Some(rest) = trimmed.strip_prefix("~/") {
        if let Some(home) = std::env::var_os("HOME").map(PathBuf::from) {
            return Some(home.join(rest));
        }
    }

    let mut buf = PathBuf::from(trimmed);
    if buf.is_relative() {
        if let Ok(cwd) = std::env::current_dir() {
            buf = cwd.join(buf);
        }
    }
    Some(buf)
}
