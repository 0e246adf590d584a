use std::collections::{BTreeSet, VecDeque};
use std::time::{Duration, Instant};

use alloy::primitives::Address;

use crate::core::{parse_command, Command};
use crate::domain::{name_hash, FormInputs, Operation};
use crate::infrastructure::ethereum::{Connector, TxOutcome};
use crate::wallet::Phase;

const MAX_ACTIVITY: usize = 200;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    Name,
    BlockCount,
    Amount,
}

impl Field {
    pub const ALL: [Field; 3] = [Field::Name, Field::BlockCount, Field::Amount];

    pub fn title(&self) -> &'static str {
        match self {
            Field::Name => "Name",
            Field::BlockCount => "Block Count",
            Field::Amount => "Amount (wei)",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Focus {
    Connect,
    Field(Field),
    Action(Operation),
}

impl Focus {
    pub const ORDER: [Focus; 7] = [
        Focus::Connect,
        Focus::Field(Field::Name),
        Focus::Field(Field::BlockCount),
        Focus::Field(Field::Amount),
        Focus::Action(Operation::Register),
        Focus::Action(Operation::Renew),
        Focus::Action(Operation::Cancel),
    ];

    fn index(&self) -> usize {
        Self::ORDER
            .iter()
            .position(|focus| focus == self)
            .unwrap_or(0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputMode {
    Normal,
    Editing(Field),
    Command,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusLevel {
    Info,
    Warn,
    Error,
}

#[derive(Debug, Clone)]
pub struct StatusMessage {
    pub text: String,
    pub level: StatusLevel,
    pub since: Instant,
}

#[derive(Debug, Clone)]
pub struct ActivityEntry {
    pub at: String,
    pub level: StatusLevel,
    pub text: String,
}

/// Work the UI wants the worker to do
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Request {
    Toggle,
    Submit {
        operation: Operation,
        inputs: FormInputs,
    },
}

pub struct App {
    pub form: FormInputs,
    pub focus: Focus,
    pub input_mode: InputMode,
    pub input: String,

    pub account: Option<Address>,
    pub user_disconnected: bool,
    pub phase: Phase,
    pub reconnect_attempts: u64,

    pub endpoint: String,
    pub endpoint_ready: bool,
    pub target_chain_id: u64,
    pub contract: Address,
    pub connector: Connector,

    pub pending: BTreeSet<Operation>,
    pub activity: VecDeque<ActivityEntry>,
    pub status: Option<StatusMessage>,
    pub should_quit: bool,
    pub copy_requested: bool,

    requests: VecDeque<Request>,
}

impl App {
    pub fn new(endpoint: String, target_chain_id: u64, contract: Address, connector: Connector) -> Self {
        Self {
            form: FormInputs::default(),
            focus: Focus::Connect,
            input_mode: InputMode::Normal,
            input: String::new(),
            account: None,
            user_disconnected: true,
            phase: Phase::Disconnected,
            reconnect_attempts: 0,
            endpoint,
            endpoint_ready: false,
            target_chain_id,
            contract,
            connector,
            pending: BTreeSet::new(),
            activity: VecDeque::new(),
            status: None,
            should_quit: false,
            copy_requested: false,
            requests: VecDeque::new(),
        }
    }

    pub fn connect_label(&self) -> &'static str {
        if self.account.is_some() {
            "Disconnect"
        } else {
            "Connect"
        }
    }

    pub fn field_value(&self, field: Field) -> &str {
        match field {
            Field::Name => &self.form.name,
            Field::BlockCount => &self.form.block_count,
            Field::Amount => &self.form.amount_wei,
        }
    }

    pub fn set_field(&mut self, field: Field, value: impl Into<String>) {
        let value = value.into();
        match field {
            Field::Name => self.form.name = value,
            Field::BlockCount => self.form.block_count = value,
            Field::Amount => self.form.amount_wei = value,
        }
    }

    // === Focus ===

    pub fn focus_next(&mut self) {
        let next = (self.focus.index() + 1) % Focus::ORDER.len();
        self.focus = Focus::ORDER[next];
    }

    pub fn focus_prev(&mut self) {
        let len = Focus::ORDER.len();
        let prev = (self.focus.index() + len - 1) % len;
        self.focus = Focus::ORDER[prev];
    }

    /// Enter on the focused element
    pub fn activate(&mut self) {
        match self.focus {
            Focus::Connect => self.request_toggle(),
            Focus::Field(field) => self.begin_edit(field),
            Focus::Action(operation) => self.submit(operation),
        }
    }

    // === Editing ===

    pub fn begin_edit(&mut self, field: Field) {
        self.focus = Focus::Field(field);
        self.input = self.field_value(field).to_string();
        self.input_mode = InputMode::Editing(field);
    }

    pub fn open_command(&mut self) {
        self.input.clear();
        self.input_mode = InputMode::Command;
    }

    pub fn push_char(&mut self, c: char) {
        if self.input_mode != InputMode::Normal {
            self.input.push(c);
        }
    }

    pub fn pop_char(&mut self) {
        self.input.pop();
    }

    pub fn cancel_input(&mut self) {
        self.input.clear();
        self.input_mode = InputMode::Normal;
    }

    pub fn commit_input(&mut self) {
        let input = std::mem::take(&mut self.input);
        let mode = self.input_mode;
        self.input_mode = InputMode::Normal;
        match mode {
            InputMode::Editing(field) => self.set_field(field, input),
            InputMode::Command => self.run_command(&input),
            InputMode::Normal => {}
        }
    }

    pub fn run_command(&mut self, input: &str) {
        match parse_command(input) {
            Command::Connect => self.request_toggle(),
            Command::Register => self.submit(Operation::Register),
            Command::Renew => self.submit(Operation::Renew),
            Command::Cancel => self.submit(Operation::Cancel),
            Command::Name(value) => self.set_field(Field::Name, value),
            Command::Blocks(value) => self.set_field(Field::BlockCount, value),
            Command::Amount(value) => self.set_field(Field::Amount, value),
            Command::Hash(value) => {
                let name = value.unwrap_or_else(|| self.form.name.clone());
                let hash = name_hash(&name);
                self.set_status(format!("keccak256({name}) = {hash}"), StatusLevel::Info);
            }
            Command::Copy => self.copy_requested = true,
            Command::Quit => self.should_quit = true,
            Command::Unknown(raw) => {
                self.set_status(format!("Unknown command: {raw}"), StatusLevel::Warn)
            }
        }
    }

    // === Requests ===

    pub fn request_toggle(&mut self) {
        self.requests.push_back(Request::Toggle);
        let text = if self.account.is_some() {
            "Disconnecting…"
        } else {
            "Connecting…"
        };
        self.set_status(text, StatusLevel::Info);
    }

    /// Queue a call with the form as it is now. Pending calls are not
    /// blocked here; the worker decides whether a duplicate is refused.
    pub fn submit(&mut self, operation: Operation) {
        self.requests.push_back(Request::Submit {
            operation,
            inputs: self.form.clone(),
        });
        self.pending.insert(operation);
        self.set_status(format!("Sending {operation}…"), StatusLevel::Info);
    }

    pub fn take_requests(&mut self) -> Vec<Request> {
        self.requests.drain(..).collect()
    }

    pub fn take_copy_request(&mut self) -> Option<String> {
        if !std::mem::take(&mut self.copy_requested) {
            return None;
        }
        match self.account {
            Some(account) => Some(account.to_string()),
            None => {
                self.set_status("Nothing to copy", StatusLevel::Warn);
                None
            }
        }
    }

    // === Worker events ===

    pub fn apply_ready(&mut self, endpoint: String) {
        self.endpoint = endpoint;
        self.endpoint_ready = true;
        self.log(StatusLevel::Info, format!("Provider ready: {}", self.endpoint));
    }

    pub fn apply_connection(
        &mut self,
        account: Option<Address>,
        user_disconnected: bool,
        phase: Phase,
        reconnect_attempts: u64,
    ) {
        if account != self.account {
            match account {
                Some(account) => self.log(StatusLevel::Info, format!("Connected {account}")),
                None => self.log(StatusLevel::Info, "Disconnected"),
            }
        }
        self.account = account;
        self.user_disconnected = user_disconnected;
        self.phase = phase;
        self.reconnect_attempts = reconnect_attempts;
    }

    pub fn apply_chain_switch(&mut self, current: u64, target: u64) {
        let text = format!("Wallet on chain {current}; requested switch to {target}. Connect again once switched.");
        self.set_status(text.clone(), StatusLevel::Warn);
        self.log(StatusLevel::Warn, text);
    }

    pub fn apply_tx_confirmed(&mut self, operation: Operation, outcome: TxOutcome) {
        self.pending.remove(&operation);
        let block = outcome
            .block_number
            .map(|n| n.to_string())
            .unwrap_or_else(|| "--".to_string());
        let (level, verdict) = if outcome.success {
            (StatusLevel::Info, "ok")
        } else {
            (StatusLevel::Error, "reverted")
        };
        self.log(
            level,
            format!(
                "{operation} {verdict} tx={} block={block} gas={}",
                outcome.hash, outcome.gas_used
            ),
        );
    }

    pub fn apply_tx_failed(&mut self, operation: Operation, message: String) {
        self.pending.remove(&operation);
        self.log(StatusLevel::Error, message);
    }

    /// The earlier submission of `operation` is still pending, so it stays marked.
    pub fn apply_tx_rejected(&mut self, _operation: Operation, message: String) {
        self.set_status(message.clone(), StatusLevel::Warn);
        self.log(StatusLevel::Warn, message);
    }

    pub fn apply_error(&mut self, message: String) {
        self.set_status(message.clone(), StatusLevel::Error);
        self.log(StatusLevel::Error, message);
    }

    // === Status ===

    pub fn log(&mut self, level: StatusLevel, text: impl Into<String>) {
        self.activity.push_back(ActivityEntry {
            at: chrono::Local::now().format("%H:%M:%S").to_string(),
            level,
            text: text.into(),
        });
        while self.activity.len() > MAX_ACTIVITY {
            self.activity.pop_front();
        }
    }

    pub fn set_status(&mut self, text: impl Into<String>, level: StatusLevel) {
        self.status = Some(StatusMessage {
            text: text.into(),
            level,
            since: Instant::now(),
        });
    }

    pub fn status_text(&self) -> Option<(&str, StatusLevel)> {
        self.status
            .as_ref()
            .map(|status| (status.text.as_str(), status.level))
    }

    pub fn on_tick(&mut self) {
        if let Some(status) = self.status.as_ref() {
            if status.since.elapsed() > Duration::from_secs(3) {
                self.status = None;
            }
        }
    }
}
