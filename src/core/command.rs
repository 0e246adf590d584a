//! Command parser for the : command system

/// Parsed command from user input
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    // Wallet
    Connect,

    // Registry calls
    Register,
    Renew,
    Cancel,

    // Form fields
    Name(String),
    Blocks(String),
    Amount(String),

    // Tools
    Hash(Option<String>),
    Copy,
    Quit,

    // Unknown command
    Unknown(String),
}

/// Parse a command string (without the leading :)
pub fn parse_command(input: &str) -> Command {
    let input = input.trim();
    let mut parts = input.splitn(2, ' ');
    let cmd = parts.next().unwrap_or("");
    let args = parts.next().map(|s| s.trim().to_string());

    match cmd.to_lowercase().as_str() {
        "connect" | "conn" | "disconnect" | "toggle" => Command::Connect,

        "register" | "reg" => Command::Register,
        "renew" => Command::Renew,
        "cancel" => Command::Cancel,

        // Field setters keep the raw argument; validation happens at send time
        "name" => match args {
            Some(name) => Command::Name(name),
            None => Command::Unknown(input.to_string()),
        },
        "blocks" | "blockcount" | "block-count" => match args {
            Some(count) => Command::Blocks(count),
            None => Command::Unknown(input.to_string()),
        },
        "amount" | "value" | "wei" => match args {
            Some(amount) => Command::Amount(amount),
            None => Command::Unknown(input.to_string()),
        },

        "hash" | "keccak" | "keccak256" => Command::Hash(args),
        "copy" | "yank" => Command::Copy,
        "quit" | "q" | "exit" => Command::Quit,

        _ => Command::Unknown(input.to_string()),
    }
}
