//! Console command parsing

use thiserror::Error;

/// One console command
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Challenge,
    Revoke(i64),
    Enroll,
    Auth(i64),
    Detect,
    Enumerate,
    Remove(Vec<i32>),
    AuthId,
    Invalidate,
    Reset,
    /// Ask the driver to abort the running operation
    Cancel,
    /// Fire the cancellation signal of the last enroll/auth/detect
    Abort,
    Down,
    Up,
    /// Simulate a finger; `None` is an unknown finger
    Touch(Option<u32>),
    Props,
    /// Open a new session for a user after the last one closed
    Open(Option<i32>),
    Close,
    Help,
    Quit,
}

#[derive(Debug, Error, PartialEq)]
pub enum CommandError {
    #[error("Unknown command: {0} (try 'help')")]
    Unknown(String),

    #[error("Invalid argument for {command}: {value}")]
    InvalidArgument { command: &'static str, value: String },

    #[error("Missing argument for {0}")]
    MissingArgument(&'static str),
}

pub const HELP: &str = "\
commands:
  challenge            generate a challenge
  revoke <challenge>   revoke a challenge
  enroll               start enrolling
  auth [op_id]         start authenticating
  detect               detect interaction
  enumerate            list enrollments
  remove <id>...       remove enrollments
  authid               get authenticator id
  invalidate           invalidate authenticator id
  reset                reset lockout
  cancel               cancel the running operation
  abort                fire the last cancellation signal
  down | up            pointer down / up
  touch [fid]          put a finger on the simulated sensor
  props                print sensor properties
  open [user]          open a new session
  close                close the session
  quit                 exit";

/// Parse one console line; `Ok(None)` for a blank line
pub fn parse(line: &str) -> Result<Option<Command>, CommandError> {
    let mut words = line.split_whitespace();
    let Some(name) = words.next() else {
        return Ok(None);
    };
    let args: Vec<&str> = words.collect();

    let command = match name {
        "challenge" => Command::Challenge,
        "revoke" => Command::Revoke(required(&args, "revoke")?),
        "enroll" => Command::Enroll,
        "auth" => Command::Auth(optional(&args, "auth")?.unwrap_or(0)),
        "detect" => Command::Detect,
        "enumerate" => Command::Enumerate,
        "remove" => {
            if args.is_empty() {
                return Err(CommandError::MissingArgument("remove"));
            }
            let ids = args
                .iter()
                .map(|a| parse_value(a, "remove"))
                .collect::<Result<Vec<i32>, _>>()?;
            Command::Remove(ids)
        }
        "authid" => Command::AuthId,
        "invalidate" => Command::Invalidate,
        "reset" => Command::Reset,
        "cancel" => Command::Cancel,
        "abort" => Command::Abort,
        "down" => Command::Down,
        "up" => Command::Up,
        "touch" => Command::Touch(optional(&args, "touch")?),
        "props" => Command::Props,
        "open" => Command::Open(optional(&args, "open")?),
        "close" => Command::Close,
        "help" | "?" => Command::Help,
        "quit" | "exit" => Command::Quit,
        other => return Err(CommandError::Unknown(other.to_string())),
    };
    Ok(Some(command))
}

fn parse_value<T: std::str::FromStr>(
    value: &str,
    command: &'static str,
) -> Result<T, CommandError> {
    value.parse().map_err(|_| CommandError::InvalidArgument {
        command,
        value: value.to_string(),
    })
}

fn required<T: std::str::FromStr>(
    args: &[&str],
    command: &'static str,
) -> Result<T, CommandError> {
    let value = args
        .first()
        .ok_or(CommandError::MissingArgument(command))?;
    parse_value(value, command)
}

fn optional<T: std::str::FromStr>(
    args: &[&str],
    command: &'static str,
) -> Result<Option<T>, CommandError> {
    args.first().map(|v| parse_value(v, command)).transpose()
}
