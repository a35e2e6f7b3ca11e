//! Minimal IRC line codec.
//!
//! # Design
//! - Only the subset the bridge needs: prefix, command, middle params, trailing param.
//! - Outgoing text is flattened to a single line so reply payloads cannot inject commands.

use std::str::FromStr;

use thiserror::Error;

/// Numeric reply sent once registration completes.
pub(crate) const RPL_WELCOME: &str = "001";
/// Numeric reply sent when the requested nickname is taken.
pub(crate) const ERR_NICKNAMEINUSE: &str = "433";

/// Errors raised while decoding IRC input.
#[derive(Debug, Error, PartialEq, Eq)]
pub(crate) enum ProtocolError {
    /// The line carried no command.
    #[error("irc line is missing a command")]
    MissingCommand {
        /// Raw line as received.
        line: String,
    },
    /// A prefix was not of the form `nick!user@host`.
    #[error("malformed hostmask")]
    MalformedHostmask {
        /// Prefix as received.
        value: String,
    },
}

impl ProtocolError {
    /// Human-readable context for logs.
    pub(crate) fn detail(&self) -> String {
        match self {
            Self::MissingCommand { line } => format!("no command in line {line:?}"),
            Self::MalformedHostmask { value } => format!("prefix {value:?} is not nick!user@host"),
        }
    }
}

/// One decoded IRC message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Message {
    pub(crate) prefix: Option<String>,
    pub(crate) command: String,
    pub(crate) params: Vec<String>,
}

impl Message {
    /// Decode a single line, tolerating a trailing CR.
    pub(crate) fn parse(line: &str) -> Result<Self, ProtocolError> {
        let missing = || ProtocolError::MissingCommand {
            line: line.to_string(),
        };
        let mut rest = line.trim_end_matches(['\r', '\n']);

        let prefix = match rest.strip_prefix(':') {
            Some(tail) => {
                let (prefix, tail) = tail.split_once(' ').ok_or_else(missing)?;
                rest = tail;
                Some(prefix.to_string())
            }
            None => None,
        };

        let rest = rest.trim_start_matches(' ');
        let (head, trailing) = match rest.split_once(" :") {
            Some((head, trailing)) => (head, Some(trailing)),
            None => (rest, None),
        };
        let mut words = head.split(' ').filter(|word| !word.is_empty());
        let command = words.next().ok_or_else(missing)?.to_ascii_uppercase();
        let mut params: Vec<String> = words.map(str::to_string).collect();
        if let Some(trailing) = trailing {
            params.push(trailing.to_string());
        }

        Ok(Self {
            prefix,
            command,
            params,
        })
    }

    /// Parameter at `index`, if present.
    pub(crate) fn param(&self, index: usize) -> Option<&str> {
        self.params.get(index).map(String::as_str)
    }
}

/// Sender identity carried in a message prefix.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Hostmask {
    pub(crate) nick: String,
    pub(crate) user: String,
    pub(crate) host: String,
}

impl FromStr for Hostmask {
    type Err = ProtocolError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let malformed = || ProtocolError::MalformedHostmask {
            value: value.to_string(),
        };
        let (nick, rest) = value.split_once('!').ok_or_else(malformed)?;
        let (user, host) = rest.split_once('@').ok_or_else(malformed)?;
        if nick.is_empty() {
            return Err(malformed());
        }
        Ok(Self {
            nick: nick.to_string(),
            user: user.to_string(),
            host: host.to_string(),
        })
    }
}

pub(crate) fn nick(nickname: &str) -> String {
    format!("NICK {}\r\n", single_line(nickname))
}

pub(crate) fn user(nickname: &str) -> String {
    let nickname = single_line(nickname);
    format!("USER {nickname} 0 * :{nickname}\r\n")
}

pub(crate) fn join(channel: &str) -> String {
    format!("JOIN {}\r\n", single_line(channel))
}

pub(crate) fn pong(token: &str) -> String {
    format!("PONG :{}\r\n", single_line(token))
}

pub(crate) fn privmsg(target: &str, text: &str) -> String {
    format!("PRIVMSG {} :{}\r\n", single_line(target), single_line(text))
}

fn single_line(text: &str) -> String {
    text.replace(['\r', '\n'], " ")
}
