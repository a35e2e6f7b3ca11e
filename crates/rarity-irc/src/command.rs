//! Chat command grammar: `<nickname>: torrent <verb> <argument>`.

/// Command addressed to the bot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum ChatCommand {
    /// Submit a `.torrent` URL.
    Add { url: String },
    /// List torrents whose names match a pattern.
    Find { pattern: String },
    /// Resume every torrent matching a pattern.
    Start { pattern: String },
    /// Pause every torrent matching a pattern.
    Stop { pattern: String },
}

impl ChatCommand {
    /// Recognise a command addressed to `nickname`.
    ///
    /// The address and verb are matched exactly; the argument is the rest of the line and may
    /// be empty, in which case `find` matches every torrent.
    pub(crate) fn parse(nickname: &str, text: &str) -> Option<Self> {
        let rest = text
            .strip_prefix(nickname)?
            .strip_prefix(": torrent ")?;
        let (verb, argument) = rest.split_once(' ')?;
        let argument = argument.to_string();
        match verb {
            "add" => Some(Self::Add { url: argument }),
            "find" => Some(Self::Find { pattern: argument }),
            "start" => Some(Self::Start { pattern: argument }),
            "stop" => Some(Self::Stop { pattern: argument }),
            _ => None,
        }
    }

    /// Short label for logs.
    pub(crate) const fn verb(&self) -> &'static str {
        match self {
            Self::Add { .. } => "add",
            Self::Find { .. } => "find",
            Self::Start { .. } => "start",
            Self::Stop { .. } => "stop",
        }
    }
}
