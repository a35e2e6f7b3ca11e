//! Command execution and chat replies.
//!
//! # Design
//! - A PRIVMSG becomes a [`Request`] only when its sender hostmask parses and its text is a
//!   command addressed to the bot; everything else is ignored.
//! - Replies go back to the channel the command arrived on, or to the sender for direct messages.
//! - `start`/`stop` act on every match and reply once per torrent; a failure on one torrent
//!   does not stop the others.

use std::sync::Arc;

use rarity_api_models::InfoHash;
use tracing::{debug, info, warn};

use crate::client::{RemoteError, TorrentRemote};
use crate::command::ChatCommand;
use crate::protocol::{Hostmask, Message};

/// A command ready to execute, with its reply routing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Request {
    pub(crate) sender: String,
    pub(crate) reply_to: String,
    pub(crate) command: ChatCommand,
}

/// Chat front-end over a [`TorrentRemote`].
#[derive(Clone)]
pub(crate) struct Bot {
    nickname: String,
    remote: Arc<dyn TorrentRemote>,
}

impl Bot {
    pub(crate) fn new(nickname: impl Into<String>, remote: Arc<dyn TorrentRemote>) -> Self {
        Self {
            nickname: nickname.into(),
            remote,
        }
    }

    pub(crate) fn nickname(&self) -> &str {
        &self.nickname
    }

    /// Extract a command from a decoded PRIVMSG.
    pub(crate) fn request(&self, message: &Message) -> Option<Request> {
        let prefix = message.prefix.as_deref()?;
        let hostmask = match prefix.parse::<Hostmask>() {
            Ok(hostmask) => hostmask,
            Err(err) => {
                debug!(error = %err, detail = %err.detail(), "ignoring message from unparsable sender");
                return None;
            }
        };
        let target = message.param(0)?;
        let command = ChatCommand::parse(&self.nickname, message.param(1)?)?;
        info!(
            nick = %hostmask.nick,
            user = %hostmask.user,
            host = %hostmask.host,
            channel = target,
            command = command.verb(),
            "chat command received"
        );
        let reply_to = if target.eq_ignore_ascii_case(&self.nickname) {
            hostmask.nick.clone()
        } else {
            target.to_string()
        };
        Some(Request {
            sender: hostmask.nick,
            reply_to,
            command,
        })
    }

    /// Execute `request` and return the reply lines in order.
    pub(crate) async fn respond(&self, request: &Request) -> Vec<String> {
        let nick = request.sender.as_str();
        match &request.command {
            ChatCommand::Add { url } => vec![self.add(nick, url).await],
            ChatCommand::Find { pattern } => self.find(nick, pattern).await,
            ChatCommand::Start { pattern } => self.transition(nick, pattern, Transition::Start).await,
            ChatCommand::Stop { pattern } => self.transition(nick, pattern, Transition::Stop).await,
        }
    }

    async fn add(&self, nick: &str, url: &str) -> String {
        match self.add_named(url).await {
            Ok(name) => format!("{nick}: Added: {name}"),
            Err(err) => failed(nick, &err),
        }
    }

    async fn add_named(&self, url: &str) -> Result<String, RemoteError> {
        let info_hash = self.remote.add_torrent(url).await?;
        self.remote.get_torrent_name(&info_hash).await
    }

    async fn find(&self, nick: &str, pattern: &str) -> Vec<String> {
        match self.remote.find_torrent(pattern).await {
            Ok(found) => std::iter::once(format!("{nick}:"))
                .chain(found.values().map(|record| format!("  {}", record.name)))
                .collect(),
            Err(err) => vec![failed(nick, &err)],
        }
    }

    async fn transition(&self, nick: &str, pattern: &str, transition: Transition) -> Vec<String> {
        let found = match self.remote.find_torrent(pattern).await {
            Ok(found) => found,
            Err(err) => return vec![failed(nick, &err)],
        };
        let mut replies = Vec::with_capacity(found.len());
        for info_hash in found.keys() {
            let reply = match self.apply(info_hash, transition).await {
                Ok(name) => format!("{nick}: {}: {name}", transition.past_tense()),
                Err(err) => failed(nick, &err),
            };
            replies.push(reply);
        }
        replies
    }

    async fn apply(&self, info_hash: &InfoHash, transition: Transition) -> Result<String, RemoteError> {
        let confirmed = match transition {
            Transition::Start => self.remote.resume_torrent(info_hash).await?,
            Transition::Stop => self.remote.pause_torrent(info_hash).await?,
        };
        let metainfo = self.remote.get_torrent_metainfo(&confirmed).await?;
        Ok(metainfo.name)
    }
}

#[derive(Debug, Clone, Copy)]
enum Transition {
    Start,
    Stop,
}

impl Transition {
    const fn past_tense(self) -> &'static str {
        match self {
            Self::Start => "started",
            Self::Stop => "stopped",
        }
    }
}

fn failed(nick: &str, err: &RemoteError) -> String {
    warn!(
        procedure = err.procedure(),
        request_id = ?err.request_id(),
        error = %err,
        "chat command failed"
    );
    format!("{nick}: Failed: {}", err.reply_text())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::FakeRemote;
    use anyhow::{Result, anyhow};

    const NICK: &str = "Rarity|nina";

    fn privmsg(prefix: &str, target: &str, text: &str) -> Result<Message> {
        Ok(Message::parse(&format!(":{prefix} PRIVMSG {target} :{text}"))?)
    }

    fn request(bot: &Bot, text: &str) -> Result<Request> {
        bot.request(&privmsg("alice!al@example.net", "#lolinano", text)?)
            .ok_or_else(|| anyhow!("no command recognised in {text:?}"))
    }

    #[test]
    fn requests_route_replies_to_channel_or_sender() -> Result<()> {
        let bot = Bot::new(NICK, Arc::new(FakeRemote::default()));
        let in_channel = request(&bot, "Rarity|nina: torrent find x")?;
        assert_eq!(in_channel.sender, "alice");
        assert_eq!(in_channel.reply_to, "#lolinano");

        let direct = bot
            .request(&privmsg(
                "alice!al@example.net",
                NICK,
                "Rarity|nina: torrent find x",
            )?)
            .ok_or_else(|| anyhow!("direct message not recognised"))?;
        assert_eq!(direct.reply_to, "alice");
        Ok(())
    }

    #[test]
    fn malformed_senders_and_chatter_are_ignored() -> Result<()> {
        let bot = Bot::new(NICK, Arc::new(FakeRemote::default()));
        assert_eq!(
            bot.request(&privmsg("irc.example.net", "#lolinano", "Rarity|nina: torrent find x")?),
            None
        );
        assert_eq!(
            bot.request(&privmsg("alice!al@example.net", "#lolinano", "hello there")?),
            None
        );
        Ok(())
    }

    #[tokio::test]
    async fn add_replies_with_the_torrent_name() -> Result<()> {
        let remote = Arc::new(FakeRemote::default().with_torrent(0x11, "ubuntu.iso"));
        let bot = Bot::new(NICK, remote);
        let replies = bot
            .respond(&request(&bot, "Rarity|nina: torrent add http://example.test/u.torrent")?)
            .await;
        assert_eq!(replies, vec!["alice: Added: ubuntu.iso"]);
        Ok(())
    }

    #[tokio::test]
    async fn add_failure_reports_the_problem_detail() -> Result<()> {
        let remote = Arc::new(FakeRemote::default().failing("metainfo download failed"));
        let bot = Bot::new(NICK, remote);
        let replies = bot
            .respond(&request(&bot, "Rarity|nina: torrent add http://example.test/x.torrent")?)
            .await;
        assert_eq!(replies, vec!["alice: Failed: metainfo download failed"]);
        Ok(())
    }

    #[tokio::test]
    async fn find_lists_each_match_under_a_header() -> Result<()> {
        let remote = Arc::new(
            FakeRemote::default()
                .with_torrent(0x01, "debian.iso")
                .with_torrent(0x02, "ubuntu.iso"),
        );
        let bot = Bot::new(NICK, remote);
        let replies = bot.respond(&request(&bot, "Rarity|nina: torrent find iso")?).await;
        assert_eq!(replies, vec!["alice:", "  debian.iso", "  ubuntu.iso"]);

        let none = bot.respond(&request(&bot, "Rarity|nina: torrent find zzz")?).await;
        assert_eq!(none, vec!["alice:"]);
        Ok(())
    }

    #[tokio::test]
    async fn start_and_stop_reply_per_torrent() -> Result<()> {
        let remote = Arc::new(
            FakeRemote::default()
                .with_torrent(0x01, "debian.iso")
                .with_torrent(0x02, "debian-dvd.iso"),
        );
        let bot = Bot::new(NICK, remote.clone());

        let stopped = bot.respond(&request(&bot, "Rarity|nina: torrent stop debian")?).await;
        assert_eq!(
            stopped,
            vec!["alice: stopped: debian.iso", "alice: stopped: debian-dvd.iso"]
        );
        assert!(remote.is_paused(0x01) && remote.is_paused(0x02));

        let started = bot.respond(&request(&bot, "Rarity|nina: torrent start dvd")?).await;
        assert_eq!(started, vec!["alice: started: debian-dvd.iso"]);
        assert!(remote.is_paused(0x01));
        assert!(!remote.is_paused(0x02));
        Ok(())
    }

    #[tokio::test]
    async fn find_failure_is_reported_once() -> Result<()> {
        let remote = Arc::new(FakeRemote::default().failing("invalid find pattern"));
        let bot = Bot::new(NICK, remote);
        let replies = bot.respond(&request(&bot, "Rarity|nina: torrent start (")?).await;
        assert_eq!(replies, vec!["alice: Failed: invalid find pattern"]);
        assert_eq!(bot.nickname(), NICK);
        Ok(())
    }
}
