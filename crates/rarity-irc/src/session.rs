//! IRC connection loop: registration, keepalive, and command dispatch.
//!
//! # Design
//! - One task owns the connection; it reads lines and writes every outgoing line.
//! - Each chat command runs on its own task so a slow confirmation never stalls `PING` replies.
//!   Finished commands hand their reply lines back through a channel.
//! - IRC carries bytes, not text; lines are decoded lossily so non-UTF-8 chatter is harmless.

use std::sync::Arc;

use anyhow::{Context, Result, bail};
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::sync::mpsc;
use tracing::{debug, info, trace, warn};

use crate::bot::Bot;
use crate::protocol::{self, ERR_NICKNAMEINUSE, Message, RPL_WELCOME};

/// Register on `stream`, join `channels`, and serve commands until the server hangs up.
///
/// # Errors
///
/// Returns an error if the connection fails or the nickname is rejected.
pub(crate) async fn run_session<S>(stream: S, bot: Arc<Bot>, channels: &[String]) -> Result<()>
where
    S: AsyncRead + AsyncWrite + Send + 'static,
{
    let (reader, mut writer) = tokio::io::split(stream);
    let mut reader = BufReader::new(reader);
    let mut buffer = Vec::new();
    let (replies_tx, mut replies_rx) = mpsc::unbounded_channel::<String>();

    send(&mut writer, &protocol::nick(bot.nickname())).await?;
    send(&mut writer, &protocol::user(bot.nickname())).await?;

    loop {
        tokio::select! {
            read = reader.read_until(b'\n', &mut buffer) => {
                if read.context("failed to read from irc server")? == 0 {
                    info!("irc server closed the connection");
                    return Ok(());
                }
                // read_until keeps partial input in `buffer` if another branch wins first.
                let line = decode_line(&buffer);
                buffer.clear();
                trace!(line = %line, "irc line received");
                let message = match Message::parse(&line) {
                    Ok(message) => message,
                    Err(err) => {
                        debug!(error = %err, detail = %err.detail(), "skipping unparsable line");
                        continue;
                    }
                };
                handle(&message, &bot, channels, &mut writer, &replies_tx).await?;
            }
            Some(reply) = replies_rx.recv() => {
                send(&mut writer, &reply).await?;
            }
        }
    }
}

async fn handle<W>(
    message: &Message,
    bot: &Arc<Bot>,
    channels: &[String],
    writer: &mut W,
    replies: &mpsc::UnboundedSender<String>,
) -> Result<()>
where
    W: AsyncWrite + Unpin,
{
    match message.command.as_str() {
        "PING" => {
            send(writer, &protocol::pong(message.param(0).unwrap_or_default())).await?;
        }
        RPL_WELCOME => {
            info!(nickname = bot.nickname(), "registered with irc server");
            for channel in channels {
                send(writer, &protocol::join(channel)).await?;
            }
        }
        ERR_NICKNAMEINUSE => bail!("nickname {} is already in use", bot.nickname()),
        "PRIVMSG" => {
            if let Some(request) = bot.request(message) {
                let bot = Arc::clone(bot);
                let replies = replies.clone();
                tokio::spawn(async move {
                    for text in bot.respond(&request).await {
                        if replies
                            .send(protocol::privmsg(&request.reply_to, &text))
                            .is_err()
                        {
                            warn!(reply_to = %request.reply_to, "connection closed before reply");
                            break;
                        }
                    }
                });
            }
        }
        other => trace!(command = other, "ignoring irc command"),
    }
    Ok(())
}

fn decode_line(raw: &[u8]) -> String {
    let raw = raw.strip_suffix(b"\n").unwrap_or(raw);
    let raw = raw.strip_suffix(b"\r").unwrap_or(raw);
    String::from_utf8_lossy(raw).into_owned()
}

async fn send<W>(writer: &mut W, line: &str) -> Result<()>
where
    W: AsyncWrite + Unpin,
{
    writer
        .write_all(line.as_bytes())
        .await
        .context("failed to write to irc server")?;
    writer.flush().await.context("failed to flush irc line")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::FakeRemote;
    use std::time::Duration;
    use tokio::io::{DuplexStream, Lines, ReadHalf, WriteHalf};
    use tokio::time::timeout;

    struct Server {
        lines: Lines<BufReader<ReadHalf<DuplexStream>>>,
        writer: WriteHalf<DuplexStream>,
    }

    impl Server {
        async fn expect(&mut self) -> Result<String> {
            timeout(Duration::from_secs(5), self.lines.next_line())
                .await
                .context("timed out waiting for the bot")??
                .context("bot closed the connection")
        }

        async fn say(&mut self, line: &str) -> Result<()> {
            send(&mut self.writer, &format!("{line}\r\n")).await
        }
    }

    fn start(remote: FakeRemote) -> (Server, tokio::task::JoinHandle<Result<()>>) {
        let (client, server) = tokio::io::duplex(4096);
        let bot = Arc::new(Bot::new("Rarity|nina", Arc::new(remote)));
        let channels = vec!["#lolinano".to_string()];
        let session = tokio::spawn(async move { run_session(client, bot, &channels).await });
        let (reader, writer) = tokio::io::split(server);
        (
            Server {
                lines: BufReader::new(reader).lines(),
                writer,
            },
            session,
        )
    }

    #[tokio::test]
    async fn registers_joins_and_answers_pings() -> Result<()> {
        let (mut server, _session) = start(FakeRemote::default());
        assert_eq!(server.expect().await?, "NICK Rarity|nina");
        assert_eq!(server.expect().await?, "USER Rarity|nina 0 * :Rarity|nina");

        server
            .say(":irc.example.net 001 Rarity|nina :Welcome")
            .await?;
        assert_eq!(server.expect().await?, "JOIN #lolinano");

        server.say("PING :irc.example.net").await?;
        assert_eq!(server.expect().await?, "PONG :irc.example.net");
        Ok(())
    }

    #[tokio::test]
    async fn commands_are_answered_in_channel() -> Result<()> {
        let (mut server, _session) =
            start(FakeRemote::default().with_torrent(0x07, "sample"));
        server.expect().await?;
        server.expect().await?;

        server
            .say(":alice!al@example.net PRIVMSG #lolinano :Rarity|nina: torrent add http://example.test/s.torrent")
            .await?;
        assert_eq!(
            server.expect().await?,
            "PRIVMSG #lolinano :alice: Added: sample"
        );

        server
            .say(":bogus PRIVMSG #lolinano :Rarity|nina: torrent find x")
            .await?;
        server.say("PING :after").await?;
        assert_eq!(server.expect().await?, "PONG :after");
        Ok(())
    }

    #[tokio::test]
    async fn non_utf8_lines_do_not_end_the_session() -> Result<()> {
        let (mut server, session) = start(FakeRemote::default());
        server.expect().await?;
        server.expect().await?;

        server
            .writer
            .write_all(b":bob!b@example.net PRIVMSG #lolinano :caf\xe9\r\n")
            .await?;
        server.say("PING :still-there").await?;
        assert_eq!(server.expect().await?, "PONG :still-there");
        assert!(!session.is_finished());
        Ok(())
    }

    #[test]
    fn lines_are_decoded_lossily_without_terminators() {
        assert_eq!(decode_line(b"PING :a\r\n"), "PING :a");
        assert_eq!(decode_line(b"PING :b\n"), "PING :b");
        assert_eq!(decode_line(b"caf\xe9"), "caf\u{fffd}");
    }

    #[tokio::test]
    async fn nickname_collision_ends_the_session() -> Result<()> {
        let (mut server, session) = start(FakeRemote::default());
        server.expect().await?;
        server.expect().await?;
        server
            .say(":irc.example.net 433 * Rarity|nina :Nickname is already in use")
            .await?;
        let outcome = timeout(Duration::from_secs(5), session).await??;
        assert!(outcome.is_err());
        Ok(())
    }

    #[tokio::test]
    async fn hangup_ends_the_session_cleanly() -> Result<()> {
        let (mut server, session) = start(FakeRemote::default());
        server.expect().await?;
        server.expect().await?;
        drop(server);
        timeout(Duration::from_secs(5), session).await???;
        Ok(())
    }
}
