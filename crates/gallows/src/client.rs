//! The player's side of the protocol.
//!
//! [`GallowsClient`] reads frames from the server, shows each one to the
//! player, and answers the server's questions from a line-oriented input
//! (stdin in the `gallows-client` binary). Answers are checked locally
//! before they are sent, so a typo is re-asked without a round trip.

use gallows_protocol::{
    normalize_guess, normalize_secret, validate_max_tries, ClientMessage, PlayerDescriptor,
    ServerMessage, MAX_TURNS, MIN_TURNS, UNKNOWN,
};
use gallows_session::SessionError;
use gallows_transport::Connection;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, Lines};

use crate::GallowsError;

/// How a client session ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEnd {
    /// The server sent `REVOKE`.
    Revoked,
    /// The server closed the connection without a word.
    ServerClosed,
}

/// A connected player at a terminal.
///
/// # Example
///
/// ```rust,no_run
/// use std::time::Duration;
///
/// use gallows::prelude::*;
/// use tokio::io::BufReader;
///
/// # async fn play() -> Result<(), GallowsError> {
/// let conn = TcpConnection::connect("127.0.0.1:5050", Duration::from_millis(100)).await?;
/// let me = PlayerDescriptor::new("alice", 2)?;
/// let mut client = GallowsClient::new(
///     conn,
///     me,
///     BufReader::new(tokio::io::stdin()),
///     tokio::io::stdout(),
/// );
/// client.run().await?;
/// # Ok(())
/// # }
/// ```
pub struct GallowsClient<C, R, W> {
    conn: C,
    me: PlayerDescriptor,
    input: Lines<R>,
    output: W,
}

impl<C, R, W> GallowsClient<C, R, W>
where
    C: Connection,
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    pub fn new(conn: C, me: PlayerDescriptor, input: R, output: W) -> Self {
        Self {
            conn,
            me,
            input: input.lines(),
            output,
        }
    }

    /// Plays until the server revokes or drops the connection, then
    /// closes it.
    pub async fn run(&mut self) -> Result<SessionEnd, GallowsError> {
        let result = self.serve().await;
        if let Err(e) = self.conn.close().await {
            tracing::debug!(error = %e, "close failed");
        }
        result
    }

    async fn serve(&mut self) -> Result<SessionEnd, GallowsError> {
        loop {
            let frame = self
                .conn
                .recv()
                .await
                .map_err(|e| SessionError::Disconnected(e.to_string()))?;
            let Some(frame) = frame else {
                self.say("Lost the connection to the server.").await?;
                return Ok(SessionEnd::ServerClosed);
            };

            let msg = match ServerMessage::from_bytes(&frame) {
                Ok(msg) => msg,
                Err(e) => {
                    tracing::error!(error = %e, "unreadable frame from server");
                    self.say("Could not understand the server. Disconnecting...").await?;
                    return Err(e.into());
                }
            };
            tracing::debug!(?msg, "received");

            if let Some(end) = self.handle(msg).await? {
                return Ok(end);
            }
        }
    }

    /// Handles one frame. `Some` ends the session.
    async fn handle(&mut self, msg: ServerMessage) -> Result<Option<SessionEnd>, GallowsError> {
        match msg {
            ServerMessage::Welcome => self.say("Connected to the server.").await?,
            ServerMessage::RequestPlayer => {
                self.send(ClientMessage::Player(self.me.clone())).await?;
            }
            ServerMessage::Queued => self.say("You are being added to a game lobby.").await?,
            ServerMessage::GameStart => self.say("Game is starting!").await?,
            ServerMessage::ChoosingPlayer(picker) => {
                self.say(&format!("{} is choosing a word.", picker.name)).await?;
            }
            ServerMessage::RequestMaxTries => {
                let question = format!("Guesses allowed ({MIN_TURNS}-{MAX_TURNS}): ");
                let hint = format!("Please allow between {MIN_TURNS} and {MAX_TURNS} tries.");
                let tries = self
                    .ask(&question, &hint, |line| line.parse().ok().and_then(validate_max_tries))
                    .await?;
                self.send(ClientMessage::MaxTries(tries)).await?;
            }
            ServerMessage::RequestSecret => {
                let word = self
                    .ask(
                        "Your turn to pick a word: ",
                        "Use letters only, at most 25 of them.",
                        normalize_secret,
                    )
                    .await?;
                self.send(ClientMessage::Secret(word)).await?;
            }
            ServerMessage::Mask(slots) => {
                self.say(&format!("Word: {}", render_mask(&slots))).await?;
            }
            ServerMessage::Turn { player, tries_left } if player == self.me => {
                let question = format!("Your turn to guess ({tries_left} tries left): ");
                let letter = self.ask(&question, "Guess a single letter.", parse_letter).await?;
                self.send(ClientMessage::Guess(letter)).await?;
            }
            ServerMessage::Turn { player, tries_left } => {
                self.say(&format!(
                    "{}'s turn to guess ({tries_left} tries left).",
                    player.name
                ))
                .await?;
            }
            ServerMessage::Correct(true) => self.say("Your guess was correct!").await?,
            ServerMessage::Correct(false) => self.say("Your guess was incorrect.").await?,
            ServerMessage::Scores(scores) => {
                self.say(&format!("Scores: {}", render_scores(&scores))).await?;
            }
            ServerMessage::Win(scores) => {
                self.say(&format!("You won! Scores: {}", render_scores(&scores))).await?;
            }
            ServerMessage::Loss(scores) => {
                self.say(&format!("You lost. Scores: {}", render_scores(&scores))).await?;
            }
            ServerMessage::ContinuePrompt => {
                let again = self
                    .ask("Play another round (y/n)? ", "Please answer y or n.", parse_yes_no)
                    .await?;
                self.send(ClientMessage::Continue(again)).await?;
                self.say("Waiting for the other players...").await?;
            }
            ServerMessage::InvalidInput => {
                self.say("Invalid input, the server will ask again.").await?;
            }
            ServerMessage::Revoke => {
                self.say("The game is over. Disconnecting.").await?;
                return Ok(Some(SessionEnd::Revoked));
            }
            ServerMessage::Heartbeat => tracing::trace!("heartbeat"),
        }
        Ok(None)
    }

    async fn send(&self, msg: ClientMessage) -> Result<(), GallowsError> {
        self.conn
            .send(msg.encode().as_bytes())
            .await
            .map_err(|e| SessionError::Disconnected(e.to_string()))?;
        Ok(())
    }

    async fn say(&mut self, text: &str) -> Result<(), GallowsError> {
        self.output.write_all(text.as_bytes()).await?;
        self.output.write_all(b"\n").await?;
        self.output.flush().await?;
        Ok(())
    }

    /// Asks until `parse` accepts a line.
    async fn ask<T>(
        &mut self,
        question: &str,
        hint: &str,
        mut parse: impl FnMut(&str) -> Option<T>,
    ) -> Result<T, GallowsError> {
        loop {
            self.output.write_all(question.as_bytes()).await?;
            self.output.flush().await?;

            let Some(line) = self.input.next_line().await? else {
                return Err(GallowsError::InputClosed);
            };
            if let Some(answer) = parse(line.trim()) {
                return Ok(answer);
            }
            self.say(hint).await?;
        }
    }
}

fn parse_letter(line: &str) -> Option<char> {
    let mut chars = line.chars();
    match (chars.next(), chars.next()) {
        (Some(letter), None) => normalize_guess(letter),
        _ => None,
    }
}

fn parse_yes_no(line: &str) -> Option<bool> {
    match line.to_ascii_lowercase().as_str() {
        "y" | "yes" => Some(true),
        "n" | "no" => Some(false),
        _ => None,
    }
}

fn render_mask(slots: &[Option<char>]) -> String {
    slots
        .iter()
        .map(|slot| slot.unwrap_or(UNKNOWN).to_string())
        .collect::<Vec<_>>()
        .join(" ")
}

fn render_scores(scores: &[u32]) -> String {
    scores
        .iter()
        .map(u32::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use gallows_transport::MemoryConnection;

    use super::*;

    type TestClient = GallowsClient<MemoryConnection, &'static [u8], Vec<u8>>;

    fn desc(name: &str) -> PlayerDescriptor {
        PlayerDescriptor::new(name, 2).unwrap()
    }

    /// A client for `ann` whose server end already holds `frames`.
    async fn client(
        frames: &[ServerMessage],
        input: &'static str,
    ) -> (TestClient, MemoryConnection) {
        let (conn, server) = MemoryConnection::pair();
        for frame in frames {
            server.send(frame.encode().as_bytes()).await.unwrap();
        }
        (GallowsClient::new(conn, desc("ann"), input.as_bytes(), Vec::new()), server)
    }

    async fn answers(server: &MemoryConnection) -> Vec<ClientMessage> {
        let mut seen = Vec::new();
        while let Ok(Some(frame)) = server.recv().await {
            seen.push(ClientMessage::from_bytes(&frame).unwrap());
        }
        seen
    }

    fn screen(client: &TestClient) -> String {
        String::from_utf8(client.output.clone()).unwrap()
    }

    #[tokio::test]
    async fn test_sends_descriptor_and_stops_on_revoke() {
        let frames = [
            ServerMessage::Welcome,
            ServerMessage::RequestPlayer,
            ServerMessage::Queued,
            ServerMessage::Heartbeat,
            ServerMessage::Revoke,
        ];
        let (mut client, server) = client(&frames, "").await;

        assert_eq!(client.run().await.unwrap(), SessionEnd::Revoked);
        assert_eq!(answers(&server).await, vec![ClientMessage::Player(desc("ann"))]);
        assert!(screen(&client).contains("added to a game lobby"));
    }

    #[tokio::test]
    async fn test_max_tries_reasked_locally() {
        let frames = [ServerMessage::RequestMaxTries, ServerMessage::Revoke];
        let (mut client, server) = client(&frames, "3\nlots\n 7 \n").await;

        client.run().await.unwrap();

        assert_eq!(answers(&server).await, vec![ClientMessage::MaxTries(7)]);
        assert_eq!(screen(&client).matches("Please allow between 5 and 25").count(), 2);
    }

    #[tokio::test]
    async fn test_secret_is_lowercased() {
        let frames = [ServerMessage::RequestSecret, ServerMessage::Revoke];
        let (mut client, server) = client(&frames, "two words\nHangman\n").await;

        client.run().await.unwrap();

        assert_eq!(answers(&server).await, vec![ClientMessage::Secret("hangman".into())]);
    }

    #[tokio::test]
    async fn test_only_own_turn_asks_for_guess() {
        let frames = [
            ServerMessage::Turn {
                player: desc("bob"),
                tries_left: 5,
            },
            ServerMessage::Turn {
                player: desc("ann"),
                tries_left: 4,
            },
            ServerMessage::Correct(false),
            ServerMessage::Revoke,
        ];
        let (mut client, server) = client(&frames, "ab\n7\nQ\n").await;

        client.run().await.unwrap();

        assert_eq!(answers(&server).await, vec![ClientMessage::Guess('q')]);
        let screen = screen(&client);
        assert!(screen.contains("bob's turn to guess (5 tries left)"));
        assert!(screen.contains("Your guess was incorrect."));
    }

    #[tokio::test]
    async fn test_continue_vote() {
        let frames = [ServerMessage::ContinuePrompt, ServerMessage::Revoke];
        let (mut client, server) = client(&frames, "maybe\nYes\n").await;

        client.run().await.unwrap();

        assert_eq!(answers(&server).await, vec![ClientMessage::Continue(true)]);
    }

    #[tokio::test]
    async fn test_results_are_shown() {
        let frames = [
            ServerMessage::Mask(vec![Some('n'), None, None]),
            ServerMessage::Win(vec![0, 1]),
            ServerMessage::Loss(vec![2, 1]),
            ServerMessage::Revoke,
        ];
        let (mut client, _server) = client(&frames, "").await;

        client.run().await.unwrap();

        let screen = screen(&client);
        assert!(screen.contains("Word: n * *"));
        assert!(screen.contains("You won! Scores: 0, 1"));
        assert!(screen.contains("You lost. Scores: 2, 1"));
    }

    #[tokio::test]
    async fn test_server_hang_up_ends_session() {
        let (mut client, server) = client(&[ServerMessage::Welcome], "").await;
        server.close().await.unwrap();

        assert_eq!(client.run().await.unwrap(), SessionEnd::ServerClosed);
    }

    #[tokio::test]
    async fn test_unreadable_frame_is_error() {
        let (mut client, server) = client(&[], "").await;
        server.send(b"BOGUS").await.unwrap();

        let err = client.run().await.unwrap_err();
        assert!(matches!(err, GallowsError::Protocol(_)));
    }

    #[tokio::test]
    async fn test_input_closed_mid_question() {
        let (mut client, _server) = client(&[ServerMessage::RequestSecret], "").await;

        let err = client.run().await.unwrap_err();
        assert!(matches!(err, GallowsError::InputClosed));
    }
}
