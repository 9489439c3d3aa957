use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info, warn};

use crate::engine::{Broadcast, ChatEngine, Command, CommandKind, UserId};

use super::commands::CommandError;
use super::formatter::Formatter;
use super::session::Session;

/// Requests connections send to the dispatcher.
#[derive(Debug)]
pub enum DispatchRequest {
    /// A new connection. The reply carries its generated nickname.
    Connect {
        session: Session,
        reply_tx: oneshot::Sender<String>,
    },
    /// A parsed command from a connected client.
    Command { id: UserId, kind: CommandKind },
    /// A line that could not be turned into a command.
    Reject { id: UserId, error: CommandError },
    /// The connection closed.
    Disconnect { id: UserId },
}

/// Cloneable sender side of the dispatcher queue.
#[derive(Debug, Clone)]
pub struct DispatcherHandle {
    tx: mpsc::UnboundedSender<DispatchRequest>,
}

impl DispatcherHandle {
    /// Register a session. Returns `None` if the dispatcher has stopped.
    pub async fn connect(&self, session: Session) -> Option<String> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.tx
            .send(DispatchRequest::Connect { session, reply_tx })
            .ok()?;
        reply_rx.await.ok()
    }

    pub fn command(&self, id: UserId, kind: CommandKind) -> bool {
        self.tx.send(DispatchRequest::Command { id, kind }).is_ok()
    }

    pub fn reject(&self, id: UserId, error: CommandError) -> bool {
        self.tx.send(DispatchRequest::Reject { id, error }).is_ok()
    }

    pub fn disconnect(&self, id: UserId) -> bool {
        self.tx.send(DispatchRequest::Disconnect { id }).is_ok()
    }
}

/// Sole owner of the [`ChatEngine`]. Applies requests strictly one at a
/// time and delivers each resulting broadcast to its recipients' sessions.
pub struct Dispatcher {
    engine: ChatEngine,
    sessions: HashMap<UserId, Session>,
    formatter: Arc<Formatter>,
    rx: mpsc::UnboundedReceiver<DispatchRequest>,
}

impl Dispatcher {
    pub fn new(engine: ChatEngine, formatter: Arc<Formatter>) -> (Self, DispatcherHandle) {
        let (tx, rx) = mpsc::unbounded_channel();
        let dispatcher = Self {
            engine,
            sessions: HashMap::new(),
            formatter,
            rx,
        };
        (dispatcher, DispatcherHandle { tx })
    }

    /// Process requests until every handle has been dropped.
    pub async fn run(mut self) {
        info!("dispatcher started");
        while let Some(request) = self.rx.recv().await {
            self.apply(request);
        }
        info!(sessions = self.sessions.len(), "dispatcher stopped");
    }

    pub fn engine(&self) -> &ChatEngine {
        &self.engine
    }

    /// Apply one request and deliver its outcome.
    pub fn apply(&mut self, request: DispatchRequest) {
        match request {
            DispatchRequest::Connect { session, reply_tx } => {
                let id = session.id;
                debug!(id, peer = %session.peer, "connect");
                self.sessions.insert(id, session);
                let broadcast = self.engine.register_user(id);
                if let Broadcast::Connected { nickname } = &broadcast {
                    let _ = reply_tx.send(nickname.clone());
                }
                self.deliver(&broadcast);
            }
            DispatchRequest::Command { id, kind } => {
                let Some(sender) = self.engine.nickname(id) else {
                    warn!(id, "command from unregistered connection");
                    return;
                };
                let broadcast = self.engine.handle(Command::new(id, sender, kind));
                self.deliver(&broadcast);
            }
            DispatchRequest::Reject { id, error } => {
                let Some(nick) = self.engine.nickname(id) else {
                    return;
                };
                debug!(id, %nick, error = %error, "line rejected");
                if let Some(session) = self.sessions.get(&id) {
                    session.send(self.formatter.command_error(&nick, &error));
                }
            }
            DispatchRequest::Disconnect { id } => {
                self.sessions.remove(&id);
                match self.engine.deregister_user(id) {
                    Ok(broadcast) => self.deliver(&broadcast),
                    Err(e) => warn!(id, error = e.code(), "disconnect for unknown connection"),
                }
            }
        }
    }

    fn deliver(&self, broadcast: &Broadcast) {
        for nick in broadcast.recipients() {
            let Some(session) = self
                .engine
                .user_id(&nick)
                .and_then(|id| self.sessions.get(&id))
            else {
                debug!(%nick, "no session for recipient");
                continue;
            };
            for line in self.formatter.render(broadcast, &nick) {
                if !session.send(line) {
                    warn!(%nick, peer = %session.peer, "outbound queue full or closed, dropping delivery");
                    break;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::irc::commands::{ClientRequest, translate};
    use crate::irc::parser::IrcMessage;

    struct Client {
        id: UserId,
        rx: mpsc::Receiver<String>,
    }

    impl Client {
        fn drain(&mut self) -> Vec<String> {
            let mut lines = Vec::new();
            while let Ok(line) = self.rx.try_recv() {
                lines.push(line);
            }
            lines
        }
    }

    fn dispatcher() -> Dispatcher {
        let formatter = Arc::new(Formatter::new("parlor", Vec::new()));
        Dispatcher::new(ChatEngine::new(), formatter).0
    }

    fn connect(d: &mut Dispatcher, id: UserId) -> (Client, oneshot::Receiver<String>) {
        let (tx, rx) = mpsc::channel(64);
        let (reply_tx, reply_rx) = oneshot::channel();
        d.apply(DispatchRequest::Connect {
            session: Session::new(id, format!("peer{id}"), tx),
            reply_tx,
        });
        (Client { id, rx }, reply_rx)
    }

    fn command(d: &mut Dispatcher, client: &Client, line: &str) {
        let msg = IrcMessage::parse(line).unwrap();
        match translate(&msg).unwrap() {
            ClientRequest::Command(kind) => d.apply(DispatchRequest::Command {
                id: client.id,
                kind,
            }),
            other => panic!("not a command: {other:?}"),
        }
    }

    #[test]
    fn test_connect_welcomes_and_replies_with_nickname() {
        let mut d = dispatcher();
        let (mut alice, mut reply) = connect(&mut d, 0);
        assert_eq!(reply.try_recv().unwrap(), "User0");
        let lines = alice.drain();
        assert_eq!(lines[0], ":parlor 001 User0 :Welcome to parlor, User0!");
    }

    #[test]
    fn test_message_reaches_every_member() {
        let mut d = dispatcher();
        let (mut a, _) = connect(&mut d, 0);
        let (mut b, _) = connect(&mut d, 1);
        let (mut c, _) = connect(&mut d, 2);
        command(&mut d, &a, "CREATE lounge");
        command(&mut d, &b, "JOIN lounge");
        a.drain();
        b.drain();
        c.drain();

        command(&mut d, &b, "PRIVMSG lounge :hi");
        assert_eq!(a.drain(), vec![":User1 PRIVMSG lounge hi"]);
        assert_eq!(b.drain(), vec![":User1 PRIVMSG lounge hi"]);
        assert!(c.drain().is_empty());
    }

    #[test]
    fn test_error_goes_only_to_sender() {
        let mut d = dispatcher();
        let (mut a, _) = connect(&mut d, 0);
        let (mut b, _) = connect(&mut d, 1);
        command(&mut d, &a, "CREATE vault +i");
        a.drain();
        b.drain();

        command(&mut d, &b, "JOIN vault");
        assert!(a.drain().is_empty());
        assert_eq!(
            b.drain(),
            vec![":parlor 473 User1 vault :cannot join a private channel without an invite"]
        );
    }

    #[test]
    fn test_rename_is_delivered_under_new_nickname() {
        let mut d = dispatcher();
        let (mut a, _) = connect(&mut d, 0);
        let (mut b, _) = connect(&mut d, 1);
        command(&mut d, &a, "CREATE lounge");
        command(&mut d, &b, "JOIN lounge");
        a.drain();
        b.drain();

        command(&mut d, &a, "NICK alice");
        assert_eq!(a.drain(), vec![":User0 NICK alice"]);
        assert_eq!(b.drain(), vec![":User0 NICK alice"]);
        assert_eq!(d.engine().owner("lounge"), Some("alice".into()));
    }

    #[test]
    fn test_disconnect_notifies_channel_peers() {
        let mut d = dispatcher();
        let (mut a, _) = connect(&mut d, 0);
        let (mut b, _) = connect(&mut d, 1);
        command(&mut d, &a, "CREATE lounge");
        command(&mut d, &b, "JOIN lounge");
        a.drain();
        b.drain();

        d.apply(DispatchRequest::Disconnect { id: 0 });
        assert_eq!(b.drain(), vec![":User0 QUIT"]);
        assert!(d.engine().channels().is_empty());
        assert!(a.drain().is_empty());
    }

    #[test]
    fn test_reject_uses_current_nickname() {
        let mut d = dispatcher();
        let (mut a, _) = connect(&mut d, 0);
        command(&mut d, &a, "NICK alice");
        a.drain();
        d.apply(DispatchRequest::Reject {
            id: 0,
            error: CommandError::UnknownCommand("TOPIC".into()),
        });
        assert_eq!(
            a.drain(),
            vec![":parlor 421 alice TOPIC :unknown command: TOPIC"]
        );
    }

    #[test]
    fn test_unknown_disconnect_is_ignored() {
        let mut d = dispatcher();
        d.apply(DispatchRequest::Disconnect { id: 42 });
        assert!(d.engine().registered_users().is_empty());
    }
}
