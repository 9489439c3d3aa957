use thiserror::Error;

use crate::engine::CommandKind;

use super::parser::{IrcMessage, ParseError};

/// Channel flag that makes a newly created channel invite-only.
pub const PRIVATE_FLAG: &str = "+i";

/// What a client line asks the server to do.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientRequest {
    /// A command for the engine.
    Command(CommandKind),
    /// Keepalive, answered by the connection itself.
    Ping(String),
    Quit(Option<String>),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CommandError {
    #[error("unknown command: {0}")]
    UnknownCommand(String),
    #[error("not enough parameters: {0}")]
    NeedMoreParams(&'static str),
    #[error("unknown channel flag: {0}")]
    UnknownFlag(String),
    #[error("malformed line: {0}")]
    Malformed(#[from] ParseError),
}

/// Translate a parsed wire message into a request.
///
/// `INVITE` takes the nickname first, like IRC; every other channel command
/// takes the channel first.
pub fn translate(msg: &IrcMessage) -> Result<ClientRequest, CommandError> {
    let p = &msg.params;
    let kind = match msg.command.as_str() {
        "PING" => return Ok(ClientRequest::Ping(p.first().cloned().unwrap_or_default())),
        "QUIT" => return Ok(ClientRequest::Quit(p.first().cloned())),
        "NICK" => CommandKind::Nickname {
            new_nickname: param(p, 0, "NICK")?,
        },
        "CREATE" => {
            let channel = param(p, 0, "CREATE")?;
            let private = match p.get(1).map(String::as_str) {
                None => false,
                Some(flag) if flag.eq_ignore_ascii_case(PRIVATE_FLAG) => true,
                Some(other) => return Err(CommandError::UnknownFlag(other.to_string())),
            };
            CommandKind::Create { channel, private }
        }
        "JOIN" => CommandKind::Join {
            channel: param(p, 0, "JOIN")?,
        },
        "PRIVMSG" => CommandKind::Message {
            channel: param(p, 0, "PRIVMSG")?,
            body: param(p, 1, "PRIVMSG")?,
        },
        "PART" => CommandKind::Leave {
            channel: param(p, 0, "PART")?,
        },
        "INVITE" => CommandKind::Invite {
            target: param(p, 0, "INVITE")?,
            channel: param(p, 1, "INVITE")?,
        },
        "KICK" => CommandKind::Kick {
            channel: param(p, 0, "KICK")?,
            target: param(p, 1, "KICK")?,
        },
        other => return Err(CommandError::UnknownCommand(other.to_string())),
    };
    Ok(ClientRequest::Command(kind))
}

fn param(params: &[String], index: usize, command: &'static str) -> Result<String, CommandError> {
    params
        .get(index)
        .cloned()
        .ok_or(CommandError::NeedMoreParams(command))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn translate_line(line: &str) -> Result<ClientRequest, CommandError> {
        translate(&IrcMessage::parse(line).unwrap())
    }

    fn command(line: &str) -> CommandKind {
        match translate_line(line) {
            Ok(ClientRequest::Command(kind)) => kind,
            other => panic!("expected a command for {line:?}, got {other:?}"),
        }
    }

    #[test]
    fn test_nick() {
        assert_eq!(
            command("NICK alice"),
            CommandKind::Nickname {
                new_nickname: "alice".into()
            }
        );
    }

    #[test]
    fn test_create_public_and_private() {
        assert_eq!(
            command("CREATE lounge"),
            CommandKind::Create {
                channel: "lounge".into(),
                private: false
            }
        );
        assert_eq!(
            command("CREATE vault +i"),
            CommandKind::Create {
                channel: "vault".into(),
                private: true
            }
        );
        assert_eq!(
            translate_line("CREATE vault +x"),
            Err(CommandError::UnknownFlag("+x".into()))
        );
    }

    #[test]
    fn test_privmsg_keeps_body() {
        assert_eq!(
            command("PRIVMSG lounge :hello there"),
            CommandKind::Message {
                channel: "lounge".into(),
                body: "hello there".into()
            }
        );
    }

    #[test]
    fn test_invite_and_kick_argument_order() {
        assert_eq!(
            command("INVITE bob vault"),
            CommandKind::Invite {
                channel: "vault".into(),
                target: "bob".into()
            }
        );
        assert_eq!(
            command("KICK vault bob"),
            CommandKind::Kick {
                channel: "vault".into(),
                target: "bob".into()
            }
        );
    }

    #[test]
    fn test_join_and_part() {
        assert_eq!(
            command("JOIN lounge"),
            CommandKind::Join {
                channel: "lounge".into()
            }
        );
        assert_eq!(
            command("PART lounge"),
            CommandKind::Leave {
                channel: "lounge".into()
            }
        );
    }

    #[test]
    fn test_missing_params() {
        assert_eq!(
            translate_line("KICK vault"),
            Err(CommandError::NeedMoreParams("KICK"))
        );
        assert_eq!(translate_line("NICK"), Err(CommandError::NeedMoreParams("NICK")));
        assert_eq!(
            translate_line("PRIVMSG lounge"),
            Err(CommandError::NeedMoreParams("PRIVMSG"))
        );
    }

    #[test]
    fn test_ping_quit_and_unknown() {
        assert_eq!(translate_line("PING abc"), Ok(ClientRequest::Ping("abc".into())));
        assert_eq!(translate_line("QUIT :bye"), Ok(ClientRequest::Quit(Some("bye".into()))));
        assert_eq!(
            translate_line("TOPIC lounge"),
            Err(CommandError::UnknownCommand("TOPIC".into()))
        );
    }

    #[test]
    fn test_parse_error_converts() {
        let err = IrcMessage::parse(":prefixonly").map_err(CommandError::from);
        assert_eq!(err, Err(CommandError::Malformed(ParseError::MissingCommand)));
    }
}
