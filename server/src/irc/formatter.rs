use std::collections::BTreeSet;

use crate::engine::{Broadcast, Command, CommandKind, ServerError};

use super::commands::{CommandError, PRIVATE_FLAG};
use super::numerics::*;
use super::parser::IrcMessage;

/// Turns engine broadcasts into wire lines. All methods return lines ready to
/// send (caller appends \r\n).
#[derive(Debug, Clone)]
pub struct Formatter {
    server_name: String,
    motd: Vec<String>,
}

impl Formatter {
    pub fn new(server_name: impl Into<String>, motd: Vec<String>) -> Self {
        Self {
            server_name: server_name.into(),
            motd,
        }
    }

    pub fn server_name(&self) -> &str {
        &self.server_name
    }

    /// Lines a single recipient sees for `broadcast`.
    pub fn render(&self, broadcast: &Broadcast, recipient: &str) -> Vec<String> {
        match broadcast {
            Broadcast::Connected { nickname } => self.welcome(nickname),
            Broadcast::Disconnected { nickname, .. } => vec![quit(nickname)],
            Broadcast::Okay { command, .. } => vec![echo(command)],
            Broadcast::Names {
                command,
                recipients,
                owner,
            } => {
                let mut lines = vec![echo(command)];
                if let Some(channel) = command.channel() {
                    let private = matches!(command.kind, CommandKind::Invite { .. });
                    lines.push(self.rpl_namreply(recipient, channel, private, recipients, owner));
                    lines.push(self.rpl_endofnames(recipient, channel));
                }
                lines
            }
            Broadcast::Error { command, reason } => vec![self.error_reply(command, *reason)],
        }
    }

    /// :parlor 001 nick :Welcome to parlor, nick!  followed by the MOTD.
    pub fn welcome(&self, nick: &str) -> Vec<String> {
        let mut lines = vec![self.reply(
            RPL_WELCOME,
            vec![
                nick.into(),
                format!("Welcome to {}, {}!", self.server_name, nick),
            ],
        )];

        if self.motd.is_empty() {
            lines.push(self.reply(ERR_NOMOTD, vec![nick.into(), "MOTD File is missing".into()]));
            return lines;
        }

        lines.push(self.reply(
            RPL_MOTDSTART,
            vec![
                nick.into(),
                format!("- {} Message of the day -", self.server_name),
            ],
        ));
        for line in &self.motd {
            lines.push(self.reply(RPL_MOTD, vec![nick.into(), format!("- {line}")]));
        }
        lines.push(self.reply(RPL_ENDOFMOTD, vec![nick.into(), "End of MOTD command".into()]));
        lines
    }

    /// :parlor 353 nick = channel :@owner member member
    pub fn rpl_namreply(
        &self,
        nick: &str,
        channel: &str,
        private: bool,
        members: &BTreeSet<String>,
        owner: &str,
    ) -> String {
        let names = members
            .iter()
            .map(|m| {
                if m == owner {
                    format!("@{m}")
                } else {
                    m.clone()
                }
            })
            .collect::<Vec<_>>()
            .join(" ");
        let symbol = if private { "*" } else { "=" };
        self.reply(
            RPL_NAMREPLY,
            vec![nick.into(), symbol.into(), channel.into(), names],
        )
    }

    /// :parlor 366 nick channel :End of /NAMES list
    pub fn rpl_endofnames(&self, nick: &str, channel: &str) -> String {
        self.reply(
            RPL_ENDOFNAMES,
            vec![nick.into(), channel.into(), "End of /NAMES list".into()],
        )
    }

    /// The numeric sent to the sender of a rejected command.
    pub fn error_reply(&self, command: &Command, reason: ServerError) -> String {
        let numeric = match reason {
            ServerError::InvalidName => ERR_ERRONEUSNICKNAME,
            ServerError::NameAlreadyInUse => ERR_NICKNAMEINUSE,
            ServerError::NoSuchUser => ERR_NOSUCHNICK,
            ServerError::NoSuchChannel => ERR_NOSUCHCHANNEL,
            ServerError::ChannelAlreadyExists => ERR_CHANNELEXISTS,
            ServerError::UserNotInChannel => ERR_USERNOTINCHANNEL,
            ServerError::UserNotOwner => ERR_CHANOPRIVSNEEDED,
            ServerError::JoinPrivateChannel => ERR_INVITEONLYCHAN,
            ServerError::InviteToPublicChannel => ERR_PUBLICCHANNEL,
        };
        self.reply(
            numeric,
            vec![
                command.sender.clone(),
                error_subject(command, reason).to_string(),
                reason.to_string(),
            ],
        )
    }

    /// Reply to a line that never reached the engine.
    pub fn command_error(&self, nick: &str, err: &CommandError) -> String {
        let (numeric, subject) = match err {
            CommandError::UnknownCommand(cmd) => (ERR_UNKNOWNCOMMAND, cmd.as_str()),
            CommandError::NeedMoreParams(cmd) => (ERR_NEEDMOREPARAMS, *cmd),
            CommandError::UnknownFlag(flag) => (ERR_UNKNOWNMODE, flag.as_str()),
            CommandError::Malformed(_) => (ERR_UNKNOWNCOMMAND, "*"),
        };
        self.reply(numeric, vec![nick.into(), subject.into(), err.to_string()])
    }

    /// :parlor PONG parlor :token
    pub fn pong(&self, token: &str) -> String {
        self.reply("PONG", vec![self.server_name.clone(), token.into()])
    }

    fn reply(&self, command: &str, params: Vec<String>) -> String {
        IrcMessage::prefixed(&self.server_name, command, params).format()
    }
}

/// Echo of a successful command, sourced from its sender.
pub fn echo(command: &Command) -> String {
    let (verb, params): (&str, Vec<String>) = match &command.kind {
        CommandKind::Nickname { new_nickname } => ("NICK", vec![new_nickname.clone()]),
        CommandKind::Create { channel, private } => {
            let mut params = vec![channel.clone()];
            if *private {
                params.push(PRIVATE_FLAG.into());
            }
            ("CREATE", params)
        }
        CommandKind::Join { channel } => ("JOIN", vec![channel.clone()]),
        CommandKind::Message { channel, body } => ("PRIVMSG", vec![channel.clone(), body.clone()]),
        CommandKind::Leave { channel } => ("PART", vec![channel.clone()]),
        CommandKind::Invite { channel, target } => ("INVITE", vec![target.clone(), channel.clone()]),
        CommandKind::Kick { channel, target } => ("KICK", vec![channel.clone(), target.clone()]),
    };
    IrcMessage::prefixed(&command.sender, verb, params).format()
}

/// :nick QUIT
pub fn quit(nick: &str) -> String {
    IrcMessage::prefixed(nick, "QUIT", Vec::new()).format()
}

/// The name an error reply is about.
fn error_subject(command: &Command, reason: ServerError) -> &str {
    match (&command.kind, reason) {
        (CommandKind::Nickname { new_nickname }, _) => new_nickname,
        (CommandKind::Invite { target, .. }, ServerError::NoSuchUser)
        | (CommandKind::Kick { target, .. }, ServerError::NoSuchUser | ServerError::UserNotInChannel) => {
            target
        }
        _ => command.channel().unwrap_or_default(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fmt() -> Formatter {
        Formatter::new("parlor", Vec::new())
    }

    fn set(names: &[&str]) -> BTreeSet<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_welcome_without_motd() {
        let lines = fmt().render(&Broadcast::connected("User0"), "User0");
        assert_eq!(
            lines,
            vec![
                ":parlor 001 User0 :Welcome to parlor, User0!",
                ":parlor 422 User0 :MOTD File is missing",
            ]
        );
    }

    #[test]
    fn test_welcome_with_motd() {
        let f = Formatter::new("parlor", vec!["be nice".into()]);
        let lines = f.welcome("User0");
        assert_eq!(lines.len(), 4);
        assert_eq!(lines[2], ":parlor 372 User0 :- be nice");
        assert_eq!(lines[3], ":parlor 376 User0 :End of MOTD command");
    }

    #[test]
    fn test_echo_lines() {
        assert_eq!(
            echo(&Command::nickname(0, "User0", "alice")),
            ":User0 NICK alice"
        );
        assert_eq!(
            echo(&Command::create(0, "alice", "vault", true)),
            ":alice CREATE vault +i"
        );
        assert_eq!(
            echo(&Command::message(0, "alice", "lounge", "hi all")),
            ":alice PRIVMSG lounge :hi all"
        );
        assert_eq!(
            echo(&Command::invite(0, "alice", "vault", "bob")),
            ":alice INVITE bob vault"
        );
        assert_eq!(
            echo(&Command::kick(0, "alice", "vault", "bob")),
            ":alice KICK vault bob"
        );
        assert_eq!(echo(&Command::leave(1, "bob", "lounge")), ":bob PART lounge");
    }

    #[test]
    fn test_names_marks_owner() {
        let b = Broadcast::names(
            Command::join(1, "User1", "lounge"),
            set(&["User0", "User1"]),
            "User0",
        );
        let lines = fmt().render(&b, "User1");
        assert_eq!(
            lines,
            vec![
                ":User1 JOIN lounge",
                ":parlor 353 User1 = lounge :@User0 User1",
                ":parlor 366 User1 lounge :End of /NAMES list",
            ]
        );
    }

    #[test]
    fn test_names_after_invite_is_private() {
        let b = Broadcast::names(
            Command::invite(0, "User0", "vault", "User1"),
            set(&["User0", "User1"]),
            "User0",
        );
        let lines = fmt().render(&b, "User0");
        assert_eq!(lines[1], ":parlor 353 User0 * vault :@User0 User1");
    }

    #[test]
    fn test_error_replies() {
        let f = fmt();
        let b = Broadcast::error(Command::join(1, "User1", "vault"), ServerError::JoinPrivateChannel);
        assert_eq!(
            f.render(&b, "User1"),
            vec![":parlor 473 User1 vault :cannot join a private channel without an invite"]
        );

        let b = Broadcast::error(Command::nickname(1, "User1", "User0"), ServerError::NameAlreadyInUse);
        assert_eq!(
            f.render(&b, "User1"),
            vec![":parlor 433 User1 User0 :nickname is already in use"]
        );

        let b = Broadcast::error(Command::kick(0, "User0", "vault", "ghost"), ServerError::NoSuchUser);
        assert_eq!(f.render(&b, "User0"), vec![":parlor 401 User0 ghost :no such user"]);
    }

    #[test]
    fn test_disconnected_is_quit() {
        let b = Broadcast::disconnected("User3", vec!["User0".to_string()]);
        assert_eq!(fmt().render(&b, "User0"), vec![":User3 QUIT"]);
    }

    #[test]
    fn test_command_error_and_pong() {
        let f = fmt();
        assert_eq!(
            f.command_error("User0", &CommandError::NeedMoreParams("KICK")),
            ":parlor 461 User0 KICK :not enough parameters: KICK"
        );
        assert_eq!(f.pong("abc"), ":parlor PONG parlor abc");
    }

    #[test]
    fn test_malformed_line_is_unknown_command() {
        let err = CommandError::Malformed(crate::irc::parser::ParseError::MissingCommand);
        assert_eq!(
            fmt().command_error("User0", &err),
            ":parlor 421 User0 * :malformed line: missing command"
        );
    }
}
