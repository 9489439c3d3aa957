/// Connection identifier, assigned by the transport layer.
pub type UserId = u64;

/// A fully parsed client command together with who sent it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Command {
    pub sender_id: UserId,
    /// Sender's nickname at the time the command was issued.
    pub sender: String,
    pub kind: CommandKind,
}

/// One case per command a client can issue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandKind {
    Nickname { new_nickname: String },
    Create { channel: String, private: bool },
    Join { channel: String },
    Message { channel: String, body: String },
    Leave { channel: String },
    Invite { channel: String, target: String },
    Kick { channel: String, target: String },
}

impl Command {
    pub fn new(sender_id: UserId, sender: impl Into<String>, kind: CommandKind) -> Self {
        Self {
            sender_id,
            sender: sender.into(),
            kind,
        }
    }

    pub fn nickname(sender_id: UserId, sender: &str, new_nickname: &str) -> Self {
        Self::new(
            sender_id,
            sender,
            CommandKind::Nickname {
                new_nickname: new_nickname.into(),
            },
        )
    }

    pub fn create(sender_id: UserId, sender: &str, channel: &str, private: bool) -> Self {
        Self::new(
            sender_id,
            sender,
            CommandKind::Create {
                channel: channel.into(),
                private,
            },
        )
    }

    pub fn join(sender_id: UserId, sender: &str, channel: &str) -> Self {
        Self::new(
            sender_id,
            sender,
            CommandKind::Join {
                channel: channel.into(),
            },
        )
    }

    pub fn message(sender_id: UserId, sender: &str, channel: &str, body: &str) -> Self {
        Self::new(
            sender_id,
            sender,
            CommandKind::Message {
                channel: channel.into(),
                body: body.into(),
            },
        )
    }

    pub fn leave(sender_id: UserId, sender: &str, channel: &str) -> Self {
        Self::new(
            sender_id,
            sender,
            CommandKind::Leave {
                channel: channel.into(),
            },
        )
    }

    pub fn invite(sender_id: UserId, sender: &str, channel: &str, target: &str) -> Self {
        Self::new(
            sender_id,
            sender,
            CommandKind::Invite {
                channel: channel.into(),
                target: target.into(),
            },
        )
    }

    pub fn kick(sender_id: UserId, sender: &str, channel: &str, target: &str) -> Self {
        Self::new(
            sender_id,
            sender,
            CommandKind::Kick {
                channel: channel.into(),
                target: target.into(),
            },
        )
    }

    /// Short lowercase name, used as a log field.
    pub fn name(&self) -> &'static str {
        match self.kind {
            CommandKind::Nickname { .. } => "nickname",
            CommandKind::Create { .. } => "create",
            CommandKind::Join { .. } => "join",
            CommandKind::Message { .. } => "message",
            CommandKind::Leave { .. } => "leave",
            CommandKind::Invite { .. } => "invite",
            CommandKind::Kick { .. } => "kick",
        }
    }

    /// The channel this command targets, if any.
    pub fn channel(&self) -> Option<&str> {
        match &self.kind {
            CommandKind::Nickname { .. } => None,
            CommandKind::Create { channel, .. }
            | CommandKind::Join { channel }
            | CommandKind::Message { channel, .. }
            | CommandKind::Leave { channel }
            | CommandKind::Invite { channel, .. }
            | CommandKind::Kick { channel, .. } => Some(channel),
        }
    }
}
