use std::collections::BTreeSet;

use super::command::Command;
use super::error::ServerError;

/// What a successful handler produced, before it is paired with its command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// Plain success echoed to `recipients`.
    Okay { recipients: BTreeSet<String> },
    /// Membership grew (join/invite); clients also learn who owns the channel.
    Names {
        recipients: BTreeSet<String>,
        owner: String,
    },
}

/// Result of applying one command or connection event, handed to the
/// transport layer for delivery. Recipient sets are sorted by nickname.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Broadcast {
    /// A new connection was registered under `nickname`.
    Connected { nickname: String },

    /// `nickname` left the server; `recipients` shared a channel with them.
    Disconnected {
        nickname: String,
        recipients: BTreeSet<String>,
    },

    /// Generic success.
    Okay {
        command: Command,
        recipients: BTreeSet<String>,
    },

    /// Success for join/invite, with the channel's current owner.
    Names {
        command: Command,
        recipients: BTreeSet<String>,
        owner: String,
    },

    /// The command was rejected. Only the sender hears about it.
    Error { command: Command, reason: ServerError },
}

/// Payload discriminant, independent of recipients.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PayloadKind {
    Connected,
    Disconnected,
    Okay,
    Names,
    Error,
}

impl Broadcast {
    pub fn connected(nickname: impl Into<String>) -> Self {
        Self::Connected {
            nickname: nickname.into(),
        }
    }

    pub fn disconnected(
        nickname: impl Into<String>,
        recipients: impl IntoIterator<Item = String>,
    ) -> Self {
        Self::Disconnected {
            nickname: nickname.into(),
            recipients: recipients.into_iter().collect(),
        }
    }

    pub fn okay(command: Command, recipients: impl IntoIterator<Item = String>) -> Self {
        Self::Okay {
            command,
            recipients: recipients.into_iter().collect(),
        }
    }

    pub fn names(
        command: Command,
        recipients: impl IntoIterator<Item = String>,
        owner: impl Into<String>,
    ) -> Self {
        Self::Names {
            command,
            recipients: recipients.into_iter().collect(),
            owner: owner.into(),
        }
    }

    pub fn error(command: Command, reason: ServerError) -> Self {
        Self::Error { command, reason }
    }

    /// Pair a handler result with the command that produced it.
    pub fn from_result(command: Command, result: Result<Outcome, ServerError>) -> Self {
        match result {
            Ok(Outcome::Okay { recipients }) => Self::Okay {
                command,
                recipients,
            },
            Ok(Outcome::Names { recipients, owner }) => Self::Names {
                command,
                recipients,
                owner,
            },
            Err(reason) => Self::Error { command, reason },
        }
    }

    /// Nicknames this broadcast must be delivered to.
    pub fn recipients(&self) -> BTreeSet<String> {
        match self {
            Self::Connected { nickname } => BTreeSet::from([nickname.clone()]),
            Self::Disconnected { recipients, .. }
            | Self::Okay { recipients, .. }
            | Self::Names { recipients, .. } => recipients.clone(),
            Self::Error { command, .. } => BTreeSet::from([command.sender.clone()]),
        }
    }

    pub fn kind(&self) -> PayloadKind {
        match self {
            Self::Connected { .. } => PayloadKind::Connected,
            Self::Disconnected { .. } => PayloadKind::Disconnected,
            Self::Okay { .. } => PayloadKind::Okay,
            Self::Names { .. } => PayloadKind::Names,
            Self::Error { .. } => PayloadKind::Error,
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Self::Error { .. })
    }

    /// The command this broadcast answers, if it answers one.
    pub fn command(&self) -> Option<&Command> {
        match self {
            Self::Okay { command, .. } | Self::Names { command, .. } | Self::Error { command, .. } => {
                Some(command)
            }
            Self::Connected { .. } | Self::Disconnected { .. } => None,
        }
    }
}
