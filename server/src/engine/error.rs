use thiserror::Error;

/// Reasons a command can be rejected. Every handler reports exactly one of
/// these when it refuses to apply a command; none of them leave partial state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Error)]
pub enum ServerError {
    #[error("name must be non-empty and alphanumeric")]
    InvalidName,

    #[error("nickname is already in use")]
    NameAlreadyInUse,

    #[error("no such user")]
    NoSuchUser,

    #[error("no such channel")]
    NoSuchChannel,

    #[error("channel already exists")]
    ChannelAlreadyExists,

    #[error("user is not in channel")]
    UserNotInChannel,

    #[error("user is not the channel owner")]
    UserNotOwner,

    #[error("cannot join a private channel without an invite")]
    JoinPrivateChannel,

    #[error("cannot invite to a public channel")]
    InviteToPublicChannel,
}

impl ServerError {
    /// Stable code for log fields.
    pub fn code(&self) -> &'static str {
        match self {
            Self::InvalidName => "invalid_name",
            Self::NameAlreadyInUse => "name_already_in_use",
            Self::NoSuchUser => "no_such_user",
            Self::NoSuchChannel => "no_such_channel",
            Self::ChannelAlreadyExists => "channel_already_exists",
            Self::UserNotInChannel => "user_not_in_channel",
            Self::UserNotOwner => "user_not_owner",
            Self::JoinPrivateChannel => "join_private_channel",
            Self::InviteToPublicChannel => "invite_to_public_channel",
        }
    }
}
