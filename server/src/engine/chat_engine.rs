use std::collections::{BTreeMap, BTreeSet};

use tracing::{debug, info};

use super::broadcast::{Broadcast, Outcome};
use super::channel::Channel;
use super::command::{Command, CommandKind, UserId};
use super::error::ServerError;
use super::users::UserRegistry;
use super::validation;

/// The central hub that owns all chat state: registered users and live
/// channels. Protocol-agnostic and I/O-free: every call takes one event and
/// returns the [`Broadcast`] the transport must deliver.
///
/// Callers must serialize access; the engine assumes a single writer.
#[derive(Debug, Default)]
pub struct ChatEngine {
    users: UserRegistry,
    /// All live channels, keyed by name.
    channels: BTreeMap<String, Channel>,
}

impl ChatEngine {
    pub fn new() -> Self {
        Self::default()
    }

    // ── Connection lifecycle ────────────────────────────────────────

    /// Register a new connection under a generated nickname.
    pub fn register_user(&mut self, id: UserId) -> Broadcast {
        let nickname = self.users.register(id);
        info!(id, %nickname, "user registered");
        Broadcast::connected(nickname)
    }

    /// Remove a connection and everything hanging off it.
    ///
    /// Recipients are everyone who shared a channel with the user, computed
    /// before any removal. Channels the user owned are deleted outright; in
    /// the rest the user is simply dropped from the membership.
    pub fn deregister_user(&mut self, id: UserId) -> Result<Broadcast, ServerError> {
        let nickname = self
            .users
            .nickname_of(id)
            .ok_or(ServerError::NoSuchUser)?
            .to_string();

        let mut recipients: BTreeSet<String> = self
            .channels
            .values()
            .filter(|ch| ch.contains(&nickname))
            .flat_map(|ch| ch.members().iter().cloned())
            .collect();
        recipients.remove(&nickname);

        self.channels.retain(|name, ch| {
            if ch.is_owner(&nickname) {
                info!(channel = %name, owner = %nickname, "channel deleted (owner disconnected)");
                return false;
            }
            ch.remove_member(&nickname);
            true
        });

        self.users.deregister(id)?;
        info!(id, %nickname, notified = recipients.len(), "user deregistered");
        Ok(Broadcast::disconnected(nickname, recipients))
    }

    // ── Command dispatch ────────────────────────────────────────────

    /// Apply one client command. Never fails: rejections come back as
    /// [`Broadcast::Error`] and leave the state untouched.
    pub fn handle(&mut self, command: Command) -> Broadcast {
        let sender = command.sender.as_str();
        let result = match &command.kind {
            CommandKind::Nickname { new_nickname } => {
                self.change_nickname(command.sender_id, new_nickname)
            }
            CommandKind::Create { channel, private } => {
                self.create_channel(channel, sender, *private)
            }
            CommandKind::Join { channel } => self.join_channel(channel, sender),
            CommandKind::Message { channel, .. } => self.send_message(channel, sender),
            CommandKind::Leave { channel } => self.leave_channel(channel, sender),
            CommandKind::Invite { channel, target } => self.invite_user(channel, sender, target),
            CommandKind::Kick { channel, target } => self.kick_user(channel, sender, target),
        };

        match &result {
            Ok(_) => debug!(command = command.name(), sender = %command.sender, "command applied"),
            Err(e) => debug!(
                command = command.name(),
                sender = %command.sender,
                error = e.code(),
                "command rejected"
            ),
        }

        Broadcast::from_result(command, result)
    }

    /// Rename a user and rewrite every channel that references the old name.
    /// Recipients: the user plus everyone sharing a channel, by new names.
    fn change_nickname(&mut self, id: UserId, new_nickname: &str) -> Result<Outcome, ServerError> {
        let old = self.users.rename(id, new_nickname)?;

        let mut recipients = BTreeSet::from([new_nickname.to_string()]);
        for channel in self.channels.values_mut() {
            if channel.contains(&old) {
                channel.rename_member(&old, new_nickname);
                recipients.extend(channel.members().iter().cloned());
            }
        }

        info!(%old, new = %new_nickname, "nickname changed");
        Ok(Outcome::Okay { recipients })
    }

    fn create_channel(
        &mut self,
        name: &str,
        owner: &str,
        private: bool,
    ) -> Result<Outcome, ServerError> {
        validation::validate_channel_name(name)?;
        if self.channels.contains_key(name) {
            return Err(ServerError::ChannelAlreadyExists);
        }

        let channel = Channel::new(name.to_string(), owner.to_string(), private);
        let recipients = channel.member_list();
        self.channels.insert(name.to_string(), channel);

        info!(channel = %name, %owner, private, "channel created");
        Ok(Outcome::Okay { recipients })
    }

    fn join_channel(&mut self, name: &str, nickname: &str) -> Result<Outcome, ServerError> {
        let channel = self
            .channels
            .get_mut(name)
            .ok_or(ServerError::NoSuchChannel)?;
        if channel.is_private() {
            return Err(ServerError::JoinPrivateChannel);
        }

        channel.add_member(nickname);
        Ok(Outcome::Names {
            recipients: channel.member_list(),
            owner: channel.owner().to_string(),
        })
    }

    fn send_message(&self, name: &str, sender: &str) -> Result<Outcome, ServerError> {
        let channel = self.channels.get(name).ok_or(ServerError::NoSuchChannel)?;
        if !channel.contains(sender) {
            return Err(ServerError::UserNotInChannel);
        }
        Ok(Outcome::Okay {
            recipients: channel.member_list(),
        })
    }

    /// Leaving as owner deletes the channel. Either way the leaver is among
    /// the recipients.
    fn leave_channel(&mut self, name: &str, sender: &str) -> Result<Outcome, ServerError> {
        let channel = self
            .channels
            .get_mut(name)
            .ok_or(ServerError::NoSuchChannel)?;
        if !channel.contains(sender) {
            return Err(ServerError::UserNotInChannel);
        }

        let recipients = channel.member_list();
        if channel.is_owner(sender) {
            self.channels.remove(name);
            info!(channel = %name, owner = %sender, "channel deleted (owner left)");
        } else {
            channel.remove_member(sender);
        }
        Ok(Outcome::Okay { recipients })
    }

    fn invite_user(
        &mut self,
        name: &str,
        sender: &str,
        target: &str,
    ) -> Result<Outcome, ServerError> {
        if !self.users.contains_nickname(target) {
            return Err(ServerError::NoSuchUser);
        }
        let channel = self
            .channels
            .get_mut(name)
            .ok_or(ServerError::NoSuchChannel)?;
        if !channel.is_private() {
            return Err(ServerError::InviteToPublicChannel);
        }
        if !channel.is_owner(sender) {
            return Err(ServerError::UserNotOwner);
        }

        channel.add_member(target);
        Ok(Outcome::Names {
            recipients: channel.member_list(),
            owner: channel.owner().to_string(),
        })
    }

    /// An owner kicking themself deletes the channel. The kicked user is
    /// among the recipients.
    fn kick_user(&mut self, name: &str, sender: &str, target: &str) -> Result<Outcome, ServerError> {
        if !self.users.contains_nickname(target) {
            return Err(ServerError::NoSuchUser);
        }
        let channel = self
            .channels
            .get_mut(name)
            .ok_or(ServerError::NoSuchChannel)?;
        if !channel.contains(target) {
            return Err(ServerError::UserNotInChannel);
        }
        if !channel.is_owner(sender) {
            return Err(ServerError::UserNotOwner);
        }

        let recipients = channel.member_list();
        if sender == target {
            self.channels.remove(name);
            info!(channel = %name, owner = %sender, "channel deleted (owner kicked self)");
        } else {
            channel.remove_member(target);
        }
        Ok(Outcome::Okay { recipients })
    }

    // ── Queries ─────────────────────────────────────────────────────
    // All return owned snapshots sorted by name.

    pub fn user_id(&self, nickname: &str) -> Option<UserId> {
        self.users.id_of(nickname)
    }

    pub fn nickname(&self, id: UserId) -> Option<String> {
        self.users.nickname_of(id).map(str::to_string)
    }

    pub fn registered_users(&self) -> BTreeSet<String> {
        self.users.nicknames()
    }

    pub fn channels(&self) -> BTreeSet<String> {
        self.channels.keys().cloned().collect()
    }

    /// Members of a channel; empty if the channel does not exist.
    pub fn users_in_channel(&self, name: &str) -> BTreeSet<String> {
        self.channels
            .get(name)
            .map(Channel::member_list)
            .unwrap_or_default()
    }

    pub fn owner(&self, name: &str) -> Option<String> {
        self.channels.get(name).map(|ch| ch.owner().to_string())
    }

    pub fn is_private(&self, name: &str) -> Option<bool> {
        self.channels.get(name).map(Channel::is_private)
    }
}
