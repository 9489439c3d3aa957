use std::collections::{BTreeMap, BTreeSet};

use super::command::UserId;
use super::error::ServerError;
use super::validation;

/// Prefix of nicknames handed out on registration.
pub const DEFAULT_NICK_PREFIX: &str = "User";

/// Bidirectional mapping between connection ids and nicknames.
/// Nicknames are unique across all registered users.
#[derive(Debug, Default)]
pub struct UserRegistry {
    by_id: BTreeMap<UserId, String>,
    /// Reverse lookup: nickname -> id.
    by_nick: BTreeMap<String, UserId>,
}

impl UserRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a connection under the smallest free `User<N>` nickname.
    /// An id that is already registered gives up its previous nickname.
    pub fn register(&mut self, id: UserId) -> String {
        if let Some(previous) = self.by_id.remove(&id) {
            self.by_nick.remove(&previous);
        }
        let nickname = self.unused_nickname();
        self.by_id.insert(id, nickname.clone());
        self.by_nick.insert(nickname.clone(), id);
        nickname
    }

    /// Remove a connection, returning the nickname it held.
    pub fn deregister(&mut self, id: UserId) -> Result<String, ServerError> {
        let nickname = self.by_id.remove(&id).ok_or(ServerError::NoSuchUser)?;
        self.by_nick.remove(&nickname);
        Ok(nickname)
    }

    /// Change the nickname of `id`, returning the nickname it replaced.
    ///
    /// Checked in order: unknown id, invalid name, name held by any user.
    pub fn rename(&mut self, id: UserId, new_nickname: &str) -> Result<String, ServerError> {
        if !self.by_id.contains_key(&id) {
            return Err(ServerError::NoSuchUser);
        }
        validation::validate_nickname(new_nickname)?;
        if self.by_nick.contains_key(new_nickname) {
            return Err(ServerError::NameAlreadyInUse);
        }

        let old = self
            .by_id
            .insert(id, new_nickname.to_string())
            .ok_or(ServerError::NoSuchUser)?;
        self.by_nick.remove(&old);
        self.by_nick.insert(new_nickname.to_string(), id);
        Ok(old)
    }

    pub fn id_of(&self, nickname: &str) -> Option<UserId> {
        self.by_nick.get(nickname).copied()
    }

    pub fn nickname_of(&self, id: UserId) -> Option<&str> {
        self.by_id.get(&id).map(String::as_str)
    }

    pub fn contains_nickname(&self, nickname: &str) -> bool {
        self.by_nick.contains_key(nickname)
    }

    /// Snapshot of all registered nicknames.
    pub fn nicknames(&self) -> BTreeSet<String> {
        self.by_nick.keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.by_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }

    fn unused_nickname(&self) -> String {
        (0u64..)
            .map(|n| format!("{DEFAULT_NICK_PREFIX}{n}"))
            .find(|candidate| !self.by_nick.contains_key(candidate))
            .unwrap_or_default()
    }
}
