use std::collections::BTreeSet;

/// In-memory state for a single channel.
///
/// The owner is always a member. Membership only shrinks through
/// [`Channel::remove_member`], which refuses to drop the owner; removing the
/// owner means deleting the whole channel from the engine instead.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Channel {
    name: String,
    owner: String,
    /// Nicknames of current members, kept sorted.
    members: BTreeSet<String>,
    private: bool,
}

impl Channel {
    pub fn new(name: String, owner: String, private: bool) -> Self {
        let mut members = BTreeSet::new();
        members.insert(owner.clone());
        Self {
            name,
            owner,
            members,
            private,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn owner(&self) -> &str {
        &self.owner
    }

    pub fn is_owner(&self, nickname: &str) -> bool {
        self.owner == nickname
    }

    pub fn is_private(&self) -> bool {
        self.private
    }

    pub fn contains(&self, nickname: &str) -> bool {
        self.members.contains(nickname)
    }

    /// Read-only view of the membership.
    pub fn members(&self) -> &BTreeSet<String> {
        &self.members
    }

    /// Owned snapshot of the membership.
    pub fn member_list(&self) -> BTreeSet<String> {
        self.members.clone()
    }

    pub fn member_count(&self) -> usize {
        self.members.len()
    }

    /// Returns false if the nickname was already a member.
    pub(crate) fn add_member(&mut self, nickname: &str) -> bool {
        self.members.insert(nickname.to_string())
    }

    /// Remove a non-owner member. Returns false if the nickname was not a
    /// member or is the owner.
    pub(crate) fn remove_member(&mut self, nickname: &str) -> bool {
        if self.is_owner(nickname) {
            return false;
        }
        self.members.remove(nickname)
    }

    /// Replace `old` with `new` in the membership and, if `old` owns the
    /// channel, in the owner slot too. No-op when `old` is not a member.
    pub(crate) fn rename_member(&mut self, old: &str, new: &str) {
        if !self.members.remove(old) {
            return;
        }
        self.members.insert(new.to_string());
        if self.owner == old {
            self.owner = new.to_string();
        }
    }
}
