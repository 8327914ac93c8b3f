//! Presence Tracker: who else is online.

use std::collections::HashSet;

use pulse_protocol::UserId;

/// The set of users currently online, as last reported by the server.
///
/// There is no add/remove: the only way in is [`replace`](Self::replace)
/// with a full server snapshot, and the only way out is
/// [`clear`](Self::clear) when the connection leaves `Open`. Members keep
/// the server's order; duplicates in a snapshot are collapsed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PresenceSet {
    members: Vec<UserId>,
}

impl PresenceSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Supersedes the whole set with `snapshot`.
    pub fn replace(&mut self, snapshot: Vec<UserId>) {
        let mut seen = HashSet::with_capacity(snapshot.len());
        self.members = snapshot
            .into_iter()
            .filter(|user| seen.insert(user.clone()))
            .collect();
    }

    pub fn clear(&mut self) {
        self.members.clear();
    }

    pub fn members(&self) -> &[UserId] {
        &self.members
    }

    pub fn contains(&self, user: &UserId) -> bool {
        self.members.contains(user)
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn users(ids: &[&str]) -> Vec<UserId> {
        ids.iter().map(|id| UserId::new(*id)).collect()
    }

    #[test]
    fn test_replace_is_total_not_merged() {
        let mut presence = PresenceSet::new();
        presence.replace(users(&["u1", "u2"]));
        presence.replace(users(&["u3"]));

        assert_eq!(presence.members(), users(&["u3"]).as_slice());
        assert!(!presence.contains(&UserId::new("u1")));
    }

    #[test]
    fn test_replace_keeps_order_and_drops_duplicates() {
        let mut presence = PresenceSet::new();
        presence.replace(users(&["u2", "u1", "u2"]));
        assert_eq!(presence.members(), users(&["u2", "u1"]).as_slice());
    }

    #[test]
    fn test_replace_with_empty_snapshot_empties_set() {
        let mut presence = PresenceSet::new();
        presence.replace(users(&["u1"]));
        presence.replace(Vec::new());
        assert!(presence.is_empty());
    }
}
