//! Room Membership: which rooms this client asked to be in.

use std::collections::BTreeSet;

use pulse_protocol::RoomId;

/// Requested room membership.
///
/// Join/leave are fire-and-forget intents with no server acknowledgement,
/// so this reflects what was *requested*, not what the server confirmed.
/// Kept sorted so views compare and render deterministically.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RoomMembership {
    joined: BTreeSet<RoomId>,
}

impl RoomMembership {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a join intent. Returns `false` if already requested.
    pub fn join(&mut self, room: RoomId) -> bool {
        self.joined.insert(room)
    }

    /// Records a leave intent. Returns `false` if the room wasn't joined.
    pub fn leave(&mut self, room: &RoomId) -> bool {
        self.joined.remove(room)
    }

    pub fn contains(&self, room: &RoomId) -> bool {
        self.joined.contains(room)
    }

    pub fn clear(&mut self) {
        self.joined.clear();
    }

    pub fn iter(&self) -> impl Iterator<Item = &RoomId> {
        self.joined.iter()
    }

    pub fn len(&self) -> usize {
        self.joined.len()
    }

    pub fn is_empty(&self) -> bool {
        self.joined.is_empty()
    }
}
