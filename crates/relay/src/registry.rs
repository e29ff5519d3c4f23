//! RoomRegistry - room membership and broadcast routing
//!
//! Two maps behind one lock:
//! - `rooms`: room id → members keyed by member id
//! - `member_rooms`: member id → current room
//!
//! Every operation updates both under the same guard, so a member is never
//! visible in two rooms and a broadcast never sees a half-removed member.

use std::collections::HashMap;
use std::sync::Arc;

use contracts::{MemberId, RoomId, RoomMember};
use parking_lot::Mutex;
use tracing::{debug, trace};

type Members = HashMap<MemberId, Arc<dyn RoomMember>>;

#[derive(Default)]
struct Rooms {
    rooms: HashMap<RoomId, Members>,
    member_rooms: HashMap<MemberId, RoomId>,
}

impl Rooms {
    fn remove_member(&mut self, member_id: &MemberId) -> Option<RoomId> {
        let room_id = self.member_rooms.remove(member_id)?;
        if let Some(members) = self.rooms.get_mut(&room_id) {
            members.remove(member_id);
            if members.is_empty() {
                self.rooms.remove(&room_id);
                debug!(room_id = %room_id, "room removed");
            }
        }
        Some(room_id)
    }
}

/// Shared room registry
#[derive(Default)]
pub struct RoomRegistry {
    inner: Mutex<Rooms>,
}

impl RoomRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Put `member` into `room_id`, leaving its previous room first.
    ///
    /// Returns the room the member was in before, if any.
    pub fn join(&self, room_id: RoomId, member: Arc<dyn RoomMember>) -> Option<RoomId> {
        let member_id = member.id().clone();
        let mut inner = self.inner.lock();

        let previous = inner.remove_member(&member_id);
        inner
            .rooms
            .entry(room_id.clone())
            .or_default()
            .insert(member_id.clone(), member);
        inner.member_rooms.insert(member_id, room_id);
        previous
    }

    /// Remove the member from its room. Empty rooms are deleted.
    pub fn leave(&self, member_id: &MemberId) -> Option<RoomId> {
        self.inner.lock().remove_member(member_id)
    }

    pub fn current_room(&self, member_id: &MemberId) -> Option<RoomId> {
        self.inner.lock().member_rooms.get(member_id).cloned()
    }

    /// Snapshot of a room's members (empty if the room does not exist)
    pub fn members_of(&self, room_id: &RoomId) -> Vec<Arc<dyn RoomMember>> {
        self.inner
            .lock()
            .rooms
            .get(room_id)
            .map(|members| members.values().cloned().collect())
            .unwrap_or_default()
    }

    /// Queue `text` to every open member of `room_id`.
    ///
    /// Closed members and full queues are skipped. Returns how many members
    /// accepted the frame.
    pub fn broadcast(&self, room_id: &RoomId, text: Arc<str>) -> usize {
        let inner = self.inner.lock();
        let Some(members) = inner.rooms.get(room_id) else {
            return 0;
        };

        members
            .values()
            .filter(|member| {
                if !member.is_open() {
                    trace!(member_id = %member.id(), "skipping closed member");
                    return false;
                }
                member.send_text(text.clone())
            })
            .count()
    }

    pub fn room_count(&self) -> usize {
        self.inner.lock().rooms.len()
    }

    /// Members across all rooms
    pub fn member_count(&self) -> usize {
        self.inner.lock().member_rooms.len()
    }
}
