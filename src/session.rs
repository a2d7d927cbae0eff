//! Session registry: the fixed-capacity table mapping an admitted
//! client to its `(user, permission, outbound channel)`.
//!
//! Guarded by a `parking_lot::Mutex`: admit, release and broadcast all
//! complete without crossing an `.await`.

use parking_lot::Mutex;
use tokio::sync::mpsc::UnboundedSender;

use crate::role::{Permission, RoleStore};

/// Why a client could not be admitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdmitError {
    /// `user` is not listed in the role store.
    Unauthorised,
    /// Every slot in the registry is occupied.
    Full,
}

impl std::fmt::Display for AdmitError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AdmitError::Unauthorised => write!(f, "UNAUTHORISED"),
            AdmitError::Full => write!(f, "FULL"),
        }
    }
}

struct Session {
    user: String,
    permission: Permission,
    outbound: UnboundedSender<String>,
}

/// Opaque handle to an occupied slot, returned by `admit` and consumed
/// by `release`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SlotId(usize);

/// Fixed-capacity table of active sessions.
pub struct SessionRegistry {
    slots: Mutex<Vec<Option<Session>>>,
}

impl SessionRegistry {
    pub fn new(capacity: usize) -> Self {
        let mut slots = Vec::with_capacity(capacity);
        slots.resize_with(capacity, || None);
        Self {
            slots: Mutex::new(slots),
        }
    }

    /// Admit `user`, looking up their permission in `roles`. Allocates
    /// the first free slot and returns its handle, or an `AdmitError`.
    pub fn admit(
        &self,
        user: &str,
        roles: &RoleStore,
        outbound: UnboundedSender<String>,
    ) -> Result<(SlotId, Permission), AdmitError> {
        let permission = roles.lookup(user).ok_or(AdmitError::Unauthorised)?;
        let mut slots = self.slots.lock();
        let index = slots
            .iter()
            .position(|slot| slot.is_none())
            .ok_or(AdmitError::Full)?;
        slots[index] = Some(Session {
            user: user.to_string(),
            permission,
            outbound,
        });
        tracing::info!(user, %permission, slot = index, "session admitted");
        Ok((SlotId(index), permission))
    }

    /// Free `slot`. A slot that is already empty (e.g. released twice) is
    /// silently accepted.
    pub fn release(&self, slot: SlotId) {
        let mut slots = self.slots.lock();
        if let Some(session) = slots.get_mut(slot.0).and_then(Option::take) {
            tracing::info!(user = %session.user, slot = slot.0, "session released");
        }
    }

    /// True while at least one slot is occupied — gates operator `QUIT`.
    pub fn has_active_sessions(&self) -> bool {
        self.slots.lock().iter().any(Option::is_some)
    }

    /// The permission the submitter of a mutator command holds, if they
    /// are still an active session.
    pub fn permission_of(&self, user: &str) -> Option<Permission> {
        self.slots
            .lock()
            .iter()
            .flatten()
            .find(|session| session.user == user)
            .map(|session| session.permission)
    }

    /// Write `delta` to every active session's outbound channel. A
    /// failed send (the session's receiving task already dropped) is
    /// logged and does not stop the rest of the broadcast — every other
    /// session still gets byte-identical text.
    pub fn broadcast(&self, delta: &str) {
        let slots = self.slots.lock();
        for session in slots.iter().flatten() {
            if session.outbound.send(delta.to_string()).is_err() {
                tracing::warn!(user = %session.user, "broadcast send failed, session outbound channel closed");
            }
        }
    }
}
