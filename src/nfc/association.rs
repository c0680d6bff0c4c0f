//! Tag↔playlist association sessions.
//!
//! While at least one session is active the coordinator routes every tag
//! into [`AssociationSessionRegistry::process_tag`] instead of playback.
//! Sessions are visited oldest first; each one re-reads the tag's current
//! link so a later session sees the link an earlier one just wrote.

use core::fmt;
use core::time::Duration;

use log::{info, warn};
use serde::Serialize;

use super::{PlaylistId, TagId};
use crate::app::ports::PlaylistDirectory;
use crate::error::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct SessionId(pub u32);

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    Active,
    Cancelled,
    Expired,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AssociationSession {
    pub id: SessionId,
    pub playlist_id: PlaylistId,
    pub created_at_ms: u64,
    pub timeout_at_ms: u64,
    /// Relink tags that already belong to another playlist.
    pub override_mode: bool,
    pub status: SessionStatus,
}

impl AssociationSession {
    pub fn is_expired(&self, now_ms: u64) -> bool {
        self.timeout_at_ms <= now_ms
    }
}

// ---------------------------------------------------------------------------
// Outcomes
// ---------------------------------------------------------------------------

/// Result of handing a tag to a session (or of a normal-mode detection),
/// as delivered to association subscribers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "action", rename_all = "snake_case", rename_all_fields = "camelCase")]
pub enum AssociationOutcome {
    /// The tag now points at the session's playlist.
    Associated {
        tag: TagId,
        playlist_id: PlaylistId,
        session_id: SessionId,
    },
    /// The tag belongs to another playlist and the session may not override.
    AlreadyAssociatedDuplicate {
        tag: TagId,
        existing_playlist_id: PlaylistId,
        requested_playlist_id: PlaylistId,
        session_id: SessionId,
    },
    /// The tag was moved from `previous_playlist_id` to `playlist_id`.
    AlreadyAssociatedUpdated {
        tag: TagId,
        playlist_id: PlaylistId,
        previous_playlist_id: PlaylistId,
        session_id: SessionId,
    },
    /// Normal-mode detection of a linked tag.
    TagDetected { tag: TagId, playlist_id: PlaylistId },
    /// Normal-mode detection of a tag with no playlist.
    TagDetectedUnassociated { tag: TagId },
}

impl AssociationOutcome {
    pub fn tag(&self) -> &TagId {
        match self {
            Self::Associated { tag, .. }
            | Self::AlreadyAssociatedDuplicate { tag, .. }
            | Self::AlreadyAssociatedUpdated { tag, .. }
            | Self::TagDetected { tag, .. }
            | Self::TagDetectedUnassociated { tag } => tag,
        }
    }

    /// The tag ended up linked to the session's playlist.
    pub fn is_linked(&self) -> bool {
        matches!(
            self,
            Self::Associated { .. } | Self::AlreadyAssociatedUpdated { .. }
        )
    }

    pub fn is_duplicate(&self) -> bool {
        matches!(self, Self::AlreadyAssociatedDuplicate { .. })
    }
}

// ---------------------------------------------------------------------------
// Registry
// ---------------------------------------------------------------------------

#[derive(Debug, Default)]
pub struct AssociationSessionRegistry {
    /// Active sessions in creation order.
    sessions: Vec<AssociationSession>,
    next_id: u32,
}

impl AssociationSessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Open a new session.  Several sessions may target the same playlist.
    pub fn start(
        &mut self,
        playlist_id: &str,
        timeout: Duration,
        override_mode: bool,
        now_ms: u64,
    ) -> AssociationSession {
        self.next_id = self.next_id.wrapping_add(1);
        let session = AssociationSession {
            id: SessionId(self.next_id),
            playlist_id: playlist_id.into(),
            created_at_ms: now_ms,
            timeout_at_ms: now_ms.saturating_add(timeout.as_millis() as u64),
            override_mode,
            status: SessionStatus::Active,
        };
        info!(
            "association {} started for playlist '{}' (override={}, {} ms)",
            session.id,
            session.playlist_id,
            override_mode,
            timeout.as_millis()
        );
        self.sessions.push(session.clone());
        session
    }

    /// Cancel an active session.  Returns `false` if it is unknown or gone.
    pub fn stop(&mut self, id: SessionId) -> bool {
        match self.finish(id, SessionStatus::Cancelled) {
            Some(session) => {
                info!("association {} cancelled", session.id);
                true
            }
            None => false,
        }
    }

    /// Expire every session whose deadline has passed.
    pub fn sweep_expired(&mut self, now_ms: u64) -> usize {
        let expired: Vec<SessionId> = self
            .sessions
            .iter()
            .filter(|s| s.is_expired(now_ms))
            .map(|s| s.id)
            .collect();
        for id in &expired {
            if let Some(session) = self.finish(*id, SessionStatus::Expired) {
                info!(
                    "association {} for '{}' expired",
                    session.id, session.playlist_id
                );
            }
        }
        expired.len()
    }

    pub fn session(&self, id: SessionId) -> Result<&AssociationSession> {
        self.sessions
            .iter()
            .find(|s| s.id == id)
            .ok_or(Error::SessionNotFound(id))
    }

    pub fn active_sessions(&self) -> Vec<AssociationSession> {
        self.sessions.clone()
    }

    pub fn has_active(&self) -> bool {
        !self.sessions.is_empty()
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    /// Apply `tag` to every active session, oldest first.
    pub fn process_tag<D>(&self, tag: &TagId, directory: &D) -> Vec<AssociationOutcome>
    where
        D: PlaylistDirectory + ?Sized,
    {
        let mut outcomes = Vec::with_capacity(self.sessions.len());
        for session in &self.sessions {
            match apply_to_session(session, tag, directory) {
                Ok(outcome) => outcomes.push(outcome),
                Err(e) => warn!("association {} skipped tag {tag}: {e}", session.id),
            }
        }
        outcomes
    }

    fn finish(&mut self, id: SessionId, status: SessionStatus) -> Option<AssociationSession> {
        let idx = self.sessions.iter().position(|s| s.id == id)?;
        let mut session = self.sessions.remove(idx);
        debug_assert_eq!(session.status, SessionStatus::Active);
        session.status = status;
        Some(session)
    }
}

fn apply_to_session<D>(
    session: &AssociationSession,
    tag: &TagId,
    directory: &D,
) -> Result<AssociationOutcome>
where
    D: PlaylistDirectory + ?Sized,
{
    let requested = &session.playlist_id;
    let outcome = match directory.playlist_for(tag)? {
        None => {
            directory.link(tag, requested)?;
            AssociationOutcome::Associated {
                tag: tag.clone(),
                playlist_id: requested.clone(),
                session_id: session.id,
            }
        }
        Some(existing) if existing == *requested => AssociationOutcome::Associated {
            tag: tag.clone(),
            playlist_id: existing,
            session_id: session.id,
        },
        Some(existing) if session.override_mode => {
            directory.link(tag, requested)?;
            AssociationOutcome::AlreadyAssociatedUpdated {
                tag: tag.clone(),
                playlist_id: requested.clone(),
                previous_playlist_id: existing,
                session_id: session.id,
            }
        }
        Some(existing) => AssociationOutcome::AlreadyAssociatedDuplicate {
            tag: tag.clone(),
            existing_playlist_id: existing,
            requested_playlist_id: requested.clone(),
            session_id: session.id,
        },
    };
    Ok(outcome)
}
