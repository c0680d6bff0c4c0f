//! In-memory playlist directory.
//!
//! Implements [`PlaylistDirectory`] over a `HashMap`.  Used on the host and
//! as the device's volatile cache until a persistent store is attached.

use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};

use log::info;

use crate::app::ports::PlaylistDirectory;
use crate::error::Result;
use crate::nfc::{PlaylistId, TagId};

#[derive(Debug, Default)]
pub struct MemoryDirectory {
    links: Mutex<HashMap<TagId, PlaylistId>>,
}

impl MemoryDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pre-populate from `(uid, playlist)` pairs; malformed UIDs are skipped.
    pub fn with_links<'a>(links: impl IntoIterator<Item = (&'a str, &'a str)>) -> Self {
        let map = links
            .into_iter()
            .filter_map(|(uid, playlist)| Some((TagId::parse(uid).ok()?, playlist.into())))
            .collect();
        Self {
            links: Mutex::new(map),
        }
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn unlink(&self, tag: &TagId) -> Option<PlaylistId> {
        self.lock().remove(tag)
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<TagId, PlaylistId>> {
        self.links.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl PlaylistDirectory for MemoryDirectory {
    fn playlist_for(&self, tag: &TagId) -> Result<Option<PlaylistId>> {
        Ok(self.lock().get(tag).cloned())
    }

    fn link(&self, tag: &TagId, playlist: &str) -> Result<Option<PlaylistId>> {
        let previous = self.lock().insert(tag.clone(), playlist.into());
        info!("DIR | {tag} -> '{playlist}' (was {previous:?})");
        Ok(previous)
    }
}
