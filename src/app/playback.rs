//! Glue between tag detection and the audio engine.
//!
//! - [`TagPlayback`] is the standard playback subscriber: it resolves the
//!   tag's playlist and starts it.
//! - [`apply_feedback`] maps engine status reports onto LED states.

use log::{debug, info};

use super::events::PlaybackStatus;
use super::ports::{LedFeedback, PlaybackPort, PlaylistDirectory};
use crate::led::LedState;
use crate::nfc::TagId;
use crate::nfc::coordinator::PlaybackCallback;

pub struct TagPlayback<P: PlaybackPort, D: PlaylistDirectory> {
    player: P,
    directory: D,
    started: u32,
}

impl<P: PlaybackPort, D: PlaylistDirectory> TagPlayback<P, D> {
    pub fn new(player: P, directory: D) -> Self {
        Self {
            player,
            directory,
            started: 0,
        }
    }

    /// Start the playlist linked to `uid`.  Unlinked tags are ignored.
    pub fn on_tag(&mut self, uid: &str) -> anyhow::Result<()> {
        let tag = TagId::parse(uid)?;
        match self.directory.playlist_for(&tag)? {
            Some(playlist) => {
                info!("tag {tag} -> playlist '{playlist}'");
                self.player.play(&playlist)?;
                self.started += 1;
            }
            None => debug!("tag {tag} has no playlist"),
        }
        Ok(())
    }

    /// Playlists started so far.
    pub fn started(&self) -> u32 {
        self.started
    }

    pub fn player(&self) -> &P {
        &self.player
    }

    /// Box into a coordinator subscriber.
    pub fn into_callback(mut self) -> PlaybackCallback
    where
        P: 'static,
        D: 'static,
    {
        Box::new(move |uid| self.on_tag(uid))
    }
}

/// Reflect an engine status change on the LED stack.
pub fn apply_feedback<L: LedFeedback + ?Sized>(leds: &L, status: PlaybackStatus) {
    match status {
        PlaybackStatus::Playing => {
            leds.clear(LedState::Paused);
            leds.clear(LedState::ErrorPlayback);
            leds.set(LedState::Playing);
        }
        PlaybackStatus::Paused => {
            leds.clear(LedState::Playing);
            leds.set(LedState::Paused);
        }
        PlaybackStatus::Stopped => {
            leds.clear(LedState::Playing);
            leds.clear(LedState::Paused);
        }
        PlaybackStatus::Error => {
            leds.clear(LedState::Playing);
            leds.clear(LedState::Paused);
            leds.set(LedState::ErrorPlayback);
        }
    }
}
