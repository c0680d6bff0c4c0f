//! Log-based playback adapter.
//!
//! Implements [`PlaybackPort`] by writing every command to the logger
//! (UART / USB-CDC in production).  Stands in for the audio engine on
//! boards without a codec and in simulation; a real engine implements the
//! same trait.

use log::info;

use crate::app::ports::PlaybackPort;

pub struct LogPlayback {
    current: Option<String>,
    paused: bool,
    volume: u8,
}

impl Default for LogPlayback {
    fn default() -> Self {
        Self::new()
    }
}

impl LogPlayback {
    pub fn new() -> Self {
        Self {
            current: None,
            paused: false,
            volume: 50,
        }
    }

    /// Playlist most recently started.
    pub fn current(&self) -> Option<&str> {
        self.current.as_deref()
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }
}

impl PlaybackPort for LogPlayback {
    fn play(&mut self, playlist: &str) -> anyhow::Result<()> {
        info!("PLAY  | playlist='{playlist}' volume={}", self.volume);
        self.current = Some(playlist.into());
        self.paused = false;
        Ok(())
    }

    fn pause(&mut self) -> anyhow::Result<()> {
        info!("PAUSE | playlist={:?}", self.current);
        self.paused = true;
        Ok(())
    }

    fn next(&mut self) -> anyhow::Result<()> {
        info!("NEXT  | playlist={:?}", self.current);
        Ok(())
    }

    fn previous(&mut self) -> anyhow::Result<()> {
        info!("PREV  | playlist={:?}", self.current);
        Ok(())
    }

    fn volume(&self) -> u8 {
        self.volume
    }

    fn set_volume(&mut self, volume: u8) -> anyhow::Result<()> {
        anyhow::ensure!(volume <= 100, "volume {volume} out of range");
        info!("VOL   | {} -> {volume}", self.volume);
        self.volume = volume;
        Ok(())
    }
}
