//! Alarm sound playback.

use std::path::PathBuf;

use log::{info, warn};

use super::error::AlarmError;

/// Plays the alarm sound without blocking the caller. Failures after
/// setup are logged and swallowed, never surfaced.
pub trait SoundPlayer: Send {
    fn play(&self);
}

/// Plays a sound file through the default audio output.
#[derive(Debug)]
pub struct AlarmSound {
    path: PathBuf,
}

impl AlarmSound {
    /// Fails with [`AlarmError::SoundNotFound`] if the file does not
    /// exist. The check runs at setup, before the alarm is armed.
    pub fn new(path: PathBuf) -> Result<Self, AlarmError> {
        if !path.exists() {
            return Err(AlarmError::SoundNotFound { path });
        }
        Ok(Self { path })
    }
}

impl SoundPlayer for AlarmSound {
    fn play(&self) {
        info!("Playing sound: {}", self.path.display());

        let path = self.path.clone();
        std::thread::spawn(move || {
            use rodio::{Decoder, OutputStream, Sink};
            use std::fs::File;
            use std::io::BufReader;

            let Ok((_stream, stream_handle)) = OutputStream::try_default() else {
                warn!("No audio output device available");
                return;
            };
            let Ok(file) = File::open(&path) else {
                warn!("Could not open sound file: {}", path.display());
                return;
            };
            let Ok(source) = Decoder::new(BufReader::new(file)) else {
                warn!("Could not decode sound file: {}", path.display());
                return;
            };
            let Ok(sink) = Sink::try_new(&stream_handle) else {
                warn!("Could not open audio sink");
                return;
            };

            sink.append(source);
            sink.sleep_until_end();
        });
    }
}
