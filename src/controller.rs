// Copyright (C) 2026 Michael Wilson <mike@mdwn.dev>
//
// This program is free software: you can redistribute it and/or modify it under
// the terms of the GNU General Public License as published by the Free Software
// Foundation, version 3.
//
// This program is distributed in the hope that it will be useful, but WITHOUT
// ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS
// FOR A PARTICULAR PURPOSE. See the GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License along with
// this program. If not, see <https://www.gnu.org/licenses/>.
//
use std::error::Error;
use std::io;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinError;
use tokio::{sync::mpsc::Sender, task::JoinHandle};
use tracing::{error, info, span, Instrument, Level};

use crate::metronome::Metronome;
use crate::tempo::TimeSignature;

pub mod keyboard;

/// Controller events that will trigger behavior in the metronome.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    /// Starts the beat if stopped, stops it if playing.
    TogglePlay,

    /// Raises the tempo by one tempo step.
    Faster,

    /// Lowers the tempo by one tempo step.
    Slower,

    /// Sets the tempo. Out of range values are clamped.
    SetTempo(u32),

    /// Switches the time signature and resets the beat.
    SetTimeSignature(TimeSignature),

    /// Switches between the dark and light display themes.
    ToggleTheme,

    /// Stops the metronome and ends the session.
    Quit,
}

pub trait Driver: Send + Sync + 'static {
    fn monitor_events(&self, events_tx: Sender<Event>) -> JoinHandle<Result<(), io::Error>>;
}

/// Controls a metronome.
pub struct Controller {
    handle: JoinHandle<()>,
}

impl Controller {
    /// Creates a new controller with the given driver.
    pub fn new(metronome: Metronome, driver: Arc<dyn Driver>) -> Result<Controller, Box<dyn Error>> {
        let span = span!(Level::INFO, "controller");
        Ok(Controller {
            handle: tokio::spawn(Controller::trigger_events(metronome, driver).instrument(span)),
        })
    }

    /// Join will block until the controller finishes.
    pub async fn join(&mut self) -> Result<(), JoinError> {
        (&mut self.handle).await
    }

    /// Applies events from the driver to the metronome until the user quits or
    /// the driver goes away.
    async fn trigger_events(metronome: Metronome, driver: Arc<dyn Driver>) {
        let (events_tx, mut events_rx) = mpsc::channel(1);
        let join_handle = driver.monitor_events(events_tx);

        info!(
            device = metronome.device().to_string(),
            bpm = metronome.snapshot().tempo.bpm(),
            "Controller started."
        );

        while let Some(event) = events_rx.recv().await {
            info!(event = format!("{:?}", event), "Received event.");

            match event {
                Event::TogglePlay => {
                    metronome.toggle_play();
                }
                Event::Faster => {
                    metronome.faster();
                }
                Event::Slower => {
                    metronome.slower();
                }
                Event::SetTempo(bpm) => {
                    metronome.set_tempo(bpm);
                }
                Event::SetTimeSignature(time_signature) => metronome.set_time_signature(time_signature),
                Event::ToggleTheme => {
                    metronome.toggle_theme();
                }
                Event::Quit => break,
            }
        }

        info!("Controller closing.");
        metronome.stop();

        // The keyboard driver may be parked on a read that will never return,
        // so only wait on drivers that have already finished.
        if join_handle.is_finished() {
            match join_handle.await {
                Ok(Err(e)) => error!("Event monitor failed: {}", e),
                Err(e) => error!("Error waiting for event monitor to stop: {}", e),
                Ok(Ok(())) => {}
            }
        }
    }
}

#[cfg(test)]
mod test {
    use std::{error::Error, io, sync::Arc};

    use tokio::{sync::mpsc::Sender, task::JoinHandle};

    use super::{Controller, Driver, Event};
    use crate::{
        audio::mock,
        config,
        metronome::Metronome,
        state::Theme,
        tempo::TimeSignature,
        testutil::within,
    };

    /// A driver that plays back a fixed script of events and then closes.
    struct ScriptDriver {
        events: Vec<Event>,
    }

    impl Driver for ScriptDriver {
        fn monitor_events(&self, events_tx: Sender<Event>) -> JoinHandle<Result<(), io::Error>> {
            let events = self.events.clone();
            tokio::task::spawn_blocking(move || {
                for event in events {
                    // The controller may have hung up after a quit.
                    if events_tx.blocking_send(event).is_err() {
                        break;
                    }
                }
                Ok(())
            })
        }
    }

    async fn run_script(events: Vec<Event>) -> Result<crate::state::Snapshot, Box<dyn Error>> {
        let device = Arc::new(mock::Device::get("mock-device"));
        let metronome = Metronome::new(device, &config::Config::default())?;
        let receiver = metronome.subscribe();

        let mut controller = Controller::new(metronome, Arc::new(ScriptDriver { events }))?;
        within(controller.join(), "Controller never finished").await?;

        let snapshot = *receiver.borrow();
        Ok(snapshot)
    }

    #[tokio::test]
    async fn test_controller_applies_events() -> Result<(), Box<dyn Error>> {
        let snapshot = run_script(vec![
            Event::SetTempo(150),
            Event::Faster,
            Event::Faster,
            Event::Slower,
            Event::SetTimeSignature(TimeSignature::SixEight),
            Event::ToggleTheme,
            Event::TogglePlay,
            Event::Quit,
        ])
        .await?;

        assert_eq!(snapshot.tempo.bpm(), 155);
        assert_eq!(snapshot.time_signature, TimeSignature::SixEight);
        assert_eq!(snapshot.beats_per_measure, 6);
        assert_eq!(snapshot.theme, Theme::Light);
        // Quitting stops the beat.
        assert!(!snapshot.playing);
        Ok(())
    }

    #[tokio::test]
    async fn test_controller_stops_at_quit() -> Result<(), Box<dyn Error>> {
        let snapshot = run_script(vec![Event::SetTempo(90), Event::Quit, Event::SetTempo(60)]).await?;
        assert_eq!(snapshot.tempo.bpm(), 90);
        Ok(())
    }

    #[tokio::test]
    async fn test_controller_stops_when_driver_closes() -> Result<(), Box<dyn Error>> {
        let snapshot = run_script(vec![Event::TogglePlay, Event::SetTempo(300)]).await?;
        assert_eq!(snapshot.tempo.bpm(), 200);
        assert!(!snapshot.playing);
        Ok(())
    }
}
