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
use std::{error::Error, sync::Arc, time::Duration};

use parking_lot::Mutex;
use tokio::{runtime::Handle, sync::watch};
use tracing::{debug, info, span, trace, Level, Span};

use crate::{
    audio::Device,
    click::SoundPool,
    config,
    scheduler::BeatScheduler,
    state::{MetronomeState, Snapshot, Theme},
    tempo::{Tempo, TimeSignature},
};

/// Everything a tick touches. Transitions and ticks are serialized on this.
struct Core {
    state: MetronomeState,
    pool: SoundPool,
}

/// Owns the metronome state, the beat scheduler and the sound pool. All state
/// changes go through the methods here, which keep the scheduler consistent
/// with the state: one timer while playing, none while stopped.
pub struct Metronome {
    /// The device backing the pool's clips. Kept alive for as long as the pool.
    device: Arc<dyn Device>,
    core: Arc<Mutex<Core>>,
    /// Always locked after the core.
    scheduler: Mutex<BeatScheduler>,
    snapshots: Arc<watch::Sender<Snapshot>>,
    tempo_step: u32,
    /// The logging span.
    span: Span,
}

impl Metronome {
    /// Creates a new metronome on the current tokio runtime, building the sound
    /// pool on the given device.
    pub fn new(device: Arc<dyn Device>, config: &config::Config) -> Result<Metronome, Box<dyn Error>> {
        let runtime = Handle::try_current()?;
        let pool = SoundPool::from_device(
            device.as_ref(),
            config.click().pool_size(),
            config.click().volume(),
            config.click().policy(),
        )?;
        let settings = config.metronome();
        let state = MetronomeState::new(
            settings.tempo(),
            settings.time_signature()?,
            settings.theme(),
        );

        Ok(Metronome::with_pool(
            device,
            pool,
            state,
            settings.tempo_step(),
            runtime,
        ))
    }

    fn with_pool(
        device: Arc<dyn Device>,
        pool: SoundPool,
        state: MetronomeState,
        tempo_step: u32,
        runtime: Handle,
    ) -> Metronome {
        let (snapshots, _) = watch::channel(state.snapshot());
        let span = span!(Level::INFO, "metronome");
        {
            let _enter = span.enter();
            info!(
                device = device.to_string(),
                bpm = state.tempo().bpm(),
                time_signature = state.time_signature().as_str(),
                pool = ?pool,
                "Metronome ready."
            );
        }

        Metronome {
            device,
            core: Arc::new(Mutex::new(Core { state, pool })),
            scheduler: Mutex::new(BeatScheduler::new(runtime)),
            snapshots: Arc::new(snapshots),
            tempo_step,
            span,
        }
    }

    /// Sets the tempo, clamped to the supported range. A running beat picks up
    /// the new interval immediately.
    pub fn set_tempo(&self, bpm: u32) -> Tempo {
        self.change_tempo(|_| Tempo::new(bpm))
    }

    /// Raises the tempo by one tempo step.
    pub fn faster(&self) -> Tempo {
        let step = self.step();
        self.change_tempo(|tempo| tempo.offset(step))
    }

    /// Lowers the tempo by one tempo step.
    pub fn slower(&self) -> Tempo {
        let step = self.step();
        self.change_tempo(|tempo| tempo.offset(-step))
    }

    fn step(&self) -> i32 {
        i32::try_from(self.tempo_step).unwrap_or(i32::MAX)
    }

    fn change_tempo<F>(&self, change: F) -> Tempo
    where
        F: FnOnce(Tempo) -> Tempo,
    {
        let _enter = self.span.enter();
        let mut core = self.core.lock();
        let tempo = change(core.state.tempo());
        if core.state.set_tempo(tempo) {
            info!(bpm = tempo.bpm(), "Tempo changed.");
            if core.state.is_playing() {
                self.rearm(&mut core);
            }
            self.publish(&core);
        }
        core.state.tempo()
    }

    /// Starts or stops the beat. Starting resets the beat to zero; the first
    /// click comes one interval later. Returns true if now playing.
    pub fn toggle_play(&self) -> bool {
        let _enter = self.span.enter();
        let mut core = self.core.lock();
        let playing = core.state.toggle_play();
        info!(playing, "Playback toggled.");
        self.rearm(&mut core);
        self.publish(&core);
        playing
    }

    /// Stops the beat if it is playing.
    pub fn stop(&self) {
        let _enter = self.span.enter();
        let mut core = self.core.lock();
        if core.state.stop() {
            info!("Playback stopped.");
            self.rearm(&mut core);
            self.publish(&core);
        }
    }

    /// Changes the time signature and resets the beat to zero. A running beat
    /// restarts its cycle.
    pub fn set_time_signature(&self, time_signature: TimeSignature) {
        let _enter = self.span.enter();
        let mut core = self.core.lock();
        core.state.set_time_signature(time_signature);
        info!(
            time_signature = time_signature.as_str(),
            beats_per_measure = time_signature.beats_per_measure(),
            "Time signature changed."
        );
        if core.state.is_playing() {
            self.rearm(&mut core);
        }
        self.publish(&core);
    }

    pub fn toggle_theme(&self) -> Theme {
        let _enter = self.span.enter();
        let mut core = self.core.lock();
        let theme = core.state.toggle_theme();
        debug!(theme = theme.to_string(), "Theme changed.");
        self.publish(&core);
        theme
    }

    /// Returns a copy of the current state.
    pub fn snapshot(&self) -> Snapshot {
        self.core.lock().state.snapshot()
    }

    /// Returns a receiver that sees every state change.
    pub fn subscribe(&self) -> watch::Receiver<Snapshot> {
        self.snapshots.subscribe()
    }

    /// Returns true if a beat timer is outstanding.
    pub fn is_timer_armed(&self) -> bool {
        self.scheduler.lock().is_armed()
    }

    /// The period of the outstanding beat timer.
    pub fn timer_period(&self) -> Option<Duration> {
        self.scheduler.lock().period()
    }

    pub fn device(&self) -> &Arc<dyn Device> {
        &self.device
    }

    /// Tears down the current timer and, if playing, arms a new one at the
    /// current tempo. Ticks from any earlier timer are discarded by the epoch
    /// check even if they were already in flight.
    fn rearm(&self, core: &mut Core) {
        let epoch = core.state.next_epoch();
        let mut scheduler = self.scheduler.lock();
        if !core.state.is_playing() {
            scheduler.stop();
            return;
        }

        let tick_core = self.core.clone();
        let snapshots = self.snapshots.clone();
        let span = self.span.clone();
        scheduler.start(core.state.tempo().interval(), move || {
            let _enter = span.enter();
            let mut core = tick_core.lock();
            if !core.state.is_playing() || core.state.epoch() != epoch {
                trace!(epoch, "Discarding stale tick.");
                return;
            }
            let beat = core.state.advance_beat();
            let clip = core.pool.play_click();
            trace!(beat, clip, "Tick.");
            snapshots.send_replace(core.state.snapshot());
        });
    }

    fn publish(&self, core: &Core) {
        self.snapshots.send_replace(core.state.snapshot());
    }
}
