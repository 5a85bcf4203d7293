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
use std::{
    error::Error,
    fmt,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    thread,
    time::Duration,
};

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::Sample;
use tracing::{error, info, span, Level};

use super::voice::Voice;
use super::{AudioError, Clip as AudioClip, Device as AudioDevice};
use crate::click::{self, LoadedClip};
use crate::config;

/// The device name that selects the host's default output device.
const DEFAULT_DEVICE: &str = "default";

/// How often the output thread checks whether it should shut down.
const SHUTDOWN_POLL: Duration = Duration::from_millis(50);

/// A small wrapper around a cpal::Device. Once opened, it owns the output
/// stream that all click voices are mixed into.
pub struct Device {
    /// The name of the device.
    name: String,
    /// The maximum number of channels the device supports.
    max_channels: u16,
    /// The host ID of the device.
    host_id: cpal::HostId,
    /// The underlying cpal device.
    device: cpal::Device,
    /// The running output, if the device has been opened for playback.
    output: Option<Output>,
}

/// Owns the output thread and the channel used to hand new voices to the
/// output callback.
struct Output {
    /// The sample rate the stream runs at.
    sample_rate: u32,
    /// The decoded click, resampled to the stream's rate.
    clip: LoadedClip,
    /// New voices are registered with the callback through this channel.
    voice_tx: crossbeam_channel::Sender<Arc<Voice>>,
    /// Cleared if the stream reports an error.
    stream_alive: Arc<AtomicBool>,
    /// Set to ask the output thread to drop the stream and exit.
    shutdown: Arc<AtomicBool>,
    /// Handle to the output thread (keeps the stream alive).
    output_thread: Option<thread::JoinHandle<()>>,
}

impl fmt::Display for Device {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} (Channels={}) ({})",
            self.name,
            self.max_channels,
            self.host_id.name()
        )
    }
}

/// Builds an output stream of the given sample type. The callback mixes every
/// registered voice into a mono buffer and copies it to all output channels.
fn build_stream<T>(
    device: &cpal::Device,
    config: &cpal::StreamConfig,
    voice_rx: crossbeam_channel::Receiver<Arc<Voice>>,
    stream_alive: Arc<AtomicBool>,
) -> Result<cpal::Stream, cpal::BuildStreamError>
where
    T: cpal::SizedSample + cpal::FromSample<f32>,
{
    let channels = config.channels.max(1) as usize;
    let mut voices: Vec<Arc<Voice>> = Vec::new();
    let mut mono: Vec<f32> = Vec::new();

    device.build_output_stream(
        config,
        move |data: &mut [T], _: &cpal::OutputCallbackInfo| {
            while let Ok(voice) = voice_rx.try_recv() {
                voices.push(voice);
            }

            let frames = data.len() / channels;
            mono.clear();
            mono.resize(frames, 0.0);
            for voice in voices.iter() {
                voice.mix_into(&mut mono);
            }

            for (frame, sample) in data.chunks_mut(channels).zip(mono.iter()) {
                frame.fill(T::from_sample(sample.clamp(-1.0, 1.0)));
            }
        },
        move |err| {
            error!(err = err.to_string(), "CPAL output stream error");
            stream_alive.store(false, Ordering::Release);
        },
        None,
    )
}

impl Output {
    /// Starts the output thread. The stream is created inside the thread, as
    /// cpal streams can't be moved between threads. Returns once the stream is
    /// playing or has failed to start.
    fn start(
        device: cpal::Device,
        supported: cpal::SupportedStreamConfig,
        clip: LoadedClip,
    ) -> Result<Output, AudioError> {
        let (voice_tx, voice_rx) = crossbeam_channel::unbounded();
        let (ready_tx, ready_rx) = crossbeam_channel::bounded::<Result<(), AudioError>>(1);
        let stream_alive = Arc::new(AtomicBool::new(true));
        let shutdown = Arc::new(AtomicBool::new(false));
        let sample_rate = supported.sample_rate().0;

        let output_thread = {
            let stream_alive = stream_alive.clone();
            let shutdown = shutdown.clone();
            thread::spawn(move || {
                let sample_format = supported.sample_format();
                let config = supported.config();
                let stream_result = match sample_format {
                    cpal::SampleFormat::F32 => {
                        build_stream::<f32>(&device, &config, voice_rx, stream_alive.clone())
                    }
                    cpal::SampleFormat::F64 => {
                        build_stream::<f64>(&device, &config, voice_rx, stream_alive.clone())
                    }
                    cpal::SampleFormat::I16 => {
                        build_stream::<i16>(&device, &config, voice_rx, stream_alive.clone())
                    }
                    cpal::SampleFormat::I32 => {
                        build_stream::<i32>(&device, &config, voice_rx, stream_alive.clone())
                    }
                    cpal::SampleFormat::U16 => {
                        build_stream::<u16>(&device, &config, voice_rx, stream_alive.clone())
                    }
                    other => {
                        let _ = ready_tx.send(Err(AudioError::UnsupportedSampleFormat(
                            format!("{:?}", other),
                        )));
                        return;
                    }
                };

                let stream = match stream_result {
                    Ok(stream) => stream,
                    Err(e) => {
                        let _ = ready_tx.send(Err(AudioError::Backend(e.to_string())));
                        return;
                    }
                };
                if let Err(e) = stream.play() {
                    let _ = ready_tx.send(Err(AudioError::Backend(e.to_string())));
                    return;
                }
                info!(
                    sample_rate = config.sample_rate.0,
                    channels = config.channels,
                    "CPAL output stream started successfully"
                );
                let _ = ready_tx.send(Ok(()));

                // Keep the stream alive until we're asked to stop.
                while !shutdown.load(Ordering::Acquire) {
                    thread::sleep(SHUTDOWN_POLL);
                }
                drop(stream);
                stream_alive.store(false, Ordering::Release);
                info!("CPAL output stream stopped");
            })
        };

        let mut output = Output {
            sample_rate,
            clip,
            voice_tx,
            stream_alive,
            shutdown,
            output_thread: Some(output_thread),
        };

        match ready_rx.recv() {
            Ok(Ok(())) => Ok(output),
            Ok(Err(e)) => Err(e),
            Err(_) => {
                // The thread exited without reporting; make sure it's gone.
                if let Some(thread) = output.output_thread.take() {
                    let _ = thread.join();
                }
                Err(AudioError::StreamUnavailable)
            }
        }
    }
}

impl Drop for Output {
    fn drop(&mut self) {
        self.shutdown.store(true, Ordering::Release);
        if let Some(thread) = self.output_thread.take() {
            let _ = thread.join();
        }
    }
}

impl Device {
    /// Lists cpal devices and produces the Device trait.
    pub fn list() -> Result<Vec<Box<dyn AudioDevice>>, Box<dyn Error>> {
        Ok(Device::list_cpal_devices()?
            .into_iter()
            .map(|device| {
                let device: Box<dyn AudioDevice> = Box::new(device);
                device
            })
            .collect())
    }

    /// Lists cpal devices that have at least one output channel.
    fn list_cpal_devices() -> Result<Vec<Device>, Box<dyn Error>> {
        // Suppress noisy output here.
        let _shh_stdout = shh::stdout()?;
        let _shh_stderr = shh::stderr()?;

        let mut devices: Vec<Device> = Vec::new();
        for host_id in cpal::available_hosts() {
            let host_devices = match cpal::host_from_id(host_id)?.output_devices() {
                Ok(host_devices) => host_devices,
                Err(e) => {
                    error!(
                        err = e.to_string(),
                        host = host_id.name(),
                        "Unable to list devices for host"
                    );
                    continue;
                }
            };

            for device in host_devices {
                let max_channels = match device.supported_output_configs() {
                    Ok(configs) => configs.map(|config| config.channels()).max().unwrap_or(0),
                    Err(_) => continue,
                };

                if max_channels > 0 {
                    devices.push(Device {
                        name: device.name()?,
                        max_channels,
                        host_id,
                        device,
                        output: None,
                    })
                }
            }
        }

        devices.sort_by_key(|device| device.name.to_string());
        Ok(devices)
    }

    /// Gets the host's default output device.
    fn default_device() -> Result<Device, Box<dyn Error>> {
        let host = cpal::default_host();
        let device = host
            .default_output_device()
            .ok_or_else(|| AudioError::DeviceNotFound(DEFAULT_DEVICE.to_string()))?;
        let max_channels = device
            .supported_output_configs()?
            .map(|config| config.channels())
            .max()
            .unwrap_or(0);

        Ok(Device {
            name: device.name()?,
            max_channels,
            host_id: host.id(),
            device,
            output: None,
        })
    }

    /// Gets the given cpal device, loads the click at the device's sample
    /// rate, and starts the output stream.
    pub fn get(audio: &config::Audio, click: &config::Click) -> Result<Device, Box<dyn Error>> {
        let span = span!(Level::INFO, "open device (cpal)");
        let _enter = span.enter();

        let name = audio.device();
        let mut device = if name == DEFAULT_DEVICE {
            Device::default_device()?
        } else {
            Device::list_cpal_devices()?
                .into_iter()
                .find(|device| device.name.trim() == name)
                .ok_or_else(|| AudioError::DeviceNotFound(name.to_string()))?
        };

        let supported = device
            .device
            .default_output_config()
            .map_err(|e| AudioError::Backend(e.to_string()))?;
        let clip = click::load_clip(click.file(), supported.sample_rate().0).map_err(AudioError::Clip)?;

        info!(
            device = device.name,
            sample_rate = supported.sample_rate().0,
            clip_ms = clip.duration().as_millis(),
            "Opening audio device."
        );

        device.output = Some(Output::start(device.device.clone(), supported, clip)?);
        Ok(device)
    }

    fn output(&self) -> Result<&Output, AudioError> {
        self.output
            .as_ref()
            .ok_or_else(|| AudioError::NotOpened(self.name.clone()))
    }
}

impl AudioDevice for Device {
    fn create_clip(&self) -> Result<Box<dyn AudioClip>, AudioError> {
        let output = self.output()?;
        let voice = Arc::new(Voice::new(output.clip.data()));
        output
            .voice_tx
            .send(voice.clone())
            .map_err(|_| AudioError::StreamUnavailable)?;

        Ok(Box::new(Clip {
            voice,
            stream_alive: output.stream_alive.clone(),
        }))
    }

    fn sample_rate(&self) -> u32 {
        self.output
            .as_ref()
            .map(|output| output.sample_rate)
            .unwrap_or_default()
    }
}

/// A clip instance backed by a voice in the output callback.
struct Clip {
    voice: Arc<Voice>,
    stream_alive: Arc<AtomicBool>,
}

impl AudioClip for Clip {
    fn is_free(&self) -> bool {
        !self.voice.is_playing() || self.voice.position() == 0
    }

    fn rewind(&mut self) {
        self.voice.rewind();
    }

    fn set_volume(&mut self, volume: f32) {
        self.voice.set_volume(volume);
    }

    fn play(&mut self) -> Result<(), AudioError> {
        if !self.stream_alive.load(Ordering::Acquire) {
            return Err(AudioError::StreamUnavailable);
        }
        self.voice.start();
        Ok(())
    }
}
