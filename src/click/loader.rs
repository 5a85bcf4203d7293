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

//! Click loading. The click is decoded entirely into memory at startup so the
//! first beat plays without any decode latency.

use std::fs::File;
use std::io::{self, Cursor};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use rubato::{
    Resampler, SincFixedIn, SincInterpolationParameters, SincInterpolationType, WindowFunction,
};
use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::{DecoderOptions, CODEC_TYPE_NULL};
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::{MediaSource, MediaSourceStream};
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;
use symphonia::default::{get_codecs, get_probe};
use tracing::{debug, info, warn};

/// The click that ships with the binary.
const BUNDLED_CLICK: &[u8] = include_bytes!("../../assets/click.wav");

/// Frames fed to the resampler per call.
const RESAMPLE_CHUNK_SIZE: usize = 1024;

/// Error types for click loading
#[derive(Debug, thiserror::Error)]
pub enum ClipLoadError {
    #[error("Unable to open click file {0}: {1}")]
    Open(String, io::Error),

    #[error("Click decoding failed: {0}")]
    Decode(#[from] SymphoniaError),

    #[error("Click file has no audio track")]
    NoTrack,

    #[error("Click file does not report a sample rate")]
    UnknownSampleRate,

    #[error("Click file contains no samples")]
    Empty,

    #[error("Unable to create a resampler from {0} Hz to {1} Hz: {2}")]
    Resampler(u32, u32, rubato::ResamplerConstructionError),

    #[error("Click resampling failed: {0}")]
    Resample(#[from] rubato::ResampleError),
}

/// A decoded mono click at a fixed sample rate. The sample data is stored in
/// an Arc so every clip instance shares it.
#[derive(Clone, Debug)]
pub struct LoadedClip {
    data: Arc<[f32]>,
    sample_rate: u32,
}

impl LoadedClip {
    /// Returns the shared sample data.
    pub fn data(&self) -> Arc<[f32]> {
        self.data.clone()
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Returns the playback length of the click.
    pub fn duration(&self) -> Duration {
        Duration::from_secs_f64(self.data.len() as f64 / self.sample_rate as f64)
    }
}

/// Loads the click from the given file, or the bundled click if none is given,
/// and resamples it to the target sample rate.
pub fn load_clip(file: Option<&Path>, target_sample_rate: u32) -> Result<LoadedClip, ClipLoadError> {
    let (source, hint): (Box<dyn MediaSource>, Hint) = match file {
        Some(path) => {
            info!(path = ?path, "Loading click into memory");
            let file = File::open(path)
                .map_err(|e| ClipLoadError::Open(path.display().to_string(), e))?;
            let mut hint = Hint::new();
            if let Some(extension) = path.extension().and_then(|ext| ext.to_str()) {
                hint.with_extension(extension);
            }
            (Box::new(file), hint)
        }
        None => {
            debug!("Loading bundled click");
            let mut hint = Hint::new();
            hint.with_extension("wav");
            (Box::new(Cursor::new(BUNDLED_CLICK)), hint)
        }
    };

    let (samples, channel_count, source_sample_rate) = decode(source, hint)?;
    let mono = downmix(&samples, channel_count);
    if mono.is_empty() {
        return Err(ClipLoadError::Empty);
    }

    let data = if source_sample_rate != target_sample_rate {
        info!(
            source_rate = source_sample_rate,
            target_rate = target_sample_rate,
            "Transcoding click"
        );
        transcode(&mono, source_sample_rate, target_sample_rate)?
    } else {
        mono
    };

    let loaded = LoadedClip {
        data: Arc::from(data),
        sample_rate: target_sample_rate,
    };
    info!(
        sample_rate = loaded.sample_rate,
        duration_ms = loaded.duration().as_millis(),
        "Click loaded"
    );
    Ok(loaded)
}

/// Decodes the first audio track of the source into interleaved f32 samples.
/// Returns the samples, the channel count and the sample rate.
fn decode(source: Box<dyn MediaSource>, hint: Hint) -> Result<(Vec<f32>, usize, u32), ClipLoadError> {
    let mss = MediaSourceStream::new(source, Default::default());
    let probed = get_probe().format(
        &hint,
        mss,
        &FormatOptions::default(),
        &MetadataOptions::default(),
    )?;
    let mut format_reader = probed.format;

    let track = format_reader
        .tracks()
        .iter()
        .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
        .ok_or(ClipLoadError::NoTrack)?;
    let track_id = track.id;
    let mut sample_rate = track
        .codec_params
        .sample_rate
        .ok_or(ClipLoadError::UnknownSampleRate)?;
    let mut channel_count = track
        .codec_params
        .channels
        .map(|channels| channels.count())
        .unwrap_or(1);
    let mut decoder = get_codecs().make(&track.codec_params, &DecoderOptions::default())?;

    let mut samples = Vec::new();
    loop {
        let packet = match format_reader.next_packet() {
            Ok(packet) => packet,
            Err(SymphoniaError::IoError(e)) if e.kind() == io::ErrorKind::UnexpectedEof => break,
            Err(e) => return Err(e.into()),
        };
        if packet.track_id() != track_id {
            continue;
        }

        match decoder.decode(&packet) {
            Ok(decoded) => {
                let spec = *decoded.spec();
                channel_count = spec.channels.count();
                sample_rate = spec.rate;
                let mut buffer = SampleBuffer::<f32>::new(decoded.capacity() as u64, spec);
                buffer.copy_interleaved_ref(decoded);
                samples.extend_from_slice(buffer.samples());
            }
            Err(SymphoniaError::DecodeError(e)) => {
                warn!(err = e, "Skipping undecodable click packet");
            }
            Err(e) => return Err(e.into()),
        }
    }

    Ok((samples, channel_count.max(1), sample_rate))
}

/// Averages interleaved channels down to mono.
fn downmix(samples: &[f32], channel_count: usize) -> Vec<f32> {
    if channel_count <= 1 {
        return samples.to_vec();
    }
    samples
        .chunks_exact(channel_count)
        .map(|frame| frame.iter().sum::<f32>() / channel_count as f32)
        .collect()
}

/// Resamples mono samples from one rate to another with a windowed sinc
/// resampler. The output is trimmed of the resampler's delay, so it lines up
/// with the input and is exactly `ceil(len * target / source)` long.
fn transcode(
    samples: &[f32],
    source_rate: u32,
    target_rate: u32,
) -> Result<Vec<f32>, ClipLoadError> {
    let ratio = target_rate as f64 / source_rate as f64;
    let params = SincInterpolationParameters {
        sinc_len: 256,
        f_cutoff: 0.95,
        oversampling_factor: 128,
        interpolation: SincInterpolationType::Linear,
        window: WindowFunction::BlackmanHarris2,
    };
    let mut resampler = SincFixedIn::<f32>::new(ratio, 1.0, params, RESAMPLE_CHUNK_SIZE, 1)
        .map_err(|e| ClipLoadError::Resampler(source_rate, target_rate, e))?;

    let target_len = (samples.len() as f64 * ratio).ceil() as usize;
    let delay = resampler.output_delay();
    let mut resampled: Vec<f32> = Vec::with_capacity(target_len + delay);

    let mut chunks = samples.chunks_exact(RESAMPLE_CHUNK_SIZE);
    for chunk in chunks.by_ref() {
        let output = resampler.process(&[chunk], None)?;
        resampled.extend_from_slice(&output[0]);
    }
    let remainder = chunks.remainder();
    if !remainder.is_empty() {
        let output = resampler.process_partial(Some(&[remainder][..]), None)?;
        resampled.extend_from_slice(&output[0]);
    }

    // Flush the samples still held back by the filter.
    while resampled.len() < target_len + delay {
        let output = resampler.process_partial::<&[f32]>(None, None)?;
        if output[0].is_empty() {
            break;
        }
        resampled.extend_from_slice(&output[0]);
    }

    resampled.drain(..delay.min(resampled.len()));
    resampled.resize(target_len, 0.0);
    Ok(resampled)
}

#[cfg(test)]
mod tests {
    use std::error::Error;

    use hound::{SampleFormat, WavSpec, WavWriter};

    use super::*;

    fn write_wav(path: &Path, channels: u16, sample_rate: u32, frames: &[Vec<f32>]) -> Result<(), Box<dyn Error>> {
        let mut writer = WavWriter::create(
            path,
            WavSpec {
                channels,
                sample_rate,
                bits_per_sample: 32,
                sample_format: SampleFormat::Float,
            },
        )?;
        for frame in frames {
            for sample in frame {
                writer.write_sample(*sample)?;
            }
        }
        writer.finalize()?;
        Ok(())
    }

    #[test]
    fn test_bundled_click_loads() {
        let clip = load_clip(None, 44100).unwrap();
        assert_eq!(clip.sample_rate(), 44100);
        assert!(!clip.data().is_empty());
        assert!(clip.duration() > Duration::ZERO);
        assert!(clip.duration() < Duration::from_secs(1));
    }

    #[test]
    fn test_bundled_click_resamples() {
        let native = load_clip(None, 44100).unwrap();
        let resampled = load_clip(None, 48000).unwrap();
        assert_eq!(resampled.sample_rate(), 48000);
        assert!(resampled.data().len() > native.data().len());
    }

    #[test]
    fn test_stereo_file_is_downmixed() -> Result<(), Box<dyn Error>> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("stereo.wav");
        write_wav(
            &path,
            2,
            44100,
            &[vec![1.0, 0.0], vec![0.5, 0.5], vec![0.0, -1.0]],
        )?;

        let clip = load_clip(Some(&path), 44100)?;
        assert_eq!(&*clip.data(), &[0.5, 0.5, -0.5]);
        Ok(())
    }

    #[test]
    fn test_missing_file() {
        let result = load_clip(Some(Path::new("/nonexistent/click.wav")), 44100);
        assert!(matches!(result, Err(ClipLoadError::Open(_, _))));
    }

    #[test]
    fn test_empty_file() -> Result<(), Box<dyn Error>> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("empty.wav");
        write_wav(&path, 1, 44100, &[])?;

        assert!(load_clip(Some(&path), 44100).is_err());
        Ok(())
    }

    #[test]
    fn test_transcode_length() {
        let source: Vec<f32> = (0..4410)
            .map(|i| (2.0 * std::f32::consts::PI * 440.0 * i as f32 / 44100.0).sin())
            .collect();
        let result = transcode(&source, 44100, 48000).unwrap();
        let expected_len = (4410.0_f64 * 48000.0 / 44100.0).ceil() as usize;
        assert_eq!(result.len(), expected_len);

        // Away from the edges the resampled tone matches the original.
        for index in [1200, 2400, 3600] {
            let expected = (2.0 * std::f32::consts::PI * 440.0 * index as f32 / 48000.0).sin();
            assert!(
                (result[index] - expected).abs() < 0.05,
                "sample {} was {}, expected {}",
                index,
                result[index],
                expected
            );
        }
    }

    #[test]
    fn test_transcode_downsamples() {
        let source = vec![0.25; 9600];
        let result = transcode(&source, 48000, 44100).unwrap();
        assert_eq!(result.len(), 8820);
        assert!((result[4410] - 0.25).abs() < 0.01);
    }

    #[test]
    fn test_transcode_short_clip() {
        // Shorter than a single resampler chunk.
        let source = vec![0.5; 100];
        let result = transcode(&source, 22050, 44100).unwrap();
        assert_eq!(result.len(), 200);
    }

    #[test]
    fn test_downmix() {
        assert_eq!(downmix(&[0.2, 0.4], 1), vec![0.2, 0.4]);
        assert_eq!(downmix(&[1.0, 0.0, 0.0, 1.0], 2), vec![0.5, 0.5]);
    }
}
