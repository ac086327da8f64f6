//! Microphone audio source.
//!
//! `MicrophoneSource` produces short [`AudioChunk`]s for the audio monitor:
//! - `stub://` devices select a synthetic source that scripts quiet noise
//!   with periodic loud bursts (no audio hardware needed)
//! - the default input device is captured via cpal behind the `audio-cpal`
//!   feature (callback thread → channel → blocking `next_chunk`)
//!
//! Each chunk is consumed to compute one scalar volume proxy and then
//! discarded; no state persists between chunks.

use anyhow::{anyhow, Result};
#[cfg(feature = "audio-cpal")]
use anyhow::Context;
use rand::Rng;
use std::time::Duration;

use super::camera::parse_stub_budget;

/// Configuration for a microphone source.
#[derive(Clone, Debug)]
pub struct AudioConfig {
    /// Input device: `stub://` for synthetic audio (with an optional
    /// `?chunks=N` budget) or anything else for the default capture device.
    pub device: String,
    /// Sample rate requested from synthetic sources. Real devices report
    /// their own rate.
    pub sample_rate: u32,
    /// Samples per chunk handed to the monitor (~100 ms at the defaults).
    pub buffer_frames: u32,
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            device: "stub://microphone".to_string(),
            sample_rate: 44_100,
            buffer_frames: 4_410,
        }
    }
}

/// A short window of captured audio samples.
#[derive(Clone, Debug)]
pub struct AudioChunk {
    pub samples: Vec<f32>,
    pub sample_rate: u32,
}

/// Magnitude proxy for one chunk: the L2 norm of the samples, scaled by 10.
/// Not calibrated to any physical loudness unit; used only for threshold
/// comparison.
pub fn volume_proxy(samples: &[f32]) -> f32 {
    samples.iter().map(|s| s * s).sum::<f32>().sqrt() * 10.0
}

/// Microphone source.
///
/// Uses cpal for real devices, with a synthetic fallback for `stub://` paths.
pub struct MicrophoneSource {
    backend: AudioBackend,
}

enum AudioBackend {
    Synthetic(SyntheticMicrophoneSource),
    #[cfg(feature = "audio-cpal")]
    Cpal(CpalMicrophoneSource),
}

impl MicrophoneSource {
    pub fn new(config: AudioConfig) -> Result<Self> {
        if config.device.starts_with("stub://") {
            Ok(Self {
                backend: AudioBackend::Synthetic(SyntheticMicrophoneSource::new(config)?),
            })
        } else {
            #[cfg(feature = "audio-cpal")]
            {
                Ok(Self {
                    backend: AudioBackend::Cpal(CpalMicrophoneSource::new(config)),
                })
            }
            #[cfg(not(feature = "audio-cpal"))]
            {
                Err(anyhow!(
                    "audio device '{}' requires the audio-cpal feature",
                    config.device
                ))
            }
        }
    }

    /// Connect to the input device and start the capture stream.
    pub fn connect(&mut self) -> Result<()> {
        match &mut self.backend {
            AudioBackend::Synthetic(source) => source.connect(),
            #[cfg(feature = "audio-cpal")]
            AudioBackend::Cpal(source) => source.connect(),
        }
    }

    /// Block until the next chunk is available. `Ok(None)` means the stream
    /// has ended.
    pub fn next_chunk(&mut self) -> Result<Option<AudioChunk>> {
        match &mut self.backend {
            AudioBackend::Synthetic(source) => source.next_chunk(),
            #[cfg(feature = "audio-cpal")]
            AudioBackend::Cpal(source) => source.next_chunk(),
        }
    }

    /// Get chunk statistics.
    pub fn stats(&self) -> AudioStats {
        match &self.backend {
            AudioBackend::Synthetic(source) => source.stats(),
            #[cfg(feature = "audio-cpal")]
            AudioBackend::Cpal(source) => source.stats(),
        }
    }
}

/// Statistics for a microphone source.
#[derive(Clone, Debug)]
pub struct AudioStats {
    pub chunks_captured: u64,
    pub device: String,
}

// ----------------------------------------------------------------------------
// Synthetic source (stub://) for tests and hardware-free runs
// ----------------------------------------------------------------------------

/// Every Nth synthetic chunk is a loud burst; the rest are near-silence.
const BURST_PERIOD: u64 = 50;

struct SyntheticMicrophoneSource {
    config: AudioConfig,
    chunk_count: u64,
    /// Total chunks before the stream ends; `None` streams forever.
    budget: Option<u64>,
}

impl SyntheticMicrophoneSource {
    fn new(config: AudioConfig) -> Result<Self> {
        let (_, budget) = parse_stub_budget(&config.device, "chunks")?;
        Ok(Self {
            config,
            chunk_count: 0,
            budget,
        })
    }

    /// Synthetic sources are always "connected".
    fn connect(&mut self) -> Result<()> {
        log::info!(
            "MicrophoneSource: connected to {} (synthetic)",
            self.config.device
        );
        Ok(())
    }

    fn next_chunk(&mut self) -> Result<Option<AudioChunk>> {
        if let Some(budget) = self.budget {
            if self.chunk_count >= budget {
                return Ok(None);
            }
        } else if self.config.sample_rate > 0 {
            // Live synthetic runs pace to roughly real time; budgeted sources
            // exist for tests and do not sleep.
            std::thread::sleep(Duration::from_secs_f64(
                f64::from(self.config.buffer_frames) / f64::from(self.config.sample_rate),
            ));
        }

        self.chunk_count += 1;
        let mut rng = rand::thread_rng();
        let loud = self.chunk_count % BURST_PERIOD == 0;
        let samples = (0..self.config.buffer_frames)
            .map(|_| {
                if loud {
                    let sign = if rng.gen::<bool>() { 1.0 } else { -1.0 };
                    sign * rng.gen_range(0.3..0.6)
                } else {
                    rng.gen_range(-0.001..0.001)
                }
            })
            .collect();

        Ok(Some(AudioChunk {
            samples,
            sample_rate: self.config.sample_rate,
        }))
    }

    fn stats(&self) -> AudioStats {
        AudioStats {
            chunks_captured: self.chunk_count,
            device: self.config.device.clone(),
        }
    }
}

// ----------------------------------------------------------------------------
// Production source using cpal
// ----------------------------------------------------------------------------

#[cfg(feature = "audio-cpal")]
struct CpalMicrophoneSource {
    config: AudioConfig,
    receiver: Option<std::sync::mpsc::Receiver<AudioChunk>>,
    /// Held so the capture stream stays alive; dropping it stops capture.
    stream: Option<cpal::Stream>,
    chunk_count: u64,
}

#[cfg(feature = "audio-cpal")]
impl CpalMicrophoneSource {
    fn new(config: AudioConfig) -> Self {
        Self {
            config,
            receiver: None,
            stream: None,
            chunk_count: 0,
        }
    }

    fn connect(&mut self) -> Result<()> {
        use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};

        let host = cpal::default_host();
        let device = host
            .default_input_device()
            .ok_or_else(|| anyhow!("no default audio input device"))?;
        let supported = device
            .default_input_config()
            .context("query default input config")?;
        if supported.sample_format() != cpal::SampleFormat::F32 {
            return Err(anyhow!(
                "unsupported input sample format {:?}; expected f32",
                supported.sample_format()
            ));
        }
        let sample_rate = supported.sample_rate().0;
        let buffer_frames = self.config.buffer_frames as usize;

        let (sender, receiver) = std::sync::mpsc::channel();
        let mut pending: Vec<f32> = Vec::with_capacity(buffer_frames);
        let stream = device
            .build_input_stream(
                &supported.config(),
                move |data: &[f32], _info: &cpal::InputCallbackInfo| {
                    for &sample in data {
                        pending.push(sample);
                        if pending.len() >= buffer_frames {
                            let samples = std::mem::take(&mut pending);
                            // The receiver disappearing just means the
                            // monitor is gone; the stream is about to be
                            // dropped with it.
                            let _ = sender.send(AudioChunk {
                                samples,
                                sample_rate,
                            });
                        }
                    }
                },
                |err| log::error!("audio input stream error: {}", err),
                None,
            )
            .context("build audio input stream")?;
        stream.play().context("start audio input stream")?;

        log::info!(
            "MicrophoneSource: capturing default input device at {} Hz",
            sample_rate
        );
        self.receiver = Some(receiver);
        self.stream = Some(stream);
        Ok(())
    }

    fn next_chunk(&mut self) -> Result<Option<AudioChunk>> {
        let receiver = self
            .receiver
            .as_ref()
            .ok_or_else(|| anyhow!("audio device not connected"))?;
        match receiver.recv() {
            Ok(chunk) => {
                self.chunk_count += 1;
                Ok(Some(chunk))
            }
            // The callback half is gone: the backend died out from under us.
            Err(_) => Err(anyhow!("audio input stream closed unexpectedly")),
        }
    }

    fn stats(&self) -> AudioStats {
        AudioStats {
            chunks_captured: self.chunk_count,
            device: self.config.device.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn volume_proxy_is_scaled_l2_norm() {
        assert_eq!(volume_proxy(&[3.0, 4.0]), 50.0);
        assert_eq!(volume_proxy(&[]), 0.0);
    }

    fn stub_config(device: &str) -> AudioConfig {
        AudioConfig {
            device: device.to_string(),
            ..AudioConfig::default()
        }
    }

    #[test]
    fn budgeted_stream_ends() {
        let mut source = MicrophoneSource::new(stub_config("stub://microphone?chunks=2")).unwrap();
        source.connect().unwrap();
        assert!(source.next_chunk().unwrap().is_some());
        assert!(source.next_chunk().unwrap().is_some());
        assert!(source.next_chunk().unwrap().is_none());
        assert_eq!(source.stats().chunks_captured, 2);
    }

    #[test]
    fn synthetic_bursts_every_fiftieth_chunk() {
        let mut source =
            MicrophoneSource::new(stub_config("stub://microphone?chunks=50")).unwrap();
        source.connect().unwrap();
        for i in 1..=50u64 {
            let chunk = source.next_chunk().unwrap().unwrap();
            let volume = volume_proxy(&chunk.samples);
            if i % BURST_PERIOD == 0 {
                assert!(volume > 20.0, "chunk {i} should be a burst, got {volume}");
            } else {
                assert!(volume <= 20.0, "chunk {i} should be quiet, got {volume}");
            }
        }
    }
}
