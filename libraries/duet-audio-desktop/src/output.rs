//! CPAL device output driving the shared mixer
use crate::error::{DeviceError, Result};
use crate::graph::CpalRenderGraph;
use crate::mixer::Mixer;
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{Device, Stream, StreamConfig};
use crossbeam_channel::{bounded, Receiver, Sender};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

/// Commands sent to the audio thread
enum AudioCommand {
    /// Drop the stream and exit
    Shutdown,
}

/// CPAL audio output
///
/// Uses a dedicated audio thread that owns the CPAL `Stream`. The stream is
/// not `Send` on every platform, so the rest of the host only ever touches
/// the shared [`Mixer`] and talks to the thread through a channel.
pub struct CpalOutput {
    command_tx: Sender<AudioCommand>,
    mixer: Arc<Mixer>,
    channels: u16,
    audio_thread: Option<JoinHandle<()>>,
}

impl CpalOutput {
    /// Open the default output device
    ///
    /// # Errors
    /// Returns an error if no device is found or the stream cannot start
    pub fn new() -> Result<Self> {
        let host = cpal::default_host();
        let device = host
            .default_output_device()
            .ok_or(DeviceError::DeviceNotFound)?;
        Self::with_device(device)
    }

    /// Open a specific output device
    pub fn with_device(device: Device) -> Result<Self> {
        let (command_tx, command_rx) = bounded::<AudioCommand>(4);
        let (ready_tx, ready_rx) = bounded::<Result<(Arc<Mixer>, u16)>>(1);

        let audio_thread = thread::Builder::new()
            .name("duet-audio".into())
            .spawn(move || Self::audio_thread_run(&device, &command_rx, &ready_tx))
            .map_err(|e| DeviceError::Device(e.to_string()))?;

        let (mixer, channels) = ready_rx
            .recv()
            .map_err(|_| DeviceError::ThreadStopped)??;

        tracing::info!(
            sample_rate = mixer.sample_rate(),
            channels,
            "Audio output started"
        );

        Ok(Self {
            command_tx,
            mixer,
            channels,
            audio_thread: Some(audio_thread),
        })
    }

    /// Device sample rate in Hz
    pub fn sample_rate(&self) -> u32 {
        self.mixer.sample_rate()
    }

    /// Device channel count
    pub fn channels(&self) -> u16 {
        self.channels
    }

    /// Shared mixer behind the stream
    pub fn mixer(&self) -> &Arc<Mixer> {
        &self.mixer
    }

    /// New render graph for one session
    pub fn create_graph(&self) -> CpalRenderGraph {
        CpalRenderGraph::new(Arc::clone(&self.mixer))
    }

    fn audio_thread_run(
        device: &Device,
        command_rx: &Receiver<AudioCommand>,
        ready_tx: &Sender<Result<(Arc<Mixer>, u16)>>,
    ) {
        let stream = match Self::open_stream(device) {
            Ok((stream, mixer, channels)) => {
                let _ = ready_tx.send(Ok((mixer, channels)));
                stream
            }
            Err(e) => {
                let _ = ready_tx.send(Err(e));
                return;
            }
        };

        while let Ok(cmd) = command_rx.recv() {
            match cmd {
                AudioCommand::Shutdown => break,
            }
        }

        drop(stream);
        tracing::debug!("Audio thread exiting");
    }

    fn open_stream(device: &Device) -> Result<(Stream, Arc<Mixer>, u16)> {
        let supported = device.default_output_config()?;
        let sample_format = supported.sample_format();
        let config: StreamConfig = supported.config();
        let channels = config.channels;
        let mixer = Arc::new(Mixer::new(config.sample_rate));

        let stream = match sample_format {
            cpal::SampleFormat::F32 => Self::build_stream::<f32>(device, &config, &mixer)?,
            cpal::SampleFormat::I16 => Self::build_stream::<i16>(device, &config, &mixer)?,
            cpal::SampleFormat::U16 => Self::build_stream::<u16>(device, &config, &mixer)?,
            format => return Err(DeviceError::UnsupportedFormat(format!("{format:?}"))),
        };
        stream.play()?;

        Ok((stream, mixer, channels))
    }

    fn build_stream<T: cpal::SizedSample + cpal::FromSample<f32>>(
        device: &Device,
        config: &StreamConfig,
        mixer: &Arc<Mixer>,
    ) -> Result<Stream> {
        let channels = usize::from(config.channels);
        let render_mixer = Arc::clone(mixer);
        let error_mixer = Arc::clone(mixer);
        let mut scratch: Vec<f32> = Vec::new();

        let stream = device.build_output_stream(
            config,
            move |data: &mut [T], _: &cpal::OutputCallbackInfo| {
                scratch.resize(data.len(), 0.0);
                render_mixer.render(&mut scratch, channels);
                for (out, sample) in data.iter_mut().zip(&scratch) {
                    *out = T::from_sample(*sample);
                }
            },
            move |err| {
                tracing::error!("Audio stream error: {}", err);
                error_mixer.mark_failed();
            },
            None,
        )?;

        Ok(stream)
    }
}

impl std::fmt::Debug for CpalOutput {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CpalOutput")
            .field("sample_rate", &self.sample_rate())
            .field("channels", &self.channels)
            .finish_non_exhaustive()
    }
}

impl Drop for CpalOutput {
    fn drop(&mut self) {
        let _ = self.command_tx.send(AudioCommand::Shutdown);
        if let Some(handle) = self.audio_thread.take() {
            let _ = handle.join();
        }
    }
}
