// Output module - device streams
//
// `OutputStream` wraps a cpal stream around a fill callback. `DeviceOutput`
// runs the renderer on its own thread and feeds the stream through a
// lock-free ring buffer so the device callback never touches the graph.

use crate::config::SonoraEngineDesc;
use crate::error::{Result, SonoraError};
use crate::events::SonoraEvent;
use crate::graph::AudioBlock;
use crate::nodes::Analyser;
use crate::playback::PlaybackCommand;
use crate::render::{RenderState, Renderer};
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{FromSample, SizedSample};
use crossbeam_channel::{Receiver, Sender, bounded};
use ringbuf::traits::{Consumer, Producer, Split};
use ringbuf::{HeapCons, HeapProd, HeapRb};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::thread::{self, JoinHandle};
use std::time::Duration;

const BACKPRESSURE_SLEEP: Duration = Duration::from_millis(2);

/// Fills an interleaved f32 buffer and returns the number of frames written.
pub(crate) type FillCallback = dyn FnMut(&mut [f32], u16) -> usize + Send;

/// A running cpal output stream.
pub(crate) struct OutputStream {
    stream: Option<cpal::Stream>,
    is_running: Arc<AtomicBool>,
    frames_processed: Arc<AtomicU64>,
    sample_rate: u32,
    channels: u16,
}

impl OutputStream {
    /// Opens the default output device.
    ///
    /// `sample_rate` and `channels` default to the device's own configuration.
    pub(crate) fn open(
        sample_rate: Option<u32>,
        channels: Option<u16>,
        fill: Box<FillCallback>,
    ) -> Result<Self> {
        let host = cpal::default_host();
        let device = host.default_output_device().ok_or_else(|| {
            SonoraError::AudioDevice("No default output device available".into())
        })?;

        let default_config = device.default_output_config().map_err(|e| {
            SonoraError::AudioDevice(format!("Failed to get default config: {}", e))
        })?;

        let config = cpal::StreamConfig {
            channels: channels.unwrap_or_else(|| default_config.channels()),
            sample_rate: sample_rate
                .map(cpal::SampleRate)
                .unwrap_or_else(|| default_config.sample_rate()),
            buffer_size: cpal::BufferSize::Default,
        };

        let is_running = Arc::new(AtomicBool::new(false));
        let frames_processed = Arc::new(AtomicU64::new(0));

        let stream = match default_config.sample_format() {
            cpal::SampleFormat::F32 => build_stream::<f32>(
                &device,
                &config,
                fill,
                Arc::clone(&is_running),
                Arc::clone(&frames_processed),
            )?,
            cpal::SampleFormat::I16 => build_stream::<i16>(
                &device,
                &config,
                fill,
                Arc::clone(&is_running),
                Arc::clone(&frames_processed),
            )?,
            cpal::SampleFormat::U16 => build_stream::<u16>(
                &device,
                &config,
                fill,
                Arc::clone(&is_running),
                Arc::clone(&frames_processed),
            )?,
            other => {
                return Err(SonoraError::AudioFormat(format!(
                    "Unsupported sample format {:?}",
                    other
                )));
            }
        };

        log::info!(
            "Output stream: {} Hz, {} channel(s), {:?}",
            config.sample_rate.0,
            config.channels,
            default_config.sample_format()
        );

        Ok(Self {
            stream: Some(stream),
            is_running,
            frames_processed,
            sample_rate: config.sample_rate.0,
            channels: config.channels,
        })
    }

    pub(crate) fn play(&self) -> Result<()> {
        if let Some(stream) = &self.stream {
            stream.play().map_err(|e| {
                SonoraError::AudioDevice(format!("Failed to start stream: {}", e))
            })?;
            self.is_running.store(true, Ordering::Relaxed);
        }
        Ok(())
    }

    pub(crate) fn stop(&mut self) {
        if let Some(stream) = self.stream.take() {
            self.is_running.store(false, Ordering::Relaxed);
            drop(stream);
        }
    }

    pub(crate) fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub(crate) fn channels(&self) -> u16 {
        self.channels
    }

    pub(crate) fn frames_processed(&self) -> u64 {
        self.frames_processed.load(Ordering::Relaxed)
    }
}

impl Drop for OutputStream {
    fn drop(&mut self) {
        self.stop();
    }
}

fn build_stream<T>(
    device: &cpal::Device,
    config: &cpal::StreamConfig,
    mut fill: Box<FillCallback>,
    is_running: Arc<AtomicBool>,
    frames_processed: Arc<AtomicU64>,
) -> Result<cpal::Stream>
where
    T: SizedSample + FromSample<f32>,
{
    let channels = config.channels;
    let mut scratch: Vec<f32> = Vec::new();

    device
        .build_output_stream(
            config,
            move |data: &mut [T], _: &cpal::OutputCallbackInfo| {
                if !is_running.load(Ordering::Relaxed) {
                    for sample in data.iter_mut() {
                        *sample = T::from_sample(0.0f32);
                    }
                    return;
                }

                // grows once to the device's callback size, then reused
                if scratch.len() < data.len() {
                    scratch.resize(data.len(), 0.0);
                }
                let buffer = &mut scratch[..data.len()];
                buffer.fill(0.0);

                let frames_filled = fill(buffer, channels);

                for (sample, value) in data.iter_mut().zip(buffer.iter()) {
                    *sample = T::from_sample(*value);
                }
                frames_processed.fetch_add(frames_filled as u64, Ordering::Relaxed);
            },
            move |err| {
                log::error!("Audio stream error: {}", err);
            },
            None,
        )
        .map_err(|e| SonoraError::AudioDevice(format!("Failed to build stream: {}", e)))
}

/// The device backend: render thread, ring buffer and cpal stream.
pub(crate) struct DeviceOutput {
    stream: OutputStream,
    running: Arc<AtomicBool>,
    render_thread: Option<JoinHandle<()>>,
}

impl DeviceOutput {
    /// Starts the render thread and the device stream.
    ///
    /// The renderer is built on the render thread itself and never leaves it.
    pub(crate) fn start(
        desc: &SonoraEngineDesc,
        commands: Receiver<PlaybackCommand>,
        events: Sender<SonoraEvent>,
        state: Arc<RenderState>,
    ) -> Result<(Self, Analyser)> {
        desc.validate()?;
        let channels = desc.channels as usize;
        let capacity = desc.block_size * channels * desc.buffer_blocks;
        let (producer, mut consumer): (HeapProd<f32>, HeapCons<f32>) =
            HeapRb::<f32>::new(capacity).split();

        let stream = OutputStream::open(
            Some(desc.sample_rate),
            Some(desc.channels),
            Box::new(move |buffer: &mut [f32], channels: u16| {
                // underruns leave the remainder silent
                let popped = consumer.pop_slice(buffer);
                popped / channels.max(1) as usize
            }),
        )?;

        let running = Arc::new(AtomicBool::new(true));
        let (ready_tx, ready_rx) = bounded::<Result<Analyser>>(1);
        let thread_desc = desc.clone();
        let thread_running = Arc::clone(&running);

        let render_thread = thread::Builder::new()
            .name("sonora-render".into())
            .spawn(move || {
                let (renderer, analyser) =
                    match Renderer::new(&thread_desc, commands, events, state) {
                        Ok(built) => built,
                        Err(e) => {
                            let _ = ready_tx.send(Err(e));
                            return;
                        }
                    };
                if ready_tx.send(Ok(analyser)).is_err() {
                    return;
                }
                render_loop(renderer, producer, thread_desc.channels as usize, &thread_running);
            })
            .map_err(|e| SonoraError::Engine(format!("Failed to spawn render thread: {}", e)))?;

        let mut output = Self {
            stream,
            running,
            render_thread: Some(render_thread),
        };

        let analyser = match ready_rx.recv() {
            Ok(Ok(analyser)) => analyser,
            Ok(Err(e)) => {
                output.shutdown();
                return Err(e);
            }
            Err(_) => {
                output.shutdown();
                return Err(SonoraError::Engine(
                    "Render thread exited during startup".into(),
                ));
            }
        };

        if let Err(e) = output.stream.play() {
            output.shutdown();
            return Err(e);
        }
        log::info!(
            "Device output running ({} Hz, {} channel(s))",
            output.stream.sample_rate(),
            output.stream.channels()
        );
        Ok((output, analyser))
    }

    pub(crate) fn frames_played(&self) -> u64 {
        self.stream.frames_processed()
    }

    fn shutdown(&mut self) {
        self.running.store(false, Ordering::Relaxed);
        self.stream.stop();
        if let Some(handle) = self.render_thread.take() {
            if handle.join().is_err() {
                log::error!("Render thread panicked");
            }
        }
    }
}

impl Drop for DeviceOutput {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn render_loop(
    mut renderer: Renderer,
    mut producer: HeapProd<f32>,
    channels: usize,
    running: &AtomicBool,
) {
    let block_size = renderer.block_size();
    let mut block = AudioBlock::new(block_size);
    let mut interleaved = vec![0.0f32; block_size * channels];

    while running.load(Ordering::Relaxed) {
        renderer.render_block(&mut block);
        block.write_interleaved(&mut interleaved, channels);

        let mut offset = 0;
        while offset < interleaved.len() {
            offset += producer.push_slice(&interleaved[offset..]);
            if offset < interleaved.len() {
                if !running.load(Ordering::Relaxed) {
                    break;
                }
                thread::sleep(BACKPRESSURE_SLEEP);
            }
        }
    }
    log::debug!("Render thread stopped with {} live chain(s)", renderer.chain_count());
}
