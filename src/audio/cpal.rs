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
    cell::UnsafeCell,
    error::Error,
    fmt,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    },
    thread,
    time::Duration,
};

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{FromSample, SizedSample};
use tracing::{error, info, span, Level};

use super::mixer::AudioMixer;
use super::thread_priority::{promote_render_thread, render_thread_priority, rt_render_enabled};
use super::OutputStream;
use crate::{config, playsync::CancelHandle};

/// Frames rendered per producer block.
const BLOCK_FRAMES: usize = 512;

/// Single producer, single consumer ring of samples between the render thread and the cpal
/// callback.
struct CircularBuffer {
    /// Backing buffer
    buffer: Box<[UnsafeCell<f32>]>,
    /// Capacity (must be power of 2)
    capacity: usize,
    /// Read position (consumer)
    read_pos: AtomicUsize,
    /// Write position (producer)
    write_pos: AtomicUsize,
}

// Only the producer writes slots in [write_pos, read_pos) and only the consumer reads slots in
// [read_pos, write_pos); the positions are published with release/acquire ordering.
unsafe impl Sync for CircularBuffer {}

impl CircularBuffer {
    fn new(capacity: usize) -> Self {
        let cap = capacity.next_power_of_two();
        Self {
            buffer: (0..cap).map(|_| UnsafeCell::new(0.0)).collect(),
            capacity: cap,
            read_pos: AtomicUsize::new(0),
            write_pos: AtomicUsize::new(0),
        }
    }

    /// Number of samples available to read.
    #[inline]
    fn available(&self) -> usize {
        let write = self.write_pos.load(Ordering::Acquire);
        let read = self.read_pos.load(Ordering::Acquire);
        write.wrapping_sub(read) & (self.capacity - 1)
    }

    /// Space available to write. One slot stays empty to tell full from empty.
    #[inline]
    fn space(&self) -> usize {
        self.capacity - self.available() - 1
    }

    /// Returns the number of samples written.
    fn write(&self, samples: &[f32]) -> usize {
        let to_write = self.space().min(samples.len());
        let write = self.write_pos.load(Ordering::Acquire);
        let mask = self.capacity - 1;
        for (i, sample) in samples[..to_write].iter().enumerate() {
            unsafe {
                *self.buffer[(write + i) & mask].get() = *sample;
            }
        }
        self.write_pos
            .store((write + to_write) & mask, Ordering::Release);
        to_write
    }

    /// Returns the number of samples read.
    fn read(&self, output: &mut [f32]) -> usize {
        let to_read = self.available().min(output.len());
        let read = self.read_pos.load(Ordering::Acquire);
        let mask = self.capacity - 1;
        for (i, sample) in output[..to_read].iter_mut().enumerate() {
            unsafe {
                *sample = *self.buffer[(read + i) & mask].get();
            }
        }
        self.read_pos.store((read + to_read) & mask, Ordering::Release);
        to_read
    }
}

/// A small wrapper around a cpal::Device.
pub struct Device {
    /// The name of the device.
    name: String,
    /// The maximum number of channels the device supports.
    max_channels: u16,
    /// The host ID of the device.
    host_id: cpal::HostId,
    /// The underlying cpal device.
    device: cpal::Device,
    sample_rate: u32,
    channels: u16,
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

/// Builds the cpal callback for one sample type. Any shortfall is filled with silence.
fn build_stream<T>(
    device: &cpal::Device,
    config: &cpal::StreamConfig,
    ring: Arc<CircularBuffer>,
) -> Result<cpal::Stream, cpal::BuildStreamError>
where
    T: SizedSample + FromSample<f32>,
{
    let mut temp: Vec<f32> = Vec::new();
    device.build_output_stream(
        config,
        move |data: &mut [T], _: &cpal::OutputCallbackInfo| {
            if temp.len() < data.len() {
                temp.resize(data.len(), 0.0);
            }
            let temp = &mut temp[..data.len()];
            let read = ring.read(temp);
            temp[read..].fill(0.0);
            for (dst, &src) in data.iter_mut().zip(temp.iter()) {
                *dst = T::from_sample(src);
            }
        },
        |err| error!(err = err.to_string(), "CPAL output stream error"),
        None,
    )
}

impl Device {
    /// Lists cpal devices and produces the Device trait.
    pub fn list() -> Result<Vec<Box<dyn super::Device>>, Box<dyn Error>> {
        Ok(Device::list_cpal_devices()?
            .into_iter()
            .map(|device| {
                let device: Box<dyn super::Device> = Box::new(device);
                device
            })
            .collect())
    }

    /// Lists cpal devices.
    fn list_cpal_devices() -> Result<Vec<Device>, Box<dyn Error>> {
        // Suppress noisy output here.
        let _shh_stdout = shh::stdout()?;
        let _shh_stderr = shh::stderr()?;

        let mut devices: Vec<Device> = Vec::new();
        for host_id in cpal::available_hosts() {
            let host_devices = match cpal::host_from_id(host_id)?.devices() {
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
                let output_configs = match device.supported_output_configs() {
                    Ok(output_configs) => output_configs,
                    Err(_) => continue,
                };
                let max_channels = output_configs
                    .map(|config| config.channels())
                    .max()
                    .unwrap_or(0);

                if max_channels > 0 {
                    devices.push(Device {
                        name: device.name()?,
                        max_channels,
                        host_id,
                        device,
                        sample_rate: 0,
                        channels: 0,
                    })
                }
            }
        }

        devices.sort_by_key(|device| device.name.to_string());
        Ok(devices)
    }

    /// Gets the given cpal device. "default" picks the default output of the default host.
    pub fn get(config: &config::Audio) -> Result<Device, Box<dyn Error>> {
        let name = config.device();
        let mut device = if name == "default" {
            let host = cpal::default_host();
            let device = host
                .default_output_device()
                .ok_or("no default output device")?;
            Device {
                name: device.name()?,
                max_channels: config.channels(),
                host_id: host.id(),
                device,
                sample_rate: 0,
                channels: 0,
            }
        } else {
            Device::list_cpal_devices()?
                .into_iter()
                .find(|device| device.name.trim() == name)
                .ok_or_else(|| format!("no device found with name {}", name))?
        };

        if config.channels() > device.max_channels {
            return Err(format!(
                "{} channels requested, audio device {} only has {}",
                config.channels(),
                device.name,
                device.max_channels
            )
            .into());
        }
        device.sample_rate = config.sample_rate();
        device.channels = config.channels();
        Ok(device)
    }
}

impl super::Device for Device {
    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    fn channels(&self) -> u16 {
        self.channels
    }

    fn start(&self, mut mixer: AudioMixer) -> Result<OutputStream, Box<dyn Error>> {
        let span = span!(Level::INFO, "start output (cpal)");
        let _enter = span.enter();

        let num_channels = mixer.num_channels();
        let sample_rate = mixer.sample_rate();
        let sample_format = self.device.default_output_config()?.sample_format();
        info!(
            device = self.name,
            sample_rate,
            channels = num_channels,
            format = ?sample_format,
            "Starting output stream."
        );

        let cancel = CancelHandle::new();

        // About 100ms of audio.
        let capacity_samples = (sample_rate as usize * num_channels as usize) / 10;
        let ring = Arc::new(CircularBuffer::new(capacity_samples.max(4 * BLOCK_FRAMES * num_channels as usize)));

        let producer = {
            let cancel = cancel.clone();
            let ring = ring.clone();
            thread::Builder::new()
                .name("padbank-render".to_string())
                .spawn(move || {
                    let span = span!(Level::INFO, "render");
                    let _enter = span.enter();
                    promote_render_thread(render_thread_priority(), rt_render_enabled());

                    let block_samples = BLOCK_FRAMES * num_channels as usize;
                    let mut scratch = vec![0.0f32; block_samples];
                    while !cancel.is_cancelled() {
                        if ring.space() >= block_samples {
                            mixer.process_into_output(&mut scratch);
                            ring.write(&scratch);
                        } else {
                            thread::sleep(Duration::from_micros(500));
                        }
                    }
                })?
        };

        // cpal streams are not Send, so the stream lives on its own thread. The result of
        // building it is sent back so start can fail synchronously.
        let (ready_tx, ready_rx) = crossbeam_channel::bounded::<Result<(), String>>(1);
        let output = {
            let cancel = cancel.clone();
            let device = self.device.clone();
            thread::Builder::new()
                .name("padbank-output".to_string())
                .spawn(move || {
                    let config = cpal::StreamConfig {
                        channels: num_channels,
                        sample_rate: cpal::SampleRate(sample_rate),
                        buffer_size: cpal::BufferSize::Default,
                    };

                    let stream = match sample_format {
                        cpal::SampleFormat::I16 => build_stream::<i16>(&device, &config, ring),
                        cpal::SampleFormat::I32 => build_stream::<i32>(&device, &config, ring),
                        cpal::SampleFormat::U16 => build_stream::<u16>(&device, &config, ring),
                        _ => build_stream::<f32>(&device, &config, ring),
                    };
                    let stream = match stream {
                        Ok(stream) => stream,
                        Err(e) => {
                            let _ = ready_tx.send(Err(format!("failed to create stream: {e}")));
                            return;
                        }
                    };
                    if let Err(e) = stream.play() {
                        let _ = ready_tx.send(Err(format!("failed to start stream: {e}")));
                        return;
                    }
                    let _ = ready_tx.send(Ok(()));

                    while !cancel.wait_timeout(Duration::from_millis(100)) {}
                    drop(stream);
                })?
        };

        let stream = OutputStream::new(cancel, vec![producer, output]);
        match ready_rx.recv() {
            Ok(Ok(())) => {
                info!("CPAL output stream started successfully");
                Ok(stream)
            }
            Ok(Err(e)) => {
                error!(err = %e, "Output stream failed");
                Err(e.into())
            }
            Err(_) => Err("output thread exited before the stream started".into()),
        }
    }
}
