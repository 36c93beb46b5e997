use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use std::sync::mpsc::Sender;

use super::output::{
    AudioOutput, OutputError, OutputHandle, OutputSpec, SampleSource, SourceEvent,
};

/// Output through the platform's default cpal host.
#[derive(Debug, Clone, Default)]
pub struct CpalOutput {
    device_name: Option<String>,
}

struct CpalHandle {
    _stream: cpal::Stream,
    spec: OutputSpec,
}

impl OutputHandle for CpalHandle {
    fn spec(&self) -> OutputSpec {
        self.spec
    }
}

impl CpalOutput {
    /// Uses the host's default output device.
    pub fn new() -> Self {
        Self::default()
    }

    /// Uses the output device whose label matches `name`.
    pub fn with_device(name: impl Into<String>) -> Self {
        Self {
            device_name: Some(name.into()),
        }
    }

    fn device(&self) -> Result<cpal::Device, OutputError> {
        let host = cpal::default_host();
        match &self.device_name {
            Some(name) => host
                .output_devices()?
                .find(|d| device_label(d) == *name)
                .ok_or(OutputError::NoDevice),
            None => host.default_output_device().ok_or(OutputError::NoDevice),
        }
    }
}

/// Labels of every output device on the default host.
pub fn list_output_devices() -> Vec<String> {
    let host = cpal::default_host();
    let mut names: Vec<String> = match host.output_devices() {
        Ok(devices) => devices.map(|d| device_label(&d)).collect(),
        Err(err) => {
            log::warn!("failed to enumerate output devices: {}", err);
            Vec::new()
        }
    };
    names.sort();
    names
}

fn device_label(device: &cpal::Device) -> String {
    match device.description() {
        Ok(desc) => desc.name().trim().to_string(),
        Err(_) => "Unknown CPAL Device".to_string(),
    }
}

fn format_rank(format: cpal::SampleFormat) -> u8 {
    match format {
        cpal::SampleFormat::F32 => 0,
        cpal::SampleFormat::I16 => 1,
        cpal::SampleFormat::U16 => 2,
        _ => u8::MAX,
    }
}

impl AudioOutput for CpalOutput {
    fn open(
        &self,
        spec: OutputSpec,
        mut source: SampleSource,
    ) -> Result<Box<dyn OutputHandle>, OutputError> {
        let device = self.device()?;

        let chosen = device
            .supported_output_configs()?
            .filter(|c| {
                c.channels() >= spec.channels
                    && c.min_sample_rate() <= spec.sample_rate
                    && c.max_sample_rate() >= spec.sample_rate
                    && format_rank(c.sample_format()) != u8::MAX
            })
            .min_by_key(|c| (format_rank(c.sample_format()), c.channels()))
            .ok_or_else(|| OutputError::ConfigMismatch {
                message: format!(
                    "device cannot play {} Hz with {} channel(s)",
                    spec.sample_rate, spec.channels
                ),
            })?;

        let device_channels = chosen.channels();
        let stream_config = cpal::StreamConfig {
            channels: device_channels,
            sample_rate: spec.sample_rate,
            buffer_size: cpal::BufferSize::Default,
        };
        let errors = source.error_reporter();

        let stream = match chosen.sample_format() {
            cpal::SampleFormat::F32 => device.build_output_stream(
                &stream_config,
                move |data: &mut [f32], _| {
                    source.fill(data, device_channels);
                },
                error_callback(errors),
                None,
            )?,
            cpal::SampleFormat::I16 => {
                let mut scratch = Vec::new();
                device.build_output_stream(
                    &stream_config,
                    move |data: &mut [i16], _| {
                        scratch.resize(data.len(), 0.0);
                        source.fill(&mut scratch, device_channels);
                        for (slot, &v) in data.iter_mut().zip(&scratch) {
                            *slot = f32_to_i16(v);
                        }
                    },
                    error_callback(errors),
                    None,
                )?
            }
            cpal::SampleFormat::U16 => {
                let mut scratch = Vec::new();
                device.build_output_stream(
                    &stream_config,
                    move |data: &mut [u16], _| {
                        scratch.resize(data.len(), 0.0);
                        source.fill(&mut scratch, device_channels);
                        for (slot, &v) in data.iter_mut().zip(&scratch) {
                            *slot = f32_to_u16(v);
                        }
                    },
                    error_callback(errors),
                    None,
                )?
            }
            other => {
                return Err(OutputError::ConfigMismatch {
                    message: format!("unsupported output sample format: {other:?}"),
                });
            }
        };

        stream.play()?;
        log::debug!(
            "opened '{}' at {} Hz, {} device channel(s)",
            device_label(&device),
            spec.sample_rate,
            device_channels
        );

        Ok(Box::new(CpalHandle {
            _stream: stream,
            spec: OutputSpec {
                sample_rate: spec.sample_rate,
                channels: device_channels,
            },
        }))
    }
}

fn error_callback(
    errors: Sender<SourceEvent>,
) -> impl FnMut(cpal::StreamError) + Send + 'static {
    move |err| {
        log::error!("cpal stream error: {}", err);
        let _ = errors.send(SourceEvent::DeviceError(err.to_string()));
    }
}

fn f32_to_i16(v: f32) -> i16 {
    let v = v.clamp(-1.0, 1.0);
    (v * i16::MAX as f32) as i16
}

fn f32_to_u16(v: f32) -> u16 {
    let v = v.clamp(-1.0, 1.0);
    let normalized = (v + 1.0) * 0.5;
    (normalized * u16::MAX as f32) as u16
}
