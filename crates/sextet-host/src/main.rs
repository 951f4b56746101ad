//! Standalone duplex host: microphone → six-slot chain → speakers.
//!
//! A thin consumer of the library crates. The audio core imposes no CLI of
//! its own; this binary exists so the chain can be played without a plugin
//! host. Input samples travel from the cpal input callback to the output
//! callback through a bounded channel; the chain processes inside the
//! output callback. A stdin loop turns typed prompts into presets via the
//! configured generation service.

use clap::Parser;
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use crossbeam_channel::{Receiver, bounded};
use sextet_chain::{Chain, chain, spawn_reclaim};
use sextet_control::{ControlSurface, PresetPayload, PresetService};
use std::io::BufRead;
use tracing_subscriber::EnvFilter;

/// Maximum block the chain is prepared for.
const MAX_BLOCK: usize = 2048;

#[derive(Debug, thiserror::Error)]
enum HostError {
    #[error("no {0} device available")]
    NoDevice(&'static str),
    #[error("no {0} device matching '{1}'")]
    DeviceNotFound(&'static str, String),
    #[error("audio stream error: {0}")]
    Stream(String),
    #[error(transparent)]
    Control(#[from] sextet_control::ControlError),
}

/// Live multi-effect chain with AI preset control.
#[derive(Parser, Debug)]
#[command(name = "sextet-host", version, about)]
struct Args {
    /// Input device name substring (default device if omitted).
    #[arg(long)]
    input_device: Option<String>,

    /// Output device name substring (default device if omitted).
    #[arg(long)]
    output_device: Option<String>,

    /// Preset-generation service endpoint URL.
    #[arg(long, env = "SEXTET_ENDPOINT")]
    endpoint: Option<String>,

    /// Preset JSON file to load at startup.
    #[arg(long)]
    preset: Option<std::path::PathBuf>,

    /// List audio devices and exit.
    #[arg(long)]
    list_devices: bool,
}

fn find_device(
    devices: impl Iterator<Item = cpal::Device>,
    name: Option<&str>,
    default: Option<cpal::Device>,
    kind: &'static str,
) -> Result<cpal::Device, HostError> {
    match name {
        Some(search) => {
            let lower = search.to_lowercase();
            for device in devices {
                if let Ok(device_name) = device.name() {
                    if device_name.to_lowercase().contains(&lower) {
                        return Ok(device);
                    }
                }
            }
            Err(HostError::DeviceNotFound(kind, search.to_string()))
        }
        None => default.ok_or(HostError::NoDevice(kind)),
    }
}

fn list_devices(host: &cpal::Host) {
    println!("input devices:");
    if let Ok(devices) = host.input_devices() {
        for device in devices {
            println!("  {}", device.name().unwrap_or_else(|_| "<unknown>".into()));
        }
    }
    println!("output devices:");
    if let Ok(devices) = host.output_devices() {
        for device in devices {
            println!("  {}", device.name().unwrap_or_else(|_| "<unknown>".into()));
        }
    }
}

/// Deinterleave, process, reinterleave inside the output callback.
struct DuplexProcessor {
    chain: Chain,
    input_rx: Receiver<(f32, f32)>,
    left: Vec<f32>,
    right: Vec<f32>,
    channels: usize,
}

impl DuplexProcessor {
    fn render(&mut self, output: &mut [f32]) {
        let frames = (output.len() / self.channels).min(MAX_BLOCK);
        self.left.clear();
        self.right.clear();
        for _ in 0..frames {
            // Underruns render silence rather than blocking the callback.
            let (l, r) = self.input_rx.try_recv().unwrap_or((0.0, 0.0));
            self.left.push(l);
            self.right.push(r);
        }

        self.chain
            .process_block(&mut self.left[..frames], &mut self.right[..frames]);

        for (frame, out) in output.chunks_mut(self.channels).enumerate() {
            if frame < frames {
                out[0] = self.left[frame];
                if self.channels > 1 {
                    out[1] = self.right[frame];
                }
            } else {
                out.fill(0.0);
            }
        }
    }
}

fn run() -> Result<(), HostError> {
    let args = Args::parse();
    let host = cpal::default_host();

    if args.list_devices {
        list_devices(&host);
        return Ok(());
    }

    let input_device = find_device(
        host.input_devices()
            .map_err(|e| HostError::Stream(e.to_string()))?,
        args.input_device.as_deref(),
        host.default_input_device(),
        "input",
    )?;
    let output_device = find_device(
        host.output_devices()
            .map_err(|e| HostError::Stream(e.to_string()))?,
        args.output_device.as_deref(),
        host.default_output_device(),
        "output",
    )?;

    let output_config = output_device
        .default_output_config()
        .map_err(|e| HostError::Stream(e.to_string()))?;
    let sample_rate = output_config.sample_rate() as f32;
    let output_channels = output_config.channels() as usize;

    tracing::info!(
        input = input_device.name().unwrap_or_default(),
        output = output_device.name().unwrap_or_default(),
        sample_rate,
        "starting duplex host"
    );

    let (mut audio_chain, handle, reclaim_rx) = chain(sample_rate);
    audio_chain.prepare(sample_rate, MAX_BLOCK);
    let reclaim_thread = spawn_reclaim(reclaim_rx);
    let mut surface = ControlSurface::new(handle);

    if let Some(path) = &args.preset {
        surface.load_preset(path)?;
    }

    // Input callback → bounded ring → output callback. Half a second of
    // headroom absorbs callback size mismatches without audible drift.
    let (input_tx, input_rx) = bounded::<(f32, f32)>((sample_rate * 0.5) as usize);

    let input_config = input_device
        .default_input_config()
        .map_err(|e| HostError::Stream(e.to_string()))?;
    let input_channels = input_config.channels() as usize;

    let input_stream = input_device
        .build_input_stream(
            &input_config.into(),
            move |data: &[f32], _: &cpal::InputCallbackInfo| {
                for frame in data.chunks(input_channels) {
                    let l = frame[0];
                    let r = if input_channels > 1 { frame[1] } else { frame[0] };
                    // Drop on overflow; the output side is authoritative.
                    let _ = input_tx.try_send((l, r));
                }
            },
            |err| tracing::error!(%err, "input stream error"),
            None,
        )
        .map_err(|e| HostError::Stream(e.to_string()))?;

    let mut processor = DuplexProcessor {
        chain: audio_chain,
        input_rx,
        left: Vec::with_capacity(MAX_BLOCK),
        right: Vec::with_capacity(MAX_BLOCK),
        channels: output_channels,
    };

    let output_stream = output_device
        .build_output_stream(
            &output_config.into(),
            move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
                processor.render(data);
            },
            |err| tracing::error!(%err, "output stream error"),
            None,
        )
        .map_err(|e| HostError::Stream(e.to_string()))?;

    input_stream
        .play()
        .map_err(|e| HostError::Stream(e.to_string()))?;
    output_stream
        .play()
        .map_err(|e| HostError::Stream(e.to_string()))?;

    let service = args
        .endpoint
        .as_deref()
        .map(PresetService::new)
        .transpose()?;

    println!("sextet-host running. Type a prompt for a preset, or 'quit'.");
    let stdin = std::io::stdin();
    for line in stdin.lock().lines() {
        let Ok(line) = line else { break };
        let prompt = line.trim();
        if prompt.is_empty() {
            continue;
        }
        if prompt.eq_ignore_ascii_case("quit") {
            break;
        }
        match &service {
            Some(service) => match service.generate(prompt) {
                Ok(payload) => {
                    if let Err(err) = surface.install_preset(&payload) {
                        eprintln!("preset rejected: {err}");
                    } else {
                        println!("loaded preset '{}'", payload.preset_name);
                    }
                }
                // Service failures leave the current preset playing.
                Err(err) => eprintln!("preset request failed: {err}"),
            },
            None => {
                // Without an endpoint, accept raw JSON payloads directly.
                match PresetPayload::from_json(prompt) {
                    Ok(payload) => {
                        if let Err(err) = surface.install_preset(&payload) {
                            eprintln!("preset rejected: {err}");
                        }
                    }
                    Err(_) => eprintln!(
                        "no endpoint configured (--endpoint or SEXTET_ENDPOINT); \
                         paste a preset JSON payload instead"
                    ),
                }
            }
        }
    }

    drop(input_stream);
    drop(output_stream);
    drop(surface);
    let _ = reclaim_thread.join();
    Ok(())
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    if let Err(err) = run() {
        tracing::error!(%err, "host exited with error");
        std::process::exit(1);
    }
}
