use anyhow::{bail, Context};
use clap::Parser;
use dopplercore::model::DEFAULT_QUADRATURE_GAIN;
use dopplercore::playback::cpal_output::list_output_devices;
use dopplercore::playback::{AudioOutput, CaptureOutput, CpalOutput};
use dopplercore::{Direction, OutputLayout, RadarBand, SpeedUnit};
use gui_bridge::bridge::{default_bind_address, ControlBridge};
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::runtime::Builder as TokioBuilder;
use tokio::signal;
use workflow::config::RunFile;
use workflow::runner::Runner;

mod gui_bridge;
mod workflow;

#[derive(Parser)]
#[command(author, version, about = "Doppler radar-gun acoustic simulator")]
struct Args {
    /// Target speed for a single-vehicle run
    #[arg(long)]
    speed: Option<f64>,
    #[arg(long, default_value = "mph")]
    unit: SpeedUnit,
    #[arg(long, default_value = "approaching")]
    direction: Direction,
    #[arg(long, default_value = "k")]
    band: RadarBand,
    /// Tone duration in seconds
    #[arg(long, default_value_t = 5.0)]
    duration: f64,
    #[arg(long, default_value = "quadrature")]
    layout: OutputLayout,
    #[arg(long, default_value_t = DEFAULT_QUADRATURE_GAIN)]
    quadrature_gain: f64,
    /// Load a multi-vehicle run from YAML
    #[arg(long)]
    run_file: Option<PathBuf>,
    /// Play into an in-memory device instead of audio hardware
    #[arg(long, default_value_t = false)]
    offline: bool,
    /// Render and describe the run without opening any device
    #[arg(long, default_value_t = false)]
    dry_run: bool,
    /// Append a JSON summary of each offline run to this file
    #[arg(long)]
    report: Option<PathBuf>,
    /// Output device name (defaults to the host's default output)
    #[arg(long)]
    device: Option<String>,
    #[arg(long, default_value_t = false)]
    list_devices: bool,
    /// Keep the control bridge alive for HTTP-driven runs
    #[arg(long, default_value_t = false)]
    serve: bool,
    #[arg(long)]
    bind: Option<SocketAddr>,
}

impl Args {
    fn run_file(&self) -> anyhow::Result<Option<RunFile>> {
        if let Some(path) = &self.run_file {
            return RunFile::load(path).map(Some);
        }
        Ok(self.speed.map(|speed| {
            RunFile::from_args(speed, self.unit, self.direction, self.band, self.duration)
                .with_layout(self.layout)
                .with_quadrature_gain(self.quadrature_gain)
        }))
    }

    fn output(&self) -> Arc<dyn AudioOutput> {
        if self.offline {
            Arc::new(CaptureOutput::unpaced())
        } else if let Some(name) = &self.device {
            Arc::new(CpalOutput::with_device(name.clone()))
        } else {
            Arc::new(CpalOutput::new())
        }
    }
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let args = Args::parse();

    if args.list_devices {
        for name in list_output_devices() {
            println!("{}", name);
        }
        return Ok(());
    }

    let run_file = args.run_file()?;
    if run_file.is_none() && !args.serve {
        bail!("nothing to do: pass --speed, --run-file or --serve");
    }

    let runner = Runner::new(args.output());
    let bridge = ControlBridge::new(runner.clone());

    if args.dry_run {
        if let Some(file) = &run_file {
            let summary = runner.preview(file)?;
            println!("{}", serde_json::to_string_pretty(&summary)?);
            return Ok(());
        }
    }

    if let Some(file) = run_file {
        let report = runner.execute(&file)?;
        match &report.summary {
            Some(summary) => {
                println!(
                    "Run {} -> {:?}, {} vehicle(s) on {}, {:.2}s, gain {:.3}, dominant {:.1} Hz",
                    report.run_id,
                    report.outcome,
                    summary.vehicles.len(),
                    summary.band,
                    summary.duration_secs(),
                    summary.gain,
                    summary.dominant_hz
                );
                for (index, vehicle) in summary.vehicles.iter().enumerate() {
                    println!(
                        "  vehicle {}: {:.3} m/s, offset {:.2} Hz, weight {:.2}",
                        index + 1,
                        vehicle.speed_mps,
                        vehicle.offset_hz,
                        vehicle.weight
                    );
                }
            }
            None => println!("Run {} -> {:?} before rendering", report.run_id, report.outcome),
        }

        if let Some(report_path) = args.report.as_ref().filter(|_| args.offline) {
            if let Some(parent) = report_path.parent() {
                fs::create_dir_all(parent)?;
            }
            let mut line = serde_json::to_string(&report).context("encoding run report")?;
            line.push('\n');
            let mut file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(report_path)
                .with_context(|| format!("opening report {}", report_path.display()))?;
            file.write_all(line.as_bytes())?;
        }
    }

    if args.serve {
        let addr = args.bind.unwrap_or_else(default_bind_address);
        let _server = bridge.serve(addr)?;
        bridge.publish_status("HTTP bridge running (Ctrl+C to stop)...");
        let runtime = TokioBuilder::new_current_thread()
            .enable_all()
            .build()
            .context("creating runtime for signal handling")?;
        runtime.block_on(async {
            signal::ctrl_c().await.context("awaiting Ctrl+C to exit")?;
            Ok::<(), anyhow::Error>(())
        })?;
        runner.shutdown();
        let status = bridge.snapshot();
        bridge.publish_status(&format!(
            "shutting down: {} completed, {} canceled, {} failed",
            status.metrics.completed, status.metrics.canceled, status.metrics.failed
        ));
    }

    Ok(())
}
