#[cfg(not(feature = "streaming"))]
fn main() {
    eprintln!(
        "The modplay CLI requires the \"streaming\" feature. Rebuild with `--features streaming` to enable playback."
    );
}

#[cfg(feature = "streaming")]
fn main() -> anyhow::Result<()> {
    cli::run()
}

#[cfg(feature = "streaming")]
mod cli {
    use std::io::{self, BufRead, Write};
    use std::path::PathBuf;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;
    use std::thread;
    use std::time::{Duration, Instant};

    use anyhow::{Context, Result};
    use clap::Parser;
    use tracing_subscriber::EnvFilter;

    use modplay::replayer::{frame_channel, VolumeTransform};
    use modplay::streaming::{AudioDevice, RealtimePlayer, SinkPump, StreamConfig};
    use modplay::visualization::ChannelMonitor;
    use modplay::{load_file, Interpolation, Pipeline, PlayerConfig};

    /// Frames of audio the ring buffer holds
    const RING_BUFFER_TICKS: usize = 4;

    /// Longest wait for the ring buffer to drain at the end
    const DRAIN_TIMEOUT: Duration = Duration::from_secs(2);

    const LEVEL_BAR_WIDTH: usize = 12;

    #[derive(Parser, Debug)]
    #[command(name = "modplay")]
    #[command(about = "Play 4-channel tracker modules in real time")]
    struct Args {
        /// Module file (plain or LHA-packed)
        file: PathBuf,

        /// JSON player config; flags below override it
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Channels to play, comma separated (0-3)
        #[arg(long, value_delimiter = ',')]
        channels: Option<Vec<usize>>,

        /// Beats per minute
        #[arg(long)]
        bpm: Option<u32>,

        /// Ticks per beat
        #[arg(long)]
        tpb: Option<u32>,

        /// Output sample rate in Hz
        #[arg(long)]
        rate: Option<u32>,

        /// Resampling: zero_order_hold, linear or cubic
        #[arg(long)]
        interpolation: Option<Interpolation>,

        /// Play position to start from
        #[arg(long)]
        start_pattern: Option<usize>,

        /// Row to start from
        #[arg(long)]
        start_note: Option<usize>,

        /// Stop after this many ticks
        #[arg(long)]
        ticks: Option<u64>,

        /// Apply Cxx set-volume commands
        #[arg(long)]
        volume_effects: bool,

        /// Show per-channel level bars
        #[arg(long)]
        monitor: bool,

        /// Print the song summary and exit
        #[arg(long)]
        info: bool,

        /// Debug logging
        #[arg(short, long)]
        verbose: bool,
    }

    impl Args {
        fn player_config(&self) -> Result<PlayerConfig> {
            let mut config = match &self.config {
                Some(path) => PlayerConfig::from_json_file(path)
                    .with_context(|| format!("failed to load config '{}'", path.display()))?,
                None => PlayerConfig::default(),
            };

            if let Some(channels) = &self.channels {
                config.channels = channels.clone();
            }
            if let Some(bpm) = self.bpm {
                config.bpm = bpm;
            }
            if let Some(tpb) = self.tpb {
                config.ticks_per_beat = tpb;
            }
            if let Some(rate) = self.rate {
                config.playback_rate = rate;
            }
            if let Some(interpolation) = self.interpolation {
                config.interpolation = interpolation;
            }
            if let Some(pattern) = self.start_pattern {
                config.start_pattern = pattern;
            }
            if let Some(note) = self.start_note {
                config.start_note = note;
            }

            config.validate().context("invalid player configuration")?;
            Ok(config)
        }
    }

    fn init_logging(verbose: bool) {
        let default = if verbose { "debug" } else { "info" };
        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .with_writer(io::stderr)
            .init();
    }

    /// Raise `stop` when the user presses Enter. A closed stdin is ignored.
    fn spawn_input_watcher(stop: Arc<AtomicBool>) -> Result<()> {
        thread::Builder::new()
            .name("input".to_string())
            .spawn(move || {
                let mut line = String::new();
                if matches!(io::stdin().lock().read_line(&mut line), Ok(n) if n > 0) {
                    stop.store(true, Ordering::Release);
                }
            })
            .context("failed to start input thread")?;
        Ok(())
    }

    pub fn run() -> Result<()> {
        let args = Args::parse();
        init_logging(args.verbose);

        let config = args.player_config()?;
        let song = Arc::new(
            load_file(&args.file)
                .with_context(|| format!("failed to load '{}'", args.file.display()))?,
        );

        if args.info {
            print!("{}", song);
            return Ok(());
        }

        let timing = config.timing()?;
        let stream_config = StreamConfig::for_timing(&timing, RING_BUFFER_TICKS);
        let output = Arc::new(
            RealtimePlayer::new(stream_config).context("failed to create output stream")?,
        );
        let device = AudioDevice::new(
            stream_config.sample_rate,
            stream_config.channels,
            output.buffer(),
        )
        .context("failed to open audio device")?;

        let (sink, frames) = frame_channel(config.sink_queue_len, config.sink_timeout());
        let mut pipeline = Pipeline::new(song.clone(), &config)
            .context("song does not fit the player configuration")?
            .with_sink(sink);
        if args.volume_effects {
            pipeline = pipeline.with_effects(Arc::new(VolumeTransform));
        }
        if let Some(ticks) = args.ticks {
            pipeline = pipeline.with_tick_limit(ticks);
        }

        println!("Playing \"{}\" ({:?})", song.name(), song.variant());
        println!(
            "{} Hz, {} samples per tick, channels {:?}. Press Enter to stop.\n",
            timing.playback_rate, timing.frame_size, config.channels
        );

        let handle = pipeline.spawn().context("failed to start render pipeline")?;
        let pump = SinkPump::spawn(frames, output.clone(), Arc::new(AtomicBool::new(false)))
            .context("failed to start sink pump")?;
        spawn_input_watcher(handle.stop_flag())?;

        let monitor = ChannelMonitor::new(handle.frames(), timing.frame_size);
        while !handle.is_finished() {
            if args.monitor {
                let cursor = handle.cursor();
                print!(
                    "\r{:03}:{:02} {}",
                    cursor.pattern_idx,
                    cursor.note_idx,
                    monitor.status_line(LEVEL_BAR_WIDTH)
                );
                let _ = io::stdout().flush();
            }
            thread::sleep(config.monitor_refresh());
        }
        if args.monitor {
            println!();
        }

        let user_stopped = handle.is_stopping() && args.ticks.is_none();
        let stats = handle.join().context("render pipeline failed")?;
        let forwarded = pump.join();

        if user_stopped {
            output.flush();
        } else {
            let started = Instant::now();
            while output.fill_ratio() > 0.0 && started.elapsed() < DRAIN_TIMEOUT {
                thread::sleep(Duration::from_millis(10));
            }
        }
        device.finish();

        println!(
            "Played {} ticks ({} frames to the device, {} dropped, {} render errors)",
            stats.ticks, forwarded, stats.dropped_frames, stats.index_errors
        );
        Ok(())
    }
}
