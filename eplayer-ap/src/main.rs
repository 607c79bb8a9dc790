//! eplayer-ap - command-line front end for the LPCM audio path
//!
//! Subcommands:
//! - `reframe`: raw PCM file -> LPCM PES file through the `pcm` writer
//! - `transcode`: compressed media file -> LPCM PES file through the `ipcm`
//!   writer (symphonia decode + rubato resample)
//! - `writers`: list writer capability descriptors as JSON

use std::fs::File;
use std::io::{BufWriter, Read, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicI64, Ordering};

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use tracing::{debug, info, warn};

use eplayer_ap::audio::writer::WRITER_CAPS;
use eplayer_ap::audio::{
    AudioCall, AudioWriter, ClockPtsCalculator, CompressedPacket, MediaFile, PacketDecoder,
    StreamParams,
};
use eplayer_ap::playback::OutputSink;
use eplayer_common::config::TomlConfig;
use eplayer_common::logging::init_tracing;
use eplayer_common::pts::{is_valid, pts_to_seconds, seconds_to_pts, INVALID_PTS_VALUE};

/// Command-line arguments for eplayer-ap
#[derive(Parser, Debug)]
#[command(name = "eplayer-ap")]
#[command(about = "LPCM reframing and decode/resample tool for eplayer")]
#[command(version)]
struct Args {
    /// Configuration file (overrides EPLAYER_CONFIG and default locations)
    #[arg(short, long, env = "EPLAYER_CONFIG")]
    config: Option<PathBuf>,

    /// Log level (overrides the configured level; RUST_LOG still wins)
    #[arg(long, env = "EPLAYER_LOG_LEVEL")]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Reframe raw PCM into LPCM PES packets
    Reframe {
        /// Sample rate in Hz
        #[arg(long, default_value = "48000")]
        rate: u32,

        /// Channel count
        #[arg(long, default_value = "2")]
        channels: u16,

        /// Bits per sample (16 or 24)
        #[arg(long, default_value = "16")]
        bits: u16,

        /// Input samples are big-endian
        #[arg(long)]
        big_endian: bool,

        /// PTS (90 kHz ticks) stamped on every packet; omitted when not given
        #[arg(long, conflicts_with = "start_seconds")]
        pts: Option<i64>,

        /// Same as --pts, given in seconds
        #[arg(long)]
        start_seconds: Option<f64>,

        /// Bytes read from the input per write call
        #[arg(long, default_value = "4096")]
        chunk: usize,

        /// Raw PCM input file
        input: PathBuf,

        /// PES output file
        output: PathBuf,
    },

    /// Decode and resample a media file into LPCM PES packets
    Transcode {
        /// Media file (wav, flac, mp3, aac, ogg, ...)
        input: PathBuf,

        /// PES output file
        output: PathBuf,
    },

    /// Print the writer capability descriptors
    Writers,
}

/// Output sink that only records the commands it receives in the log
struct LoggingSink;

impl OutputSink for LoggingSink {
    fn play(&self) -> bool {
        debug!("output: play");
        true
    }

    fn pause(&self) -> bool {
        debug!("output: pause");
        true
    }

    fn continue_playback(&self) -> bool {
        debug!("output: continue");
        true
    }

    fn stop(&self) -> bool {
        debug!("output: stop");
        true
    }

    fn clear(&self) -> bool {
        debug!("output: clear");
        true
    }

    fn mute(&self, on: bool) -> bool {
        debug!("output: mute({})", on);
        true
    }

    fn av_sync(&self, on: bool) -> bool {
        debug!("output: avsync({})", on);
        true
    }

    fn fast_forward(&self, speed: i32) -> bool {
        debug!("output: fastforward({})", speed);
        true
    }

    fn slow_motion(&self, repeats: i32) -> bool {
        debug!("output: slowmotion({})", repeats);
        true
    }

    fn get_pts(&self) -> Option<i64> {
        None
    }

    fn get_frame_count(&self) -> Option<i64> {
        None
    }
}

fn main() -> Result<()> {
    let args = Args::parse();

    let mut config = TomlConfig::load_or_default(args.config.as_deref())
        .context("Failed to load configuration")?;
    if let Some(level) = args.log_level {
        config.logging.level = level;
    }
    init_tracing(&config.logging).context("Failed to initialise logging")?;

    info!(
        "eplayer-ap {} (git {}, built {}, {})",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH"),
        env!("BUILD_TIMESTAMP"),
        env!("BUILD_PROFILE")
    );

    match args.command {
        Command::Reframe {
            rate,
            channels,
            bits,
            big_endian,
            pts,
            start_seconds,
            chunk,
            input,
            output,
        } => {
            let params = StreamParams::new(channels, rate, bits, !big_endian);
            let pts = pts
                .or(start_seconds.map(seconds_to_pts))
                .unwrap_or(INVALID_PTS_VALUE);
            reframe(&input, &output, params, pts, chunk, &config)
        }
        Command::Transcode { input, output } => transcode(&input, &output, &config),
        Command::Writers => {
            let json = serde_json::to_string_pretty(&WRITER_CAPS)
                .context("Failed to serialise writer capabilities")?;
            println!("{}", json);
            Ok(())
        }
    }
}

fn reframe(
    input: &Path,
    output: &Path,
    params: StreamParams,
    pts: i64,
    chunk: usize,
    config: &TomlConfig,
) -> Result<()> {
    if chunk == 0 {
        bail!("--chunk must be greater than 0");
    }

    let mut reader = File::open(input)
        .with_context(|| format!("Failed to open input {}", input.display()))?;
    let mut out = BufWriter::new(
        File::create(output)
            .with_context(|| format!("Failed to create output {}", output.display()))?,
    );
    let mut writer = AudioWriter::for_codec("A_PCM", &config.resampler)
        .context("pcm writer unavailable")?;

    info!(
        "Reframing {} ({} Hz, {} ch, {} bit, {}) -> {}",
        input.display(),
        params.sample_rate,
        params.channels,
        params.bits_per_sample,
        if params.little_endian { "LE" } else { "BE" },
        output.display()
    );

    let mut buf = vec![0u8; chunk];
    let mut total = 0usize;
    loop {
        let n = reader.read(&mut buf).context("Failed to read input")?;
        if n == 0 {
            break;
        }
        let consumed = writer.write(AudioCall::pcm(&mut out, &buf[..n], params, pts));
        if consumed == 0 {
            bail!("Stream parameters cannot be framed as LPCM");
        }
        total += consumed;
    }
    out.flush().context("Failed to flush output")?;

    if let AudioWriter::Pcm(pcm) = &writer {
        if pcm.carried() > 0 {
            warn!("{} trailing bytes did not fill a PES payload", pcm.carried());
        }
    }
    info!("Reframed {} bytes", total);
    Ok(())
}

fn transcode(input: &Path, output: &Path, config: &TomlConfig) -> Result<()> {
    let mut media = MediaFile::open(input)
        .with_context(|| format!("Failed to open media {}", input.display()))?;
    let mut decoder = media.decoder().context("Failed to create decoder")?;
    let time_base = media.time_base();

    let mut out = BufWriter::new(
        File::create(output)
            .with_context(|| format!("Failed to create output {}", output.display()))?,
    );
    let mut writer = AudioWriter::for_codec("A_IPCM", &config.resampler)
        .context("ipcm writer unavailable")?;

    let sink = LoggingSink;
    let pts_calc = ClockPtsCalculator;
    let current_pts = AtomicI64::new(INVALID_PTS_VALUE);

    info!("Transcoding {} -> {}", input.display(), output.display());

    let mut packets = 0usize;
    while let Some(packet) = media.next_packet().context("Failed to read packet")? {
        let compressed = CompressedPacket {
            data: &packet.data,
            timestamp: Some(packet.timestamp),
            time_base,
            decoder: &mut decoder as &mut dyn PacketDecoder,
            output: &sink,
            pts_calc: &pts_calc,
            current_pts: &current_pts,
            restart_resampling: false,
        };
        writer.write(AudioCall::compressed(&mut out, compressed));
        packets += 1;
    }
    out.flush().context("Failed to flush output")?;

    let last_pts = current_pts.load(Ordering::Acquire);
    if is_valid(last_pts) {
        info!(
            "Transcoded {} packets, last audio PTS {} ({:.3}s)",
            packets,
            last_pts,
            pts_to_seconds(last_pts)
        );
    } else {
        info!("Transcoded {} packets, no audio PTS", packets);
    }
    Ok(())
}
