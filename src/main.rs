//! `bilicache`: converts the download cache of the Bilibili mobile client into
//! one audio file per cached video.

mod cli;
mod logging;

use crate::cli::Cli;
use bilicache_config::{Config, Existing, InputMode, TranscoderConfig};
use bilicache_fragment::HeaderPatcher;
use bilicache_library::{Context, ConvertEvent, NameGenerator, OnExisting, ScanEvent, Summary, convert, scan};
use bilicache_storage::BackendHandle;
use bilicache_storage::backend::LocalBackend;
use bilicache_transcode::{Ffmpeg, FfmpegOptions, InputMode as TranscodeInputMode, TranscoderHandle};
use clap::Parser;
use futures::StreamExt;
use miette::{IntoDiagnostic, WrapErr};
use std::pin::pin;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

/// Exit code for errors that stop the whole run.
const EXIT_FATAL: u8 = 101;
const EXIT_INTERRUPTED: u8 = 130;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    logging::init(cli.verbosity());
    tokio::select! {
        result = run(&cli) => match result {
            Ok(code) => code,
            Err(report) => {
                eprintln!("{report:?}");
                ExitCode::from(EXIT_FATAL)
            },
        },
        _ = tokio::signal::ctrl_c() => {
            // Dropping `run` cancels conversions in flight: transcoders are
            // killed and their temporary files removed.
            eprintln!("Interrupted");
            ExitCode::from(EXIT_INTERRUPTED)
        },
    }
}

async fn run(cli: &Cli) -> miette::Result<ExitCode> {
    let config = Config::load(cli.config.as_deref(), &cli.overrides()).map_err(fatal("invalid configuration"))?;
    tracing::debug!(?config, "Configuration loaded");

    let root = std::fs::canonicalize(&cli.input)
        .into_diagnostic()
        .wrap_err_with(|| format!("cache directory {} not found", cli.input.display()))?;
    let backend: BackendHandle =
        Arc::new(LocalBackend::new("cache", &root).map_err(fatal("cache directory not readable"))?);
    let ctx = context(&config).await?;

    println!("Scanning {}", root.display());
    let mut summary = Summary::default();
    let mut entries = Vec::new();
    let mut scanning = pin!(scan(&backend));
    while let Some(event) = scanning.next().await {
        match event.map_err(fatal("cache scan failed"))? {
            ScanEvent::Discovered(entry) => entries.push(*entry),
            ScanEvent::Skipped(skipped) => {
                println!("{}: skipped, {} is not readable", skipped.dir.display(), skipped.unreadable.display());
                summary.record_unscanned();
            },
            ScanEvent::Unreadable(dir) => tracing::warn!(dir = %dir.display(), "Directory not readable; ignored"),
            ScanEvent::Started | ScanEvent::DiscoveryComplete(_) | ScanEvent::Complete => {},
        }
    }

    if entries.is_empty() && summary.total() == 0 {
        println!("No cache entries found under {}", root.display());
        return Ok(ExitCode::SUCCESS);
    }
    println!("Found {} entries", entries.len());

    let mut converting = pin!(convert(&backend, &ctx, entries));
    while let Some(event) = converting.next().await {
        if let ConvertEvent::Finished(report) = event {
            println!("{report}");
            summary.record(&report);
        }
    }

    println!("{summary}");
    println!("Output: {}", ctx.output.display());
    Ok(ExitCode::from(summary.exit_code()))
}

/// Builds the conversion context, locating the transcoder and creating the
/// output directory.
async fn context(config: &Config) -> miette::Result<Context> {
    let names: NameGenerator = config.naming.template.parse().map_err(fatal("invalid naming template"))?;
    let options = ffmpeg_options(&config.transcoder);
    let ffmpeg = match &config.transcoder.program {
        Some(program) => Ffmpeg::with_program(program, options).await,
        None => Ffmpeg::discover(options).await,
    }
    .map_err(fatal("transcoder unavailable"))?;
    tracing::info!(program = %ffmpeg.program().display(), "Using FFmpeg");
    let transcoder: TranscoderHandle = Arc::new(ffmpeg);

    tokio::fs::create_dir_all(&config.output)
        .await
        .into_diagnostic()
        .wrap_err_with(|| format!("cannot create output directory {}", config.output.display()))?;

    let existing = match config.existing {
        Existing::Overwrite => OnExisting::Overwrite,
        Existing::Skip => OnExisting::Skip,
    };
    Ok(Context::new(transcoder, &config.output)
        .with_patcher(
            HeaderPatcher::new(config.patch.magic.as_bytes()).with_require_prefix(config.patch.require_prefix),
        )
        .with_names(names.with_max_length(config.naming.max_length))
        .with_existing(existing)
        .with_jobs(config.jobs))
}

fn ffmpeg_options(config: &TranscoderConfig) -> FfmpegOptions {
    FfmpegOptions {
        codec: config.codec.clone(),
        quality: config.quality,
        extension: config.extension.clone(),
        timeout: Duration::from_secs(config.timeout),
        input: match config.input {
            InputMode::Pipe => TranscodeInputMode::Pipe,
            InputMode::Tempfile => TranscodeInputMode::TempFile,
        },
        extra_args: config.extra_args.clone(),
    }
}

/// Turns a run-fatal error into a report: its message up front, the full
/// error tree as help.
fn fatal<E>(context: &'static str) -> impl FnOnce(exn::Exn<E>) -> miette::Report
where
    E: std::error::Error + Send + Sync + 'static,
{
    move |err| miette::miette!(help = format!("{err:?}"), "{context}: {}", *err)
}
