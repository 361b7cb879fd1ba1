// mediaforge-cli/src/commands/transcode.rs
//
// The `transcode` subcommand: probes the source, maps the CLI flags onto a
// typed output format, and drives one save operation with a live spinner.

use crate::cli::{OverwritePolicy, TranscodeArgs};
use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use log::{debug, info};
use mediaforge_core::utils::{format_bytes, format_duration};
use mediaforge_core::{
    CoreConfig, CoreError, CoreResult, Format, Media, Overwrite, Prober, SplitOptions, Timecode,
};
use std::time::Duration;

pub fn run(args: TranscodeArgs) -> CoreResult<()> {
    let config = build_config(&args);
    config.validate()?;

    let prober = Prober::new(&config)?;
    let mut media = Media::probe(&args.input, &prober)?;
    debug!("Probed {}: {:?}", args.input.display(), media.info());

    let format = build_format(&args)?;

    if let Some(start) = args.start {
        let start = Timecode::from_seconds(start)?;
        let duration = args.duration.map(Timecode::from_seconds).transpose()?;
        media.extract_segment(start, duration)?;
    }

    if let Some(interval) = args.split_interval {
        media.split(SplitOptions::every(Timecode::from_seconds(interval)?))?;
    } else if let Some(times) = &args.split_times {
        let times = times
            .iter()
            .map(|t| Timecode::from_seconds(*t))
            .collect::<CoreResult<Vec<_>>>()?;
        media.split(SplitOptions::at_times(times))?;
    }

    for pair in &args.metadata {
        let (key, value) = pair
            .split_once('=')
            .ok_or_else(|| CoreError::Usage(format!("metadata must be KEY=VALUE: {pair}")))?;
        media.metadata(key, value);
    }

    let overwrite = match args.overwrite {
        OverwritePolicy::Fail => Overwrite::Fail,
        OverwritePolicy::Preserve => Overwrite::Preserve,
        OverwritePolicy::Force => Overwrite::Existing,
        OverwritePolicy::Unique => Overwrite::Unique,
    };

    info!(
        "Transcoding {} -> {}",
        args.input.display(),
        args.output.display()
    );

    let spinner = ProgressBar::new_spinner();
    spinner.set_style(
        ProgressStyle::with_template("{spinner} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    spinner.enable_steady_tick(Duration::from_millis(120));

    let result = media.save_with_progress(&args.output, &format, overwrite, &config, |buffer| {
        if let Some(line) = buffer.lines().last() {
            spinner.set_message(line.trim().to_string());
        }
    });
    spinner.finish_and_clear();
    let report = result?;

    let elapsed = report
        .run_time
        .map_or_else(|| "unknown".to_string(), |d| format_duration(d.as_secs_f64()));
    println!(
        "{} {} file(s) in {}",
        style("Done:").green().bold(),
        report.output_files.len(),
        elapsed
    );
    for file in &report.output_files {
        match std::fs::metadata(file) {
            Ok(meta) => println!("  {} ({})", file.display(), format_bytes(meta.len())),
            Err(_) => println!("  {}", file.display()),
        }
    }
    Ok(())
}

fn build_config(args: &TranscodeArgs) -> CoreConfig {
    let temp_dir = args
        .temp_dir
        .clone()
        .unwrap_or_else(std::env::temp_dir);
    let mut config = CoreConfig::new(temp_dir);
    config.engine_path = args.ffmpeg.clone();
    config.prober_path = args.ffprobe.clone();
    config
}

fn build_format(args: &TranscodeArgs) -> CoreResult<Format> {
    let mut format = Format::output();

    if let Some(container) = &args.container {
        format.set_format(container)?;
    }
    if args.no_video {
        format.disable_video();
    } else {
        if let Some(codec) = &args.vcodec {
            format.set_video_codec(codec)?;
        }
        if let Some(kbps) = args.video_bitrate {
            format.set_video_bitrate(kbps)?;
        }
        if let Some(fps) = args.fps {
            format.set_frame_rate(fps)?;
        }
        if let Some(quality) = args.quality {
            format.set_quality(quality)?;
        }
        if let Some(size) = &args.size {
            let (width, height) = parse_size(size)?;
            format.set_dimensions(width, height)?;
        }
    }
    if args.no_audio {
        format.disable_audio();
    } else {
        if let Some(codec) = &args.acodec {
            format.set_audio_codec(codec)?;
        }
        if let Some(kbps) = args.audio_bitrate {
            format.set_audio_bitrate(kbps)?;
        }
    }
    Ok(format)
}

fn parse_size(size: &str) -> CoreResult<(u32, u32)> {
    let parsed = size.split_once('x').and_then(|(w, h)| {
        Some((w.trim().parse::<u32>().ok()?, h.trim().parse::<u32>().ok()?))
    });
    parsed.ok_or_else(|| CoreError::Usage(format!("size must be WIDTHxHEIGHT: {size}")))
}
