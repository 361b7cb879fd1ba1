// mediaforge-cli/src/commands/probe.rs
//
// The `probe` subcommand: structured or raw inspection of one media file.

use crate::cli::ProbeArgs;
use console::style;
use mediaforge_core::utils::format_duration;
use mediaforge_core::{CoreConfig, CoreResult, MediaInfo, Prober};

pub fn run(args: ProbeArgs) -> CoreResult<()> {
    let temp_dir = args.temp_dir.clone().unwrap_or_else(std::env::temp_dir);
    let mut config = CoreConfig::new(temp_dir);
    config.prober_path = args.ffprobe.clone();
    config.validate()?;

    let prober = Prober::new(&config)?;

    if args.json {
        println!("{}", prober.raw_probe(&args.input)?);
        return Ok(());
    }

    let info = prober.media_info(&args.input)?;
    print_summary(&args.input.display().to_string(), &info);
    Ok(())
}

fn print_summary(path: &str, info: &MediaInfo) {
    println!("{} {path}", style("File:").bold());

    match info.duration_secs {
        Some(secs) => println!("{} {}", style("Duration:").bold(), format_duration(secs)),
        None => println!("{} unknown", style("Duration:").bold()),
    }
    if let Some(bitrate) = info.bitrate {
        println!("{} {} kb/s", style("Bitrate:").bold(), bitrate / 1000);
    }

    for (index, stream) in info.streams.iter().enumerate() {
        let codec = stream.codec_name.as_deref().unwrap_or("unknown");
        let mut details = vec![codec.to_string()];
        if let (Some(w), Some(h)) = (stream.width, stream.height) {
            details.push(format!("{w}x{h}"));
        }
        if let Some(fps) = stream.frame_rate {
            details.push(format!("{fps:.2} fps"));
        }
        if let Some(rate) = stream.sample_rate {
            details.push(format!("{rate} Hz"));
        }
        if let Some(channels) = stream.channels {
            details.push(format!("{channels} ch"));
        }
        println!(
            "{} #{index} ({}): {}",
            style("Stream").bold(),
            stream.codec_type,
            details.join(", ")
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mediaforge_core::StreamInfo;

    // print_summary must tolerate sparse probe results.
    #[test]
    fn summary_handles_missing_fields() {
        let info = MediaInfo {
            duration_secs: None,
            bitrate: None,
            streams: vec![StreamInfo {
                codec_type: "video".to_string(),
                ..Default::default()
            }],
        };
        print_summary("clip.mkv", &info);
    }
}
