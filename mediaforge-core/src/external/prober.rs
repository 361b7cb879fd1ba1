//! Media inspection through the prober binary.
//!
//! The prober is invoked through the same composer and supervisor as the
//! engine, with `-show_streams -show_format` output in JSON form. Parsing
//! the raw text into structured records sits behind the [`MetadataParser`]
//! trait, treated as a pure function of the raw text; results can be cached
//! through an injected [`QueryCache`].

use crate::cache::{NoopCache, QueryCache, QueryKind};
use crate::command::{ArgPosition, ArgValue, CommandRequest};
use crate::config::CoreConfig;
use crate::error::{CoreError, CoreResult};
use crate::external::exec::ExecBuffer;

use serde::Deserialize;
use std::path::{Path, PathBuf};

// ============================================================================
// STRUCTURED MEDIA INFORMATION
// ============================================================================

/// Per-stream information extracted from the prober output.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StreamInfo {
    pub codec_type: String,
    pub codec_name: Option<String>,
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub sample_rate: Option<u32>,
    pub channels: Option<u32>,
    pub frame_rate: Option<f64>,
    pub total_frames: Option<u64>,
}

/// Structured information about one media file.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MediaInfo {
    /// Duration of the media in seconds.
    pub duration_secs: Option<f64>,
    /// Overall bitrate in bits per second.
    pub bitrate: Option<u64>,
    pub streams: Vec<StreamInfo>,
}

impl MediaInfo {
    /// First video stream, if any.
    #[must_use]
    pub fn video_stream(&self) -> Option<&StreamInfo> {
        self.streams.iter().find(|s| s.codec_type == "video")
    }

    /// All audio streams.
    pub fn audio_streams(&self) -> impl Iterator<Item = &StreamInfo> {
        self.streams.iter().filter(|s| s.codec_type == "audio")
    }

    /// Dimensions of the first video stream.
    #[must_use]
    pub fn dimensions(&self) -> Option<(u32, u32)> {
        let video = self.video_stream()?;
        Some((video.width?, video.height?))
    }

    /// Frame rate of the first video stream.
    #[must_use]
    pub fn frame_rate(&self) -> Option<f64> {
        self.video_stream()?.frame_rate
    }
}

// ============================================================================
// METADATA PARSING
// ============================================================================

/// Turns raw prober output into structured records. A pure function of the
/// raw text; the concrete implementation is selected once at construction.
pub trait MetadataParser {
    fn parse_media_info(&self, raw: &str) -> CoreResult<MediaInfo>;
}

/// Default parser for the prober's JSON output format.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonMetadataParser;

#[derive(Debug, Deserialize)]
struct RawProbe {
    format: Option<RawFormat>,
    #[serde(default)]
    streams: Vec<RawStream>,
}

#[derive(Debug, Deserialize)]
struct RawFormat {
    duration: Option<String>,
    bit_rate: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawStream {
    codec_type: Option<String>,
    codec_name: Option<String>,
    width: Option<i64>,
    height: Option<i64>,
    sample_rate: Option<String>,
    channels: Option<i64>,
    avg_frame_rate: Option<String>,
    r_frame_rate: Option<String>,
    nb_frames: Option<String>,
}

impl MetadataParser for JsonMetadataParser {
    fn parse_media_info(&self, raw: &str) -> CoreResult<MediaInfo> {
        // The buffer may carry engine banner noise before the JSON object.
        let json_start = raw.find('{').ok_or_else(|| {
            CoreError::ProbeParse("no JSON object found in prober output".to_string())
        })?;
        let parsed: RawProbe = serde_json::from_str(&raw[json_start..])
            .map_err(|e| CoreError::ProbeParse(format!("malformed prober JSON: {e}")))?;

        let (duration_secs, bitrate) = match &parsed.format {
            Some(format) => (
                format.duration.as_deref().and_then(|d| d.parse::<f64>().ok()),
                format.bit_rate.as_deref().and_then(|b| b.parse::<u64>().ok()),
            ),
            None => (None, None),
        };

        let streams = parsed
            .streams
            .into_iter()
            .map(|raw| {
                let frame_rate = raw
                    .avg_frame_rate
                    .as_deref()
                    .and_then(parse_frame_rate)
                    .or_else(|| raw.r_frame_rate.as_deref().and_then(parse_frame_rate));
                StreamInfo {
                    codec_type: raw.codec_type.unwrap_or_default(),
                    codec_name: raw.codec_name,
                    width: raw.width.and_then(|w| u32::try_from(w).ok()),
                    height: raw.height.and_then(|h| u32::try_from(h).ok()),
                    sample_rate: raw.sample_rate.and_then(|s| s.parse().ok()),
                    channels: raw.channels.and_then(|c| u32::try_from(c).ok()),
                    frame_rate,
                    total_frames: raw.nb_frames.and_then(|f| f.parse().ok()),
                }
            })
            .collect();

        Ok(MediaInfo {
            duration_secs,
            bitrate,
            streams,
        })
    }
}

/// Parses a prober rational frame rate such as `30000/1001`.
fn parse_frame_rate(text: &str) -> Option<f64> {
    match text.split_once('/') {
        Some((num, den)) => {
            let num: f64 = num.parse().ok()?;
            let den: f64 = den.parse().ok()?;
            if den == 0.0 {
                None
            } else {
                Some(num / den)
            }
        }
        None => text.parse().ok(),
    }
}

/// The engine reports this when asked for metadata without an output file;
/// for probing purposes it is benign and must not propagate as a failure.
fn is_benign_probe_failure(tail: &str) -> bool {
    tail.to_ascii_lowercase()
        .contains("at least one output file must be specified")
}

// ============================================================================
// PROBER
// ============================================================================

/// Executes the prober binary against media files.
///
/// Parser and cache are injected at construction; the defaults are the JSON
/// parser and the no-op cache.
#[derive(Debug)]
pub struct Prober<C = NoopCache, P = JsonMetadataParser> {
    config: CoreConfig,
    binary: PathBuf,
    cache: C,
    parser: P,
}

impl Prober {
    /// Creates a prober with the default parser and no caching.
    pub fn new(config: &CoreConfig) -> CoreResult<Self> {
        let binary = config.resolver().prober(config.prober_path.as_deref())?;
        Ok(Self {
            config: config.clone(),
            binary,
            cache: NoopCache,
            parser: JsonMetadataParser,
        })
    }
}

impl<C: QueryCache, P: MetadataParser> Prober<C, P> {
    /// Replaces the cache implementation.
    pub fn with_cache<C2: QueryCache>(self, cache: C2) -> Prober<C2, P> {
        Prober {
            config: self.config,
            binary: self.binary,
            cache,
            parser: self.parser,
        }
    }

    /// Replaces the parser implementation.
    pub fn with_parser<P2: MetadataParser>(self, parser: P2) -> Prober<C, P2> {
        Prober {
            config: self.config,
            binary: self.binary,
            cache: self.cache,
            parser,
        }
    }

    /// Structured information for one media file.
    pub fn media_info(&self, path: &Path) -> CoreResult<MediaInfo> {
        let raw = self.raw_probe(path)?;
        self.parser.parse_media_info(&raw)
    }

    /// Raw prober output for one media file, via the cache when possible.
    pub fn raw_probe(&self, path: &Path) -> CoreResult<String> {
        if !path.is_file() {
            return Err(CoreError::PathError(format!(
                "media file does not exist: {}",
                path.display()
            )));
        }

        if let Some(cached) = self.cache.get(path, QueryKind::MediaInfo) {
            log::debug!("Probe cache hit for {}", path.display());
            return Ok(cached);
        }

        let mut request = CommandRequest::new();
        request
            .add(ArgPosition::PreInput, "-show_streams", ArgValue::None, false)?
            .add(ArgPosition::PreInput, "-show_format", ArgValue::None, false)?
            .add(
                ArgPosition::PreInput,
                "-of",
                ArgValue::Escaped("json".to_string()),
                false,
            )?
            .add(
                ArgPosition::PreInput,
                "-v",
                ArgValue::Escaped("quiet".to_string()),
                false,
            )?
            .set_input(path)?;
        let command = request.compose(&self.binary)?;

        let mut exec = ExecBuffer::new(command, &self.config)?;
        exec.execute()?;

        if exec.has_error()? {
            let tail = exec.error_tail();
            if is_benign_probe_failure(&tail) {
                log::debug!("Ignoring benign probe failure for {}", path.display());
            } else {
                return Err(CoreError::EngineFailure {
                    exit_code: exec.error_code(),
                    tail,
                    report: Box::new(exec.report()),
                });
            }
        }

        let raw = exec.cleaned_buffer();
        self.cache.put(path, QueryKind::MediaInfo, raw.clone());
        Ok(raw)
    }

    /// First line of the prober's `-version` banner.
    pub fn version(&self) -> CoreResult<String> {
        if let Some(cached) = self.cache.get(&self.binary, QueryKind::ProberVersion) {
            return Ok(cached);
        }
        let version = crate::external::binary_version(&self.binary)?;
        self.cache
            .put(&self.binary, QueryKind::ProberVersion, version.clone());
        Ok(version)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::MemoryCache;
    use crate::external::mocks::MockMetadataParser;
    use crate::external::resolve_binary;

    const SAMPLE_JSON: &str = r#"{
        "streams": [
            {
                "codec_type": "video",
                "codec_name": "h264",
                "width": 1920,
                "height": 1080,
                "avg_frame_rate": "30000/1001",
                "nb_frames": "9000"
            },
            {
                "codec_type": "audio",
                "codec_name": "aac",
                "sample_rate": "48000",
                "channels": 6
            }
        ],
        "format": {
            "duration": "300.25",
            "bit_rate": "1500000"
        }
    }"#;

    #[test]
    fn json_parser_extracts_structured_records() {
        let info = JsonMetadataParser.parse_media_info(SAMPLE_JSON).unwrap();
        assert_eq!(info.duration_secs, Some(300.25));
        assert_eq!(info.bitrate, Some(1_500_000));
        assert_eq!(info.streams.len(), 2);

        let video = info.video_stream().unwrap();
        assert_eq!(video.codec_name.as_deref(), Some("h264"));
        assert_eq!(info.dimensions(), Some((1920, 1080)));
        let fps = info.frame_rate().unwrap();
        assert!((fps - 29.97).abs() < 0.01);
        assert_eq!(video.total_frames, Some(9000));

        let audio = info.audio_streams().next().unwrap();
        assert_eq!(audio.sample_rate, Some(48000));
        assert_eq!(audio.channels, Some(6));
    }

    #[test]
    fn json_parser_skips_banner_noise_before_json() {
        let noisy = format!("probe version 6.0\nbuilt with gcc\n{SAMPLE_JSON}");
        let info = JsonMetadataParser.parse_media_info(&noisy).unwrap();
        assert_eq!(info.duration_secs, Some(300.25));
    }

    #[test]
    fn json_parser_rejects_tokenless_garbage() {
        assert!(JsonMetadataParser.parse_media_info("no json here").is_err());
        assert!(JsonMetadataParser.parse_media_info("{ not json").is_err());
    }

    #[test]
    fn frame_rate_rational_parsing() {
        assert_eq!(parse_frame_rate("25/1"), Some(25.0));
        assert_eq!(parse_frame_rate("24"), Some(24.0));
        assert_eq!(parse_frame_rate("0/0"), None);
        assert_eq!(parse_frame_rate("abc"), None);
    }

    #[test]
    fn benign_probe_failure_is_special_cased() {
        assert!(is_benign_probe_failure(
            "At least one output file must be specified"
        ));
        assert!(!is_benign_probe_failure("Unknown encoder 'libx266'"));
    }

    #[test]
    fn raw_probe_runs_through_supervisor_and_caches() {
        // Use a stand-in prober (echo) so the plumbing runs without ffprobe.
        let dir = tempfile::tempdir().unwrap();
        let media = dir.path().join("clip.mkv");
        std::fs::write(&media, b"fake").unwrap();

        let mut config = CoreConfig::new(dir.path().to_path_buf());
        config.prober_path = Some(resolve_binary(None, "echo").unwrap());

        let prober = Prober::new(&config)
            .unwrap()
            .with_cache(MemoryCache::new());
        let first = prober.raw_probe(&media).unwrap();
        assert!(first.contains("-show_streams"));

        // Second query must come from the cache even if the file changes.
        std::fs::remove_file(&media).unwrap();
        std::fs::write(&media, b"changed").unwrap();
        let second = prober.raw_probe(&media).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn media_info_uses_the_injected_parser() {
        let dir = tempfile::tempdir().unwrap();
        let media = dir.path().join("clip.mkv");
        std::fs::write(&media, b"fake").unwrap();

        let mut config = CoreConfig::new(dir.path().to_path_buf());
        config.prober_path = Some(resolve_binary(None, "echo").unwrap());

        let canned = MediaInfo {
            duration_secs: Some(12.0),
            ..Default::default()
        };
        let prober = Prober::new(&config)
            .unwrap()
            .with_parser(MockMetadataParser::returning(canned.clone()));
        assert_eq!(prober.media_info(&media).unwrap(), canned);
    }

    #[test]
    fn missing_media_file_is_a_path_error() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = CoreConfig::new(dir.path().to_path_buf());
        config.prober_path = Some(resolve_binary(None, "echo").unwrap());

        let prober = Prober::new(&config).unwrap();
        let err = prober.media_info(&dir.path().join("missing.mkv"));
        assert!(matches!(err, Err(CoreError::PathError(_))));
    }

    #[test]
    fn version_queries_hit_the_cache_after_the_first() {
        use crate::external::mocks::CountingCache;
        use std::sync::Arc;

        let dir = tempfile::tempdir().unwrap();
        let mut config = CoreConfig::new(dir.path().to_path_buf());
        config.prober_path = Some(resolve_binary(None, "echo").unwrap());

        let cache = Arc::new(CountingCache::new());
        let prober = Prober::new(&config).unwrap().with_cache(Arc::clone(&cache));

        let first = prober.version().unwrap();
        let second = prober.version().unwrap();
        assert_eq!(first, second);
        assert_eq!(cache.get_count(), 2);
        assert_eq!(cache.put_count(), 1);
    }
}
