//! Declarative format settings and their compilation to engine flags.
//!
//! A [`Format`] is a bag of logical options ("video codec", "audio bitrate",
//! ...) for one transform direction. Each option is bound to exactly one flag
//! template; templates are only resolved when the format is compiled against
//! a [`CompileContext`], so late mutation before a save is legal. Setters
//! validate their own domain (numeric ranges, enumerated names, direction
//! restrictions) so compile never has to.
//!
//! Precedence at compile time: a flag present in the caller's additional
//! command set wins over the mapped option of the same name, and a flag in
//! the removed set is suppressed entirely. Filter options accumulate into a
//! single comma-joined `-vf`/`-af` occurrence instead of overwriting.

use crate::error::{usage_error, CoreResult};
use std::collections::{BTreeSet, HashMap};

#[cfg(test)]
mod tests;

// ============================================================================
// DIRECTION AND CONTEXT
// ============================================================================

/// Whether the format describes the input side or the output side of a
/// transform. Several settings are only meaningful on the output side.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Input,
    Output,
}

/// One-shot context passed into [`Format::compile`], carrying what the
/// format may need from the source media (auto-sizing, aspect handling).
/// This replaces any stored back-reference from format to media.
#[derive(Debug, Clone, Copy, Default)]
pub struct CompileContext {
    pub duration_secs: Option<f64>,
    pub width: Option<u32>,
    pub height: Option<u32>,
}

// ============================================================================
// FLAG TEMPLATES
// ============================================================================

/// A flag template bound to one logical option. `<setting>` (or named
/// placeholders for multi-value options) is substituted at compile time.
#[derive(Debug, Clone, Copy)]
enum Template {
    /// Same template for both directions.
    Simple(&'static str),
    /// Direction-specific variants.
    PerDirection {
        input: &'static str,
        output: &'static str,
    },
    /// Arguments accumulate into one comma-joined flag occurrence.
    Grouped(&'static str),
}

impl Template {
    fn resolve(&self, direction: Direction) -> &'static str {
        match self {
            Template::Simple(t) | Template::Grouped(t) => t,
            Template::PerDirection { input, output } => match direction {
                Direction::Input => input,
                Direction::Output => output,
            },
        }
    }

    fn is_grouped(&self) -> bool {
        matches!(self, Template::Grouped(_))
    }
}

/// Returns the flag name of a template: everything before the first space.
fn flag_name(template: &str) -> &str {
    template.split(' ').next().unwrap_or(template)
}

// ============================================================================
// OPTION KEYS
// ============================================================================

/// Logical option names. Binding every key to a template at the type level
/// makes "option missing from the template map" unrepresentable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum OptionKey {
    FormatName,
    VideoCodec,
    VideoBitrate,
    FrameRate,
    Quality,
    PixelFormat,
    Dimensions,
    AspectRatio,
    DisableVideo,
    AudioCodec,
    AudioBitrate,
    SampleRate,
    AudioChannels,
    DisableAudio,
    Threads,
    Strictness,
    Padding,
    VideoFilter,
    AudioFilter,
}

/// Stable declaration order for compilation.
const OPTION_ORDER: &[OptionKey] = &[
    OptionKey::FormatName,
    OptionKey::VideoCodec,
    OptionKey::VideoBitrate,
    OptionKey::FrameRate,
    OptionKey::Quality,
    OptionKey::PixelFormat,
    OptionKey::Dimensions,
    OptionKey::AspectRatio,
    OptionKey::DisableVideo,
    OptionKey::AudioCodec,
    OptionKey::AudioBitrate,
    OptionKey::SampleRate,
    OptionKey::AudioChannels,
    OptionKey::DisableAudio,
    OptionKey::Threads,
    OptionKey::Strictness,
    OptionKey::Padding,
    OptionKey::VideoFilter,
    OptionKey::AudioFilter,
];

impl OptionKey {
    fn template(self) -> Template {
        match self {
            OptionKey::FormatName => Template::Simple("-f <setting>"),
            OptionKey::VideoCodec => Template::Simple("-vcodec <setting>"),
            OptionKey::VideoBitrate => Template::Simple("-b:v <setting>"),
            OptionKey::FrameRate => Template::PerDirection {
                input: "-framerate <setting>",
                output: "-r <setting>",
            },
            OptionKey::Quality => Template::Simple("-q:v <setting>"),
            OptionKey::PixelFormat => Template::Simple("-pix_fmt <setting>"),
            OptionKey::Dimensions => Template::Simple("-s <width>x<height>"),
            OptionKey::AspectRatio => Template::Simple("-aspect <setting>"),
            OptionKey::DisableVideo => Template::Simple("-vn"),
            OptionKey::AudioCodec => Template::Simple("-acodec <setting>"),
            OptionKey::AudioBitrate => Template::Simple("-b:a <setting>"),
            OptionKey::SampleRate => Template::Simple("-ar <setting>"),
            OptionKey::AudioChannels => Template::Simple("-ac <setting>"),
            OptionKey::DisableAudio => Template::Simple("-an"),
            OptionKey::Threads => Template::Simple("-threads <setting>"),
            OptionKey::Strictness => Template::Simple("-strict <setting>"),
            // Padding renders through the video filter flag so it groups
            // with any other filters into one -vf occurrence.
            OptionKey::Padding => Template::Grouped("-vf pad=<width>:<height>:<x>:<y>"),
            OptionKey::VideoFilter => Template::Grouped("-vf <setting>"),
            OptionKey::AudioFilter => Template::Grouped("-af <setting>"),
        }
    }
}

// ============================================================================
// STORED VALUES
// ============================================================================

#[derive(Debug, Clone)]
enum Stored {
    /// Plain scalar substituted for `<setting>`.
    Scalar(String),
    /// Flag that takes no argument.
    Set,
    /// Explicit dimensions or "match the source".
    Dims(DimensionSpec),
    /// Padding geometry, substituted into named placeholders.
    Pad { width: u32, height: u32, x: u32, y: u32 },
    /// Accumulating filter values.
    Filters(Vec<String>),
}

#[derive(Debug, Clone, Copy)]
enum DimensionSpec {
    Exact { width: u32, height: u32 },
    MatchSource,
}

/// One compiled flag occurrence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompiledFlag {
    pub flag: String,
    pub value: Option<String>,
}

impl CompiledFlag {
    fn new(flag: impl Into<String>, value: Option<String>) -> Self {
        Self {
            flag: flag.into(),
            value,
        }
    }
}

// ============================================================================
// VALIDATION DOMAINS
// ============================================================================

/// Strictness levels accepted by the engine's `-strict` flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strictness {
    Very,
    Strict,
    Normal,
    Unofficial,
    Experimental,
}

impl Strictness {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Strictness::Very => "very",
            Strictness::Strict => "strict",
            Strictness::Normal => "normal",
            Strictness::Unofficial => "unofficial",
            Strictness::Experimental => "experimental",
        }
    }
}

const KNOWN_CONTAINER_FORMATS: &[&str] = &[
    "mp4", "mov", "matroska", "avi", "webm", "flv", "mpegts", "mpeg", "ogg", "wav", "mp3",
    "flac", "gif", "image2", "rawvideo", "segment", "null",
];

const KNOWN_VIDEO_CODECS: &[&str] = &[
    "copy", "libx264", "h264", "libx265", "hevc", "libsvtav1", "libaom-av1", "libvpx-vp9",
    "mpeg4", "mpeg2video", "mjpeg", "png", "rawvideo",
];

const KNOWN_AUDIO_CODECS: &[&str] = &[
    "copy", "aac", "libmp3lame", "mp3", "libvorbis", "libopus", "ac3", "eac3", "flac",
    "pcm_s16le",
];

/// Preference-ordered codec aliases. The first candidate available in the
/// registry wins; without a registry the first candidate is assumed.
const VIDEO_CODEC_ALIASES: &[(&str, &[&str])] = &[
    ("h264", &["libx264", "h264"]),
    ("x264", &["libx264"]),
    ("h265", &["libx265", "hevc"]),
    ("av1", &["libsvtav1", "libaom-av1"]),
    ("vp9", &["libvpx-vp9"]),
];

const AUDIO_CODEC_ALIASES: &[(&str, &[&str])] = &[
    ("mp3", &["libmp3lame", "mp3"]),
    ("vorbis", &["libvorbis"]),
    ("opus", &["libopus"]),
];

const KNOWN_PIXEL_FORMATS: &[&str] = &[
    "yuv420p", "yuvj420p", "yuv422p", "yuv444p", "yuv420p10le", "nv12", "rgb24", "bgr24",
    "gray", "monob", "pal8",
];

const KNOWN_SAMPLE_RATES: &[u32] = &[
    8000, 11025, 12000, 16000, 22050, 24000, 32000, 44100, 48000, 88200, 96000,
];

// ============================================================================
// CODEC REGISTRY
// ============================================================================

/// Set of codec names the resolved engine build actually provides, used to
/// settle alias resolution. Populated once (e.g. from `-codecs` output) and
/// handed to the format at construction; never consulted per call.
#[derive(Debug, Clone, Default)]
pub struct CodecRegistry {
    video: BTreeSet<String>,
    audio: BTreeSet<String>,
}

impl CodecRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_video(&mut self, name: &str) -> &mut Self {
        self.video.insert(name.to_string());
        self
    }

    pub fn add_audio(&mut self, name: &str) -> &mut Self {
        self.audio.insert(name.to_string());
        self
    }

    #[must_use]
    pub fn has_video(&self, name: &str) -> bool {
        self.video.contains(name)
    }

    #[must_use]
    pub fn has_audio(&self, name: &str) -> bool {
        self.audio.contains(name)
    }
}

// ============================================================================
// FORMAT
// ============================================================================

/// Declarative option bag for one transform direction.
#[derive(Debug, Clone)]
pub struct Format {
    direction: Direction,
    values: HashMap<OptionKey, Stored>,
    additional: Vec<CompiledFlag>,
    removed: BTreeSet<String>,
    registry: Option<CodecRegistry>,
}

impl Format {
    /// Creates a format for the input side of a transform.
    #[must_use]
    pub fn input() -> Self {
        Self::new(Direction::Input)
    }

    /// Creates a format for the output side of a transform.
    #[must_use]
    pub fn output() -> Self {
        Self::new(Direction::Output)
    }

    fn new(direction: Direction) -> Self {
        Self {
            direction,
            values: HashMap::new(),
            additional: Vec::new(),
            removed: BTreeSet::new(),
            registry: None,
        }
    }

    /// Attaches a codec registry used to settle alias resolution.
    #[must_use]
    pub fn with_registry(mut self, registry: CodecRegistry) -> Self {
        self.registry = Some(registry);
        self
    }

    #[must_use]
    pub fn direction(&self) -> Direction {
        self.direction
    }

    // ---- Setters (validation happens here, not at compile time) ----

    /// Sets the container format (`-f`).
    pub fn set_format(&mut self, name: &str) -> CoreResult<&mut Self> {
        if !KNOWN_CONTAINER_FORMATS.contains(&name) {
            return Err(usage_error(format!("unknown container format '{name}'")));
        }
        self.values
            .insert(OptionKey::FormatName, Stored::Scalar(name.to_string()));
        Ok(self)
    }

    /// Sets the video codec, resolving aliases such as `h264` -> `libx264`.
    pub fn set_video_codec(&mut self, codec: &str) -> CoreResult<&mut Self> {
        let resolved = resolve_codec(
            codec,
            KNOWN_VIDEO_CODECS,
            VIDEO_CODEC_ALIASES,
            self.registry.as_ref().map(|r| (r, true)),
        )?;
        self.values
            .insert(OptionKey::VideoCodec, Stored::Scalar(resolved));
        Ok(self)
    }

    /// Sets the audio codec, resolving aliases such as `mp3` -> `libmp3lame`.
    pub fn set_audio_codec(&mut self, codec: &str) -> CoreResult<&mut Self> {
        let resolved = resolve_codec(
            codec,
            KNOWN_AUDIO_CODECS,
            AUDIO_CODEC_ALIASES,
            self.registry.as_ref().map(|r| (r, false)),
        )?;
        self.values
            .insert(OptionKey::AudioCodec, Stored::Scalar(resolved));
        Ok(self)
    }

    /// Sets the video bitrate in kbit/s. Output direction only.
    pub fn set_video_bitrate(&mut self, kbps: u32) -> CoreResult<&mut Self> {
        self.ensure_output("video bitrate")?;
        if !(1..=100_000).contains(&kbps) {
            return Err(usage_error(format!(
                "video bitrate must be between 1 and 100000 kbit/s, got {kbps}"
            )));
        }
        self.values
            .insert(OptionKey::VideoBitrate, Stored::Scalar(format!("{kbps}k")));
        Ok(self)
    }

    /// Sets the audio bitrate in kbit/s. Output direction only.
    pub fn set_audio_bitrate(&mut self, kbps: u32) -> CoreResult<&mut Self> {
        self.ensure_output("audio bitrate")?;
        if !(8..=640).contains(&kbps) {
            return Err(usage_error(format!(
                "audio bitrate must be between 8 and 640 kbit/s, got {kbps}"
            )));
        }
        self.values
            .insert(OptionKey::AudioBitrate, Stored::Scalar(format!("{kbps}k")));
        Ok(self)
    }

    /// Sets the frame rate. The flag differs per direction (`-framerate`
    /// before the input, `-r` for the output).
    pub fn set_frame_rate(&mut self, fps: f64) -> CoreResult<&mut Self> {
        if !fps.is_finite() || fps <= 0.0 {
            return Err(usage_error(format!("frame rate must be positive, got {fps}")));
        }
        self.values
            .insert(OptionKey::FrameRate, Stored::Scalar(trim_float(fps)));
        Ok(self)
    }

    /// Sets the video quality scale (1 best to 31 worst). Output only.
    pub fn set_quality(&mut self, quality: u8) -> CoreResult<&mut Self> {
        self.ensure_output("quality")?;
        if !(1..=31).contains(&quality) {
            return Err(usage_error(format!(
                "quality must be between 1 and 31, got {quality}"
            )));
        }
        self.values
            .insert(OptionKey::Quality, Stored::Scalar(quality.to_string()));
        Ok(self)
    }

    /// Sets the audio sample rate in Hz, validated against the engine's
    /// supported rates.
    pub fn set_sample_rate(&mut self, hz: u32) -> CoreResult<&mut Self> {
        if !KNOWN_SAMPLE_RATES.contains(&hz) {
            return Err(usage_error(format!("unsupported sample rate {hz} Hz")));
        }
        self.values
            .insert(OptionKey::SampleRate, Stored::Scalar(hz.to_string()));
        Ok(self)
    }

    /// Sets the audio channel count (1-8).
    pub fn set_audio_channels(&mut self, channels: u8) -> CoreResult<&mut Self> {
        if !(1..=8).contains(&channels) {
            return Err(usage_error(format!(
                "audio channels must be between 1 and 8, got {channels}"
            )));
        }
        self.values
            .insert(OptionKey::AudioChannels, Stored::Scalar(channels.to_string()));
        Ok(self)
    }

    /// Sets the worker thread count (1-64). Output only.
    pub fn set_threads(&mut self, threads: u8) -> CoreResult<&mut Self> {
        self.ensure_output("threads")?;
        if !(1..=64).contains(&threads) {
            return Err(usage_error(format!(
                "threads must be between 1 and 64, got {threads}"
            )));
        }
        self.values
            .insert(OptionKey::Threads, Stored::Scalar(threads.to_string()));
        Ok(self)
    }

    /// Sets the pixel format, validated against the known set.
    pub fn set_pixel_format(&mut self, name: &str) -> CoreResult<&mut Self> {
        if !KNOWN_PIXEL_FORMATS.contains(&name) {
            return Err(usage_error(format!("unknown pixel format '{name}'")));
        }
        self.values
            .insert(OptionKey::PixelFormat, Stored::Scalar(name.to_string()));
        Ok(self)
    }

    /// Sets exact output dimensions.
    pub fn set_dimensions(&mut self, width: u32, height: u32) -> CoreResult<&mut Self> {
        if width == 0 || height == 0 {
            return Err(usage_error(format!(
                "dimensions must be non-zero, got {width}x{height}"
            )));
        }
        self.values.insert(
            OptionKey::Dimensions,
            Stored::Dims(DimensionSpec::Exact { width, height }),
        );
        Ok(self)
    }

    /// Sizes the output to match the source; resolved from the compile
    /// context, which must then carry the source dimensions.
    pub fn set_dimensions_match_source(&mut self) -> &mut Self {
        self.values
            .insert(OptionKey::Dimensions, Stored::Dims(DimensionSpec::MatchSource));
        self
    }

    /// Sets the display aspect ratio, e.g. `16:9`.
    pub fn set_aspect_ratio(&mut self, ratio: &str) -> CoreResult<&mut Self> {
        let valid = match ratio.split_once(':') {
            Some((num, den)) => {
                num.parse::<u32>().map(|n| n > 0).unwrap_or(false)
                    && den.parse::<u32>().map(|d| d > 0).unwrap_or(false)
            }
            None => ratio.parse::<f64>().map(|r| r > 0.0).unwrap_or(false),
        };
        if !valid {
            return Err(usage_error(format!("invalid aspect ratio '{ratio}'")));
        }
        self.values
            .insert(OptionKey::AspectRatio, Stored::Scalar(ratio.to_string()));
        Ok(self)
    }

    /// Adds padding around the video. Joins the video filter group.
    pub fn set_padding(&mut self, width: u32, height: u32, x: u32, y: u32) -> CoreResult<&mut Self> {
        if width == 0 || height == 0 {
            return Err(usage_error(format!(
                "padding target must be non-zero, got {width}x{height}"
            )));
        }
        self.values
            .insert(OptionKey::Padding, Stored::Pad { width, height, x, y });
        Ok(self)
    }

    /// Sets the `-strict` level.
    pub fn set_strictness(&mut self, level: Strictness) -> &mut Self {
        self.values.insert(
            OptionKey::Strictness,
            Stored::Scalar(level.as_str().to_string()),
        );
        self
    }

    /// Disables the video stream (`-vn`).
    pub fn disable_video(&mut self) -> &mut Self {
        self.values.insert(OptionKey::DisableVideo, Stored::Set);
        self
    }

    /// Disables the audio stream (`-an`).
    pub fn disable_audio(&mut self) -> &mut Self {
        self.values.insert(OptionKey::DisableAudio, Stored::Set);
        self
    }

    /// Appends a video filter expression. Filters accumulate; compilation
    /// emits one `-vf` occurrence with all values comma-joined.
    pub fn add_video_filter(&mut self, filter: &str) -> CoreResult<&mut Self> {
        self.add_filter(OptionKey::VideoFilter, filter)
    }

    /// Appends an audio filter expression, accumulating like video filters.
    pub fn add_audio_filter(&mut self, filter: &str) -> CoreResult<&mut Self> {
        self.add_filter(OptionKey::AudioFilter, filter)
    }

    fn add_filter(&mut self, key: OptionKey, filter: &str) -> CoreResult<&mut Self> {
        if filter.trim().is_empty() {
            return Err(usage_error("filter expression must not be empty"));
        }
        match self.values.entry(key).or_insert_with(|| Stored::Filters(Vec::new())) {
            Stored::Filters(list) => list.push(filter.to_string()),
            _ => unreachable!("filter keys always store filter lists"),
        }
        Ok(self)
    }

    // ---- Explicit overrides and suppression ----

    /// Adds an explicit flag that wins over any mapped option resolving to
    /// the same flag name.
    pub fn add_command(&mut self, flag: &str, value: Option<&str>) -> &mut Self {
        self.additional
            .push(CompiledFlag::new(flag, value.map(str::to_string)));
        self
    }

    /// Suppresses any mapped option resolving to the given flag name.
    pub fn remove_command(&mut self, flag: &str) -> &mut Self {
        self.removed.insert(flag.to_string());
        self
    }

    // ---- Compilation ----

    /// Compiles the non-null options into a flag list, in stable declaration
    /// order. Pure: repeated calls on unchanged state yield identical lists.
    pub fn compile(&self, ctx: &CompileContext) -> CoreResult<Vec<CompiledFlag>> {
        let mut flags: Vec<CompiledFlag> = Vec::new();
        // flag name -> accumulated filter values, in first-seen order
        let mut groups: Vec<(String, Vec<String>)> = Vec::new();

        for key in OPTION_ORDER {
            let Some(stored) = self.values.get(key) else {
                continue;
            };
            let template = key.template();
            let resolved = template.resolve(self.direction);
            let name = flag_name(resolved);

            if self.is_overridden(name) || self.removed.contains(name) {
                log::debug!("Skipping mapped option {key:?}: flag {name} is overridden or removed");
                continue;
            }

            match stored {
                Stored::Set => flags.push(CompiledFlag::new(name, None)),
                Stored::Scalar(value) => {
                    if template.is_grouped() {
                        accumulate(&mut groups, name, value.clone());
                    } else {
                        flags.push(CompiledFlag::new(
                            name,
                            Some(substitute_setting(resolved, value)),
                        ));
                    }
                }
                Stored::Filters(values) => {
                    for value in values {
                        accumulate(&mut groups, name, value.clone());
                    }
                }
                Stored::Dims(spec) => {
                    let (width, height) = match spec {
                        DimensionSpec::Exact { width, height } => (*width, *height),
                        DimensionSpec::MatchSource => match (ctx.width, ctx.height) {
                            (Some(w), Some(h)) => (w, h),
                            _ => {
                                return Err(usage_error(
                                    "dimensions are set to match the source but the compile \
                                     context carries no source dimensions",
                                ))
                            }
                        },
                    };
                    let value = value_template(resolved)
                        .replace("<width>", &width.to_string())
                        .replace("<height>", &height.to_string());
                    flags.push(CompiledFlag::new(name, Some(value)));
                }
                Stored::Pad { width, height, x, y } => {
                    let value = value_template(resolved)
                        .replace("<width>", &width.to_string())
                        .replace("<height>", &height.to_string())
                        .replace("<x>", &x.to_string())
                        .replace("<y>", &y.to_string());
                    accumulate(&mut groups, name, value);
                }
            }
        }

        for (name, values) in groups {
            flags.push(CompiledFlag::new(name, Some(values.join(","))));
        }

        flags.extend(self.additional.iter().cloned());
        Ok(flags)
    }

    fn is_overridden(&self, flag: &str) -> bool {
        self.additional.iter().any(|f| f.flag == flag)
    }

    fn ensure_output(&self, what: &str) -> CoreResult<()> {
        if self.direction == Direction::Input {
            return Err(usage_error(format!(
                "{what} cannot be set on an input-direction format"
            )));
        }
        Ok(())
    }
}

// ============================================================================
// TEMPLATE SUBSTITUTION HELPERS
// ============================================================================

/// Everything after the flag name, i.e. the value part of the template.
fn value_template(template: &str) -> String {
    template
        .split_once(' ')
        .map(|(_, rest)| rest.to_string())
        .unwrap_or_default()
}

fn substitute_setting(template: &str, value: &str) -> String {
    value_template(template).replace("<setting>", value)
}

fn accumulate(groups: &mut Vec<(String, Vec<String>)>, flag: &str, value: String) {
    if let Some((_, values)) = groups.iter_mut().find(|(name, _)| name == flag) {
        values.push(value);
    } else {
        groups.push((flag.to_string(), vec![value]));
    }
}

/// Renders a float without a trailing `.0` for whole numbers.
fn trim_float(value: f64) -> String {
    if (value - value.round()).abs() < f64::EPSILON {
        format!("{}", value.round() as i64)
    } else {
        format!("{value}")
    }
}

/// Resolves a codec name: known names pass through, aliases resolve against
/// the registry when one is available, otherwise to their first candidate.
fn resolve_codec(
    name: &str,
    known: &[&str],
    aliases: &[(&str, &[&str])],
    registry: Option<(&CodecRegistry, bool)>,
) -> CoreResult<String> {
    let Some((_, candidates)) = aliases.iter().find(|(alias, _)| *alias == name) else {
        if known.contains(&name) {
            return Ok(name.to_string());
        }
        return Err(usage_error(format!("unknown codec '{name}'")));
    };

    match registry {
        Some((registry, is_video)) => candidates
            .iter()
            .find(|c| {
                if is_video {
                    registry.has_video(c)
                } else {
                    registry.has_audio(c)
                }
            })
            .map(|c| (*c).to_string())
            .ok_or_else(|| {
                usage_error(format!(
                    "no candidate for codec alias '{name}' is available in this engine build"
                ))
            }),
        None => Ok(candidates[0].to_string()),
    }
}
