// ============================================================================
// mediaforge-core/src/media.rs
// ============================================================================
//
// SAVE PIPELINE: Media Objects and the Save/Transform Orchestrator
//
// A Media object wraps one source file plus its probed information and the
// directives attached to a single save operation: segment extraction, split
// boundaries, and global metadata. save() validates the destination and
// overwrite policy, injects the directive flags ahead of the format-mapped
// flags, composes the command, and drives the process supervisor to
// completion. Every validation failure aborts before a process is spawned.

use crate::command::{ArgPosition, ArgValue, CommandRequest};
use crate::config::{CoreConfig, COARSE_SEEK_LOOKBACK_SECS};
use crate::error::{usage_error, CoreError, CoreResult};
use crate::external::exec::{ExecBuffer, ExecReport};
use crate::external::prober::{MediaInfo, Prober};
use crate::format::{CompileContext, Direction, Format};
use crate::temp_files;
use crate::timecode::Timecode;

use std::path::{Path, PathBuf};
use std::time::Duration;

// ============================================================================
// SAVE DIRECTIVES
// ============================================================================

/// Overwrite policy applied to the destination path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Overwrite {
    /// Abort if the destination already exists.
    Fail,
    /// Leave the decision to the engine's own prompt behavior.
    Preserve,
    /// Force overwrite of an existing destination (`-y`).
    Existing,
    /// Rewrite the destination with a generated unique suffix.
    Unique,
}

/// Segment extraction directive: a start position and optional duration.
#[derive(Debug, Clone, Copy)]
struct ExtractSegment {
    start: Timecode,
    duration: Option<Timecode>,
}

/// Where one split output ends and the next begins.
#[derive(Debug, Clone)]
pub enum SplitBoundaries {
    /// Fixed time delta between segments.
    Interval(Timecode),
    /// Explicit segment start times, strictly increasing.
    Times(Vec<Timecode>),
    /// Explicit frame boundaries, strictly increasing.
    Frames(Vec<u64>),
}

/// Split directive attached to one save.
#[derive(Debug, Clone)]
pub struct SplitOptions {
    pub boundaries: SplitBoundaries,
    /// Optional list file the engine writes segment names into.
    pub list_file: Option<PathBuf>,
    /// Optional per-split container format.
    pub segment_format: Option<String>,
}

impl SplitOptions {
    #[must_use]
    pub fn every(interval: Timecode) -> Self {
        Self {
            boundaries: SplitBoundaries::Interval(interval),
            list_file: None,
            segment_format: None,
        }
    }

    #[must_use]
    pub fn at_times(times: Vec<Timecode>) -> Self {
        Self {
            boundaries: SplitBoundaries::Times(times),
            list_file: None,
            segment_format: None,
        }
    }

    #[must_use]
    pub fn at_frames(frames: Vec<u64>) -> Self {
        Self {
            boundaries: SplitBoundaries::Frames(frames),
            list_file: None,
            segment_format: None,
        }
    }
}

// ============================================================================
// SAVE RESULTS
// ============================================================================

/// Everything decided before the process spawns: the composed command, the
/// final (possibly templated) destination, and the working path the engine
/// actually writes to.
#[derive(Debug, Clone)]
pub struct SavePlan {
    pub command: String,
    pub destination: PathBuf,
    pub working_destination: PathBuf,
    pub templated: bool,
    /// Start time of each split segment, for `%timecode` substitution.
    segment_starts: Vec<f64>,
}

/// Result of a completed save.
#[derive(Debug)]
pub struct SaveReport {
    pub destination: PathBuf,
    pub output_files: Vec<PathBuf>,
    pub run_time: Option<Duration>,
    pub report: ExecReport,
}

// ============================================================================
// MEDIA
// ============================================================================

/// One source media file plus the directives for a single save operation.
#[derive(Debug)]
pub struct Media {
    path: PathBuf,
    info: MediaInfo,
    input_format: Option<Format>,
    extract: Option<ExtractSegment>,
    split: Option<SplitOptions>,
    metadata: Vec<(String, String)>,
    already_split: bool,
}

impl Media {
    /// Creates a media object from a path and already-probed information.
    pub fn new(path: &Path, info: MediaInfo) -> CoreResult<Self> {
        if !path.is_file() {
            return Err(CoreError::PathError(format!(
                "source media file does not exist: {}",
                path.display()
            )));
        }
        Ok(Self {
            path: path.to_path_buf(),
            info,
            input_format: None,
            extract: None,
            split: None,
            metadata: Vec::new(),
            already_split: false,
        })
    }

    /// Creates a media object by probing the file.
    pub fn probe<C, P>(path: &Path, prober: &Prober<C, P>) -> CoreResult<Self>
    where
        C: crate::cache::QueryCache,
        P: crate::external::prober::MetadataParser,
    {
        let info = prober.media_info(path)?;
        Self::new(path, info)
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    #[must_use]
    pub fn info(&self) -> &MediaInfo {
        &self.info
    }

    /// Known duration of the source, if the probe reported one.
    #[must_use]
    pub fn duration(&self) -> Option<Timecode> {
        self.info
            .duration_secs
            .and_then(|secs| Timecode::from_seconds(secs).ok())
    }

    /// Attaches an input-direction format whose compiled flags are placed
    /// ahead of `-i`.
    pub fn set_input_format(&mut self, format: Format) -> CoreResult<&mut Self> {
        if format.direction() != Direction::Input {
            return Err(usage_error(
                "input format must be constructed for the input direction",
            ));
        }
        self.input_format = Some(format);
        Ok(self)
    }

    /// Requests extraction of a sub-range starting at `start` with an
    /// optional duration. At most one extraction per save.
    pub fn extract_segment(
        &mut self,
        start: Timecode,
        duration: Option<Timecode>,
    ) -> CoreResult<&mut Self> {
        if self.extract.is_some() {
            return Err(usage_error("segment extraction is already set"));
        }
        if let Some(total) = self.info.duration_secs {
            if start.total_seconds() >= total {
                return Err(usage_error(format!(
                    "extraction start {} is beyond the media duration {total}s",
                    start.total_seconds()
                )));
            }
            if let Some(len) = duration {
                if start.total_seconds() + len.total_seconds() > total {
                    return Err(usage_error(format!(
                        "extraction range ends beyond the media duration {total}s"
                    )));
                }
            }
        }
        self.extract = Some(ExtractSegment { start, duration });
        Ok(self)
    }

    /// Requests splitting into multiple outputs. At most one split per
    /// save, and never on media that is itself the product of a split.
    pub fn split(&mut self, options: SplitOptions) -> CoreResult<&mut Self> {
        if self.split.is_some() {
            return Err(usage_error("split is already set"));
        }
        if self.already_split {
            return Err(usage_error("media is already split; splitting again is not supported"));
        }
        self.validate_split(&options)?;
        self.split = Some(options);
        Ok(self)
    }

    /// Attaches a global metadata key/value pair. Repeatable.
    pub fn metadata(&mut self, key: &str, value: &str) -> &mut Self {
        self.metadata.push((key.to_string(), value.to_string()));
        self
    }

    fn validate_split(&self, options: &SplitOptions) -> CoreResult<()> {
        let total = self.info.duration_secs;
        match &options.boundaries {
            SplitBoundaries::Interval(interval) => {
                if interval.total_seconds() <= 0.0 {
                    return Err(usage_error("split interval must be positive"));
                }
            }
            SplitBoundaries::Times(times) => {
                if times.is_empty() {
                    return Err(usage_error("split time list must not be empty"));
                }
                let mut previous = 0.0;
                for time in times {
                    let secs = time.total_seconds();
                    if secs <= previous {
                        return Err(usage_error("split times must be strictly increasing"));
                    }
                    if let Some(total) = total {
                        if secs >= total {
                            return Err(usage_error(format!(
                                "split time {secs}s is beyond the media duration {total}s"
                            )));
                        }
                    }
                    previous = secs;
                }
            }
            SplitBoundaries::Frames(frames) => {
                if frames.is_empty() {
                    return Err(usage_error("split frame list must not be empty"));
                }
                // Frame 0 is where the first segment already starts; like a
                // time boundary of 0 it would describe an empty segment.
                if frames[0] == 0 {
                    return Err(usage_error("split frame boundaries must start after frame 0"));
                }
                if !frames.windows(2).all(|w| w[0] < w[1]) {
                    return Err(usage_error("split frames must be strictly increasing"));
                }
                if let (Some(total), Some(fps)) = (total, self.info.frame_rate()) {
                    let frame_count = (total * fps).floor() as u64;
                    if frames.iter().any(|f| *f >= frame_count) {
                        return Err(usage_error(format!(
                            "split frame beyond the media frame count {frame_count}"
                        )));
                    }
                }
            }
        }
        Ok(())
    }

    // ========================================================================
    // SAVE PIPELINE
    // ========================================================================

    /// Validates the request and composes the final command without
    /// spawning anything.
    pub fn prepare_save(
        &self,
        destination: &Path,
        format: &Format,
        overwrite: Overwrite,
        config: &CoreConfig,
    ) -> CoreResult<SavePlan> {
        if format.direction() != Direction::Output {
            return Err(usage_error(
                "save requires an output-direction format",
            ));
        }

        let ctx = self.compile_context();

        // Destination directory must exist and be writable before anything
        // else happens; templated destinations defer exact-path checks.
        let dest_dir = destination_dir(destination)?;
        let mut destination = destination.to_path_buf();
        let mut templated = is_templated(&destination)?;

        let mut force_overwrite = false;
        if !templated && destination.exists() {
            match overwrite {
                Overwrite::Fail => {
                    return Err(usage_error(format!(
                        "destination already exists: {}",
                        destination.display()
                    )));
                }
                Overwrite::Preserve => {}
                Overwrite::Existing => {}
                Overwrite::Unique => {
                    destination = unique_destination(&destination)?;
                    log::info!(
                        "Destination rewritten for uniqueness: {}",
                        destination.display()
                    );
                }
            }
        }
        if overwrite == Overwrite::Existing {
            force_overwrite = true;
        }

        let mut request = CommandRequest::new();
        if force_overwrite {
            request.add(ArgPosition::PreInput, "-y", ArgValue::None, false)?;
        }

        if let Some(input_format) = &self.input_format {
            for flag in input_format.compile(&ctx)? {
                request.add(
                    ArgPosition::PreInput,
                    &flag.flag,
                    flag.value.map(ArgValue::Escaped).unwrap_or(ArgValue::None),
                    false,
                )?;
            }
        }

        // Segment extraction flags go ahead of the input (coarse seek) and
        // ahead of the format flags (exact seek, duration).
        if let Some(extract) = &self.extract {
            self.add_extract_flags(&mut request, extract)?;
        }

        request.set_input(&self.path)?;

        // Splitting flags, also ahead of the format flags.
        let mut segment_starts: Vec<f64> = Vec::new();
        if let Some(split) = &self.split {
            if !templated {
                destination = templated_destination(&destination)?;
                templated = true;
                log::info!(
                    "Destination rewritten for splitting: {}",
                    destination.display()
                );
            }
            segment_starts = self.add_split_flags(&mut request, split, format, &ctx)?;
        } else {
            for flag in format.compile(&ctx)? {
                request.add(
                    ArgPosition::PostInput,
                    &flag.flag,
                    flag.value.map(ArgValue::Escaped).unwrap_or(ArgValue::None),
                    false,
                )?;
            }
        }

        for (key, value) in &self.metadata {
            request.add(
                ArgPosition::PostInput,
                "-metadata",
                ArgValue::Escaped(format!("{key}={value}")),
                true,
            )?;
        }

        // A templated destination is routed through a working filename the
        // engine can number; the outputs are renamed after completion.
        let working_destination = if templated {
            working_destination(&dest_dir, &destination)?
        } else {
            destination.clone()
        };
        request.set_output(&working_destination.to_string_lossy())?;

        let engine = config.resolver().engine(config.engine_path.as_deref())?;
        let command = request.compose(&engine)?;

        Ok(SavePlan {
            command,
            destination,
            working_destination,
            templated,
            segment_starts,
        })
    }

    /// Runs one save to completion, blocking the calling thread.
    pub fn save(
        &mut self,
        destination: &Path,
        format: &Format,
        overwrite: Overwrite,
        config: &CoreConfig,
    ) -> CoreResult<SaveReport> {
        let plan = self.prepare_save(destination, format, overwrite, config)?;
        self.consume_directives();

        let mut exec = ExecBuffer::new(plan.command.clone(), config)?;
        exec.execute()?;
        self.finish_save(plan, exec)
    }

    /// Runs one save through the polling supervisor, invoking the progress
    /// callback on every poll iteration with the partial output buffer.
    pub fn save_with_progress<F>(
        &mut self,
        destination: &Path,
        format: &Format,
        overwrite: Overwrite,
        config: &CoreConfig,
        progress: F,
    ) -> CoreResult<SaveReport>
    where
        F: FnMut(&str),
    {
        let plan = self.prepare_save(destination, format, overwrite, config)?;
        self.consume_directives();

        let mut exec = ExecBuffer::new(plan.command.clone(), config)?;
        exec.spawn()?;
        exec.wait_with_progress(progress)?;
        self.finish_save(plan, exec)
    }

    fn finish_save(&mut self, plan: SavePlan, exec: ExecBuffer) -> CoreResult<SaveReport> {
        if exec.has_error()? {
            return Err(CoreError::EngineFailure {
                exit_code: exec.error_code(),
                tail: exec.error_tail(),
                report: Box::new(exec.report()),
            });
        }

        let output_files = if plan.templated {
            rename_templated_outputs(
                &plan.working_destination,
                &plan.destination,
                &plan.segment_starts,
            )?
        } else {
            vec![plan.destination.clone()]
        };

        Ok(SaveReport {
            destination: plan.destination,
            output_files,
            run_time: exec.run_time(),
            report: exec.report(),
        })
    }

    /// Directives apply to exactly one save; they are consumed once the
    /// command has been compiled.
    fn consume_directives(&mut self) {
        self.extract = None;
        if self.split.take().is_some() {
            self.already_split = true;
        }
    }

    fn compile_context(&self) -> CompileContext {
        let (width, height) = match self.info.dimensions() {
            Some((w, h)) => (Some(w), Some(h)),
            None => (None, None),
        };
        CompileContext {
            duration_secs: self.info.duration_secs,
            width,
            height,
        }
    }

    /// Injects the seek flags. A start past the look-back threshold is
    /// split into a cheap coarse pre-input seek that lands early, plus an
    /// exact post-input seek for the remaining offset; a start below the
    /// threshold seeks exactly in one step.
    fn add_extract_flags(
        &self,
        request: &mut CommandRequest,
        extract: &ExtractSegment,
    ) -> CoreResult<()> {
        let start = extract.start;
        if start.total_seconds() > COARSE_SEEK_LOOKBACK_SECS {
            let coarse = start.offset(-COARSE_SEEK_LOOKBACK_SECS);
            let exact = Timecode::from_seconds(COARSE_SEEK_LOOKBACK_SECS)?;
            request.add(
                ArgPosition::PreInput,
                "-ss",
                ArgValue::Escaped(coarse.seek_string()),
                false,
            )?;
            request.add(
                ArgPosition::PostInput,
                "-ss",
                ArgValue::Escaped(exact.seek_string()),
                false,
            )?;
        } else {
            request.add(
                ArgPosition::PostInput,
                "-ss",
                ArgValue::Escaped(start.seek_string()),
                false,
            )?;
        }

        // -t is a length, so it needs no adjustment for the seek offset.
        if let Some(duration) = extract.duration {
            request.add(
                ArgPosition::PostInput,
                "-t",
                ArgValue::Escaped(duration.seek_string()),
                false,
            )?;
        }
        Ok(())
    }

    /// Injects the splitting flags and the format flags, rerouting the
    /// format's own container flag to the per-split variant. Returns the
    /// start time of each expected segment.
    fn add_split_flags(
        &self,
        request: &mut CommandRequest,
        split: &SplitOptions,
        format: &Format,
        ctx: &CompileContext,
    ) -> CoreResult<Vec<f64>> {
        request.add(
            ArgPosition::PostInput,
            "-f",
            ArgValue::Escaped("segment".to_string()),
            false,
        )?;

        let total = self.info.duration_secs;
        let starts: Vec<f64>;
        match &split.boundaries {
            SplitBoundaries::Interval(interval) => {
                request.add(
                    ArgPosition::PostInput,
                    "-segment_time",
                    ArgValue::Escaped(seconds_string(interval.total_seconds())),
                    false,
                )?;
                let step = interval.total_seconds();
                let count = total.map_or(1, |t| (t / step).ceil().max(1.0) as usize);
                starts = (0..count).map(|i| i as f64 * step).collect();
            }
            SplitBoundaries::Times(times) => {
                let list = times
                    .iter()
                    .map(|t| seconds_string(t.total_seconds()))
                    .collect::<Vec<_>>()
                    .join(",");
                request.add(
                    ArgPosition::PostInput,
                    "-segment_times",
                    ArgValue::Escaped(list),
                    false,
                )?;
                starts = std::iter::once(0.0)
                    .chain(times.iter().map(Timecode::total_seconds))
                    .collect();
            }
            SplitBoundaries::Frames(frames) => {
                let list = frames
                    .iter()
                    .map(u64::to_string)
                    .collect::<Vec<_>>()
                    .join(",");
                request.add(
                    ArgPosition::PostInput,
                    "-segment_frames",
                    ArgValue::Escaped(list),
                    false,
                )?;
                let fps = self.info.frame_rate();
                starts = std::iter::once(0.0)
                    .chain(frames.iter().map(|f| {
                        fps.map_or(0.0, |fps| *f as f64 / fps)
                    }))
                    .collect();
            }
        }

        request.add(
            ArgPosition::PostInput,
            "-map",
            ArgValue::Escaped("0".to_string()),
            false,
        )?;

        if let Some(list_file) = &split.list_file {
            request.add(
                ArgPosition::PostInput,
                "-segment_list",
                ArgValue::Escaped(list_file.to_string_lossy().into_owned()),
                false,
            )?;
        }
        if let Some(segment_format) = &split.segment_format {
            request.add(
                ArgPosition::PostInput,
                "-segment_format",
                ArgValue::Escaped(segment_format.clone()),
                false,
            )?;
        }

        // The format's own container flag becomes the per-split format
        // unless one was given explicitly.
        for flag in format.compile(ctx)? {
            if flag.flag == "-f" {
                if split.segment_format.is_none() {
                    if let Some(value) = flag.value {
                        request.add(
                            ArgPosition::PostInput,
                            "-segment_format",
                            ArgValue::Escaped(value),
                            false,
                        )?;
                    }
                }
                continue;
            }
            request.add(
                ArgPosition::PostInput,
                &flag.flag,
                flag.value.map(ArgValue::Escaped).unwrap_or(ArgValue::None),
                false,
            )?;
        }

        Ok(starts)
    }
}

// ============================================================================
// DESTINATION HANDLING
// ============================================================================

/// Placeholder markers recognized in a destination filename.
const INDEX_PLACEHOLDER: &str = "%index";
const TIMECODE_PLACEHOLDER: &str = "%timecode";

fn destination_dir(destination: &Path) -> CoreResult<PathBuf> {
    let dir = match destination.parent() {
        Some(parent) if parent.as_os_str().is_empty() => Path::new("."),
        Some(parent) => parent,
        None => {
            return Err(CoreError::PathError(format!(
                "destination has no parent directory: {}",
                destination.display()
            )))
        }
    };

    if !dir.is_dir() {
        return Err(CoreError::PathError(format!(
            "destination directory does not exist: {}",
            dir.display()
        )));
    }
    let metadata = std::fs::metadata(dir)?;
    if metadata.permissions().readonly() {
        return Err(CoreError::PathError(format!(
            "destination directory is not writable: {}",
            dir.display()
        )));
    }
    Ok(dir.to_path_buf())
}

fn is_templated(destination: &Path) -> CoreResult<bool> {
    let name = crate::utils::get_filename_safe(destination)?;
    Ok(name.contains(INDEX_PLACEHOLDER) || name.contains(TIMECODE_PLACEHOLDER))
}

/// Splits a filename into stem and `.ext` (dot included).
fn stem_and_ext(destination: &Path) -> CoreResult<(String, String)> {
    let name = crate::utils::get_filename_safe(destination)?;
    match name.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() => Ok((stem.to_string(), format!(".{ext}"))),
        _ => Ok((name, String::new())),
    }
}

/// Rewrites a destination with a generated unique suffix.
fn unique_destination(destination: &Path) -> CoreResult<PathBuf> {
    let dir = destination.parent().unwrap_or_else(|| Path::new("."));
    let (stem, ext) = stem_and_ext(destination)?;
    let timestamp = chrono::Local::now().format("%Y%m%d_%H%M%S");

    loop {
        let candidate = dir.join(format!(
            "{stem}_{timestamp}_{}{ext}",
            temp_files::random_id(4)
        ));
        if !candidate.exists() {
            return Ok(candidate);
        }
    }
}

/// Forces a `%timecode` placeholder into a destination filename.
fn templated_destination(destination: &Path) -> CoreResult<PathBuf> {
    let dir = destination.parent().unwrap_or_else(|| Path::new("."));
    let (stem, ext) = stem_and_ext(destination)?;
    Ok(dir.join(format!("{stem}_{TIMECODE_PLACEHOLDER}{ext}")))
}

/// Generates the numbered working filename the engine writes to.
fn working_destination(dir: &Path, destination: &Path) -> CoreResult<PathBuf> {
    let (_, ext) = stem_and_ext(destination)?;
    Ok(dir.join(format!(
        "mfwork_{}_%05d{ext}",
        temp_files::random_id(6)
    )))
}

/// Renames the engine's numbered working outputs according to the
/// destination template, substituting `%index` and `%timecode`.
fn rename_templated_outputs(
    working_destination: &Path,
    destination: &Path,
    segment_starts: &[f64],
) -> CoreResult<Vec<PathBuf>> {
    let dir = working_destination
        .parent()
        .unwrap_or_else(|| Path::new("."));
    let working_name = crate::utils::get_filename_safe(working_destination)?;
    let (prefix, suffix) = working_name.split_once("%05d").ok_or_else(|| {
        CoreError::PathError(format!("working destination has no number pattern: {working_name}"))
    })?;

    let mut numbered: Vec<(usize, PathBuf)> = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        let name = entry.file_name().to_string_lossy().into_owned();
        if let Some(middle) = name
            .strip_prefix(prefix)
            .and_then(|rest| rest.strip_suffix(suffix))
        {
            if let Ok(index) = middle.parse::<usize>() {
                numbered.push((index, entry.path()));
            }
        }
    }
    numbered.sort_by_key(|(index, _)| *index);

    if numbered.is_empty() {
        return Err(CoreError::PathError(format!(
            "engine produced no outputs matching {}",
            working_destination.display()
        )));
    }

    let template_name = crate::utils::get_filename_safe(destination)?;
    let mut renamed = Vec::with_capacity(numbered.len());
    for (index, path) in numbered {
        let start = segment_starts.get(index).copied().unwrap_or(0.0);
        let timecode = Timecode::from_seconds(start.max(0.0))?;
        let mut name = template_name
            .replace(INDEX_PLACEHOLDER, &format!("{index:05}"))
            .replace(TIMECODE_PLACEHOLDER, &timecode.filename_string());
        let mut target = dir.join(&name);
        if renamed.contains(&target) {
            // Identical substitutions would collide; disambiguate by index.
            name = format!("{index:05}_{name}");
            target = dir.join(&name);
            log::warn!("Template substitution collided; using {name}");
        }
        std::fs::rename(&path, &target)?;
        renamed.push(target);
    }
    Ok(renamed)
}

/// Renders seconds the way the engine's segment flags expect: a bare
/// number, without a trailing `.0` for whole values.
fn seconds_string(seconds: f64) -> String {
    if (seconds - seconds.round()).abs() < f64::EPSILON {
        format!("{}", seconds.round() as i64)
    } else {
        format!("{seconds}")
    }
}
