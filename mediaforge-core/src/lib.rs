// ============================================================================
// mediaforge-core/src/lib.rs
// ============================================================================
//
// Root of the mediaforge-core library crate.
//
// mediaforge-core drives an external media engine and prober through the
// shell: it maps typed output settings to engine flags, composes escaped
// command lines, supervises the spawned processes with a boundary-token
// completion protocol, and orchestrates whole save operations including
// segment extraction and splitting.
//
// Module structure:
//   - command:    argument groups and ordered command composition
//   - format:     typed settings mapped to engine flag templates
//   - external:   process supervision (exec) and media probing (prober)
//   - media:      the save pipeline tying the above together
//   - config:     shared configuration and environment validation
//   - cache:      injectable cache for repeated probe queries
//   - timecode:   time positions and their string renderings
//   - temp_files: temporary files for supervisor output buffers
//   - error:      the crate-wide error type
//   - utils:      small formatting helpers

//! Core library for shell-level orchestration of a media engine and prober.
//!
//! The central types are [`Format`] (typed settings compiled to flags),
//! [`ExecBuffer`] (the process supervisor), [`Prober`] (structured media
//! information), and [`Media`] (the save pipeline).

pub mod cache;
pub mod command;
pub mod config;
pub mod error;
pub mod external;
pub mod format;
pub mod media;
pub mod temp_files;
pub mod timecode;
pub mod utils;

pub use cache::{MemoryCache, NoopCache, QueryCache, QueryKind};
pub use command::{ArgPosition, ArgValue, CommandRequest};
pub use config::CoreConfig;
pub use error::{CoreError, CoreResult};
pub use external::{
    binary_version, check_dependency, resolve_binary, BinaryResolver, ExecBuffer, ExecReport,
    JsonMetadataParser, MediaInfo, MetadataParser, ProcessStatus, Prober, StreamInfo,
};
pub use format::{CodecRegistry, CompileContext, CompiledFlag, Direction, Format, Strictness};
pub use media::{Media, Overwrite, SavePlan, SaveReport, SplitBoundaries, SplitOptions};
pub use timecode::Timecode;
