// ============================================================================
// mediaforge-core/src/command.rs
// ============================================================================
//
// COMMAND COMPOSER: Ordered Argument Groups and Shell-Safe Composition
//
// This module builds engine invocations from three ordered argument groups
// (pre-input, post-input, post-output) plus the input and output paths. The
// serialized order is fixed:
//
//   <binary> <pre-input> -i <input> <post-input> <output> <post-output>
//
// Every argument value is shell-escaped individually; raw tokens are only
// emitted through an explicit per-argument opt-in. A request is sealed by
// its first composition: repeated composition returns the cached string, and
// any mutation after sealing is a usage error.

use crate::error::{usage_error, CoreResult};
use std::path::{Path, PathBuf};

// ============================================================================
// ARGUMENT VALUES AND GROUPS
// ============================================================================

/// Value attached to one flag occurrence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArgValue {
    /// Flag takes no argument (e.g. `-y`, `-vn`).
    None,
    /// Argument is shell-escaped before serialization. The default.
    Escaped(String),
    /// Argument is emitted verbatim. Explicit opt-in only.
    Raw(String),
}

impl ArgValue {
    fn render(&self) -> Option<String> {
        match self {
            ArgValue::None => None,
            ArgValue::Escaped(v) => Some(shell_words::quote(v).into_owned()),
            ArgValue::Raw(v) => Some(v.clone()),
        }
    }
}

#[derive(Debug, Clone)]
struct ArgEntry {
    flag: String,
    value: ArgValue,
}

/// An ordered mapping from flag name to argument value(s).
///
/// A flag may repeat only when inserted with explicit repeat permission;
/// otherwise re-inserting a present flag is a definition error.
#[derive(Debug, Clone, Default)]
pub struct ArgGroup {
    entries: Vec<ArgEntry>,
}

impl ArgGroup {
    /// Adds a flag with its value. `repeatable` permits multiple occurrences.
    pub fn add(&mut self, flag: &str, value: ArgValue, repeatable: bool) -> CoreResult<()> {
        if !repeatable && self.contains(flag) {
            return Err(usage_error(format!(
                "flag '{flag}' is already defined and is not repeatable"
            )));
        }
        self.entries.push(ArgEntry {
            flag: flag.to_string(),
            value,
        });
        Ok(())
    }

    /// Whether the group already holds the given flag.
    #[must_use]
    pub fn contains(&self, flag: &str) -> bool {
        self.entries.iter().any(|e| e.flag == flag)
    }

    /// Removes all occurrences of the given flag.
    pub fn remove(&mut self, flag: &str) {
        self.entries.retain(|e| e.flag != flag);
    }

    /// Number of flag occurrences in the group.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn serialize(&self, out: &mut Vec<String>) {
        for entry in &self.entries {
            out.push(entry.flag.clone());
            if let Some(value) = entry.value.render() {
                out.push(value);
            }
        }
    }
}

// ============================================================================
// COMMAND REQUEST
// ============================================================================

/// Position of an argument group relative to the input and output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArgPosition {
    PreInput,
    PostInput,
    PostOutput,
}

/// An incrementally built engine invocation, serialized exactly once.
#[derive(Debug, Clone, Default)]
pub struct CommandRequest {
    pre_input: ArgGroup,
    post_input: ArgGroup,
    post_output: ArgGroup,
    input: Option<PathBuf>,
    output: Option<String>,
    composed: Option<String>,
}

impl CommandRequest {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the input path, emitted as `-i <input>`.
    pub fn set_input(&mut self, input: &Path) -> CoreResult<&mut Self> {
        self.ensure_unsealed()?;
        self.input = Some(input.to_path_buf());
        Ok(self)
    }

    /// Sets the output path or template, emitted after the post-input group.
    pub fn set_output(&mut self, output: &str) -> CoreResult<&mut Self> {
        self.ensure_unsealed()?;
        self.output = Some(output.to_string());
        Ok(self)
    }

    /// Adds a flag to the given group.
    pub fn add(
        &mut self,
        position: ArgPosition,
        flag: &str,
        value: ArgValue,
        repeatable: bool,
    ) -> CoreResult<&mut Self> {
        self.ensure_unsealed()?;
        self.group_mut(position).add(flag, value, repeatable)?;
        Ok(self)
    }

    /// Whether a flag is present in the given group.
    #[must_use]
    pub fn contains(&self, position: ArgPosition, flag: &str) -> bool {
        self.group(position).contains(flag)
    }

    /// Removes a flag from the given group.
    pub fn remove(&mut self, position: ArgPosition, flag: &str) -> CoreResult<&mut Self> {
        self.ensure_unsealed()?;
        self.group_mut(position).remove(flag);
        Ok(self)
    }

    /// Whether this request has been sealed by a composition.
    #[must_use]
    pub fn is_sealed(&self) -> bool {
        self.composed.is_some()
    }

    /// Serializes the request into a single shell-safe command string.
    ///
    /// The first call seals the request and caches the result; repeated
    /// calls return the cached string unchanged. Mutation after sealing is
    /// rejected, so the cache can never go stale.
    pub fn compose(&mut self, binary: &Path) -> CoreResult<String> {
        if let Some(cached) = &self.composed {
            return Ok(cached.clone());
        }

        let mut tokens: Vec<String> = Vec::new();
        tokens.push(shell_words::quote(&binary.to_string_lossy()).into_owned());

        self.pre_input.serialize(&mut tokens);

        if let Some(input) = &self.input {
            tokens.push("-i".to_string());
            tokens.push(shell_words::quote(&input.to_string_lossy()).into_owned());
        }

        self.post_input.serialize(&mut tokens);

        if let Some(output) = &self.output {
            tokens.push(shell_words::quote(output).into_owned());
        }

        self.post_output.serialize(&mut tokens);

        let command = tokens.join(" ");
        log::debug!("Composed command: {command}");
        self.composed = Some(command.clone());
        Ok(command)
    }

    fn ensure_unsealed(&self) -> CoreResult<()> {
        if self.is_sealed() {
            return Err(usage_error(
                "command request is sealed; it was already composed",
            ));
        }
        Ok(())
    }

    fn group(&self, position: ArgPosition) -> &ArgGroup {
        match position {
            ArgPosition::PreInput => &self.pre_input,
            ArgPosition::PostInput => &self.post_input,
            ArgPosition::PostOutput => &self.post_output,
        }
    }

    fn group_mut(&mut self, position: ArgPosition) -> &mut ArgGroup {
        match position {
            ArgPosition::PreInput => &mut self.pre_input,
            ArgPosition::PostInput => &mut self.post_input,
            ArgPosition::PostOutput => &mut self.post_output,
        }
    }
}
