//! Immutable time-position value used for seeks and split boundaries.
//!
//! A `Timecode` is a non-negative number of seconds convertible to and from
//! frame counts (given a frame rate) and formatted seek strings in the
//! `HH:MM:SS.mmm` form the engine accepts.

use crate::error::{usage_error, CoreResult};
use std::fmt;

/// An immutable time position within a media item.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default)]
pub struct Timecode {
    seconds: f64,
}

impl Timecode {
    /// Creates a timecode from a number of seconds.
    ///
    /// Negative or non-finite values are usage errors.
    pub fn from_seconds(seconds: f64) -> CoreResult<Self> {
        if !seconds.is_finite() || seconds < 0.0 {
            return Err(usage_error(format!(
                "timecode seconds must be finite and non-negative, got {seconds}"
            )));
        }
        Ok(Self { seconds })
    }

    /// Creates a timecode from a frame count at the given frame rate.
    pub fn from_frames(frames: u64, frame_rate: f64) -> CoreResult<Self> {
        if !frame_rate.is_finite() || frame_rate <= 0.0 {
            return Err(usage_error(format!(
                "frame rate must be positive, got {frame_rate}"
            )));
        }
        Self::from_seconds(frames as f64 / frame_rate)
    }

    /// Total seconds represented by this timecode.
    #[must_use]
    pub fn total_seconds(&self) -> f64 {
        self.seconds
    }

    /// Frame count at the given frame rate, rounded to the nearest frame.
    #[must_use]
    pub fn to_frames(&self, frame_rate: f64) -> u64 {
        (self.seconds * frame_rate).round() as u64
    }

    /// Returns a new timecode offset by `delta` seconds, clamped at zero.
    #[must_use]
    pub fn offset(&self, delta: f64) -> Self {
        Self {
            seconds: (self.seconds + delta).max(0.0),
        }
    }

    /// Formats the timecode as an engine seek string: `HH:MM:SS.mmm`.
    #[must_use]
    pub fn seek_string(&self) -> String {
        let total_millis = (self.seconds * 1000.0).round() as u64;
        let millis = total_millis % 1000;
        let total_secs = total_millis / 1000;
        let hours = total_secs / 3600;
        let minutes = (total_secs % 3600) / 60;
        let secs = total_secs % 60;
        format!("{hours:02}:{minutes:02}:{secs:02}.{millis:03}")
    }

    /// Formats the timecode for use inside a filename: `HH-MM-SS`.
    /// Colons are avoided since they are unsafe in some filesystems.
    #[must_use]
    pub fn filename_string(&self) -> String {
        let total_secs = self.seconds as u64;
        let hours = total_secs / 3600;
        let minutes = (total_secs % 3600) / 60;
        let secs = total_secs % 60;
        format!("{hours:02}-{minutes:02}-{secs:02}")
    }
}

impl fmt::Display for Timecode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.seek_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seconds_round_trip() {
        let tc = Timecode::from_seconds(3725.5).unwrap();
        assert_eq!(tc.total_seconds(), 3725.5);
        assert_eq!(tc.seek_string(), "01:02:05.500");
        assert_eq!(tc.filename_string(), "01-02-05");
    }

    #[test]
    fn rejects_negative_and_non_finite() {
        assert!(Timecode::from_seconds(-1.0).is_err());
        assert!(Timecode::from_seconds(f64::NAN).is_err());
        assert!(Timecode::from_seconds(f64::INFINITY).is_err());
    }

    #[test]
    fn frame_conversion() {
        let tc = Timecode::from_frames(250, 25.0).unwrap();
        assert_eq!(tc.total_seconds(), 10.0);
        assert_eq!(tc.to_frames(25.0), 250);
    }

    #[test]
    fn rejects_bad_frame_rate() {
        assert!(Timecode::from_frames(10, 0.0).is_err());
        assert!(Timecode::from_frames(10, -24.0).is_err());
    }

    #[test]
    fn offset_clamps_at_zero() {
        let tc = Timecode::from_seconds(5.0).unwrap();
        assert_eq!(tc.offset(-15.0).total_seconds(), 0.0);
        assert_eq!(tc.offset(15.0).total_seconds(), 20.0);
    }

    #[test]
    fn display_matches_seek_string() {
        let tc = Timecode::from_seconds(61.25).unwrap();
        assert_eq!(tc.to_string(), "00:01:01.250");
    }
}
