// Copyright (C) 2026 Michael Wilson <mike@mdwn.dev>
//
// This program is free software: you can redistribute it and/or modify it under
// the terms of the GNU General Public License as published by the Free Software
// Foundation, version 3.
//
// This program is distributed in the hope that it will be useful, but WITHOUT
// ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS
// FOR A PARTICULAR PURPOSE. See the GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License along with
// this program. If not, see <https://www.gnu.org/licenses/>.
//
use std::path::Path;
use std::time::Duration;

/// Outputs the given duration in a minutes:seconds format. Partial seconds round up so a clip
/// with any time left never shows 0:00.
pub fn duration_minutes_seconds(duration: Duration) -> String {
    let total = duration.as_secs() + u64::from(duration.subsec_nanos() > 0);
    format!("{}:{:02}", total / 60, total % 60)
}

/// Displays a clip path relative to the config directory when it lives inside it.
pub fn relative_display(base: &Path, path: &Path) -> String {
    path.strip_prefix(base)
        .unwrap_or(path)
        .display()
        .to_string()
}

#[cfg(test)]
mod test {
    use std::path::Path;
    use std::time::Duration;

    use super::*;

    #[test]
    fn test_duration_minutes_strings() {
        assert_eq!("0:00", duration_minutes_seconds(Duration::ZERO));
        assert_eq!("0:01", duration_minutes_seconds(Duration::from_millis(10)));
        assert_eq!("0:05", duration_minutes_seconds(Duration::new(5, 0)));
        assert_eq!("1:00", duration_minutes_seconds(Duration::new(59, 500)));
        assert_eq!("2:05", duration_minutes_seconds(Duration::new(125, 0)));
        assert_eq!("60:06", duration_minutes_seconds(Duration::new(3606, 0)));
    }

    #[test]
    fn test_relative_display() {
        let base = Path::new("/sets/live");
        assert_eq!("kick.wav", relative_display(base, Path::new("/sets/live/kick.wav")));
        assert_eq!(
            "drums/kick.wav",
            relative_display(base, Path::new("/sets/live/drums/kick.wav"))
        );
        assert_eq!("/other/kick.wav", relative_display(base, Path::new("/other/kick.wav")));
    }
}
