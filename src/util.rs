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

/// Outputs the given number of seconds in a minutes:seconds format. Negative or non-finite
/// values are shown as 0:00.
pub fn duration_minutes_seconds(seconds: f64) -> String {
    let total = if seconds.is_finite() && seconds > 0.0 {
        seconds as u64
    } else {
        0
    };
    let minutes = total / 60;
    let secs = total - minutes * 60;
    format!("{}:{:02}", minutes, secs)
}

/// Parses a `name=value` volume assignment.
pub fn parse_volume_assignment(assignment: &str) -> Result<(String, f64), String> {
    let (name, value) = assignment
        .split_once('=')
        .ok_or_else(|| format!("malformed volume assignment '{}'", assignment))?;
    if name.is_empty() {
        return Err(format!("missing stem name in '{}'", assignment));
    }
    let value = value
        .parse::<f64>()
        .map_err(|e| format!("invalid volume in '{}': {}", assignment, e))?;
    Ok((name.to_string(), value))
}
