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
use std::time::Duration;

use serde::Deserialize;

use crate::color::Color;
use crate::effects::{EffectKind, MAX_UPDATE_INTERVAL};
use crate::snapshot::Power;

/// Errors for payloads that can't be turned into a command.
#[derive(Debug, thiserror::Error)]
pub enum CommandError {
    #[error("unable to decode command: {0}")]
    Json(#[from] serde_json::Error),

    #[error("{field} must be between {min} and {max}, got {value}")]
    OutOfRange {
        field: &'static str,
        value: u64,
        min: u64,
        max: u64,
    },
}

/// The payload as it arrives, before range checks.
#[derive(Deserialize)]
struct RawCommand {
    state: Option<Power>,
    effect: Option<EffectKind>,
    interval_ms: Option<u64>,
    group_size: Option<u64>,
    brightness: Option<u64>,
    color: Option<RawColor>,
}

#[derive(Deserialize)]
struct RawColor {
    r: u64,
    g: u64,
    b: u64,
}

/// A validated command. Absent fields leave the corresponding state unchanged.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Command {
    pub state: Option<Power>,
    pub effect: Option<EffectKind>,
    pub interval: Option<Duration>,
    pub group_size: Option<usize>,
    pub brightness: Option<u8>,
    pub color: Option<Color>,
}

fn check_range(field: &'static str, value: u64, min: u64, max: u64) -> Result<u64, CommandError> {
    if value < min || value > max {
        return Err(CommandError::OutOfRange {
            field,
            value,
            min,
            max,
        });
    }
    Ok(value)
}

fn channel(field: &'static str, value: u64) -> Result<u8, CommandError> {
    Ok(check_range(field, value, 0, u8::MAX.into())? as u8)
}

impl Command {
    /// Decodes and validates a JSON payload. Unknown keys are ignored.
    pub fn parse(payload: &str) -> Result<Command, CommandError> {
        let raw: RawCommand = serde_json::from_str(payload)?;

        Ok(Command {
            state: raw.state,
            effect: raw.effect,
            interval: raw
                .interval_ms
                .map(|interval_ms| {
                    check_range(
                        "interval_ms",
                        interval_ms,
                        0,
                        MAX_UPDATE_INTERVAL.as_millis() as u64,
                    )
                    .map(Duration::from_millis)
                })
                .transpose()?,
            group_size: raw
                .group_size
                .map(|group_size| {
                    check_range("group_size", group_size, 1, u32::MAX.into())
                        .map(|group_size| group_size as usize)
                })
                .transpose()?,
            brightness: raw
                .brightness
                .map(|brightness| channel("brightness", brightness))
                .transpose()?,
            color: raw
                .color
                .map(|color| -> Result<Color, CommandError> {
                    Ok(Color::new(
                        channel("color.r", color.r)?,
                        channel("color.g", color.g)?,
                        channel("color.b", color.b)?,
                    ))
                })
                .transpose()?,
        })
    }

    /// Returns true if the command carries anything besides the power state.
    pub fn changes_effect(&self) -> bool {
        self.effect.is_some()
            || self.interval.is_some()
            || self.group_size.is_some()
            || self.brightness.is_some()
            || self.color.is_some()
    }
}
