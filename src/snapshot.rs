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
use serde::{Deserialize, Serialize};

use crate::color::Color;
use crate::effects::{Effect, EffectKind};

/// Whether the strip is lit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Power {
    On,
    Off,
}

impl From<bool> for Power {
    fn from(enabled: bool) -> Self {
        if enabled {
            Power::On
        } else {
            Power::Off
        }
    }
}

/// The state document published after every command.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateSnapshot {
    pub brightness: u8,
    pub state: Power,
    pub color: Color,
    /// Omitted for the plain color effect.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub effect: Option<EffectKind>,
}

impl StateSnapshot {
    pub(crate) fn new(effect: &Effect, enabled: bool) -> StateSnapshot {
        StateSnapshot {
            brightness: effect.brightness(),
            state: enabled.into(),
            color: effect.color(),
            effect: match effect.kind() {
                EffectKind::Plain => None,
                kind => Some(kind),
            },
        }
    }

    /// Serializes the snapshot as JSON.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

#[cfg(test)]
mod test {
    use serde_json::json;

    use crate::{color::Color, effects::Effect};

    use super::StateSnapshot;

    #[test]
    fn test_plain_omits_effect() {
        let snapshot = StateSnapshot::new(&Effect::plain(Color::new(1, 2, 3)), false);
        let value: serde_json::Value = serde_json::from_str(&snapshot.to_json().unwrap()).unwrap();

        assert_eq!(
            json!({
                "brightness": 255,
                "state": "OFF",
                "color": {"r": 1, "g": 2, "b": 3},
            }),
            value
        );
    }

    #[test]
    fn test_named_effect() {
        let mut effect = Effect::rainbow();
        effect.set_brightness(120);
        let snapshot = StateSnapshot::new(&effect, true);
        let value: serde_json::Value = serde_json::from_str(&snapshot.to_json().unwrap()).unwrap();

        assert_eq!(
            json!({
                "brightness": 120,
                "state": "ON",
                "color": {"r": 255, "g": 255, "b": 255},
                "effect": "rainbow",
            }),
            value
        );
    }
}
