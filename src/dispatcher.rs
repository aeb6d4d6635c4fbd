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
use std::sync::Arc;

use tracing::{info, warn};

use crate::color::Color;
use crate::effects::{Effect, EffectError, EffectKind, DEFAULT_GROUP_SIZE};
use crate::manager::EffectManager;
use crate::snapshot::{Power, StateSnapshot};

mod command;

pub use command::{Command, CommandError};

/// Turns commands into calls on the effect manager.
pub struct Dispatcher {
    manager: Arc<EffectManager>,
    /// If set, parameter commands without an effect modify the installed effect instead
    /// of replacing it with a plain color.
    retain_effect: bool,
}

impl Dispatcher {
    pub fn new(manager: Arc<EffectManager>, retain_effect: bool) -> Dispatcher {
        Dispatcher {
            manager,
            retain_effect,
        }
    }

    /// Handles a raw payload and returns the state to publish. Invalid payloads are
    /// logged and dropped without touching the manager.
    pub fn handle(&self, payload: &str) -> StateSnapshot {
        match Command::parse(payload) {
            Ok(command) => {
                info!(command = ?command, "Applying command.");
                if let Err(e) = self.apply(&command) {
                    warn!(err = e.to_string(), "Command not applied.");
                }
            }
            Err(e) => warn!(err = e.to_string(), payload, "Dropping invalid command."),
        }

        self.manager.snapshot()
    }

    /// Applies a validated command. The target effect is built before anything else
    /// happens, so a failure leaves the manager untouched.
    pub fn apply(&self, command: &Command) -> Result<(), EffectError> {
        let target = if command.changes_effect() {
            Some(self.target_effect(command)?)
        } else {
            None
        };

        match command.state {
            Some(Power::On) => self.manager.enable(),
            Some(Power::Off) => self.manager.disable(),
            None => {}
        }

        if let Some(target) = target {
            self.manager.set_effect(target);
        }
        Ok(())
    }

    /// The state as it stands.
    pub fn snapshot(&self) -> StateSnapshot {
        self.manager.snapshot()
    }

    fn target_effect(&self, command: &Command) -> Result<Effect, EffectError> {
        let mut effect = match command.effect {
            Some(EffectKind::GroupShift) => {
                Effect::group_shift(command.group_size.unwrap_or(DEFAULT_GROUP_SIZE))?
            }
            Some(kind) => Effect::from_kind(kind),
            None if self.retain_effect => {
                let mut effect = self.manager.current_effect();
                if let (Some(group_size), Some(_)) = (command.group_size, effect.group_size()) {
                    effect.set_group_size(group_size)?;
                }
                effect
            }
            None => Effect::plain(Color::WHITE),
        };

        if let Some(color) = command.color {
            effect.set_color(color);
        }
        if let Some(brightness) = command.brightness {
            effect.set_brightness(brightness);
        }
        if let Some(interval) = command.interval {
            effect.set_update_interval(interval)?;
        }
        Ok(effect)
    }
}
