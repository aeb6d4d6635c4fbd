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
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::color::Color;
use crate::strip::{Strip, StripError};

mod error;
mod group_shift;
mod night_rider;
mod plain;
mod rainbow;
mod strobe;

pub use error::EffectError;
use group_shift::GroupShift;
use night_rider::NightRider;
use plain::PlainColor;
use rainbow::Rainbow;
use strobe::Strobe;

/// The longest update interval an effect accepts.
pub const MAX_UPDATE_INTERVAL: Duration = Duration::from_millis(5000);

/// The group size used by the group shift effect when none is given.
pub const DEFAULT_GROUP_SIZE: usize = 8;

const GROUP_SHIFT_INTERVAL: Duration = Duration::from_millis(250);

/// Source of effect ids.
static NEXT_EFFECT_ID: AtomicU64 = AtomicU64::new(1);

/// Identifies a constructed effect. Copies of an effect share its id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EffectId(u64);

impl EffectId {
    fn next() -> EffectId {
        EffectId(NEXT_EFFECT_ID.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for EffectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The kinds of effect that can be installed. Plain color is the default and can't be
/// selected by name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EffectKind {
    #[serde(skip_deserializing)]
    Plain,
    NightRider,
    Rainbow,
    Strobe,
    GroupShift,
}

impl EffectKind {
    /// The effects that can be selected by name.
    pub const SELECTABLE: [EffectKind; 4] = [
        EffectKind::NightRider,
        EffectKind::Rainbow,
        EffectKind::Strobe,
        EffectKind::GroupShift,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            EffectKind::Plain => "plain",
            EffectKind::NightRider => "nightrider",
            EffectKind::Rainbow => "rainbow",
            EffectKind::Strobe => "strobe",
            EffectKind::GroupShift => "groupshift",
        }
    }
}

impl fmt::Display for EffectKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// The parameters shared by every effect.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct Parameters {
    pub color: Color,
    pub brightness: u8,
    pub interval: Duration,
}

impl Parameters {
    /// The color after brightness has been applied.
    pub fn scaled_color(&self) -> Color {
        self.color.scale(self.brightness)
    }
}

/// The frame computation of a single effect variant.
pub(crate) trait Animation {
    /// Resets the animation to its first frame.
    fn reset(&mut self);

    /// Writes the next frame into the strip buffer. Does not show.
    fn render(&mut self, params: &Parameters, strip: &mut dyn Strip);
}

#[derive(Debug, Clone)]
enum Variant {
    Plain(PlainColor),
    NightRider(NightRider),
    Rainbow(Rainbow),
    Strobe(Strobe),
    GroupShift(GroupShift),
}

impl Variant {
    fn animation(&mut self) -> &mut dyn Animation {
        match self {
            Variant::Plain(plain) => plain,
            Variant::NightRider(night_rider) => night_rider,
            Variant::Rainbow(rainbow) => rainbow,
            Variant::Strobe(strobe) => strobe,
            Variant::GroupShift(group_shift) => group_shift,
        }
    }
}

/// A visual effect. Effects are started once when they become active, run once per
/// frame while active, and stopped once when they are replaced or disabled.
#[derive(Debug, Clone)]
pub struct Effect {
    id: EffectId,
    params: Parameters,
    /// True between start and stop.
    active: bool,
    variant: Variant,
}

impl Effect {
    fn new(variant: Variant, color: Color, interval: Duration) -> Effect {
        Effect {
            id: EffectId::next(),
            params: Parameters {
                color,
                brightness: u8::MAX,
                interval,
            },
            active: false,
            variant,
        }
    }

    /// Holds every pixel at one color.
    pub fn plain(color: Color) -> Effect {
        Effect::new(
            Variant::Plain(PlainColor),
            color,
            Duration::from_millis(100),
        )
    }

    /// A short lit segment that bounces between the ends of the strip.
    pub fn night_rider() -> Effect {
        Effect::new(
            Variant::NightRider(NightRider::default()),
            Color::RED,
            Duration::from_millis(50),
        )
    }

    /// Hues spread across the strip, rotating over time.
    pub fn rainbow() -> Effect {
        Effect::new(
            Variant::Rainbow(Rainbow::default()),
            Color::WHITE,
            Duration::from_millis(20),
        )
    }

    /// Flashes the whole strip, toggling every frame.
    pub fn strobe() -> Effect {
        Effect::new(
            Variant::Strobe(Strobe::default()),
            Color::WHITE,
            Duration::from_millis(100),
        )
    }

    /// Alternating lit and dark groups of pixels that march along the strip.
    pub fn group_shift(group_size: usize) -> Result<Effect, EffectError> {
        Ok(Effect::new(
            Variant::GroupShift(GroupShift::new(group_size)?),
            Color::WHITE,
            GROUP_SHIFT_INTERVAL,
        ))
    }

    /// Constructs an effect of the given kind with its default parameters.
    pub fn from_kind(kind: EffectKind) -> Effect {
        match kind {
            EffectKind::Plain => Effect::plain(Color::WHITE),
            EffectKind::NightRider => Effect::night_rider(),
            EffectKind::Rainbow => Effect::rainbow(),
            EffectKind::Strobe => Effect::strobe(),
            EffectKind::GroupShift => Effect::new(
                Variant::GroupShift(GroupShift::default()),
                Color::WHITE,
                GROUP_SHIFT_INTERVAL,
            ),
        }
    }

    pub fn id(&self) -> EffectId {
        self.id
    }

    pub fn kind(&self) -> EffectKind {
        match self.variant {
            Variant::Plain(_) => EffectKind::Plain,
            Variant::NightRider(_) => EffectKind::NightRider,
            Variant::Rainbow(_) => EffectKind::Rainbow,
            Variant::Strobe(_) => EffectKind::Strobe,
            Variant::GroupShift(_) => EffectKind::GroupShift,
        }
    }

    pub fn color(&self) -> Color {
        self.params.color
    }

    pub fn brightness(&self) -> u8 {
        self.params.brightness
    }

    pub fn update_interval(&self) -> Duration {
        self.params.interval
    }

    /// The group size, if this is a group shift effect.
    pub fn group_size(&self) -> Option<usize> {
        match &self.variant {
            Variant::GroupShift(group_shift) => Some(group_shift.group_size()),
            _ => None,
        }
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn set_color(&mut self, color: Color) {
        self.params.color = color;
    }

    pub fn set_brightness(&mut self, brightness: u8) {
        self.params.brightness = brightness;
    }

    /// Sets the time between frames. Intervals above [MAX_UPDATE_INTERVAL] are rejected.
    pub fn set_update_interval(&mut self, interval: Duration) -> Result<(), EffectError> {
        if interval > MAX_UPDATE_INTERVAL {
            return Err(EffectError::InvalidParameter {
                name: "update interval",
                reason: format!(
                    "{}ms exceeds the maximum of {}ms",
                    interval.as_millis(),
                    MAX_UPDATE_INTERVAL.as_millis()
                ),
            });
        }
        self.params.interval = interval;
        Ok(())
    }

    /// Sets the group size. Only group shift effects have one.
    pub fn set_group_size(&mut self, group_size: usize) -> Result<(), EffectError> {
        let kind = self.kind();
        match &mut self.variant {
            Variant::GroupShift(group_shift) => group_shift.set_group_size(group_size),
            _ => Err(EffectError::InvalidParameter {
                name: "group size",
                reason: format!("not supported by the {} effect", kind),
            }),
        }
    }

    /// A copy of this effect that has not been started. The copy keeps the id and
    /// parameters.
    pub fn detached(&self) -> Effect {
        Effect {
            active: false,
            ..self.clone()
        }
    }

    /// Activates the effect and rewinds its animation.
    pub fn start(&mut self) {
        assert!(!self.active, "effect {} was started twice", self.id);
        self.active = true;
        self.variant.animation().reset();
    }

    /// Deactivates the effect.
    pub fn stop(&mut self) {
        assert!(self.active, "effect {} was stopped while idle", self.id);
        self.active = false;
        self.variant.animation().reset();
    }

    /// Renders one frame and shows it.
    pub fn run(&mut self, strip: &mut dyn Strip) -> Result<(), StripError> {
        assert!(self.active, "effect {} was run while idle", self.id);
        let params = self.params;
        self.variant.animation().render(&params, strip);
        strip.show()
    }
}
