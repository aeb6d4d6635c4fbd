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
use crate::{color::Color, strip::Strip};

use super::{Animation, Parameters};

/// Degrees the rainbow rotates every frame.
const HUE_STEP: f64 = 5.0;

/// Spreads the full hue wheel across the strip and rotates it every frame. The
/// configured color is not used; brightness is.
#[derive(Debug, Clone, Default)]
pub(super) struct Rainbow {
    /// Hue of the first pixel in degrees.
    offset: f64,
}

impl Animation for Rainbow {
    fn reset(&mut self) {
        self.offset = 0.0;
    }

    fn render(&mut self, params: &Parameters, strip: &mut dyn Strip) {
        let len = strip.len();
        let spacing = 360.0 / len.max(1) as f64;
        for index in 0..len {
            let hue = self.offset + index as f64 * spacing;
            strip.set_pixel(
                index,
                Color::from_hsv(hue, 1.0, 1.0).scale(params.brightness),
            );
        }

        self.offset = (self.offset + HUE_STEP) % 360.0;
    }
}
