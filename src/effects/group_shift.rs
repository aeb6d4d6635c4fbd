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

use super::{Animation, EffectError, Parameters, DEFAULT_GROUP_SIZE};

/// Partitions the strip into groups of `group_size` pixels that alternate between lit
/// and dark. The pattern moves one pixel along the strip every frame.
#[derive(Debug, Clone)]
pub(super) struct GroupShift {
    group_size: usize,
    /// How far the pattern has moved, in pixels.
    shift: usize,
}

impl Default for GroupShift {
    fn default() -> Self {
        GroupShift {
            group_size: DEFAULT_GROUP_SIZE,
            shift: 0,
        }
    }
}

impl GroupShift {
    pub fn new(group_size: usize) -> Result<GroupShift, EffectError> {
        let mut group_shift = GroupShift::default();
        group_shift.set_group_size(group_size)?;
        Ok(group_shift)
    }

    pub fn group_size(&self) -> usize {
        self.group_size
    }

    pub fn set_group_size(&mut self, group_size: usize) -> Result<(), EffectError> {
        if group_size == 0 {
            return Err(EffectError::InvalidParameter {
                name: "group size",
                reason: "must be at least 1".to_string(),
            });
        }
        self.group_size = group_size;
        self.shift %= 2 * group_size;
        Ok(())
    }
}

impl Animation for GroupShift {
    fn reset(&mut self) {
        self.shift = 0;
    }

    fn render(&mut self, params: &Parameters, strip: &mut dyn Strip) {
        let color = params.scaled_color();
        let period = 2 * self.group_size;
        for index in 0..strip.len() {
            // Shifting forward means each pixel shows what its left neighbour had.
            let position = (index + period - self.shift) % period;
            let lit = position / self.group_size == 0;
            strip.set_pixel(index, if lit { color } else { Color::BLACK });
        }

        self.shift = (self.shift + 1) % period;
    }
}
