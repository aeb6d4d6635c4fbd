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
use crate::strip::Strip;

use super::{Animation, Parameters};

/// Holds the whole strip at the configured color.
#[derive(Debug, Clone, Default)]
pub(super) struct PlainColor;

impl Animation for PlainColor {
    fn reset(&mut self) {}

    fn render(&mut self, params: &Parameters, strip: &mut dyn Strip) {
        strip.fill(params.scaled_color());
    }
}
