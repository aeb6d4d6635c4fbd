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

/// Alternates the whole strip between the configured color and dark, one state per
/// frame. The first frame after a reset is lit.
#[derive(Debug, Clone, Default)]
pub(super) struct Strobe {
    lit: bool,
}

impl Animation for Strobe {
    fn reset(&mut self) {
        self.lit = false;
    }

    fn render(&mut self, params: &Parameters, strip: &mut dyn Strip) {
        self.lit = !self.lit;
        strip.fill(if self.lit {
            params.scaled_color()
        } else {
            Color::BLACK
        });
    }
}

#[cfg(test)]
mod test {
    use std::time::Duration;

    use crate::{
        color::Color,
        effects::{Animation, Parameters},
        strip::{SimulatedStrip, Strip},
    };

    use super::Strobe;

    #[test]
    fn test_alternates() {
        let mut strip = SimulatedStrip::new(4);
        let monitor = strip.monitor();
        let params = Parameters {
            color: Color::new(0, 100, 0),
            brightness: 255,
            interval: Duration::from_millis(100),
        };
        let mut strobe = Strobe::default();

        let mut frames = Vec::new();
        for _ in 0..4 {
            strobe.render(&params, &mut strip);
            strip.show().unwrap();
            frames.push(monitor.is_dark());
        }
        assert_eq!(vec![false, true, false, true], frames);

        // A reset starts lit again.
        strobe.render(&params, &mut strip);
        strobe.reset();
        strobe.render(&params, &mut strip);
        strip.show().unwrap();
        assert_eq!(vec![Color::new(0, 100, 0); 4], monitor.frame());
    }
}
