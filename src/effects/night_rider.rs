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

/// The number of lit pixels in the moving segment.
const SEGMENT_LEN: usize = 3;

/// A lit segment that moves one pixel per frame and bounces at both ends of the strip.
#[derive(Debug, Clone)]
pub(super) struct NightRider {
    /// Index of the first lit pixel.
    position: usize,
    /// True while moving towards the end of the strip.
    forward: bool,
}

impl Default for NightRider {
    fn default() -> Self {
        NightRider {
            position: 0,
            forward: true,
        }
    }
}

impl NightRider {
    /// Moves the segment one pixel, turning around at the ends.
    fn advance(&mut self, last_position: usize) {
        if last_position == 0 {
            self.position = 0;
            return;
        }

        if self.forward && self.position >= last_position {
            self.forward = false;
        } else if !self.forward && self.position == 0 {
            self.forward = true;
        }

        if self.forward {
            self.position += 1;
        } else {
            self.position -= 1;
        }
    }
}

impl Animation for NightRider {
    fn reset(&mut self) {
        *self = NightRider::default();
    }

    fn render(&mut self, params: &Parameters, strip: &mut dyn Strip) {
        let len = strip.len();
        if len == 0 {
            return;
        }

        let segment = SEGMENT_LEN.min(len);
        let last_position = len - segment;
        // The strip may have shrunk under us.
        self.position = self.position.min(last_position);

        strip.fill(Color::BLACK);
        let color = params.scaled_color();
        for index in self.position..self.position + segment {
            strip.set_pixel(index, color);
        }

        self.advance(last_position);
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

    use super::NightRider;

    fn lit_positions(frame: &[Color]) -> Vec<usize> {
        frame
            .iter()
            .enumerate()
            .filter(|(_, color)| !color.is_black())
            .map(|(index, _)| index)
            .collect()
    }

    #[test]
    fn test_bounces() {
        let mut strip = SimulatedStrip::new(5);
        let monitor = strip.monitor();
        let params = Parameters {
            color: Color::RED,
            brightness: 255,
            interval: Duration::from_millis(50),
        };
        let mut night_rider = NightRider::default();

        let mut starts = Vec::new();
        for _ in 0..7 {
            night_rider.render(&params, &mut strip);
            strip.show().unwrap();
            let lit = lit_positions(&monitor.frame());
            assert_eq!(3, lit.len());
            starts.push(lit[0]);
        }

        assert_eq!(vec![0, 1, 2, 1, 0, 1, 2], starts);
    }

    #[test]
    fn test_short_strip() {
        let mut strip = SimulatedStrip::new(2);
        let monitor = strip.monitor();
        let params = Parameters {
            color: Color::RED,
            brightness: 255,
            interval: Duration::from_millis(50),
        };
        let mut night_rider = NightRider::default();

        for _ in 0..3 {
            night_rider.render(&params, &mut strip);
            strip.show().unwrap();
            assert_eq!(vec![Color::RED; 2], monitor.frame());
        }
    }

    #[test]
    fn test_reset() {
        let mut strip = SimulatedStrip::new(10);
        let params = Parameters {
            color: Color::RED,
            brightness: 255,
            interval: Duration::from_millis(50),
        };
        let mut night_rider = NightRider::default();
        night_rider.render(&params, &mut strip);
        night_rider.render(&params, &mut strip);
        assert_eq!(2, night_rider.position);

        night_rider.reset();
        assert_eq!(0, night_rider.position);
        assert!(night_rider.forward);
    }
}
