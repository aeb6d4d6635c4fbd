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

use parking_lot::Mutex;
use tracing::trace;

use crate::color::Color;

use super::{Strip, StripError};

/// What the simulated strip has displayed so far.
#[derive(Default)]
struct Shown {
    /// The last frame pushed by show or off.
    frame: Vec<Color>,
    /// Number of show calls.
    shows: usize,
    /// Number of off calls.
    offs: usize,
}

/// A strip that keeps its pixels in memory. Used when no hardware is attached.
pub struct SimulatedStrip {
    pixels: Vec<Color>,
    shown: Arc<Mutex<Shown>>,
}

/// A read handle onto a simulated strip that stays valid after the strip has been
/// handed to the effect manager.
#[derive(Clone)]
pub struct StripMonitor {
    shown: Arc<Mutex<Shown>>,
}

impl SimulatedStrip {
    /// Creates a new simulated strip with the given number of pixels.
    pub fn new(length: usize) -> SimulatedStrip {
        SimulatedStrip {
            pixels: vec![Color::BLACK; length],
            shown: Arc::new(Mutex::new(Shown {
                frame: vec![Color::BLACK; length],
                ..Default::default()
            })),
        }
    }

    /// Gets a monitor for this strip.
    pub fn monitor(&self) -> StripMonitor {
        StripMonitor {
            shown: self.shown.clone(),
        }
    }
}

impl Strip for SimulatedStrip {
    fn len(&self) -> usize {
        self.pixels.len()
    }

    fn set_pixel(&mut self, index: usize, color: Color) {
        if let Some(pixel) = self.pixels.get_mut(index) {
            *pixel = color;
        }
    }

    fn show(&mut self) -> Result<(), StripError> {
        let mut shown = self.shown.lock();
        shown.frame.clone_from(&self.pixels);
        shown.shows += 1;
        trace!(
            frame = shown.shows,
            pixels = ?self.pixels,
            "Simulated strip frame."
        );
        Ok(())
    }

    fn off(&mut self) -> Result<(), StripError> {
        self.pixels.fill(Color::BLACK);
        let mut shown = self.shown.lock();
        shown.frame.clone_from(&self.pixels);
        shown.offs += 1;
        trace!("Simulated strip off.");
        Ok(())
    }
}

impl StripMonitor {
    /// The last frame that reached the strip.
    pub fn frame(&self) -> Vec<Color> {
        self.shown.lock().frame.clone()
    }

    /// How many frames have been shown.
    pub fn shows(&self) -> usize {
        self.shown.lock().shows
    }

    /// How many times the strip has been turned off.
    pub fn offs(&self) -> usize {
        self.shown.lock().offs
    }

    /// Returns true if every pixel of the last frame is dark.
    pub fn is_dark(&self) -> bool {
        self.shown.lock().frame.iter().all(Color::is_black)
    }
}
