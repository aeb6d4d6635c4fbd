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
use std::error::Error;
use std::io;

use crate::color::Color;
use crate::config;

mod serial;
mod simulated;

pub use serial::SerialStrip;
pub use simulated::{SimulatedStrip, StripMonitor};

/// Errors raised while pushing pixel data to the hardware.
#[derive(Debug, thiserror::Error)]
pub enum StripError {
    #[error("strip I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("serial port error: {0}")]
    Serial(#[from] serialport::Error),
}

/// An addressable LED strip. Pixels are buffered by `set_pixel` and only reach the
/// hardware on `show`.
pub trait Strip: Send {
    /// The number of pixels on the strip.
    fn len(&self) -> usize;

    /// Returns true if the strip has no pixels.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Sets the buffered color of a pixel. Indices past the end of the strip are ignored.
    fn set_pixel(&mut self, index: usize, color: Color);

    /// Pushes the buffered pixels to the hardware.
    fn show(&mut self) -> Result<(), StripError>;

    /// Clears every pixel and pushes the dark frame to the hardware.
    fn off(&mut self) -> Result<(), StripError>;

    /// Sets every pixel to the same color. Does not show.
    fn fill(&mut self, color: Color) {
        for index in 0..self.len() {
            self.set_pixel(index, color);
        }
    }
}

/// Creates the strip described by the configuration.
pub fn from_config(config: &config::Strip) -> Result<Box<dyn Strip>, Box<dyn Error>> {
    Ok(match config {
        config::Strip::Serial(serial) => Box::new(SerialStrip::open(
            serial.device(),
            serial.baud(),
            serial.length(),
        )?),
        config::Strip::Simulated(simulated) => {
            Box::new(SimulatedStrip::new(simulated.length()))
        }
    })
}
