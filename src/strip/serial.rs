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
use std::io::Write;
use std::time::Duration;

use serialport::SerialPort;
use tracing::info;

use crate::color::Color;

use super::{Strip, StripError};

/// How long a frame write may block before failing.
const WRITE_TIMEOUT: Duration = Duration::from_millis(100);

/// The Adalight frame magic.
const MAGIC: &[u8; 3] = b"Ada";

/// A strip driven by a microcontroller listening for Adalight frames on a serial port.
pub struct SerialStrip {
    port: Box<dyn SerialPort>,
    pixels: Vec<Color>,
    /// Reused frame buffer.
    frame: Vec<u8>,
}

impl SerialStrip {
    /// Opens the serial port for a strip of the given length.
    pub fn open(device: &str, baud: u32, length: usize) -> Result<SerialStrip, StripError> {
        info!(device, baud, length, "Opening serial strip.");
        let port = serialport::new(device, baud)
            .timeout(WRITE_TIMEOUT)
            .open()?;

        Ok(SerialStrip {
            port,
            pixels: vec![Color::BLACK; length],
            frame: Vec::with_capacity(header_len() + length * 3),
        })
    }
}

const fn header_len() -> usize {
    MAGIC.len() + 3
}

/// Writes an Adalight frame for the given pixels into the buffer.
fn encode_frame(pixels: &[Color], frame: &mut Vec<u8>) {
    frame.clear();

    // The count on the wire is the number of pixels minus one.
    let count = pixels.len().saturating_sub(1) as u16;
    let [hi, lo] = count.to_be_bytes();
    frame.extend_from_slice(MAGIC);
    frame.extend_from_slice(&[hi, lo, hi ^ lo ^ 0x55]);
    for pixel in pixels {
        frame.extend_from_slice(&[pixel.r, pixel.g, pixel.b]);
    }
}

impl Strip for SerialStrip {
    fn len(&self) -> usize {
        self.pixels.len()
    }

    fn set_pixel(&mut self, index: usize, color: Color) {
        if let Some(pixel) = self.pixels.get_mut(index) {
            *pixel = color;
        }
    }

    fn show(&mut self) -> Result<(), StripError> {
        encode_frame(&self.pixels, &mut self.frame);
        self.port.write_all(&self.frame)?;
        self.port.flush()?;
        Ok(())
    }

    fn off(&mut self) -> Result<(), StripError> {
        self.pixels.fill(Color::BLACK);
        self.show()
    }
}
