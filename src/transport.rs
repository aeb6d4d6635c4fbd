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
use std::io;

use tokio::{sync::mpsc::Sender, task::JoinHandle};

mod loopback;
mod osc;

pub use loopback::LoopbackTransport;
pub use osc::OscTransport;

/// Errors raised while publishing.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("transport is closed")]
    Closed,

    #[error("invalid topic {topic}: {reason}")]
    InvalidTopic { topic: String, reason: String },
}

/// A publish/subscribe channel carrying string payloads on named topics.
pub trait Transport: Send + Sync + 'static {
    /// Forwards payloads received on the topic to the sender, in arrival order. The
    /// returned task finishes when the inbound stream closes.
    fn subscribe(
        &self,
        topic: &str,
        payloads_tx: Sender<String>,
    ) -> JoinHandle<Result<(), io::Error>>;

    /// Publishes a payload on the topic without waiting for delivery.
    fn publish(&self, topic: &str, payload: String) -> Result<(), TransportError>;
}
