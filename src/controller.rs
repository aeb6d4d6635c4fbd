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

use tokio::sync::mpsc;
use tokio::task::{JoinError, JoinHandle};
use tracing::{error, info, span, Level};

use crate::config::Topics;
use crate::dispatcher::Dispatcher;
use crate::snapshot::StateSnapshot;
use crate::transport::Transport;

/// Feeds commands from a transport to the dispatcher and publishes the resulting state.
pub struct Controller {
    handle: JoinHandle<()>,
}

impl Controller {
    /// Creates a new controller. Must be called from within a tokio runtime.
    pub fn new(
        dispatcher: Arc<Dispatcher>,
        transport: Arc<dyn Transport>,
        topics: Topics,
    ) -> Controller {
        Controller {
            handle: tokio::spawn(async move {
                Controller::handle_commands(dispatcher, transport, topics).await
            }),
        }
    }

    /// Join will block until the controller finishes.
    pub async fn join(&mut self) -> Result<(), JoinError> {
        (&mut self.handle).await
    }

    /// Handles one payload at a time in arrival order, publishing the state after each.
    async fn handle_commands(
        dispatcher: Arc<Dispatcher>,
        transport: Arc<dyn Transport>,
        topics: Topics,
    ) {
        let span = span!(Level::INFO, "controller");
        let _enter = span.enter();

        let (payloads_tx, mut payloads_rx) = mpsc::channel::<String>(10);
        let join_handle = transport.subscribe(&topics.command, payloads_tx);

        info!(
            command = topics.command.as_str(),
            state = topics.state.as_str(),
            "Controller started."
        );
        Self::publish(transport.as_ref(), &topics, &dispatcher.snapshot());

        while let Some(payload) = payloads_rx.recv().await {
            info!(payload = payload.as_str(), "Received command.");
            let snapshot = dispatcher.handle(&payload);
            Self::publish(transport.as_ref(), &topics, &snapshot);
        }

        info!("Controller closing.");
        match join_handle.await {
            Ok(Err(e)) => error!(err = e.to_string(), "Transport subscription failed."),
            Err(e) => error!(err = e.to_string(), "Error waiting for transport to stop."),
            Ok(Ok(())) => {}
        }
    }

    fn publish(transport: &dyn Transport, topics: &Topics, snapshot: &StateSnapshot) {
        let payload = match snapshot.to_json() {
            Ok(payload) => payload,
            Err(e) => {
                error!(err = e.to_string(), "Error encoding state.");
                return;
            }
        };
        if let Err(e) = transport.publish(&topics.state, payload) {
            error!(err = e.to_string(), "Error publishing state.");
        }
    }
}

#[cfg(test)]
mod test {
    use std::{error::Error, sync::Arc};

    use crate::{
        color::Color,
        config::Topics,
        dispatcher::Dispatcher,
        manager::EffectManager,
        snapshot::{Power, StateSnapshot},
        strip::SimulatedStrip,
        testutil::eventually_async,
        transport::LoopbackTransport,
    };

    use super::Controller;

    fn topics() -> Topics {
        Topics {
            command: "/home/neopixels/set".to_string(),
            state: "/home/neopixels".to_string(),
        }
    }

    fn states(transport: &LoopbackTransport) -> Vec<StateSnapshot> {
        transport
            .published()
            .into_iter()
            .map(|(topic, payload)| {
                assert_eq!(topics().state, topic);
                serde_json::from_str(&payload).unwrap()
            })
            .collect()
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_controller() -> Result<(), Box<dyn Error>> {
        let manager = Arc::new(EffectManager::new(Box::new(SimulatedStrip::new(8)))?);
        let dispatcher = Arc::new(Dispatcher::new(manager.clone(), false));
        let transport = Arc::new(LoopbackTransport::new());
        let mut controller = Controller::new(dispatcher, transport.clone(), topics());

        // The initial state goes out before any command.
        eventually_async(
            || async { transport.published().len() == 1 },
            "Initial state never published",
        )
        .await;
        assert_eq!(
            vec![StateSnapshot {
                brightness: 255,
                state: Power::Off,
                color: Color::BLACK,
                effect: None,
            }],
            states(&transport)
        );

        // Every payload gets a publish, including invalid ones.
        eventually_async(
            || async { transport.inject(&topics().command, "{}") == 1 },
            "Controller never subscribed",
        )
        .await;
        transport.inject(
            &topics().command,
            r#"{"state": "ON", "color": {"r": 255, "g": 0, "b": 0}}"#,
        );
        transport.inject(&topics().command, "not json");
        transport.inject("/home/other/set", r#"{"state": "OFF"}"#);

        eventually_async(
            || async { transport.published().len() == 4 },
            "States never published",
        )
        .await;
        let states = states(&transport);
        let lit = StateSnapshot {
            brightness: 255,
            state: Power::On,
            color: Color::RED,
            effect: None,
        };
        assert_eq!(lit, states[2]);
        assert_eq!(lit, states[3]);
        assert!(manager.is_enabled());

        transport.close();
        controller.join().await?;
        manager.shutdown();
        Ok(())
    }
}
