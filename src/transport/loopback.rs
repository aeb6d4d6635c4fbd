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
use std::collections::HashMap;
use std::io;
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::{
    sync::mpsc::{self, Sender, UnboundedSender},
    task::JoinHandle,
};
use tracing::debug;

use super::{Transport, TransportError};

/// An in-process transport. Payloads injected on a topic reach its subscribers, and
/// everything published is recorded.
#[derive(Default)]
pub struct LoopbackTransport {
    inner: Arc<Mutex<Inner>>,
}

#[derive(Default)]
struct Inner {
    subscribers: HashMap<String, Vec<UnboundedSender<String>>>,
    published: Vec<(String, String)>,
    closed: bool,
}

impl LoopbackTransport {
    pub fn new() -> LoopbackTransport {
        LoopbackTransport::default()
    }

    /// Delivers a payload to the subscribers of the topic. Returns the number of
    /// subscribers reached.
    pub fn inject(&self, topic: &str, payload: &str) -> usize {
        let mut inner = self.inner.lock();
        let Some(subscribers) = inner.subscribers.get_mut(topic) else {
            return 0;
        };
        subscribers.retain(|subscriber| subscriber.send(payload.to_string()).is_ok());
        subscribers.len()
    }

    /// Everything published so far, as (topic, payload) pairs.
    pub fn published(&self) -> Vec<(String, String)> {
        self.inner.lock().published.clone()
    }

    /// Ends every subscription. Later publishes fail.
    pub fn close(&self) {
        let mut inner = self.inner.lock();
        inner.closed = true;
        inner.subscribers.clear();
    }
}

impl Transport for LoopbackTransport {
    fn subscribe(
        &self,
        topic: &str,
        payloads_tx: Sender<String>,
    ) -> JoinHandle<Result<(), io::Error>> {
        let (subscriber_tx, mut subscriber_rx) = mpsc::unbounded_channel::<String>();
        {
            let mut inner = self.inner.lock();
            if !inner.closed {
                inner
                    .subscribers
                    .entry(topic.to_string())
                    .or_default()
                    .push(subscriber_tx);
            }
        }

        let topic = topic.to_string();
        tokio::spawn(async move {
            while let Some(payload) = subscriber_rx.recv().await {
                if payloads_tx.send(payload).await.is_err() {
                    break;
                }
            }
            debug!(topic = topic.as_str(), "Loopback subscription ended.");
            Ok(())
        })
    }

    fn publish(&self, topic: &str, payload: String) -> Result<(), TransportError> {
        let mut inner = self.inner.lock();
        if inner.closed {
            return Err(TransportError::Closed);
        }
        inner.published.push((topic.to_string(), payload));
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use tokio::sync::mpsc;

    use crate::transport::{Transport, TransportError};

    use super::LoopbackTransport;

    #[tokio::test]
    async fn test_inject_reaches_topic_subscribers() {
        let transport = LoopbackTransport::new();
        let (payloads_tx, mut payloads_rx) = mpsc::channel(10);
        let handle = transport.subscribe("/a", payloads_tx);

        assert_eq!(0, transport.inject("/b", "ignored"));
        assert_eq!(1, transport.inject("/a", "first"));
        assert_eq!(1, transport.inject("/a", "second"));

        assert_eq!(Some("first".to_string()), payloads_rx.recv().await);
        assert_eq!(Some("second".to_string()), payloads_rx.recv().await);

        transport.close();
        assert_eq!(None, payloads_rx.recv().await);
        assert!(handle.await.unwrap().is_ok());
    }

    #[test]
    fn test_publish_records() {
        let transport = LoopbackTransport::new();
        transport.publish("/a", "one".to_string()).unwrap();
        transport.publish("/b", "two".to_string()).unwrap();

        assert_eq!(
            vec![
                ("/a".to_string(), "one".to_string()),
                ("/b".to_string(), "two".to_string()),
            ],
            transport.published()
        );

        transport.close();
        assert!(matches!(
            transport.publish("/a", "three".to_string()),
            Err(TransportError::Closed)
        ));
    }
}
