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
use std::{
    collections::HashSet,
    error::Error,
    io,
    net::{AddrParseError, IpAddr, Ipv4Addr, SocketAddr, SocketAddrV4},
    sync::Arc,
};

use rosc::{
    address::{Matcher, OscAddress},
    OscMessage, OscPacket, OscType,
};
use tokio::{
    net::UdpSocket,
    select,
    sync::{
        mpsc::{self, Sender, UnboundedReceiver, UnboundedSender},
        Mutex,
    },
    task::JoinHandle,
};
use tracing::{debug, error, info, span, warn, Level};

use crate::config;

use super::{Transport, TransportError};

/// Carries topics as OSC addresses over UDP. A payload is the first string argument
/// of a message.
pub struct OscTransport {
    /// The socket address to host the OSC server on.
    addr: SocketAddr,
    /// The addresses that receive every published message.
    broadcast_addresses: Vec<SocketAddr>,
    /// Published packets, sent once the socket is up.
    outgoing_tx: UnboundedSender<OscPacket>,
    /// Taken by the first subscription, which owns the socket.
    outgoing_rx: parking_lot::Mutex<Option<UnboundedReceiver<OscPacket>>>,
}

impl OscTransport {
    pub fn new(config: &config::OscTransport) -> Result<OscTransport, Box<dyn Error>> {
        let addr: SocketAddr =
            SocketAddr::V4(SocketAddrV4::new(Ipv4Addr::UNSPECIFIED, config.port()));
        let broadcast_addresses: Vec<SocketAddr> = config
            .broadcast_addresses()
            .iter()
            .map(|addr| addr.parse())
            .collect::<Result<Vec<SocketAddr>, AddrParseError>>()?;
        let (outgoing_tx, outgoing_rx) = mpsc::unbounded_channel();

        Ok(OscTransport {
            addr,
            broadcast_addresses,
            outgoing_tx,
            outgoing_rx: parking_lot::Mutex::new(Some(outgoing_rx)),
        })
    }

    /// Sends a single payload to a running instance.
    pub async fn send_once(addr: SocketAddr, topic: &str, payload: &str) -> Result<(), Box<dyn Error>> {
        let packet = message(topic, payload.to_string())?;
        let buf = rosc::encoder::encode(&packet)?;
        let socket = UdpSocket::bind(SocketAddr::V4(SocketAddrV4::new(Ipv4Addr::UNSPECIFIED, 0))).await?;
        socket.send_to(&buf, addr).await?;
        Ok(())
    }

    /// Handles UDP sending/receiving.
    async fn handle_udp_comms(
        socket: UdpSocket,
        broadcast_addresses: Vec<SocketAddr>,
        connected_clients: Arc<Mutex<HashSet<SocketAddr>>>,
        rx_sender: Sender<OscPacket>,
        mut tx_receiver: UnboundedReceiver<OscPacket>,
    ) {
        let mut buf = [0u8; rosc::decoder::MTU];
        let mut sending = true;

        // Spurious socket errors are logged and the loop carries on.
        loop {
            select! {
                result = socket.recv_from(&mut buf) => {
                    match result {
                        Ok((size, sender_addr)) => {
                            {
                                let mut clients = connected_clients.lock().await;
                                if clients.insert(sender_addr) {
                                    info!(client = %sender_addr, "New OSC client.");
                                }
                            }
                            match rosc::decoder::decode_udp(&buf[..size]) {
                                Ok((_, packet)) => {
                                    if rx_sender.send(packet).await.is_err() {
                                        debug!("Subscriber gone, closing OSC socket.");
                                        return;
                                    }
                                }
                                Err(e) => error!(err = e.to_string(), "Error decoding OSC message"),
                            }
                        },
                        Err(e) => error!(err = e.to_string(), "Error receiving UDP."),
                    }
                }
                packet = tx_receiver.recv(), if sending => {
                    let Some(packet) = packet else {
                        sending = false;
                        continue;
                    };
                    match rosc::encoder::encode(&packet) {
                        Ok(buf) => {
                            for addr in broadcast_addresses.iter() {
                                if let Err(e) = socket.send_to(&buf, addr).await {
                                    error!(err = e.to_string(), "Error sending UDP data.");
                                }
                            }
                            let clients = connected_clients.lock().await;
                            for addr in clients.iter() {
                                if let Err(e) = socket.send_to(&buf, addr).await {
                                    error!(err = e.to_string(), "Error sending UDP data to client.");
                                }
                            }
                        }
                        Err(e) => error!(err = e.to_string(), "Error encoding OSC message"),
                    };
                }
            };
        }
    }

    /// Extracts the payloads addressed to the topic. Bundles are flattened in order.
    fn payloads(matcher: &Matcher, packet: &OscPacket) -> Vec<String> {
        match packet {
            OscPacket::Message(msg) => Self::payload(matcher, msg).into_iter().collect(),
            OscPacket::Bundle(bundle) => bundle
                .content
                .iter()
                .flat_map(|packet| Self::payloads(matcher, packet))
                .collect(),
        }
    }

    fn payload(matcher: &Matcher, msg: &OscMessage) -> Option<String> {
        let address = match OscAddress::new(msg.addr.clone()) {
            Ok(address) => address,
            Err(e) => {
                warn!(err = e.to_string(), addr = msg.addr.as_str(), "Invalid OSC address.");
                return None;
            }
        };
        if !matcher.match_address(&address) {
            debug!(addr = msg.addr.as_str(), "Ignoring message for another topic.");
            return None;
        }

        match msg.args.first() {
            Some(OscType::String(payload)) => Some(payload.clone()),
            _ => {
                warn!(addr = msg.addr.as_str(), "Ignoring message without a string payload.");
                None
            }
        }
    }
}

/// Builds the message carrying a payload on a topic.
fn message(topic: &str, payload: String) -> Result<OscPacket, TransportError> {
    OscAddress::new(topic.to_string()).map_err(|e| TransportError::InvalidTopic {
        topic: topic.to_string(),
        reason: e.to_string(),
    })?;

    Ok(OscPacket::Message(OscMessage {
        addr: topic.to_string(),
        args: vec![OscType::String(payload)],
    }))
}

impl Transport for OscTransport {
    fn subscribe(
        &self,
        topic: &str,
        payloads_tx: Sender<String>,
    ) -> JoinHandle<Result<(), io::Error>> {
        let addr = self.addr;
        let broadcast_addresses = self.broadcast_addresses.clone();
        let outgoing_rx = self.outgoing_rx.lock().take();
        let topic = topic.to_string();

        tokio::spawn(async move {
            let span = span!(Level::INFO, "OSC transport");
            let _enter = span.enter();

            let Some(outgoing_rx) = outgoing_rx else {
                return Err(io::Error::new(
                    io::ErrorKind::AlreadyExists,
                    "the OSC transport only supports one subscription",
                ));
            };
            let matcher = Matcher::new(&topic)
                .map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, e.to_string()))?;

            let socket = UdpSocket::bind(addr).await?;
            socket.set_broadcast(true)?;
            for broadcast_addr in broadcast_addresses.iter() {
                let ip = broadcast_addr.ip();
                if ip.is_multicast() {
                    match ip {
                        IpAddr::V4(ipv4_addr) => {
                            socket.join_multicast_v4(ipv4_addr, Ipv4Addr::UNSPECIFIED)?
                        }
                        IpAddr::V6(ipv6_addr) => socket.join_multicast_v6(&ipv6_addr, 0)?,
                    }
                }
            }
            info!(%addr, topic = topic.as_str(), "OSC transport listening.");

            let (rx_sender, mut rx_receiver) = mpsc::channel::<OscPacket>(10);
            let connected_clients: Arc<Mutex<HashSet<SocketAddr>>> =
                Arc::new(Mutex::new(HashSet::new()));
            let comms = tokio::spawn(Self::handle_udp_comms(
                socket,
                broadcast_addresses,
                connected_clients,
                rx_sender,
                outgoing_rx,
            ));

            while let Some(packet) = rx_receiver.recv().await {
                for payload in Self::payloads(&matcher, &packet) {
                    if payloads_tx.send(payload).await.is_err() {
                        info!("OSC subscription closed.");
                        comms.abort();
                        return Ok(());
                    }
                }
            }
            Ok(())
        })
    }

    fn publish(&self, topic: &str, payload: String) -> Result<(), TransportError> {
        self.outgoing_tx
            .send(message(topic, payload)?)
            .map_err(|_| TransportError::Closed)
    }
}

#[cfg(test)]
mod test {
    use std::{collections::HashSet, error::Error, sync::Arc, time::Duration};

    use rosc::{address::Matcher, OscBundle, OscMessage, OscPacket, OscTime, OscType};
    use tokio::{
        net::UdpSocket,
        sync::{mpsc, Mutex},
        time::timeout,
    };

    use crate::{
        config,
        testutil::eventually_async,
        transport::{Transport, TransportError},
    };

    use super::OscTransport;

    const TOPIC: &str = "/home/neopixels/set";

    fn string_message(addr: &str, payload: &str) -> OscPacket {
        OscPacket::Message(OscMessage {
            addr: addr.to_string(),
            args: vec![OscType::String(payload.to_string())],
        })
    }

    async fn recv_packet(socket: &UdpSocket) -> Result<OscPacket, Box<dyn Error>> {
        let mut buf = [0u8; rosc::decoder::MTU];
        let (size, _) = timeout(Duration::from_secs(1), socket.recv_from(&mut buf)).await??;
        let (_, packet) = rosc::decoder::decode_udp(&buf[..size])?;
        Ok(packet)
    }

    #[test]
    fn test_payloads() -> Result<(), Box<dyn Error>> {
        let matcher = Matcher::new(TOPIC)?;

        assert_eq!(
            vec!["{}".to_string()],
            OscTransport::payloads(&matcher, &string_message(TOPIC, "{}"))
        );
        assert!(OscTransport::payloads(&matcher, &string_message("/home/other/set", "{}")).is_empty());
        assert!(OscTransport::payloads(
            &matcher,
            &OscPacket::Message(OscMessage {
                addr: TOPIC.to_string(),
                args: vec![OscType::Int(1)],
            })
        )
        .is_empty());
        assert!(OscTransport::payloads(
            &matcher,
            &OscPacket::Message(OscMessage {
                addr: TOPIC.to_string(),
                args: vec![],
            })
        )
        .is_empty());

        let bundle = OscPacket::Bundle(OscBundle {
            timetag: OscTime {
                seconds: 0,
                fractional: 1,
            },
            content: vec![
                string_message(TOPIC, "first"),
                string_message("/elsewhere", "skipped"),
                string_message(TOPIC, "second"),
            ],
        });
        assert_eq!(
            vec!["first".to_string(), "second".to_string()],
            OscTransport::payloads(&matcher, &bundle)
        );
        Ok(())
    }

    #[test]
    fn test_publish_invalid_topic() -> Result<(), Box<dyn Error>> {
        let transport = OscTransport::new(&config::OscTransport::default())?;
        assert!(matches!(
            transport.publish("no-slash", "{}".to_string()),
            Err(TransportError::InvalidTopic { .. })
        ));
        assert!(transport.publish("/home/neopixels", "{}".to_string()).is_ok());
        Ok(())
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_udp_comms() -> Result<(), Box<dyn Error>> {
        let server_socket = UdpSocket::bind("127.0.0.1:0").await?;
        let server_addr = server_socket.local_addr()?;
        let client_socket = UdpSocket::bind("127.0.0.1:0").await?;
        let client_addr = client_socket.local_addr()?;
        let broadcast_socket = UdpSocket::bind("127.0.0.1:0").await?;

        let (rx_sender, mut rx_receiver) = mpsc::channel::<OscPacket>(10);
        let (tx_sender, tx_receiver) = mpsc::unbounded_channel::<OscPacket>();
        let connected_clients = Arc::new(Mutex::new(HashSet::new()));

        let handler_task = tokio::spawn(OscTransport::handle_udp_comms(
            server_socket,
            vec![broadcast_socket.local_addr()?],
            connected_clients.clone(),
            rx_sender,
            tx_receiver,
        ));

        // Inbound packets are decoded and the sender becomes a client.
        let command = string_message(TOPIC, r#"{"state": "ON"}"#);
        client_socket
            .send_to(&rosc::encoder::encode(&command)?, server_addr)
            .await?;
        assert_eq!(
            Some(command),
            timeout(Duration::from_secs(1), rx_receiver.recv()).await?
        );
        eventually_async(
            || async { connected_clients.lock().await.contains(&client_addr) },
            "Client never tracked",
        )
        .await;

        // Outbound packets reach the broadcast addresses and every client.
        let state = string_message("/home/neopixels", r#"{"state": "ON"}"#);
        tx_sender.send(state.clone())?;
        assert_eq!(state, recv_packet(&client_socket).await?);
        assert_eq!(state, recv_packet(&broadcast_socket).await?);

        handler_task.abort();
        Ok(())
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_send_once() -> Result<(), Box<dyn Error>> {
        let socket = UdpSocket::bind("127.0.0.1:0").await?;

        OscTransport::send_once(socket.local_addr()?, TOPIC, r#"{"effect": "rainbow"}"#).await?;
        assert_eq!(
            string_message(TOPIC, r#"{"effect": "rainbow"}"#),
            recv_packet(&socket).await?
        );
        Ok(())
    }
}
