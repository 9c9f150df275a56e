//! Bus driver: owns the rumqttc event loop and turns its traffic into [`BusEvent`]s.
//!
//! The driver only polls while a connection attempt is wanted. After any poll
//! error it parks in `Idle` until the session asks for a new attempt, so the
//! reconnect policy lives entirely in the session.

use rumqttc::{
    AsyncClient, ConnectionError, Event, EventLoop, NetworkOptions, Packet, QoS,
    SubscribeReasonCode,
};
use statum::{machine, state};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use super::config::MqttConfig;
use super::connection::BusLink;
use super::error::BusError;
use super::message::{BusEvent, MqttMessage};

#[state]
#[derive(Debug, Clone)]
pub enum DriverState {
    Idle,
    Polling,
}

#[machine]
pub struct BusDriver<S: DriverState> {
    eventloop: EventLoop,

    // Connect requests from the link
    connect_rx: mpsc::Receiver<()>,

    events: mpsc::Sender<BusEvent>,

    // Whether the current attempt got its ConnAck
    connected: bool,
}

impl BusDriver<Idle> {
    pub fn create(
        eventloop: EventLoop,
        connect_rx: mpsc::Receiver<()>,
        events: mpsc::Sender<BusEvent>,
    ) -> Self {
        Self::new(eventloop, connect_rx, events, false)
    }

    /// Parks until a connect request arrives. `None` means shut down.
    pub async fn wait_for_connect(
        mut self,
        cancel: &CancellationToken,
    ) -> Option<BusDriver<Polling>> {
        tokio::select! {
            _ = cancel.cancelled() => None,
            request = self.connect_rx.recv() => {
                request?;
                self.connected = false;
                Some(self.transition())
            }
        }
    }
}

impl BusDriver<Polling> {
    /// Polls the event loop until the attempt fails or the session drops.
    pub async fn run_until_error(mut self, cancel: &CancellationToken) -> Option<BusDriver<Idle>> {
        loop {
            tokio::select! {
                _ = cancel.cancelled() => return None,
                polled = self.eventloop.poll() => match polled {
                    Ok(event) => self.dispatch(event).await,
                    Err(e) => {
                        self.report_failure(e).await;
                        return Some(self.transition());
                    }
                }
            }
        }
    }

    async fn dispatch(&mut self, event: Event) {
        match event {
            Event::Incoming(Packet::ConnAck(ack)) => {
                info!("Broker accepted connection (session present: {})", ack.session_present);
                self.connected = true;
                self.forward(BusEvent::Connected).await;
            }
            Event::Incoming(Packet::Publish(publish)) => {
                debug!("Publish on {} ({} bytes)", publish.topic, publish.payload.len());
                self.forward(BusEvent::Message(MqttMessage::from_publish(&publish)))
                    .await;
            }
            Event::Incoming(Packet::SubAck(ack)) => {
                if ack
                    .return_codes
                    .iter()
                    .any(|code| matches!(code, SubscribeReasonCode::Failure))
                {
                    error!("Broker rejected subscription (pkid {})", ack.pkid);
                } else {
                    debug!("Subscription acknowledged (pkid {})", ack.pkid);
                }
            }
            other => debug!("Bus event: {:?}", other),
        }
    }

    async fn report_failure(&mut self, e: ConnectionError) {
        let reason = e.to_string();
        if self.connected {
            warn!("Connection lost: {}", reason);
            self.forward(BusEvent::ConnectionLost(reason)).await;
        } else {
            error!("Connection attempt failed: {}", reason);
            self.forward(BusEvent::ConnectFailed(reason)).await;
        }
        self.connected = false;
    }
}

impl<S: DriverState> BusDriver<S> {
    async fn forward(&mut self, event: BusEvent) {
        if let Err(e) = self.events.send(event).await {
            warn!("Session is gone, dropping bus event: {:?}", e.0);
        }
    }
}

/// [`BusLink`] backed by a rumqttc client and a spawned [`BusDriver`].
pub struct RumqttLink {
    client: AsyncClient,
    connect_tx: mpsc::Sender<()>,
}

impl RumqttLink {
    /// Creates the client and spawns the driver task. Nothing connects until
    /// [`BusLink::start`] is called.
    pub fn spawn(
        config: &MqttConfig,
        client_id: &str,
        events: mpsc::Sender<BusEvent>,
        cancel: CancellationToken,
    ) -> Self {
        let (client, mut eventloop) =
            AsyncClient::new(config.to_options(client_id), config.request_capacity);

        let mut network_options = NetworkOptions::new();
        network_options.set_connection_timeout(config.connect_timeout_secs);
        eventloop.set_network_options(network_options);

        let (connect_tx, connect_rx) = mpsc::channel(1);
        let driver = BusDriver::create(eventloop, connect_rx, events);

        tokio::spawn(async move {
            let mut idle = driver;
            loop {
                let Some(polling) = idle.wait_for_connect(&cancel).await else {
                    break;
                };
                let Some(next) = polling.run_until_error(&cancel).await else {
                    break;
                };
                idle = next;
            }
            info!("Bus driver stopped");
        });

        Self { client, connect_tx }
    }
}

impl BusLink for RumqttLink {
    fn start(&mut self) -> Result<(), BusError> {
        match self.connect_tx.try_send(()) {
            Ok(()) => Ok(()),
            Err(mpsc::error::TrySendError::Full(())) => {
                debug!("Connect request already pending");
                Ok(())
            }
            Err(mpsc::error::TrySendError::Closed(())) => Err(BusError::LinkDown),
        }
    }

    fn subscribe(&mut self, topic: &str) -> Result<(), BusError> {
        self.client.try_subscribe(topic, QoS::AtMostOnce)?;
        Ok(())
    }

    fn publish(&mut self, topic: &str, payload: Vec<u8>) -> Result<(), BusError> {
        self.client
            .try_publish(topic, QoS::AtMostOnce, false, payload)?;
        Ok(())
    }
}
