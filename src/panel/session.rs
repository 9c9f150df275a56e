//! The panel session: single owner of the connection and everything shown on screen.
//!
//! Bus events, UI actions and timer expiries all arrive as [`SessionEvent`]s
//! and are handled one at a time. After each event the session publishes a
//! fresh [`PanelView`] on a watch channel for the UI to draw.
//!
//! Timers are detached sleeps that post an event back into the inbox. They
//! cannot be cancelled: a glow timer scheduled for an older message still
//! clears the glow of a newer one when it fires.

use std::time::Duration;

use tokio::sync::{mpsc, watch};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use super::color::{Indicator, LedColor};
use super::compose::{self, ConfigForm};
use crate::config::PanelConfig;
use crate::mqtt::connection::{Connection, ConnectionState};
use crate::mqtt::message::{BusEvent, MqttMessage};

/// Shown instead of an empty payload.
pub const EMPTY_PLACEHOLDER: &str = "---";

const INBOX_CAPACITY: usize = 64;

#[derive(Debug, Clone)]
pub enum SessionEvent {
    Bus(BusEvent),
    /// The user pressed "Send config"
    SubmitConfig(ConfigForm),
    GlowElapsed,
    ReconnectDue,
}

impl From<BusEvent> for SessionEvent {
    fn from(event: BusEvent) -> Self {
        SessionEvent::Bus(event)
    }
}

/// Text plus the connection state it describes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StatusLine {
    pub text: String,
    pub state: ConnectionState,
}

/// Everything the UI renders.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PanelView {
    pub status: StatusLine,
    pub indicator: Indicator,
    pub received_text: String,
    pub message_count: u64,
    pub config_status: String,
}

impl Default for PanelView {
    fn default() -> Self {
        Self {
            status: StatusLine::default(),
            indicator: Indicator::default(),
            received_text: EMPTY_PLACEHOLDER.to_string(),
            message_count: 0,
            config_status: String::new(),
        }
    }
}

/// One inbound color report, normalized.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColorEvent {
    pub raw: String,
    pub token: String,
}

impl ColorEvent {
    pub fn from_payload(raw: &str) -> Self {
        Self {
            raw: raw.to_string(),
            token: raw.trim().to_lowercase(),
        }
    }

    pub fn display_text(&self) -> &str {
        if self.token.is_empty() {
            EMPTY_PLACEHOLDER
        } else {
            &self.token
        }
    }

    pub fn color(&self) -> Option<LedColor> {
        LedColor::from_token(&self.token)
    }
}

pub struct Session {
    connection: Connection,
    monitor_topic: String,
    config_topic: String,
    reconnect_delay: Duration,
    glow: Duration,
    view: PanelView,
    view_tx: watch::Sender<PanelView>,
    inbox: mpsc::Receiver<SessionEvent>,
    // Handed to timers so they can post back
    inbox_tx: mpsc::Sender<SessionEvent>,
}

impl Session {
    /// Returns the session and the sender the UI uses for its actions.
    pub fn new(
        config: &PanelConfig,
        connection: Connection,
        view_tx: watch::Sender<PanelView>,
    ) -> (Self, mpsc::Sender<SessionEvent>) {
        let (inbox_tx, inbox) = mpsc::channel(INBOX_CAPACITY);
        let session = Self {
            connection,
            monitor_topic: config.mqtt.monitor_topic.clone(),
            config_topic: config.mqtt.config_topic.clone(),
            reconnect_delay: config.timing.reconnect_delay(),
            glow: config.timing.glow(),
            view: PanelView::default(),
            view_tx,
            inbox,
            inbox_tx: inbox_tx.clone(),
        };
        (session, inbox_tx)
    }

    /// Connects, then serves events until `cancel` fires.
    pub async fn run(mut self, mut bus: mpsc::Receiver<BusEvent>, cancel: CancellationToken) {
        let greeting = format!("Connecting to {}...", self.connection.address());
        self.connect(greeting);
        self.publish_view();

        loop {
            let event = tokio::select! {
                _ = cancel.cancelled() => break,
                Some(event) = bus.recv() => SessionEvent::Bus(event),
                Some(event) = self.inbox.recv() => event,
                else => break,
            };
            self.handle(event);
        }
        info!("Session stopped");
    }

    pub fn handle(&mut self, event: SessionEvent) {
        match event {
            SessionEvent::Bus(bus_event) => {
                self.connection.observe(&bus_event);
                match bus_event {
                    BusEvent::Connected => self.on_connected(),
                    BusEvent::ConnectFailed(reason) => self.on_connect_failed(reason),
                    BusEvent::ConnectionLost(reason) => self.on_connection_lost(reason),
                    BusEvent::Message(msg) => self.on_message(msg),
                }
            }
            SessionEvent::SubmitConfig(form) => self.submit_config(&form),
            SessionEvent::GlowElapsed => self.view.indicator.clear_glow(),
            SessionEvent::ReconnectDue => self.connect("Reconnecting...".to_string()),
        }
        self.publish_view();
    }

    fn connect(&mut self, status: String) {
        match self.connection.connect() {
            Ok(()) => self.set_status(status),
            Err(e) => {
                error!("Unable to start MQTT connection: {}", e);
                self.set_status("Error starting MQTT connection".to_string());
            }
        }
    }

    fn on_connected(&mut self) {
        info!("Connected to MQTT broker at {}", self.connection.address());
        self.set_status("Connected to MQTT".to_string());

        // A failed subscribe only degrades to receiving nothing
        match self.connection.subscribe(&self.monitor_topic) {
            Ok(()) => info!("Subscribed to {}", self.monitor_topic),
            Err(e) => error!("Subscribing to {} failed: {}", self.monitor_topic, e),
        }
    }

    fn on_connect_failed(&mut self, reason: String) {
        self.set_status(format!("MQTT connection failed: {}", reason));
    }

    fn on_connection_lost(&mut self, reason: String) {
        warn!("Connection lost: {}", reason);
        self.set_status("Disconnected from MQTT".to_string());
        self.schedule(self.reconnect_delay, SessionEvent::ReconnectDue);
    }

    fn on_message(&mut self, msg: MqttMessage) {
        if msg.topic != self.monitor_topic {
            debug!("Ignoring message on {}", msg.topic);
            return;
        }

        let event = ColorEvent::from_payload(&msg.content);
        self.view.message_count = self.view.message_count.saturating_add(1);
        self.view.received_text = event.display_text().to_string();
        debug!(
            "Color report #{}: {:?} -> {:?}",
            self.view.message_count, event.raw, event.token
        );

        // Unknown tokens drop the glow but leave the previous color in place
        match event.color() {
            Some(color) => {
                debug!("Indicator set to {}", color.class_name());
                self.view.indicator.light(color);
                self.schedule(self.glow, SessionEvent::GlowElapsed);
            }
            None => self.view.indicator.clear_glow(),
        }
    }

    fn submit_config(&mut self, form: &ConfigForm) {
        self.view.config_status =
            match compose::send_config(&mut self.connection, &self.config_topic, form) {
                Ok(sent) => sent.summary(),
                Err(e) => {
                    warn!("Config not sent: {}", e);
                    e.to_string()
                }
            };
    }

    fn set_status(&mut self, text: String) {
        self.view.status = StatusLine {
            text,
            state: self.connection.state(),
        };
    }

    fn schedule(&self, after: Duration, event: SessionEvent) {
        let inbox = self.inbox_tx.clone();
        let deadline = tokio::time::Instant::now() + after;
        tokio::spawn(async move {
            tokio::time::sleep_until(deadline).await;
            if inbox.send(event).await.is_err() {
                debug!("Session gone before timer fired");
            }
        });
    }

    fn publish_view(&self) {
        self.view_tx.send_replace(self.view.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mqtt::connection::testing::RecordingLink;
    use crate::panel::compose::DeviceConfig;

    struct Harness {
        session: Session,
        link: RecordingLink,
        view_rx: watch::Receiver<PanelView>,
    }

    impl Harness {
        fn new() -> Self {
            let config = PanelConfig::default();
            let link = RecordingLink::default();
            let connection = Connection::new(
                &config.mqtt,
                "panel_test".to_string(),
                Box::new(link.clone()),
            );
            let (view_tx, view_rx) = watch::channel(PanelView::default());
            let (session, _actions) = Session::new(&config, connection, view_tx);
            Self {
                session,
                link,
                view_rx,
            }
        }

        fn connected() -> Self {
            let mut harness = Self::new();
            harness.session.connect("Connecting...".to_string());
            harness.session.handle(BusEvent::Connected.into());
            harness
        }

        fn color(&mut self, payload: &str) {
            self.session.handle(
                BusEvent::Message(MqttMessage::from_topic("esp32/led", payload)).into(),
            );
        }

        /// Lets elapsed timers run, then handles whatever they posted.
        async fn drain_timers(&mut self) -> usize {
            for _ in 0..10 {
                tokio::task::yield_now().await;
            }
            let mut handled = 0;
            while let Ok(event) = self.session.inbox.try_recv() {
                self.session.handle(event);
                handled += 1;
            }
            handled
        }

        fn starts(&self) -> usize {
            self.link.log.lock().unwrap().starts
        }

        fn published(&self) -> Vec<(String, Vec<u8>)> {
            self.link.log.lock().unwrap().published.clone()
        }
    }

    #[test]
    fn color_event_normalizes_payload() {
        let event = ColorEvent::from_payload("  GrEeN \n");
        assert_eq!(event.token, "green");
        assert_eq!(event.display_text(), "green");
        assert_eq!(event.color(), Some(LedColor::Green));

        let empty = ColorEvent::from_payload("   ");
        assert_eq!(empty.display_text(), EMPTY_PLACEHOLDER);
        assert_eq!(empty.color(), None);
    }

    #[tokio::test]
    async fn subscribes_to_monitor_topic_on_connect() {
        let harness = Harness::connected();
        assert_eq!(harness.starts(), 1);
        assert_eq!(
            harness.link.log.lock().unwrap().subscriptions,
            vec!["esp32/led".to_string()]
        );
        let view = harness.view_rx.borrow().clone();
        assert_eq!(view.status.text, "Connected to MQTT");
        assert_eq!(view.status.state, ConnectionState::Connected);
    }

    #[tokio::test]
    async fn connect_reports_connecting_state() {
        let mut harness = Harness::new();
        harness.session.connect("Connecting to 18.218.20.155:9001...".to_string());
        assert_eq!(harness.session.view.status.state, ConnectionState::Connecting);
    }

    #[tokio::test]
    async fn failed_connect_is_reported_and_not_retried() {
        let mut harness = Harness::new();
        harness.session.connect("Connecting...".to_string());
        harness
            .session
            .handle(BusEvent::ConnectFailed("connection refused".into()).into());

        let status = &harness.session.view.status;
        assert_eq!(status.state, ConnectionState::Disconnected);
        assert_eq!(status.text, "MQTT connection failed: connection refused");
        assert_eq!(harness.drain_timers().await, 0);
        assert_eq!(harness.starts(), 1);
    }

    #[tokio::test]
    async fn driver_down_is_reported() {
        let mut harness = Harness::new();
        harness.link.log.lock().unwrap().fail_start = true;
        harness.session.connect("Connecting...".to_string());
        let status = &harness.session.view.status;
        assert_eq!(status.text, "Error starting MQTT connection");
        assert_eq!(status.state, ConnectionState::Disconnected);
    }

    #[tokio::test(start_paused = true)]
    async fn lost_connection_reconnects_once_after_delay() {
        let mut harness = Harness::connected();
        harness
            .session
            .handle(BusEvent::ConnectionLost("keep alive timeout".into()).into());

        let status = harness.session.view.status.clone();
        assert_eq!(status.text, "Disconnected from MQTT");
        assert_eq!(status.state, ConnectionState::Disconnected);

        tokio::time::advance(Duration::from_millis(1999)).await;
        assert_eq!(harness.drain_timers().await, 0);
        assert_eq!(harness.starts(), 1);

        tokio::time::advance(Duration::from_millis(1)).await;
        assert_eq!(harness.drain_timers().await, 1);
        assert_eq!(harness.starts(), 2);
        let status = &harness.session.view.status;
        assert_eq!(status.text, "Reconnecting...");
        assert_eq!(status.state, ConnectionState::Connecting);

        tokio::time::advance(Duration::from_secs(10)).await;
        assert_eq!(harness.drain_timers().await, 0);
        assert_eq!(harness.starts(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn known_color_glows_then_settles() {
        let mut harness = Harness::connected();
        harness.color("  RED ");

        let view = harness.session.view.clone();
        assert_eq!(view.received_text, "red");
        assert_eq!(view.message_count, 1);
        assert_eq!(view.indicator.color(), Some(LedColor::Red));
        assert!(view.indicator.is_glowing());

        tokio::time::advance(Duration::from_millis(900)).await;
        harness.drain_timers().await;
        let indicator = harness.session.view.indicator;
        assert_eq!(indicator.color(), Some(LedColor::Red));
        assert!(!indicator.is_glowing());
        assert_eq!(harness.view_rx.borrow().indicator, indicator);
    }

    #[tokio::test(start_paused = true)]
    async fn older_glow_timer_ends_newer_glow() {
        let mut harness = Harness::connected();
        harness.color("red");
        tokio::time::advance(Duration::from_millis(500)).await;
        harness.color("blue");

        tokio::time::advance(Duration::from_millis(400)).await;
        harness.drain_timers().await;
        let indicator = harness.session.view.indicator;
        assert_eq!(indicator.color(), Some(LedColor::Blue));
        assert!(!indicator.is_glowing());

        tokio::time::advance(Duration::from_millis(500)).await;
        assert_eq!(harness.drain_timers().await, 1);
        assert!(!harness.session.view.indicator.is_glowing());
    }

    #[tokio::test(start_paused = true)]
    async fn empty_payload_counts_and_shows_placeholder() {
        let mut harness = Harness::connected();
        harness.color("green");
        tokio::time::advance(Duration::from_millis(900)).await;
        harness.drain_timers().await;

        harness.color("   ");
        let view = &harness.session.view;
        assert_eq!(view.received_text, EMPTY_PLACEHOLDER);
        assert_eq!(view.message_count, 2);
        assert_eq!(view.indicator.color(), Some(LedColor::Green));
        assert!(!view.indicator.is_glowing());
    }

    #[tokio::test(start_paused = true)]
    async fn unknown_color_keeps_previous_class() {
        let mut harness = Harness::connected();
        harness.color("blue");
        tokio::time::advance(Duration::from_millis(900)).await;
        harness.drain_timers().await;

        harness.color("Purple");
        let view = &harness.session.view;
        assert_eq!(view.received_text, "purple");
        assert_eq!(view.message_count, 2);
        assert_eq!(view.indicator.color(), Some(LedColor::Blue));
        assert!(!view.indicator.is_glowing());
        assert_eq!(harness.drain_timers().await, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn unknown_color_ends_a_running_glow() {
        let mut harness = Harness::connected();
        harness.color("red");
        tokio::time::advance(Duration::from_millis(300)).await;

        harness.color("purple");
        let indicator = harness.session.view.indicator;
        assert_eq!(indicator.color(), Some(LedColor::Red));
        assert!(!indicator.is_glowing());
        assert_eq!(harness.view_rx.borrow().indicator, indicator);

        harness.color("red");
        assert!(harness.session.view.indicator.is_glowing());
        harness.color("");
        let view = &harness.session.view;
        assert_eq!(view.received_text, EMPTY_PLACEHOLDER);
        assert_eq!(view.message_count, 4);
        assert_eq!(view.indicator.color(), Some(LedColor::Red));
        assert!(!view.indicator.is_glowing());
    }

    #[tokio::test]
    async fn submit_sends_unusual_colors_intact() {
        let mut harness = Harness::connected();
        let colors = "r\"ed\\,grün,青";
        harness
            .session
            .handle(SessionEvent::SubmitConfig(ConfigForm::new("12abc", colors)));

        let published = harness.published();
        assert_eq!(published.len(), 1);
        let sent: DeviceConfig = serde_json::from_slice(&published[0].1).unwrap();
        assert_eq!(sent.interval_sec, 12);
        assert_eq!(sent.colors, colors);
    }

    #[tokio::test]
    async fn first_payload_unknown_leaves_indicator_blank() {
        let mut harness = Harness::connected();
        harness.color("");
        let view = &harness.session.view;
        assert_eq!(view.message_count, 1);
        assert_eq!(view.indicator, Indicator::default());
    }

    #[tokio::test]
    async fn other_topics_are_ignored() {
        let mut harness = Harness::connected();
        harness.session.handle(
            BusEvent::Message(MqttMessage::from_topic("esp32/other", "red")).into(),
        );
        let view = &harness.session.view;
        assert_eq!(view.message_count, 0);
        assert_eq!(view.received_text, EMPTY_PLACEHOLDER);
    }

    #[tokio::test]
    async fn submit_while_connected_publishes_once() {
        let mut harness = Harness::connected();
        harness
            .session
            .handle(SessionEvent::SubmitConfig(ConfigForm::new("5", "red,green")));

        let published = harness.published();
        assert_eq!(published.len(), 1);
        let (topic, payload) = &published[0];
        assert_eq!(topic, "esp32/config");
        let json: serde_json::Value = serde_json::from_slice(payload).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"interval_sec": 5, "colors": "red,green"})
        );

        let status = harness.view_rx.borrow().config_status.clone();
        assert_eq!(status, "Config sent. Interval: 5s. Colors: red,green");
    }

    #[tokio::test]
    async fn submit_with_bad_interval_publishes_nothing() {
        let mut harness = Harness::connected();
        for bad in ["0", "-3", "soon"] {
            harness
                .session
                .handle(SessionEvent::SubmitConfig(ConfigForm::new(bad, "red")));
            assert_eq!(
                harness.session.view.config_status,
                "Error: interval must be a positive number."
            );
        }
        assert!(harness.published().is_empty());
    }

    #[tokio::test]
    async fn submit_while_disconnected_publishes_nothing() {
        let mut harness = Harness::connected();
        harness
            .session
            .handle(BusEvent::ConnectionLost("eof".into()).into());
        harness
            .session
            .handle(SessionEvent::SubmitConfig(ConfigForm::new("3", "red")));

        assert_eq!(
            harness.session.view.config_status,
            "Error: not connected to the broker."
        );
        assert!(harness.published().is_empty());
    }

    #[tokio::test]
    async fn run_stops_on_cancel() {
        let config = PanelConfig::default();
        let link = RecordingLink::default();
        let connection =
            Connection::new(&config.mqtt, "panel_test".to_string(), Box::new(link.clone()));
        let (view_tx, mut view_rx) = watch::channel(PanelView::default());
        let (session, actions) = Session::new(&config, connection, view_tx);
        let (bus_tx, bus_rx) = mpsc::channel(8);
        let cancel = CancellationToken::new();
        let task = tokio::spawn(session.run(bus_rx, cancel.clone()));

        bus_tx.send(BusEvent::Connected).await.unwrap();
        view_rx
            .wait_for(|view| view.status.state == ConnectionState::Connected)
            .await
            .unwrap();
        actions
            .send(SessionEvent::SubmitConfig(ConfigForm::new("9", "blue")))
            .await
            .unwrap();

        view_rx
            .wait_for(|view| !view.config_status.is_empty())
            .await
            .unwrap();
        assert_eq!(link.log.lock().unwrap().starts, 1);
        assert_eq!(link.log.lock().unwrap().published.len(), 1);

        cancel.cancel();
        task.await.unwrap();
    }
}
