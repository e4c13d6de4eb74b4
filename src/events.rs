use crate::card::CardResult;
use crate::error::EventBusError;
use serde::Serialize;
use std::time::SystemTime;
use tokio::sync::broadcast;
use tracing::{debug, error, info, warn};

/// Events that can occur in the cardcam system
#[derive(Debug, Clone, Serialize)]
pub enum CardcamEvent {
    /// Both inference stages passed for a frame
    CardRecognized {
        card: CardResult,
        timestamp: SystemTime,
    },
    /// A component could not be brought up; the system keeps running without it
    SetupFailed { component: String, error: String },
    /// Frame delivery was enabled or disabled
    CaptureStateChanged {
        capturing: bool,
        timestamp: SystemTime,
    },
    /// A system error occurred in a component
    SystemError { component: String, error: String },
    /// System shutdown requested
    ShutdownRequested {
        timestamp: SystemTime,
        reason: String,
    },
}

impl CardcamEvent {
    /// Get the timestamp of the event
    pub fn timestamp(&self) -> SystemTime {
        match self {
            CardcamEvent::CardRecognized { timestamp, .. } => *timestamp,
            CardcamEvent::SetupFailed { .. } => SystemTime::now(),
            CardcamEvent::CaptureStateChanged { timestamp, .. } => *timestamp,
            CardcamEvent::SystemError { .. } => SystemTime::now(),
            CardcamEvent::ShutdownRequested { timestamp, .. } => *timestamp,
        }
    }

    /// Get a human-readable description of the event
    pub fn description(&self) -> String {
        match self {
            CardcamEvent::CardRecognized { card, .. } => format!("Card recognised: {}", card),
            CardcamEvent::SetupFailed { component, error } => {
                format!("Setup of {} failed: {}", component, error)
            }
            CardcamEvent::CaptureStateChanged { capturing, .. } => {
                format!("Capture {}", if *capturing { "started" } else { "stopped" })
            }
            CardcamEvent::SystemError { component, error } => {
                format!("Error in {}: {}", component, error)
            }
            CardcamEvent::ShutdownRequested { reason, .. } => {
                format!("Shutdown requested: {}", reason)
            }
        }
    }

    /// Get the event type as a string for filtering
    pub fn event_type(&self) -> &'static str {
        match self {
            CardcamEvent::CardRecognized { .. } => "card_recognized",
            CardcamEvent::SetupFailed { .. } => "setup_failed",
            CardcamEvent::CaptureStateChanged { .. } => "capture_state_changed",
            CardcamEvent::SystemError { .. } => "system_error",
            CardcamEvent::ShutdownRequested { .. } => "shutdown_requested",
        }
    }
}

/// Event bus for component coordination using broadcast channels
#[derive(Clone)]
pub struct EventBus {
    sender: broadcast::Sender<CardcamEvent>,
}

impl EventBus {
    /// Create a new event bus with the specified channel capacity
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    /// Subscribe to events and get a receiver
    pub fn subscribe(&self) -> broadcast::Receiver<CardcamEvent> {
        self.sender.subscribe()
    }

    /// Subscribe with a filter applied on receive
    pub fn subscribe_filtered<S: Into<String>>(
        &self,
        filter: EventFilter,
        name: S,
    ) -> EventReceiver {
        EventReceiver::new(self.sender.subscribe(), filter, name.into())
    }

    /// Publish an event to all subscribers.
    ///
    /// Never blocks, so it is safe to call from result handlers.
    pub fn publish(&self, event: CardcamEvent) -> Result<usize, EventBusError> {
        match &event {
            CardcamEvent::CardRecognized { card, .. } => info!("Card recognised: {}", card),
            CardcamEvent::SetupFailed { component, error } => {
                error!("Setup of {} failed: {}", component, error)
            }
            CardcamEvent::SystemError { component, error } => {
                error!("System error in {}: {}", component, error)
            }
            CardcamEvent::ShutdownRequested { reason, .. } => {
                info!("Shutdown requested: {}", reason)
            }
            _ => debug!("Event: {}", event.description()),
        }

        self.sender
            .send(event)
            .map_err(|e| EventBusError::PublishFailed {
                details: e.to_string(),
            })
    }

    /// Get the number of active subscribers
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }

    /// Check if there are any active subscribers
    pub fn has_subscribers(&self) -> bool {
        self.sender.receiver_count() > 0
    }
}

/// Event filter for selective event handling
#[derive(Debug, Clone)]
pub enum EventFilter {
    /// Accept all events
    All,
    /// Accept only specific event types
    EventTypes(Vec<&'static str>),
    /// Custom filter function
    Custom(fn(&CardcamEvent) -> bool),
}

impl EventFilter {
    /// Check if an event passes this filter
    pub fn matches(&self, event: &CardcamEvent) -> bool {
        match self {
            EventFilter::All => true,
            EventFilter::EventTypes(types) => types.contains(&event.event_type()),
            EventFilter::Custom(filter_fn) => filter_fn(event),
        }
    }
}

/// Event receiver with filtering
pub struct EventReceiver {
    receiver: broadcast::Receiver<CardcamEvent>,
    filter: EventFilter,
    name: String,
}

impl EventReceiver {
    pub fn new(
        receiver: broadcast::Receiver<CardcamEvent>,
        filter: EventFilter,
        name: String,
    ) -> Self {
        Self {
            receiver,
            filter,
            name,
        }
    }

    /// Receive the next filtered event
    pub async fn recv(&mut self) -> Result<CardcamEvent, EventBusError> {
        loop {
            match self.receiver.recv().await {
                Ok(event) => {
                    if self.filter.matches(&event) {
                        debug!(
                            "Receiver '{}' received event: {}",
                            self.name,
                            event.description()
                        );
                        return Ok(event);
                    }
                }
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    // Card results are only interesting while fresh
                    warn!("Receiver '{}' lagged behind by {} events", self.name, n);
                }
                Err(broadcast::error::RecvError::Closed) => {
                    debug!("Event bus closed for receiver '{}'", self.name);
                    return Err(EventBusError::ChannelClosed);
                }
            }
        }
    }
}
