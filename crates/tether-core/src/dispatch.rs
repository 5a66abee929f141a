//! Event dispatch: decode engine notifications and route them to
//! subscribers.
//!
//! The [`Dispatcher`] owns a registry mapping [`EventKind`] to subscriber
//! callbacks, plus a reserved error channel for everything that cannot be
//! delivered as a typed event. Handlers are registered before the bridge
//! starts and invoked synchronously, in registration order, on the task
//! that owns the dispatcher, which is what keeps dispatch order equal to
//! emission order.
//!
//! # Notification flow
//!
//! For each notification, in order:
//! 1. An engine-reported error short-circuits to the error channel; the
//!    payload is not decoded.
//! 2. A missing or empty payload is itself anomalous and goes to the error
//!    channel rather than being dropped silently.
//! 3. A payload that fails to decode goes to the error channel with the
//!    raw text attached.
//! 4. A decoded event is routed to every handler registered for its kind.
//!    A failing handler is logged and isolated; the remaining handlers and
//!    all later events still run.

use std::collections::HashMap;

use crate::event::{DecodeError, Event, EventKind};

/// Outcome of one subscriber invocation.
pub type HandlerResult = Result<(), Box<dyn std::error::Error + Send + Sync>>;

/// Subscriber callback for one event kind.
pub type Handler = Box<dyn FnMut(&Event) -> HandlerResult + Send>;

/// Subscriber callback for the reserved error channel.
pub type ErrorHandler = Box<dyn FnMut(&DispatchError) + Send>;

/// A notification as received on the engine's event callback.
///
/// Mirrors the `(err, payload)` pair the engine passes to its callback;
/// both halves are optional because the callback contract allows either to
/// be absent.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct EventNotification {
    /// Engine-reported error, verbatim.
    pub error: Option<String>,
    /// Encoded event payload.
    pub payload: Option<String>,
}

impl EventNotification {
    /// A notification carrying only a payload.
    pub fn payload(payload: impl Into<String>) -> Self {
        Self { error: None, payload: Some(payload.into()) }
    }

    /// A notification carrying only an engine error.
    pub fn error(error: impl Into<String>) -> Self {
        Self { error: Some(error.into()), payload: None }
    }
}

/// Non-fatal failures surfaced on the reserved error channel.
///
/// Every variant is isolated to the notification or frame that produced
/// it; none of them terminate the bridge.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DispatchError {
    /// The engine invoked a callback with its error indicator set.
    #[error("engine reported an error: {message}")]
    Engine {
        /// Verbatim engine error text.
        message: String,
    },

    /// The engine invoked the event callback with neither error nor payload.
    #[error("event notification carried no payload")]
    EmptyPayload,

    /// The payload did not decode into the event taxonomy.
    #[error("event payload did not decode: {0}")]
    Decode(#[from] DecodeError),

    /// The channel failed to open or to transmit a frame.
    #[error("transport failure: {message}")]
    Transport {
        /// Underlying channel error text.
        message: String,
    },
}

/// Decodes engine notifications and routes them to subscribers.
#[derive(Default)]
pub struct Dispatcher {
    handlers: HashMap<EventKind, Vec<Handler>>,
    error_handlers: Vec<ErrorHandler>,
}

impl Dispatcher {
    /// Create a dispatcher with no subscribers.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a handler for one event kind.
    ///
    /// Multiple handlers per kind are allowed and run in registration
    /// order. Registration is expected to finish before the bridge starts;
    /// the registry is read-only during dispatch.
    pub fn on<F>(&mut self, kind: EventKind, handler: F)
    where
        F: FnMut(&Event) -> HandlerResult + Send + 'static,
    {
        self.handlers.entry(kind).or_default().push(Box::new(handler));
    }

    /// Register a handler for the reserved error channel.
    pub fn on_error<F>(&mut self, handler: F)
    where
        F: FnMut(&DispatchError) + Send + 'static,
    {
        self.error_handlers.push(Box::new(handler));
    }

    /// Process one notification end to end.
    pub fn dispatch(&mut self, notification: EventNotification) {
        if let Some(message) = notification.error {
            self.report(DispatchError::Engine { message });
            return;
        }

        let payload = notification.payload.unwrap_or_default();
        if payload.is_empty() {
            self.report(DispatchError::EmptyPayload);
            return;
        }

        match Event::decode(&payload) {
            Ok(event) => self.route(&event),
            Err(error) => self.report(DispatchError::Decode(error)),
        }
    }

    /// Surface a failure on the reserved error channel.
    ///
    /// With no error handler registered the failure is still logged, never
    /// swallowed.
    pub fn report(&mut self, error: DispatchError) {
        if self.error_handlers.is_empty() {
            tracing::warn!(%error, "dispatch error with no error handler registered");
            return;
        }
        for handler in &mut self.error_handlers {
            handler(&error);
        }
    }

    fn route(&mut self, event: &Event) {
        let kind = event.kind();
        let Some(handlers) = self.handlers.get_mut(&kind) else {
            tracing::debug!(?kind, "event with no registered handler");
            return;
        };
        for (index, handler) in handlers.iter_mut().enumerate() {
            if let Err(error) = handler(event) {
                tracing::warn!(?kind, index, %error, "event handler failed");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use super::*;

    fn qr_payload(code: &str) -> String {
        format!(r#"{{"type":"PairingQrCode","data":{{"code":"{code}","timeout":60}}}}"#)
    }

    fn collector() -> (Arc<Mutex<Vec<String>>>, impl Fn(&str) -> Handler) {
        let seen: Arc<Mutex<Vec<String>>> = Arc::default();
        let make = {
            let seen = seen.clone();
            move |label: &str| -> Handler {
                let seen = seen.clone();
                let label = label.to_owned();
                Box::new(move |_event: &Event| {
                    seen.lock().unwrap().push(label.clone());
                    Ok(())
                })
            }
        };
        (seen, make)
    }

    #[test]
    fn handlers_run_in_registration_order() {
        let mut dispatcher = Dispatcher::new();
        let (seen, make) = collector();
        dispatcher.on(EventKind::PairingQrCode, make("first"));
        dispatcher.on(EventKind::PairingQrCode, make("second"));

        dispatcher.dispatch(EventNotification::payload(qr_payload("ABC")));

        assert_eq!(*seen.lock().unwrap(), vec!["first", "second"]);
    }

    #[test]
    fn events_only_reach_their_own_kind() {
        let mut dispatcher = Dispatcher::new();
        let (seen, make) = collector();
        dispatcher.on(EventKind::PairingQrCode, make("qr"));
        dispatcher.on(EventKind::Connected, make("connected"));

        dispatcher.dispatch(EventNotification::payload(qr_payload("ABC")));

        assert_eq!(*seen.lock().unwrap(), vec!["qr"]);
    }

    #[test]
    fn failing_handler_does_not_stop_the_rest() {
        let mut dispatcher = Dispatcher::new();
        let (seen, make) = collector();
        dispatcher.on(EventKind::PairingQrCode, |_event: &Event| -> HandlerResult {
            Err("boom".into())
        });
        dispatcher.on(EventKind::PairingQrCode, make("survivor"));

        dispatcher.dispatch(EventNotification::payload(qr_payload("ABC")));
        // Dispatcher must remain operable for later events too.
        dispatcher.dispatch(EventNotification::payload(qr_payload("DEF")));

        assert_eq!(*seen.lock().unwrap(), vec!["survivor", "survivor"]);
    }

    #[test]
    fn engine_error_short_circuits_without_decoding() {
        let mut dispatcher = Dispatcher::new();
        let (seen, make) = collector();
        dispatcher.on(EventKind::PairingQrCode, make("qr"));

        let errors: Arc<Mutex<Vec<DispatchError>>> = Arc::default();
        let sink = errors.clone();
        dispatcher.on_error(move |error| sink.lock().unwrap().push(error.clone()));

        dispatcher.dispatch(EventNotification {
            error: Some("stream errored".to_owned()),
            payload: Some(qr_payload("ABC")),
        });

        assert!(seen.lock().unwrap().is_empty());
        assert_eq!(
            *errors.lock().unwrap(),
            vec![DispatchError::Engine { message: "stream errored".to_owned() }]
        );
    }

    #[test]
    fn empty_payload_is_reported_not_dropped() {
        let mut dispatcher = Dispatcher::new();
        let errors: Arc<Mutex<Vec<DispatchError>>> = Arc::default();
        let sink = errors.clone();
        dispatcher.on_error(move |error| sink.lock().unwrap().push(error.clone()));

        dispatcher.dispatch(EventNotification::default());
        dispatcher.dispatch(EventNotification::payload(""));

        assert_eq!(
            *errors.lock().unwrap(),
            vec![DispatchError::EmptyPayload, DispatchError::EmptyPayload]
        );
    }

    #[test]
    fn malformed_payload_reports_decode_error_and_dispatcher_survives() {
        let mut dispatcher = Dispatcher::new();
        let (seen, make) = collector();
        dispatcher.on(EventKind::PairingQrCode, make("qr"));

        let errors: Arc<Mutex<Vec<DispatchError>>> = Arc::default();
        let sink = errors.clone();
        dispatcher.on_error(move |error| sink.lock().unwrap().push(error.clone()));

        dispatcher.dispatch(EventNotification::payload("{not json"));
        dispatcher.dispatch(EventNotification::payload(qr_payload("ABC")));

        assert_eq!(errors.lock().unwrap().len(), 1);
        assert!(matches!(errors.lock().unwrap()[0], DispatchError::Decode(_)));
        assert_eq!(*seen.lock().unwrap(), vec!["qr"]);
    }

    #[test]
    fn unknown_tag_routes_to_other_handlers() {
        let mut dispatcher = Dispatcher::new();
        let (seen, make) = collector();
        dispatcher.on(EventKind::Other, make("other"));

        dispatcher.dispatch(EventNotification::payload(r#"{"type":"CallOffer"}"#));

        assert_eq!(*seen.lock().unwrap(), vec!["other"]);
    }

    #[test]
    fn multiple_error_handlers_all_run() {
        let mut dispatcher = Dispatcher::new();
        let errors: Arc<Mutex<Vec<&'static str>>> = Arc::default();
        for label in ["a", "b"] {
            let sink = errors.clone();
            dispatcher.on_error(move |_error| sink.lock().unwrap().push(label));
        }

        dispatcher.dispatch(EventNotification::default());

        assert_eq!(*errors.lock().unwrap(), vec!["a", "b"]);
    }
}
