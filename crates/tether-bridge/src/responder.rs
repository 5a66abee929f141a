//! Stock event handlers.
//!
//! Deployments of this bridge want two things from events out of the box:
//! answering `"ping"` messages with `"pong!"` so operators can check
//! liveness end to end, and surfacing pairing codes for out-of-band
//! scanning. Both are ordinary dispatcher subscriptions; nothing here has
//! access the application's own handlers would not have.

use std::sync::Arc;

use tether_core::{Dispatcher, Event, EventKind, HandlerResult};

use crate::engine::Engine;

/// Register a handler that answers `"ping"` messages with `"pong!"`.
///
/// Matching is trimmed and case-insensitive. The reply goes to the
/// originating chat through [`Engine::send_message`], spawned so dispatch
/// never blocks on the engine. A failed send is logged and dropped; the
/// bridge does not retry.
pub fn install_ping_responder<E: Engine>(dispatcher: &mut Dispatcher, engine: Arc<E>) {
    dispatcher.on(EventKind::Message, move |event: &Event| -> HandlerResult {
        let Event::Message { info, text: Some(text) } = event else {
            return Ok(());
        };
        if !is_ping(text) {
            return Ok(());
        }
        let engine = Arc::clone(&engine);
        let chat = info.source.chat.to_string();
        tokio::spawn(async move {
            match engine.send_message(&chat, "pong!").await {
                Ok(id) => tracing::debug!(%chat, %id, "sent pong"),
                Err(error) => tracing::warn!(%chat, %error, "pong reply failed"),
            }
        });
        Ok(())
    });
}

/// Register a handler that logs pairing codes for out-of-band scanning.
pub fn install_pairing_logger(dispatcher: &mut Dispatcher) {
    dispatcher.on(EventKind::PairingQrCode, |event: &Event| -> HandlerResult {
        if let Event::PairingQrCode { code, timeout } = event {
            tracing::info!(%code, timeout_secs = timeout.as_secs(), "pairing code ready to scan");
        }
        Ok(())
    });
}

fn is_ping(text: &str) -> bool {
    text.trim().eq_ignore_ascii_case("ping")
}
