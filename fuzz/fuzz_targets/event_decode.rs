//! Fuzzer for event notification decoding.
//!
//! The dispatcher promises that malformed payloads are reported, never
//! raised: `Event::decode` must not panic on any input, and every error
//! must carry the raw payload back verbatim for diagnosis.

#![no_main]

use libfuzzer_sys::fuzz_target;
use tether_core::{DecodeError, Event};

fuzz_target!(|data: &[u8]| {
    let Ok(payload) = std::str::from_utf8(data) else {
        return;
    };

    match Event::decode(payload) {
        Ok(event) => {
            // kind() must be total over every decodable payload.
            let _ = event.kind();
        },
        Err(
            DecodeError::Syntax { raw, .. }
            | DecodeError::MissingTag { raw }
            | DecodeError::Payload { raw, .. },
        ) => {
            assert_eq!(raw, payload);
        },
    }
});
