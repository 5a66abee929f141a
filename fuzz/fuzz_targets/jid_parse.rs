//! Fuzzer for JID parsing.
//!
//! Parsing must never panic, and every accepted identifier must
//! round-trip through its canonical text form.

#![no_main]

use libfuzzer_sys::fuzz_target;
use tether_core::Jid;

fuzz_target!(|data: &[u8]| {
    let Ok(text) = std::str::from_utf8(data) else {
        return;
    };

    if let Ok(jid) = text.parse::<Jid>() {
        let canonical = jid.to_string();
        let reparsed = canonical.parse::<Jid>().expect("canonical form must reparse");
        assert_eq!(jid, reparsed);
    }
});
