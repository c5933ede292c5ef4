#![no_main]

#[path = "../support/capture.rs"]
mod capture;

use compreq::{ComponentRequest, InboundRequest, KeyedChecksum};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let result = std::panic::catch_unwind(|| {
        let request = InboundRequest::json("/fuzz", data.to_vec());
        let _ = ComponentRequest::new(&request, "fuzz", &KeyedChecksum::sha256("fuzz"));
    });

    if result.is_err() {
        capture::record_panic("body_decode", data);
    }
});
