#![no_main]

#[path = "../support/capture.rs"]
mod capture;

use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let result = std::panic::catch_unwind(|| {
        if let Ok(expr) = std::str::from_utf8(data) {
            let _ = compreq::parse_call_method_name(expr);
        }
    });

    if result.is_err() {
        capture::record_panic("call_method_parse", data);
    }
});
