#![no_main]

#[path = "../support/capture.rs"]
mod capture;

use compreq::{PathTreeBuilder, Value};
use libfuzzer_sys::fuzz_target;

const MAX_FUZZ_INDEX: usize = 64;

// One form key per line; the value is the line number so leaf conflicts
// stay observable.
fuzz_target!(|data: &[u8]| {
    let result = std::panic::catch_unwind(|| {
        let Ok(text) = std::str::from_utf8(data) else {
            return;
        };
        let fields: Vec<(String, Value)> = text
            .lines()
            .enumerate()
            .map(|(line, key)| (key.to_string(), Value::Int(line as i64)))
            .collect();
        let _ = PathTreeBuilder::default()
            .with_max_index(MAX_FUZZ_INDEX)
            .build(&fields);
    });

    if result.is_err() {
        capture::record_panic("path_tree", data);
    }
});
