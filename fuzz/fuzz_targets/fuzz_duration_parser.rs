#![no_main]

use std::time::Duration;

use libfuzzer_sys::fuzz_target;
use phaseloop::config::{format_duration, parse_duration};

fuzz_target!(|data: &[u8]| {
    if let Ok(input) = std::str::from_utf8(data) {
        if let Ok(duration) = parse_duration(input) {
            let formatted = format_duration(duration);
            // Near Duration::MAX the f64 round trip is lossy.
            if duration < Duration::from_secs(1 << 40) {
                assert!(parse_duration(&formatted).is_ok(), "{formatted}");
            }
        }
    }
});
