#![no_main]

use libfuzzer_sys::fuzz_target;
use redis_driver_client::Config;

fuzz_target!(|data: &[u8]| {
    // Fuzz URL parsing: arbitrary input must parse or error, never panic.
    if let Ok(url) = std::str::from_utf8(data) {
        let _ = Config::from_url(url);
    }
});
