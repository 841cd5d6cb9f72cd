#![no_main]

use bytes::BytesMut;
use libfuzzer_sys::fuzz_target;
use resp_protocol::Value;

fuzz_target!(|data: &[u8]| {
    // Fuzz the incremental reply decoder: arbitrary bytes must never panic,
    // and whatever decodes must re-encode without panicking either.
    let mut buf = BytesMut::from(data);
    while let Ok(Some(value)) = Value::decode(&mut buf) {
        let mut out = BytesMut::new();
        value.encode(&mut out);
    }
});
