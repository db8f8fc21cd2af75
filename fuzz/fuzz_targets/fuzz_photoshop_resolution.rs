#![no_main]

use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let _ = imghdr::formats::jpeg::photoshop_resolution(data);
});
