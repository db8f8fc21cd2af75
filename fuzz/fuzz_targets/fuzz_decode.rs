#![no_main]

use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if let Ok(descriptor) = imghdr::decode_bytes(data) {
        assert!(descriptor.width() > 0.0 && descriptor.height() > 0.0);
    }
});
