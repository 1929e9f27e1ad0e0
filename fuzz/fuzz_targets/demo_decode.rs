#![no_main]

use codec::{decode, encode, CodecConfig};
use demo_formats::{Mot, Motlist, Msg};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let config = CodecConfig::for_testing();

    // Re-encode whatever decodes to exercise the write path.
    if let Ok(msg) = decode::<Msg>(data, &config) {
        let _ = encode(&msg, &config);
    }
    if let Ok(list) = decode::<Motlist>(data, &config) {
        let _ = encode(&list, &config);
    }
    let _ = decode::<Mot>(data, &config);
});
