#![no_main]

use bytestream::ByteReader;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let mut reader = ByteReader::new(data);
    let mut idx = 0usize;

    // Input bytes drive a bounded sequence of cursor operations.
    while idx < data.len() && idx < 1024 {
        let op = data[idx] % 8;
        let arg = usize::from(data[idx].wrapping_mul(31));
        idx += 1;

        match op {
            0 => {
                let _ = reader.read::<u32>();
            }
            1 => {
                let _ = reader.read::<u64>();
            }
            2 => {
                let _ = reader.align(1 << (arg % 5));
            }
            3 => {
                let _ = reader.read_wstring_at(arg);
            }
            4 => {
                let _ = reader.read_astring();
            }
            5 => {
                if let Ok(child) = reader.with_offset(arg) {
                    reader = child;
                }
            }
            6 => {
                if let Ok(limited) = reader.clone().with_limit(arg) {
                    reader = limited;
                }
            }
            _ => {
                let _ = reader.jump_back(arg, |r| r.read_array::<u16>(arg % 16));
            }
        }
    }
});
