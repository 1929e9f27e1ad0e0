use proptest::prelude::*;
use wire::cipher::{decrypt, encrypt, KEY};

proptest! {
    #[test]
    fn prop_decrypt_inverts_encrypt(data in prop::collection::vec(any::<u8>(), 0..512)) {
        let mut buf = data.clone();
        encrypt(&mut buf);
        decrypt(&mut buf);
        prop_assert_eq!(buf, data);
    }

    #[test]
    fn prop_encrypt_inverts_decrypt(data in prop::collection::vec(any::<u8>(), 0..512)) {
        let mut buf = data.clone();
        decrypt(&mut buf);
        encrypt(&mut buf);
        prop_assert_eq!(buf, data);
    }

    #[test]
    fn prop_single_byte(p in any::<u8>()) {
        let mut buf = [p];
        encrypt(&mut buf);
        prop_assert_eq!(buf[0], p ^ KEY[0]);
    }

    #[test]
    fn prop_each_byte_depends_on_previous_ciphertext(data in prop::collection::vec(any::<u8>(), 2..64)) {
        let mut cipher = data.clone();
        encrypt(&mut cipher);
        for i in 1..data.len() {
            prop_assert_eq!(cipher[i], data[i] ^ cipher[i - 1] ^ KEY[i % 16]);
        }
    }
}
