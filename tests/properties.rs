//! Property tests for the encryption core, run against the in-memory
//! boundary with cheap scrypt parameters.

use std::path::Path;

use khef::boundary::MemoryBoundary;
use khef::container::{Container, MIN_CONTAINER_LEN};
use khef::kdf::KdfParams;
use khef::workflow::{DecryptionWorkflow, EncryptionWorkflow, decrypt_bytes, encrypt_bytes};
use proptest::prelude::*;

const FAST: KdfParams = KdfParams::insecure_fast();

fn encrypt(seed: u64, passphrase: &[u8], plaintext: &[u8]) -> Vec<u8> {
    let mut mem = MemoryBoundary::with_seed(seed);
    encrypt_bytes(&mut mem, passphrase, plaintext, &FAST).unwrap()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn roundtrip(
        plaintext in prop::collection::vec(any::<u8>(), 0..2048),
        passphrase in prop::collection::vec(any::<u8>(), 0..64),
        seed in any::<u64>(),
    ) {
        let encoded = encrypt(seed, &passphrase, &plaintext);
        prop_assert_eq!(encoded.len(), MIN_CONTAINER_LEN + plaintext.len());
        let decrypted = decrypt_bytes(&passphrase, &encoded, &FAST).unwrap();
        prop_assert_eq!(&decrypted[..], &plaintext[..]);
    }

    #[test]
    fn single_byte_flip_fails_authentication(
        plaintext in prop::collection::vec(any::<u8>(), 0..512),
        seed in any::<u64>(),
        position in any::<prop::sample::Index>(),
        mask in 1u8..=255,
    ) {
        let mut encoded = encrypt(seed, b"pass", &plaintext);
        // Everything after magic and version: salt, nonce, ciphertext, tag.
        let pos = 5 + position.index(encoded.len() - 5);
        encoded[pos] ^= mask;

        let err = decrypt_bytes(b"pass", &encoded, &FAST).unwrap_err();
        prop_assert!(err.is_authentication_failure(), "flip at {} gave {:?}", pos, err.kind);
    }

    #[test]
    fn wrong_passphrase_fails_authentication(
        plaintext in prop::collection::vec(any::<u8>(), 0..256),
        q1 in prop::collection::vec(any::<u8>(), 0..32),
        q2 in prop::collection::vec(any::<u8>(), 0..32),
        seed in any::<u64>(),
    ) {
        prop_assume!(q1 != q2);
        let encoded = encrypt(seed, &q1, &plaintext);
        let err = decrypt_bytes(&q2, &encoded, &FAST).unwrap_err();
        prop_assert!(err.is_authentication_failure());
    }

    #[test]
    fn truncation_never_yields_plaintext(
        plaintext in prop::collection::vec(any::<u8>(), 0..256),
        cut in any::<prop::sample::Index>(),
    ) {
        let encoded = encrypt(0, b"pass", &plaintext);
        let len = cut.index(encoded.len());
        let err = decrypt_bytes(b"pass", &encoded[..len], &FAST).unwrap_err();
        prop_assert!(err.is_format_error() || err.is_authentication_failure());
        if len < MIN_CONTAINER_LEN {
            prop_assert!(err.is_format_error());
        }
    }

    #[test]
    fn arbitrary_bytes_never_panic(data in prop::collection::vec(any::<u8>(), 0..256)) {
        let _ = Container::decode(&data);
        prop_assert!(decrypt_bytes(b"pass", &data, &FAST).is_err());
    }
}

#[test]
fn repeated_encryptions_differ() {
    let mut mem = MemoryBoundary::with_seed(99);
    mem.insert_file("plain", b"same plaintext, same passphrase".to_vec());

    for dest in ["one.khef", "two.khef"] {
        mem.push_passphrase(b"correct horse");
        EncryptionWorkflow::new(&mut mem)
            .kdf_params(FAST)
            .run(Path::new("plain"), Path::new(dest))
            .unwrap();
    }

    let one = Container::decode(mem.file("one.khef").unwrap()).unwrap();
    let two = Container::decode(mem.file("two.khef").unwrap()).unwrap();
    assert_ne!(one.salt, two.salt);
    assert_ne!(one.nonce, two.nonce);
    assert_ne!(one.ciphertext, two.ciphertext);

    for (src, dest) in [("one.khef", "one.txt"), ("two.khef", "two.txt")] {
        mem.push_passphrase(b"correct horse");
        DecryptionWorkflow::new(&mut mem)
            .kdf_params(FAST)
            .run(Path::new(src), Path::new(dest))
            .unwrap();
        assert_eq!(mem.file(dest), Some(&b"same plaintext, same passphrase"[..]));
    }
}
