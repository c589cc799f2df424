//! Human-readable description of what khef does to a file

use std::fmt::Write;
use std::path::Path;

use crate::cipher::{NONCE_LEN, TAG_LEN};
use crate::config::Config;
use crate::container::{MAGIC, MIN_CONTAINER_LEN, VERSION};
use crate::kdf::{KEY_LEN, KdfParams, SALT_LEN};

pub fn report(config: &Config, config_path: Option<&Path>) -> String {
    let kdf = KdfParams::default();
    let mut out = String::new();

    // Writing to a String cannot fail.
    let _ = writeln!(out, "khef {}", env!("CARGO_PKG_VERSION"));
    let _ = writeln!(
        out,
        "key derivation: scrypt (N=2^{}, r={}, p={}), {}-byte key",
        kdf.log_n, kdf.r, kdf.p, KEY_LEN
    );
    let _ = writeln!(out, "cipher: XSalsa20-Poly1305 (NaCl secretbox, detached tag)");
    let _ = writeln!(
        out,
        "container v{}: {} | version[1] | salt[{}] | nonce[{}] | ciphertext[n] | tag[{}]",
        VERSION,
        String::from_utf8_lossy(MAGIC),
        SALT_LEN,
        NONCE_LEN,
        TAG_LEN
    );
    let _ = writeln!(out, "overhead: {} bytes", MIN_CONTAINER_LEN);
    let _ = writeln!(out, "extension: .{}", config.output.extension);
    match config_path {
        Some(path) => {
            let _ = writeln!(out, "config: {}", path.display());
        }
        None => {
            let _ = writeln!(out, "config: (unresolved)");
        }
    }
    out
}
