#![no_main]

use libfuzzer_sys::fuzz_target;
use once_cell::sync::Lazy;
use secretmint_envelope::{Address, OneTimeKey};

static SEED: Lazy<Address> = Lazy::new(|| OneTimeKey::generate().into_address());

fuzz_target!(|data: &[u8]| {
    let Ok(envelope) = core::str::from_utf8(data) else {
        return;
    };

    let _ = secretmint_envelope::inspect(envelope);
    let _ = secretmint_envelope::decrypt_secret(envelope, &SEED);
});
