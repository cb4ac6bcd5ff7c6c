use rand::Rng;

pub const ID_LENGTH: usize = 8;

const ALPHABET: &[u8; 64] = b"useandom-26T198340PX75pxJACKVERYMINDBUSHWOLF_GQZbfghjklqvwyzrict";

/// Returns a fresh record id drawn from the thread-local RNG.
///
/// No check is made against ids already in use; with 64^8 possible values a
/// collision is negligible for the collection sizes this service holds.
pub fn generate() -> String {
    generate_with(&mut rand::rng())
}

pub fn generate_with<R: Rng>(rng: &mut R) -> String {
    (0..ID_LENGTH)
        .map(|_| ALPHABET[rng.random_range(0..ALPHABET.len())] as char)
        .collect()
}
