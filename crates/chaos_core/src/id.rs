use rand::Rng;
use uuid::Uuid;

/// Session id drawn from the session's own RNG, so a debug seed reproduces it.
pub fn session_uuid(rng: &mut impl Rng) -> Uuid {
    let bytes: [u8; 16] = rng.gen();
    uuid::Builder::from_random_bytes(bytes).into_uuid()
}
