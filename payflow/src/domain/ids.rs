//! Identifier generators for records and mock gateway payloads.

use rand::Rng;

/// Opaque transaction identifier.
pub fn transaction_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

/// Uppercase alphanumeric reference, M-Pesa receipt style (ex. `9F3A1C77B2`).
pub fn receipt(len: usize) -> String {
    let mut out = String::with_capacity(len);
    while out.len() < len {
        let chunk = uuid::Uuid::new_v4().simple().to_string().to_uppercase();
        out.push_str(&chunk[..chunk.len().min(len - out.len())]);
    }
    out
}

/// A string of `len` random decimal digits.
pub fn digits(len: usize) -> String {
    let mut rng = rand::rng();
    (0..len)
        .map(|_| char::from(b'0' + rng.random_range(0..10u8)))
        .collect()
}

/// Daraja-style request id (ex. `29115-34620561-1`).
pub fn request_id() -> String {
    format!("{}-{}-1", digits(5), digits(8))
}
