//! Shared utility functions for esim-cloud

use md5::{Digest, Md5};
use rand::Rng;

pub fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

/// `ESIM` + Unix seconds + three random digits
pub fn generate_order_number() -> String {
    let suffix: u16 = rand::thread_rng().gen_range(0..1000);
    format!("ESIM{}{:03}", chrono::Utc::now().timestamp(), suffix)
}

/// Lowercase hex MD5 digest (both partner protocols sign with it)
pub fn md5_hex(input: &str) -> String {
    hex::encode(Md5::digest(input.as_bytes()))
}
