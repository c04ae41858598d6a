use sha2::{Digest, Sha256};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

pub const UID_LEN: usize = 16;

static SEQ: AtomicU64 = AtomicU64::new(0);

pub fn sha256_hex(s: &str) -> String {
    let mut h = Sha256::new();
    h.update(s.as_bytes());
    hex::encode(h.finalize())
}

/// 16 lowercase hex chars, unique per process and call.
pub fn new_uid() -> String {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos())
        .unwrap_or_default();
    let seq = SEQ.fetch_add(1, Ordering::Relaxed);
    let seed = format!("{}:{}:{}", nanos, std::process::id(), seq);
    sha256_hex(&seed)[..UID_LEN].to_string()
}
