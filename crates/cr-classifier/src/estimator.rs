//! Token estimator — a deliberately coarse, allocation-free approximation
//! used on the hot path to bucket prompts before any real tokenizer is
//! warranted.

/// `ceil(byte_len / 4)`. No error conditions; every `&str` has a defined
/// byte length.
#[inline]
pub fn estimate_tokens(text: &str) -> u64 {
    let len = text.len() as u64;
    (len + 3) / 4
}
