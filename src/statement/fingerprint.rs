//! Content fingerprints for imported transactions.

/// Creates a stable fingerprint for a transaction from its normalized date
/// text, trimmed description, and amount.
///
/// Two rows with the same date, description, and amount always produce the
/// same fingerprint, no matter which upload or parse path produced them.
/// This is what makes re-uploading the same (or an overlapping) statement
/// safe: the merge skips fingerprints that are already stored.
///
/// The flip side is that two genuinely separate transactions that share all
/// three fields (say, two identical coffees on the same day) collide and
/// only the first one survives an import. The amount is folded in with two
/// decimal places, matching how statement exports print money.
pub fn fingerprint(date: &str, description: &str, amount: f64) -> i64 {
    let canonical = format!("{}|{}|{:.2}", date, description.trim(), amount);
    let hash_128 = md5::compute(canonical);
    let mut hash_64 = [0; 8];
    hash_64.copy_from_slice(&hash_128[0..8]);
    i64::from_le_bytes(hash_64)
}
