use xxhash_rust::xxh3::xxh3_64;

/// Stable content hash, used for entity tags of built assets.
///
/// Hashes must be stable across runs, machines and platforms since clients keep them between
/// requests.
pub fn hash_bytes(s: &[u8]) -> String {
  let res = xxh3_64(s);
  format!("{:016x}", res)
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn hash_is_stable_and_fixed_width() {
    let hash = hash_bytes(b"body");
    assert_eq!(hash, hash_bytes(b"body"));
    assert_ne!(hash, hash_bytes(b"other body"));
    assert_eq!(hash.len(), 16);
  }
}
