use rand::Rng;

/// Builds a readable payload for the `i`-th record.
pub(crate) fn payload(i: u64) -> Vec<u8> {
    format!("record-{:04}", i).into_bytes()
}

/// Builds `n` payloads of random bytes, each at most `max_len` bytes long.
///
/// Lengths are drawn from `0..=max_len`.
pub(crate) fn random_payloads(n: usize, max_len: usize) -> Vec<Vec<u8>> {
    let mut rng = rand::rng();

    (0..n)
        .map(|_| {
            let len = rng.random_range(0..=max_len);
            let mut b = vec![0u8; len];
            rng.fill(&mut b[..]);
            b
        })
        .collect()
}
