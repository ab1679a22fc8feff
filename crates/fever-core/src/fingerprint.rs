//! Content fingerprints.
//!
//! A fingerprint is the lowercase hex MD5 digest of the ordered concatenation
//! of every fragment's bytes. Feeding the fragments one by one into the
//! digest is equivalent to hashing the concatenated buffer.

/// Fingerprint a single buffer.
pub fn fingerprint(data: &[u8]) -> String {
    format!("{:x}", md5::compute(data))
}

/// Fingerprint an ordered list of buffers as if they were concatenated.
///
/// An empty list yields the empty string rather than the digest of zero bytes.
pub fn fingerprint_parts<I, B>(parts: I) -> String
where
    I: IntoIterator<Item = B>,
    B: AsRef<[u8]>,
{
    let mut ctx = md5::Context::new();
    let mut seen = false;
    for part in parts {
        ctx.consume(part.as_ref());
        seen = true;
    }
    if !seen {
        return String::new();
    }
    format!("{:x}", ctx.compute())
}
