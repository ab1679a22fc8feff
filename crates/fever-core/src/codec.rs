//! Compression codec and content-coding negotiation.

use crate::error::{FeverError, Result};
use crate::types::Sizes;
use flate2::write::{GzEncoder, ZlibEncoder};
use flate2::Compression;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::io::Write;

/// Content coding of a persisted artifact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Encoding {
    Gzip,
    Deflate,
    Identity,
}

impl Encoding {
    /// Suffix appended to the fingerprint for this variant's artifact name.
    pub fn suffix(&self) -> &'static str {
        match self {
            Encoding::Gzip => ".gzip",
            Encoding::Deflate => ".deflate",
            Encoding::Identity => "",
        }
    }

    /// Token used in `Content-Encoding` headers.
    pub fn as_str(&self) -> &'static str {
        match self {
            Encoding::Gzip => "gzip",
            Encoding::Deflate => "deflate",
            Encoding::Identity => "identity",
        }
    }

    /// Pick the best variant the client accepts: gzip, then deflate, then raw.
    /// A compressed variant is only eligible when it was actually produced.
    pub fn select(accepted: &[Encoding], sizes: &Sizes) -> Encoding {
        if accepted.contains(&Encoding::Gzip) && sizes.gzip > 0 {
            Encoding::Gzip
        } else if accepted.contains(&Encoding::Deflate) && sizes.deflate > 0 {
            Encoding::Deflate
        } else {
            Encoding::Identity
        }
    }
}

impl fmt::Display for Encoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Parse an `Accept-Encoding` header into the compressed codings it allows.
///
/// Entries with `q=0` are dropped and `*` admits both gzip and deflate.
pub fn parse_accept_encoding(header: &str) -> Vec<Encoding> {
    let mut out = Vec::new();
    for item in header.split(',') {
        let mut parts = item.split(';');
        let token = parts.next().unwrap_or("").trim().to_ascii_lowercase();
        let refused = parts.any(|p| {
            let p = p.trim();
            p.strip_prefix("q=")
                .and_then(|q| q.trim().parse::<f32>().ok())
                .map(|q| q <= 0.0)
                .unwrap_or(false)
        });
        if refused {
            continue;
        }
        let found: &[Encoding] = match token.as_str() {
            "gzip" | "x-gzip" => &[Encoding::Gzip],
            "deflate" => &[Encoding::Deflate],
            "*" => &[Encoding::Gzip, Encoding::Deflate],
            _ => &[],
        };
        for enc in found {
            if !out.contains(enc) {
                out.push(*enc);
            }
        }
    }
    out
}

pub fn gzip(data: &[u8]) -> Result<Vec<u8>> {
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    let fail = |e: std::io::Error| FeverError::Compression { encoding: "gzip", reason: e.to_string() };
    encoder.write_all(data).map_err(fail)?;
    encoder.finish().map_err(fail)
}

/// zlib-wrapped deflate, which is what HTTP's `deflate` coding means.
pub fn deflate(data: &[u8]) -> Result<Vec<u8>> {
    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
    let fail = |e: std::io::Error| FeverError::Compression { encoding: "deflate", reason: e.to_string() };
    encoder.write_all(data).map_err(fail)?;
    encoder.finish().map_err(fail)
}

/// Store path of an artifact: `<directory>/<fingerprint><suffix>`.
pub fn artifact_path(directory: &str, fingerprint: &str, encoding: Encoding) -> String {
    let dir = directory.trim_end_matches('/');
    if dir.is_empty() {
        format!("{fingerprint}{}", encoding.suffix())
    } else {
        format!("{dir}/{fingerprint}{}", encoding.suffix())
    }
}
