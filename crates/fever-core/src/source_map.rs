//! Source Map v3 synthesis for concatenated artifacts.
//!
//! Every generated line gets one segment pointing at column 0 of the fragment
//! line it came from. Concatenation never rewrites columns, so that is enough
//! to resolve any position in the artifact.

use crate::error::Result;
use serde::{Deserialize, Serialize};

const BASE64: &[u8; 64] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789+/";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceMap {
    pub version: u8,
    /// Fingerprint of the artifact this map describes.
    pub file: String,
    pub sources: Vec<String>,
    pub sources_content: Vec<String>,
    pub names: Vec<String>,
    pub mappings: String,
}

impl SourceMap {
    /// Build a map for `fragments` (path, content) concatenated in order.
    ///
    /// A path listed twice is recorded once, at its first position.
    pub fn generate<'a, I>(file: impl Into<String>, fragments: I) -> Self
    where
        I: IntoIterator<Item = (&'a str, &'a [u8])>,
    {
        let mut sources: Vec<String> = Vec::new();
        let mut sources_content: Vec<String> = Vec::new();
        let mut builder = MappingsBuilder::default();

        for (path, content) in fragments {
            let index = match sources.iter().position(|s| s == path) {
                Some(i) => i,
                None => {
                    sources.push(path.to_string());
                    sources_content.push(String::from_utf8_lossy(content).into_owned());
                    sources.len() - 1
                }
            };
            builder.append(index as i64, content);
        }

        Self {
            version: 3,
            file: file.into(),
            sources,
            sources_content,
            names: Vec::new(),
            mappings: builder.finish(),
        }
    }

    /// Original content recorded for `path`.
    pub fn source_content(&self, path: &str) -> Option<&str> {
        self.sources
            .iter()
            .position(|s| s == path)
            .and_then(|i| self.sources_content.get(i))
            .map(String::as_str)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}

#[derive(Default)]
struct MappingsBuilder {
    out: String,
    // Generated position of the next byte.
    gen_col: i64,
    line_has_segment: bool,
    // Previous segment, for relative encoding.
    prev_gen_col: i64,
    prev_source: i64,
    prev_line: i64,
}

impl MappingsBuilder {
    fn append(&mut self, source: i64, content: &[u8]) {
        let text = String::from_utf8_lossy(content);
        let mut pieces = text.split('\n').peekable();
        let mut src_line = 0i64;
        while let Some(piece) = pieces.next() {
            let last = pieces.peek().is_none();
            if !(last && piece.is_empty()) {
                self.segment(source, src_line);
            }
            if last {
                self.gen_col += piece.encode_utf16().count() as i64;
            } else {
                self.out.push(';');
                self.gen_col = 0;
                self.prev_gen_col = 0;
                self.line_has_segment = false;
                src_line += 1;
            }
        }
    }

    fn segment(&mut self, source: i64, src_line: i64) {
        if self.line_has_segment {
            self.out.push(',');
        }
        encode_vlq(&mut self.out, self.gen_col - self.prev_gen_col);
        encode_vlq(&mut self.out, source - self.prev_source);
        encode_vlq(&mut self.out, src_line - self.prev_line);
        encode_vlq(&mut self.out, 0);
        self.prev_gen_col = self.gen_col;
        self.prev_source = source;
        self.prev_line = src_line;
        self.line_has_segment = true;
    }

    fn finish(self) -> String {
        self.out
    }
}

fn encode_vlq(out: &mut String, value: i64) {
    let mut vlq = if value < 0 { ((-value) << 1) | 1 } else { value << 1 };
    loop {
        let mut digit = (vlq & 0b11111) as usize;
        vlq >>= 5;
        if vlq > 0 {
            digit |= 0b100000;
        }
        out.push(BASE64[digit] as char);
        if vlq == 0 {
            break;
        }
    }
}
