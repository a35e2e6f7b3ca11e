//! Bencoded `.torrent` fixtures.
//!
//! Encoders here write dictionary keys in sorted order, so `encode_info` reproduces the
//! exact span a parser must hash.

/// Builder for a single-file torrent.
#[derive(Debug, Clone)]
pub struct MetainfoFixture {
    name: String,
    pieces: usize,
    piece_length: u64,
    private: bool,
    comment: Option<String>,
    announce: String,
}

impl MetainfoFixture {
    /// Start a fixture with one piece and a public tracker.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            pieces: 1,
            piece_length: 16_384,
            private: false,
            comment: None,
            announce: "http://tracker.example/announce".to_string(),
        }
    }

    /// Set the number of pieces.
    #[must_use]
    pub const fn pieces(mut self, pieces: usize) -> Self {
        self.pieces = pieces;
        self
    }

    /// Set the private flag.
    #[must_use]
    pub const fn private(mut self, private: bool) -> Self {
        self.private = private;
        self
    }

    /// Add a top-level comment.
    #[must_use]
    pub fn comment(mut self, comment: impl Into<String>) -> Self {
        self.comment = Some(comment.into());
        self
    }

    /// Override the announce URL.
    #[must_use]
    pub fn announce(mut self, announce: impl Into<String>) -> Self {
        self.announce = announce.into();
        self
    }

    /// Encode only the `info` dictionary.
    #[must_use]
    pub fn encode_info(&self) -> Vec<u8> {
        let mut out = Vec::new();
        out.push(b'd');
        push_str(&mut out, "length");
        push_int(&mut out, self.piece_length * self.pieces as u64);
        push_str(&mut out, "name");
        push_str(&mut out, &self.name);
        push_str(&mut out, "piece length");
        push_int(&mut out, self.piece_length);
        push_str(&mut out, "pieces");
        push_bytes(&mut out, &piece_table(&self.name, self.pieces));
        if self.private {
            push_str(&mut out, "private");
            push_int(&mut out, 1);
        }
        out.push(b'e');
        out
    }

    /// Encode the full metainfo document.
    #[must_use]
    pub fn encode(&self) -> Vec<u8> {
        let mut out = Vec::new();
        out.push(b'd');
        push_str(&mut out, "announce");
        push_str(&mut out, &self.announce);
        if let Some(comment) = &self.comment {
            push_str(&mut out, "comment");
            push_str(&mut out, comment);
        }
        push_str(&mut out, "info");
        out.extend_from_slice(&self.encode_info());
        out.push(b'e');
        out
    }
}

/// A two-file torrent named `album` with file lengths 100 and 200.
#[must_use]
pub fn multi_file_metainfo() -> Vec<u8> {
    let mut info = Vec::new();
    info.push(b'd');
    push_str(&mut info, "files");
    info.push(b'l');
    for (length, file) in [(100, "one.flac"), (200, "two.flac")] {
        info.push(b'd');
        push_str(&mut info, "length");
        push_int(&mut info, length);
        push_str(&mut info, "path");
        info.push(b'l');
        push_str(&mut info, "disc1");
        push_str(&mut info, file);
        info.push(b'e');
        info.push(b'e');
    }
    info.push(b'e');
    push_str(&mut info, "name");
    push_str(&mut info, "album");
    push_str(&mut info, "piece length");
    push_int(&mut info, 256);
    push_str(&mut info, "pieces");
    push_bytes(&mut info, &piece_table("album", 2));
    info.push(b'e');

    let mut out = Vec::new();
    out.push(b'd');
    push_str(&mut out, "announce-list");
    out.extend_from_slice(b"ll");
    push_str(&mut out, "udp://tracker.example:6969");
    out.extend_from_slice(b"ee");
    push_str(&mut out, "info");
    out.extend_from_slice(&info);
    out.push(b'e');
    out
}

fn piece_table(seed: &str, pieces: usize) -> Vec<u8> {
    let seed = seed.bytes().fold(0u8, u8::wrapping_add);
    (0..pieces * 20)
        .map(|index| seed.wrapping_add(u8::try_from(index % 251).unwrap_or_default()))
        .collect()
}

fn push_str(out: &mut Vec<u8>, value: &str) {
    push_bytes(out, value.as_bytes());
}

fn push_bytes(out: &mut Vec<u8>, value: &[u8]) {
    out.extend_from_slice(value.len().to_string().as_bytes());
    out.push(b':');
    out.extend_from_slice(value);
}

fn push_int(out: &mut Vec<u8>, value: u64) {
    out.push(b'i');
    out.extend_from_slice(value.to_string().as_bytes());
    out.push(b'e');
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn full_document_embeds_info_span_verbatim() {
        let fixture = MetainfoFixture::new("sample").pieces(2);
        let info = fixture.encode_info();
        let full = fixture.encode();
        assert!(full.windows(info.len()).any(|window| window == info.as_slice()));
        assert!(full.starts_with(b"d8:announce"));
    }

    #[test]
    fn distinct_names_produce_distinct_piece_tables() {
        assert_ne!(piece_table("a", 1), piece_table("b", 1));
        assert_eq!(piece_table("a", 3).len(), 60);
    }
}
