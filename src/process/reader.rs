// src/process/reader.rs

use anyhow::{Context, Result};
use std::{
    collections::HashMap,
    fmt, fs,
    io::Cursor,
    path::{Path, PathBuf},
};
use tracing::{debug, info, instrument};

/// Field delimiter of the export format.
pub const DELIMITER: u8 = b'\t';

/// One source line keyed by header name. Trailing columns missing from a
/// short line are simply absent.
pub type RawRow = HashMap<String, String>;

/// Text encodings the export is known to arrive in.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TextEncoding {
    /// UTF-16 with byte-order mark sniffing, little-endian when there is none.
    Utf16,
    Utf16Le,
    Utf8,
    Latin1,
}

/// Tried in order; the first one that yields a header plus a data row wins.
pub const CANDIDATE_ENCODINGS: [TextEncoding; 4] = [
    TextEncoding::Utf16,
    TextEncoding::Utf16Le,
    TextEncoding::Utf8,
    TextEncoding::Latin1,
];

impl TextEncoding {
    pub fn as_str(&self) -> &str {
        match self {
            TextEncoding::Utf16 => "utf-16",
            TextEncoding::Utf16Le => "utf-16-le",
            TextEncoding::Utf8 => "utf-8",
            TextEncoding::Latin1 => "latin-1",
        }
    }

    /// Strict decode: `None` on any malformed input.
    pub fn decode(&self, bytes: &[u8]) -> Option<String> {
        let text = match self {
            TextEncoding::Utf16 => match bytes {
                [0xFF, 0xFE, rest @ ..] => decode_utf16(rest, false)?,
                [0xFE, 0xFF, rest @ ..] => decode_utf16(rest, true)?,
                _ => decode_utf16(bytes, false)?,
            },
            TextEncoding::Utf16Le => decode_utf16(bytes, false)?,
            TextEncoding::Utf8 => std::str::from_utf8(bytes).ok()?.to_string(),
            TextEncoding::Latin1 => bytes.iter().map(|&b| char::from(b)).collect(),
        };
        Some(text.trim_start_matches('\u{feff}').to_string())
    }
}

impl fmt::Display for TextEncoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

fn decode_utf16(bytes: &[u8], big_endian: bool) -> Option<String> {
    if bytes.len() % 2 != 0 {
        return None;
    }
    let units = bytes.chunks_exact(2).map(|pair| {
        if big_endian {
            u16::from_be_bytes([pair[0], pair[1]])
        } else {
            u16::from_le_bytes([pair[0], pair[1]])
        }
    });
    char::decode_utf16(units).collect::<Result<String, _>>().ok()
}

/// Conditions that stop a run before any remote call is made.
#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    #[error("source file {} does not exist", .0.display())]
    Missing(PathBuf),

    #[error("could not decode {} as any of {tried:?}", .path.display())]
    Decoding {
        path: PathBuf,
        tried: Vec<TextEncoding>,
    },
}

fn reader_builder() -> csv::ReaderBuilder {
    let mut builder = csv::ReaderBuilder::new();
    builder
        .delimiter(DELIMITER)
        .quote(b'"')
        .has_headers(true)
        .flexible(true);
    builder
}

/// True when `text` holds a non-empty header and at least one data row.
fn parses_as_table(text: &str) -> bool {
    let mut rdr = reader_builder().from_reader(text.as_bytes());
    let has_header = rdr.headers().map(|h| !h.is_empty()).unwrap_or(false);
    has_header && matches!(rdr.records().next(), Some(Ok(_)))
}

/// Single-pass stream of rows from a decoded export.
pub struct RawRows {
    encoding: TextEncoding,
    headers: Vec<String>,
    records: csv::StringRecordsIntoIter<Cursor<String>>,
}

impl RawRows {
    fn new(encoding: TextEncoding, text: String) -> Result<Self> {
        let mut rdr = reader_builder().from_reader(Cursor::new(text));
        let headers = rdr
            .headers()
            .context("reading header line")?
            .iter()
            .map(|h| h.trim().to_string())
            .collect();
        Ok(Self {
            encoding,
            headers,
            records: rdr.into_records(),
        })
    }

    pub fn encoding(&self) -> TextEncoding {
        self.encoding
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }
}

impl Iterator for RawRows {
    type Item = Result<RawRow>;

    fn next(&mut self) -> Option<Self::Item> {
        let record = self.records.next()?;
        Some(
            record
                .map(|rec| {
                    self.headers
                        .iter()
                        .zip(rec.iter())
                        .map(|(h, v)| (h.clone(), v.to_string()))
                        .collect()
                })
                .context("reading source row"),
        )
    }
}

/// Open the export at `path`, picking the first candidate encoding under
/// which it parses as a table.
#[instrument(level = "info", skip(path), fields(source = %path.as_ref().display()))]
pub fn open_source(path: impl AsRef<Path>) -> Result<RawRows> {
    let path = path.as_ref();
    if !path.is_file() {
        return Err(SourceError::Missing(path.to_path_buf()).into());
    }
    let bytes = fs::read(path).with_context(|| format!("reading {}", path.display()))?;

    for encoding in CANDIDATE_ENCODINGS {
        let Some(text) = encoding.decode(&bytes) else {
            debug!(%encoding, "decode failed");
            continue;
        };
        if !parses_as_table(&text) {
            debug!(%encoding, "no header + data row");
            continue;
        }
        info!(%encoding, bytes = bytes.len(), "source decoded");
        return RawRows::new(encoding, text);
    }

    Err(SourceError::Decoding {
        path: path.to_path_buf(),
        tried: CANDIDATE_ENCODINGS.to_vec(),
    }
    .into())
}
