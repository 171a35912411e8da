//! PSV record layout and parsing.
//!
//! A PSV record is a line-oriented text file: a fixed-length header block of
//! `key:"value"` pairs terminated by a `>>>>Begin` sentinel line, followed by
//! three fixed, non-overlapping line ranges holding one sample per line for
//! the VNIR, VIS, and UV channels.
//!
//! All line ranges are properties of the record format, not of any single
//! file, and live together in [`RecordLayout`] so that a format revision is a
//! one-place change.

use std::collections::HashMap;
use std::fs;
use std::num::ParseFloatError;
use std::ops::Range;
use std::path::Path;

use ndarray::Array1;
use thiserror::Error;

/// Sentinel line marking the end of the key/value header section.
pub const HEADER_SENTINEL: &str = ">>>>Begin";

/// Line-range constants of the PSV record format.
///
/// Channel ranges are zero-based line indices into the record; dark ranges
/// are indices into the already-sliced channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordLayout {
    /// Number of leading lines copied verbatim into RAD products.
    pub header_lines: usize,
    /// VNIR channel slice.
    pub vnir: Range<usize>,
    /// VIS channel slice.
    pub vis: Range<usize>,
    /// UV channel slice.
    pub uv: Range<usize>,
    /// Dark (blank) sub-range of the VNIR channel.
    pub vnir_dark: Range<usize>,
    /// Dark sub-range of the VIS channel.
    pub vis_dark: Range<usize>,
    /// Dark sub-range of the UV channel.
    pub uv_dark: Range<usize>,
}

impl RecordLayout {
    /// Flight layout of the mast spectrometer record: 2048 samples per
    /// channel behind a 29-line header.
    pub const MSL: RecordLayout = RecordLayout {
        header_lines: 29,
        vnir: 79..2127,
        vis: 2227..4275,
        uv: 4375..6423,
        vnir_dark: 1816..1832,
        vis_dark: 0..5,
        uv_dark: 0..11,
    };

    /// Samples per record across all three channels.
    pub fn total_samples(&self) -> usize {
        self.vnir.len() + self.vis.len() + self.uv.len()
    }

    /// Minimum number of lines a record must have to cover every slice.
    pub fn min_lines(&self) -> usize {
        self.vnir.end.max(self.vis.end).max(self.uv.end)
    }
}

/// Errors produced while reading a PSV record.
#[derive(Debug, Error)]
pub enum RecordError {
    #[error("i/o error reading record: {0}")]
    Io(#[from] std::io::Error),

    /// The header section ends without the `>>>>Begin` sentinel.
    #[error("header sentinel `{HEADER_SENTINEL}` not found")]
    MissingSentinel,

    /// The record has fewer lines than the layout requires.
    #[error("record has {got} lines, layout requires {expected}")]
    Truncated { expected: usize, got: usize },

    /// A channel line failed to parse as a decimal number.
    #[error("channel sample at line {line} is not a number: {source}")]
    Channel {
        line: usize,
        #[source]
        source: ParseFloatError,
    },
}

/// One parsed PSV record.
///
/// Channel arrays hold raw digital numbers in record order; the header map
/// and the verbatim header block ride alongside so products can copy the
/// original header through unchanged.
#[derive(Debug, Clone)]
pub struct SpectrumRecord {
    /// Key/value pairs of the header section.
    pub headers: HashMap<String, String>,
    /// First `layout.header_lines` lines, verbatim.
    pub header_block: Vec<String>,
    /// VNIR channel samples in DN.
    pub vnir: Array1<f64>,
    /// VIS channel samples in DN.
    pub vis: Array1<f64>,
    /// UV channel samples in DN.
    pub uv: Array1<f64>,
}

impl SpectrumRecord {
    /// Read and parse a record file under the given layout.
    pub fn from_file(path: &Path, layout: &RecordLayout) -> Result<Self, RecordError> {
        let text = fs::read_to_string(path)?;
        Self::parse(&text, layout)
    }

    /// Parse a record from its full text.
    pub fn parse(text: &str, layout: &RecordLayout) -> Result<Self, RecordError> {
        let lines: Vec<&str> = text.lines().collect();
        if lines.len() < layout.min_lines() {
            return Err(RecordError::Truncated {
                expected: layout.min_lines(),
                got: lines.len(),
            });
        }

        let headers = parse_header(text)?;
        let header_block = header_block(text, layout.header_lines);
        let vnir = parse_channel(&lines, &layout.vnir)?;
        let vis = parse_channel(&lines, &layout.vis)?;
        let uv = parse_channel(&lines, &layout.uv)?;

        Ok(Self {
            headers,
            header_block,
            vnir,
            vis,
            uv,
        })
    }
}

/// Parse the `key:"value"` header section of a record.
///
/// Lines are scanned until the sentinel. Each line containing a colon is
/// split once; the key loses a leading quote, the value a trailing quote.
/// Lines without a colon are ignored. A record with no sentinel is an error.
pub fn parse_header(text: &str) -> Result<HashMap<String, String>, RecordError> {
    let mut headers = HashMap::new();
    for line in text.lines() {
        if line.contains(HEADER_SENTINEL) {
            return Ok(headers);
        }
        if let Some((key, value)) = line.split_once(':') {
            let key = key.trim_start_matches('"').to_string();
            let value = value.trim_end_matches('"').to_string();
            headers.insert(key, value);
        }
    }
    Err(RecordError::MissingSentinel)
}

/// First `n` lines of a record, verbatim, for pass-through into products.
pub fn header_block(text: &str, n: usize) -> Vec<String> {
    text.lines().take(n).map(str::to_string).collect()
}

fn parse_channel(lines: &[&str], range: &Range<usize>) -> Result<Array1<f64>, RecordError> {
    let mut samples = Vec::with_capacity(range.len());
    for (offset, line) in lines[range.clone()].iter().enumerate() {
        let value = line
            .trim()
            .parse::<f64>()
            .map_err(|source| RecordError::Channel {
                line: range.start + offset + 1,
                source,
            })?;
        samples.push(value);
    }
    Ok(Array1::from_vec(samples))
}
