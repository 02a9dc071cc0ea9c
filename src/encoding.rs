//! Input loading and encoding detection
//!
//! Input files are read whole (memory-mapped), their encoding detected, and
//! decoded to UTF-8 lines before the engine ever sees them.

use anyhow::Context;
use chardetng::EncodingDetector;
use encoding_rs::Encoding;
use std::fs::File;
use std::path::Path;

/// Bytes sampled for encoding detection
const DETECTION_SAMPLE: usize = 64 * 1024;

/// Result of encoding detection
#[derive(Debug, Clone)]
pub struct EncodingInfo {
    /// Detected encoding name
    pub name: &'static str,
    /// Confidence level (0.0 - 1.0)
    pub confidence: f32,
    /// The encoding_rs Encoding reference
    pub encoding: &'static Encoding,
}

impl Default for EncodingInfo {
    fn default() -> Self {
        Self {
            name: "UTF-8",
            confidence: 1.0,
            encoding: encoding_rs::UTF_8,
        }
    }
}

/// Detect the encoding of raw content by sampling its start
pub fn detect_encoding(content: &[u8]) -> EncodingInfo {
    let sample = &content[..content.len().min(DETECTION_SAMPLE)];

    if sample.is_empty() {
        return EncodingInfo::default();
    }

    if let Some(encoding) = detect_bom(sample) {
        return EncodingInfo {
            name: encoding.name(),
            confidence: 1.0,
            encoding,
        };
    }

    let mut detector = EncodingDetector::new();
    detector.feed(sample, sample.len() == content.len());
    let encoding = detector.guess(None, true);

    // Rough confidence: a clean UTF-8 sample is certain
    let confidence = if encoding == encoding_rs::UTF_8 {
        if std::str::from_utf8(sample).is_ok() {
            1.0
        } else {
            0.5
        }
    } else {
        0.8
    };

    EncodingInfo {
        name: encoding.name(),
        confidence,
        encoding,
    }
}

/// Detect BOM (Byte Order Mark) at the start of content
fn detect_bom(content: &[u8]) -> Option<&'static Encoding> {
    Encoding::for_bom(content).map(|(encoding, _)| encoding)
}

/// Decoded contents of one input file
#[derive(Debug)]
pub struct InputFile {
    pub lines: Vec<String>,
    pub encoding: EncodingInfo,
    pub size: u64,
    /// True when undecodable bytes were replaced
    pub lossy: bool,
}

/// Decode raw bytes into lines, stripping `\n` / `\r\n` terminators
pub fn decode_lines(content: &[u8]) -> (Vec<String>, EncodingInfo, bool) {
    let info = detect_encoding(content);
    // decode() strips a matching BOM and falls back to lossy replacement
    let (text, _, had_errors) = info.encoding.decode(content);
    let lines = text.lines().map(str::to_owned).collect();
    (lines, info, had_errors)
}

/// Read an input file completely and split it into lines
pub fn read_input(path: &Path) -> anyhow::Result<InputFile> {
    let file = File::open(path).with_context(|| format!("Failed to open input {:?}", path))?;
    let size = file
        .metadata()
        .with_context(|| format!("Failed to stat input {:?}", path))?
        .len();

    if size == 0 {
        return Ok(InputFile {
            lines: Vec::new(),
            encoding: EncodingInfo::default(),
            size,
            lossy: false,
        });
    }

    // SAFETY: the map is read-only and dropped before this function returns
    let mmap = unsafe { memmap2::Mmap::map(&file) }
        .with_context(|| format!("Failed to map input {:?}", path))?;

    let (lines, encoding, lossy) = decode_lines(&mmap);
    if lossy {
        log::warn!("Encoding errors in {:?} ({}), using lossy conversion", path, encoding.name);
    }
    log::debug!("{:?}: {} lines, {} encoding", path, lines.len(), encoding.name);

    Ok(InputFile {
        lines,
        encoding,
        size,
        lossy,
    })
}
