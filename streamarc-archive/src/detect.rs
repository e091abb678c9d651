//! File-type sniffing by magic bytes.
//!
//! Signatures are stored in a byte trie. A signature may contain wildcard
//! positions (`??`) that match any byte, as WebP's `RIFF ???? WEBP` does.
//! The trie refuses ambiguous tables at construction: a wildcard and a
//! concrete byte may not share a parent, and no signature may be a prefix
//! of another.

use std::collections::HashMap;
use std::sync::OnceLock;
use streamarc_core::error::{Result, StreamArcError};

/// MIME type for ZIP archives.
pub const MIME_ZIP: &str = "application/zip";
/// MIME type for RAR archives.
pub const MIME_RAR: &str = "application/x-rar-compressed";
/// MIME type for TAR archives.
pub const MIME_TAR: &str = "application/x-tar";

/// Built-in signature table: MIME type and its hex signatures.
const SIGNATURES: &[(&str, &[&str])] = &[
    ("application/pdf", &["25 50 44 46 2d"]),
    (MIME_TAR, &["75 73 74 61 72 00 30 30", "75 73 74 61 72 20 20 00"]),
    ("application/x-7z-compressed", &["37 7A BC AF 27 1C"]),
    ("application/x-bzip2", &["42 5A 68"]),
    (MIME_RAR, &["52 61 72 21 1A 07"]),
    (MIME_ZIP, &["50 4B 03 04", "50 4B 05 06", "50 4B 07 08"]),
    ("image/bmp", &["42 4D"]),
    ("image/gif", &["47 49 46 38"]),
    ("image/jpeg", &["FF D8 FF"]),
    ("image/png", &["89 50 4E 47 0D 0A 1A 0A"]),
    ("image/webp", &["52 49 46 46 ?? ?? ?? ?? 57 45 42 50"]),
    ("application/ogg", &["4F 67 67 53"]),
    ("audio/mpeg", &["FF FB", "FF F3", "FF F2", "49 44 33"]),
];

/// One position of a signature.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SignatureByte {
    /// Matches exactly this byte.
    Exact(u8),
    /// Matches any byte.
    Any,
}

/// Parse a whitespace-separated hex signature; `??` is a wildcard.
pub fn parse_signature(signature: &str) -> Result<Vec<SignatureByte>> {
    signature
        .split_whitespace()
        .map(|token| {
            if token == "??" {
                return Ok(SignatureByte::Any);
            }
            u8::from_str_radix(token, 16)
                .map(SignatureByte::Exact)
                .map_err(|_| {
                    StreamArcError::invalid_header(format!(
                        "bad signature byte '{token}' in '{signature}'"
                    ))
                })
        })
        .collect()
}

#[derive(Debug, Default)]
struct Node {
    mime_type: Option<&'static str>,
    children: HashMap<SignatureByte, Node>,
}

impl Node {
    fn has_wildcard(&self) -> bool {
        self.children.contains_key(&SignatureByte::Any)
    }
}

/// Signature trie mapping leading bytes to a MIME type.
#[derive(Debug, Default)]
pub struct Sniffer {
    root: Node,
    max_depth: usize,
}

impl Sniffer {
    /// An empty sniffer that recognises nothing.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a sniffer from `(mime_type, signatures)` pairs.
    pub fn from_table(table: &[(&'static str, &[&str])]) -> Result<Self> {
        let mut sniffer = Self::new();
        for &(mime_type, signatures) in table {
            for signature in signatures {
                sniffer.add(mime_type, &parse_signature(signature)?)?;
            }
        }
        Ok(sniffer)
    }

    /// Add one signature.
    pub fn add(&mut self, mime_type: &'static str, signature: &[SignatureByte]) -> Result<()> {
        if signature.is_empty() {
            return Err(StreamArcError::invalid_header(format!(
                "{mime_type} has an empty signature"
            )));
        }

        let mut node = &mut self.root;
        for &byte in signature {
            if !node.children.contains_key(&byte) {
                if byte == SignatureByte::Any && !node.children.is_empty() {
                    return Err(StreamArcError::invalid_header(
                        "cannot add a wildcard child to a node that has concrete children",
                    ));
                }
                if byte != SignatureByte::Any && node.has_wildcard() {
                    return Err(StreamArcError::invalid_header(
                        "cannot add a concrete child to a node that has a wildcard child",
                    ));
                }
            }
            if node.mime_type.is_some() {
                return Err(StreamArcError::invalid_header(format!(
                    "{mime_type} signature is not unique, it extends another signature"
                )));
            }
            node = node.children.entry(byte).or_default();
        }

        if let Some(existing) = node.mime_type {
            return Err(StreamArcError::invalid_header(format!(
                "file signature collision: {existing} overlaps with {mime_type}"
            )));
        }
        if !node.children.is_empty() {
            return Err(StreamArcError::invalid_header(format!(
                "{mime_type} signature is not unique, it collides with other mime types"
            )));
        }
        node.mime_type = Some(mime_type);
        self.max_depth = self.max_depth.max(signature.len());
        Ok(())
    }

    /// Length of the longest signature.
    pub fn max_depth(&self) -> usize {
        self.max_depth
    }

    /// MIME type whose signature prefixes `bytes`, if any.
    pub fn find_mime_type(&self, bytes: &[u8]) -> Option<&'static str> {
        let depth = bytes.len().min(self.max_depth);
        let mut node = &self.root;
        for &byte in &bytes[..depth] {
            node = match node.children.get(&SignatureByte::Any) {
                Some(wildcard) => wildcard,
                None => node.children.get(&SignatureByte::Exact(byte))?,
            };
            if node.mime_type.is_some() {
                return node.mime_type;
            }
        }
        None
    }
}

/// The sniffer for the built-in signature table, built on first use.
pub fn builtin_sniffer() -> Result<&'static Sniffer> {
    static SNIFFER: OnceLock<Sniffer> = OnceLock::new();
    if let Some(sniffer) = SNIFFER.get() {
        return Ok(sniffer);
    }
    let sniffer = Sniffer::from_table(SIGNATURES)?;
    Ok(SNIFFER.get_or_init(|| sniffer))
}

/// MIME type of `bytes` according to the built-in table.
pub fn find_mime_type(bytes: &[u8]) -> Option<&'static str> {
    builtin_sniffer().ok()?.find_mime_type(bytes)
}

/// Archive formats an unarchiver can be selected for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArchiveFormat {
    /// ZIP archive (.zip, .cbz).
    Zip,
    /// RAR archive (.rar, .cbr). Recognised only.
    Rar,
    /// TAR archive (.tar, .cbt).
    Tar,
}

impl ArchiveFormat {
    /// Pick the format for an archive whose first bytes are `magic`.
    ///
    /// Anything that is neither ZIP nor RAR is treated as TAR, whose
    /// signature sits at offset 257 and so is never seen by the sniffer.
    pub fn from_magic(magic: &[u8]) -> Self {
        match find_mime_type(magic) {
            Some(MIME_ZIP) => Self::Zip,
            Some(MIME_RAR) => Self::Rar,
            _ => Self::Tar,
        }
    }

    /// Get the MIME type.
    pub fn mime_type(&self) -> &'static str {
        match self {
            Self::Zip => MIME_ZIP,
            Self::Rar => MIME_RAR,
            Self::Tar => MIME_TAR,
        }
    }

    /// Get the typical file extension.
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Zip => "zip",
            Self::Rar => "rar",
            Self::Tar => "tar",
        }
    }

    /// Whether entries of this format can be extracted.
    pub fn is_supported(&self) -> bool {
        !matches!(self, Self::Rar)
    }
}

impl std::fmt::Display for ArchiveFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Zip => write!(f, "ZIP"),
            Self::Rar => write!(f, "RAR"),
            Self::Tar => write!(f, "TAR"),
        }
    }
}
