//! Output encoding.
//!
//! The formatter always produces UTF-8 text; this module turns that text
//! into bytes in the encoding requested for the save pass, bridging to
//! `encoding_rs` for legacy encodings.
//!
//! # Encoding Resolution
//!
//! 1. UTF-8 labels are written as is.
//! 2. `US-ASCII` / `ASCII` write every non-ASCII character as a hexadecimal
//!    character reference, and the ISO-8859-1 labels (`latin1`, `l1`, ...)
//!    write U+0000..=U+00FF as one byte and everything above as a reference.
//!    (`encoding_rs` maps these labels to windows-1252, which puts `€` and
//!    friends at 0x80..=0x9F where ISO-8859-1 has C1 controls.)
//! 3. Any other label is looked up with `encoding_rs::Encoding::for_label`.
//!    Characters the encoding cannot represent become numeric character
//!    references, which keeps the output well-formed.
//! 4. Labels whose output encoding differs from the label itself (UTF-16,
//!    `replacement`) are rejected: the declaration would lie about the bytes.

use std::fmt::Write as _;

use encoding_rs::{CoderResult, Encoder, Encoding, UTF_8};

use crate::error::OpenError;

/// Extra room reserved per encode round so a numeric character reference
/// for an unmappable character always fits.
const NCR_HEADROOM: usize = 16;

/// Transcodes formatter output for one save pass.
pub struct OutputEncoder {
    label: String,
    kind: EncoderKind,
}

enum EncoderKind {
    Utf8,
    Ascii,
    Latin1,
    Legacy(Encoder),
}

/// Labels that name ISO-8859-1 itself rather than windows-1252.
const LATIN1_LABELS: [&str; 11] = [
    "iso-8859-1",
    "iso8859-1",
    "iso88591",
    "iso_8859-1",
    "iso_8859-1:1987",
    "iso-ir-100",
    "latin1",
    "l1",
    "cp819",
    "ibm819",
    "csisolatin1",
];

impl std::fmt::Debug for OutputEncoder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OutputEncoder")
            .field("label", &self.label)
            .field("name", &self.name())
            .finish()
    }
}

impl OutputEncoder {
    /// Resolves an encoding label for output.
    ///
    /// # Errors
    ///
    /// Returns [`OpenError::EmptyEncoding`] for an empty label and
    /// [`OpenError::UnsupportedEncoding`] for a label that is unknown or
    /// cannot be produced.
    ///
    /// # Examples
    ///
    /// ```
    /// use xmlsave::encoding::OutputEncoder;
    ///
    /// let enc = OutputEncoder::for_label("latin1").unwrap();
    /// assert_eq!(enc.name(), "ISO-8859-1");
    /// assert_eq!(OutputEncoder::for_label("cp1252").unwrap().name(), "windows-1252");
    /// assert!(OutputEncoder::for_label("UTF-16").is_err());
    /// ```
    pub fn for_label(label: &str) -> Result<Self, OpenError> {
        let trimmed = label.trim();
        if trimmed.is_empty() {
            return Err(OpenError::EmptyEncoding);
        }
        let kind = if is_ascii_label(trimmed) {
            EncoderKind::Ascii
        } else if is_latin1_label(trimmed) {
            EncoderKind::Latin1
        } else {
            let encoding = Encoding::for_label(trimmed.as_bytes())
                .ok_or_else(|| OpenError::UnsupportedEncoding(label.to_string()))?;
            if encoding.output_encoding() != encoding {
                return Err(OpenError::UnsupportedEncoding(label.to_string()));
            }
            if encoding == UTF_8 {
                EncoderKind::Utf8
            } else {
                EncoderKind::Legacy(encoding.new_encoder())
            }
        };
        Ok(Self {
            label: label.to_string(),
            kind,
        })
    }

    /// The label this encoder was created from, as given.
    #[must_use]
    pub fn label(&self) -> &str {
        &self.label
    }

    /// The canonical name of the resolved encoding.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match &self.kind {
            EncoderKind::Utf8 => "UTF-8",
            EncoderKind::Ascii => "US-ASCII",
            EncoderKind::Latin1 => "ISO-8859-1",
            EncoderKind::Legacy(encoder) => encoder.encoding().name(),
        }
    }

    /// Encodes `text` and appends the bytes to `out`.
    ///
    /// `last` must be `true` for the final call of a pass so that stateful
    /// encoders (ISO-2022-JP) can return to their initial state.
    pub fn encode(&mut self, text: &str, out: &mut Vec<u8>, last: bool) {
        match &mut self.kind {
            EncoderKind::Utf8 => out.extend_from_slice(text.as_bytes()),
            EncoderKind::Ascii => encode_single_byte(text, out, 0x7F),
            EncoderKind::Latin1 => encode_single_byte(text, out, 0xFF),
            EncoderKind::Legacy(encoder) => encode_legacy(encoder, text, out, last),
        }
    }
}

fn is_ascii_label(label: &str) -> bool {
    label.eq_ignore_ascii_case("us-ascii") || label.eq_ignore_ascii_case("ascii")
}

fn is_latin1_label(label: &str) -> bool {
    LATIN1_LABELS.iter().any(|l| label.eq_ignore_ascii_case(l))
}

/// Writes characters up to `max` as one byte each, the rest as hex references.
fn encode_single_byte(text: &str, out: &mut Vec<u8>, max: u8) {
    let mut reference = String::new();
    for ch in text.chars() {
        match u8::try_from(ch) {
            Ok(byte) if byte <= max => out.push(byte),
            _ => {
                reference.clear();
                let _ = write!(reference, "&#x{:X};", ch as u32);
                out.extend_from_slice(reference.as_bytes());
            }
        }
    }
}

fn encode_legacy(encoder: &mut Encoder, text: &str, out: &mut Vec<u8>, last: bool) {
    let mut src = text;
    loop {
        let needed = encoder
            .max_buffer_length_from_utf8_if_no_unmappables(src.len())
            .unwrap_or(src.len());
        out.reserve(needed + NCR_HEADROOM);
        let (result, read, _) = encoder.encode_from_utf8_to_vec(src, out, last);
        src = &src[read..];
        match result {
            CoderResult::InputEmpty => break,
            CoderResult::OutputFull => {}
        }
    }
}
