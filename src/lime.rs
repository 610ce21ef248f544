// SPDX-License-Identifier: AGPL-3.0-only

//! LIME tagged-record container parsing (SCIDAC/QIO files).
//!
//! A LIME file is a sequence of records:
//!
//! | bytes | content |
//! |-------|---------|
//! | 8 | header word; the first 6 bytes must be `45 67 89 AB 00 01` |
//! | 8 | big-endian u64 payload length L |
//! | 128 | ASCII record name, null-padded |
//! | `ceil(L/8)*8` | payload (bytes past L are padding) |
//!
//! The trailing 2 bytes of the header word carry message-boundary flags and
//! are not validated, matching the upstream reader. The stream ends at
//! end-of-file or at a single literal newline byte where the next header
//! would start.
//!
//! [`LimeIndex`] records, per name, the ordered occurrences of
//! `(payload_offset, padded_length)`. Callers select by name and sequence
//! index; the QIO conventions (private file XML at occurrence 0, private
//! record XML at occurrence 1, binary payloads at odd occurrences from 1)
//! are fixed upstream and reproduced by [`crate::qio`].
//!
//! Metadata payloads are UTF-8 XML with a flat scalar-tag grammar, parsed
//! here by tag name; no XML tree is ever built.

use crate::error::ConfluenceError;
use crate::field::{ND, NC, NS};

/// First 6 bytes of every record header word.
pub const LIME_MAGIC: [u8; 6] = [0x45, 0x67, 0x89, 0xAB, 0x00, 0x01];

const HEADER_WORD: usize = 8;
const LENGTH_WORD: usize = 8;
const NAME_FIELD: usize = 128;

/// One record occurrence: where its payload starts and its padded extent.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LimeRecord {
    /// Byte offset of the payload within the file buffer.
    pub offset: usize,
    /// Payload length rounded up to the 8-byte boundary.
    pub padded_len: usize,
}

/// Ordered index of every record in a LIME byte buffer.
#[derive(Debug, Default)]
pub struct LimeIndex {
    records: Vec<(String, LimeRecord)>,
}

impl LimeIndex {
    /// Walk the buffer and index every record.
    ///
    /// # Errors
    ///
    /// [`ConfluenceError::MalformedMagic`] when a record header does not
    /// open with the magic marker; [`ConfluenceError::UnexpectedEof`] when
    /// the buffer ends inside a header or payload.
    pub fn parse(bytes: &[u8]) -> Result<Self, ConfluenceError> {
        let mut records = Vec::new();
        let mut cursor = 0usize;
        loop {
            let remaining = bytes.len() - cursor;
            if remaining == 0 || (remaining == 1 && bytes[cursor] == b'\n') {
                break;
            }
            if remaining < HEADER_WORD + LENGTH_WORD + NAME_FIELD {
                return Err(ConfluenceError::UnexpectedEof(format!(
                    "record header at offset {cursor} needs 144 bytes, {remaining} left"
                )));
            }
            if bytes[cursor..cursor + LIME_MAGIC.len()] != LIME_MAGIC {
                return Err(ConfluenceError::MalformedMagic(cursor));
            }
            let mut word = [0u8; 8];
            word.copy_from_slice(&bytes[cursor + HEADER_WORD..cursor + HEADER_WORD + LENGTH_WORD]);
            let length = u64::from_be_bytes(word) as usize;
            let padded_len = length.div_ceil(8) * 8;

            let name_start = cursor + HEADER_WORD + LENGTH_WORD;
            let name_bytes = &bytes[name_start..name_start + NAME_FIELD];
            let name = String::from_utf8_lossy(name_bytes)
                .trim_matches('\0')
                .to_string();

            let offset = name_start + NAME_FIELD;
            if bytes.len() < offset + padded_len {
                return Err(ConfluenceError::UnexpectedEof(format!(
                    "record '{name}' payload of {padded_len} bytes at offset {offset} \
                     exceeds buffer of {} bytes",
                    bytes.len()
                )));
            }
            records.push((name, LimeRecord { offset, padded_len }));
            cursor = offset + padded_len;
        }
        Ok(Self { records })
    }

    /// All records in file order.
    #[must_use]
    pub fn records(&self) -> &[(String, LimeRecord)] {
        &self.records
    }

    /// Ordered occurrences of one record name.
    #[must_use]
    pub fn occurrences(&self, name: &str) -> Vec<LimeRecord> {
        self.records
            .iter()
            .filter(|(n, _)| n == name)
            .map(|&(_, r)| r)
            .collect()
    }

    /// The `index`-th occurrence of `name`.
    ///
    /// # Errors
    ///
    /// [`ConfluenceError::MissingRecord`] when the name has fewer
    /// occurrences than `index + 1`.
    pub fn occurrence(&self, name: &str, index: usize) -> Result<LimeRecord, ConfluenceError> {
        self.occurrences(name)
            .get(index)
            .copied()
            .ok_or_else(|| ConfluenceError::MissingRecord(format!("{name}[{index}]")))
    }
}

/// Payload bytes of one record (padded extent, as stored).
#[must_use]
pub fn payload<'a>(bytes: &'a [u8], record: &LimeRecord) -> &'a [u8] {
    &bytes[record.offset..record.offset + record.padded_len]
}

/// Payload decoded as null-stripped UTF-8 XML.
///
/// # Errors
///
/// [`ConfluenceError::MalformedMetadata`] on invalid UTF-8.
pub fn xml_payload<'a>(bytes: &'a [u8], record: &LimeRecord) -> Result<&'a str, ConfluenceError> {
    let raw = payload(bytes, record);
    let text = std::str::from_utf8(raw).map_err(|e| {
        ConfluenceError::MalformedMetadata(format!("XML record is not UTF-8: {e}"))
    })?;
    Ok(text.trim_matches('\0'))
}

/// Inner text of the first `<tag>…</tag>` occurrence, trimmed.
#[must_use]
pub fn xml_tag<'a>(xml: &'a str, tag: &str) -> Option<&'a str> {
    let open = format!("<{tag}>");
    let close = format!("</{tag}>");
    let start = xml.find(&open)? + open.len();
    let end = xml[start..].find(&close)? + start;
    Some(xml[start..end].trim())
}

fn require_tag<'a>(xml: &'a str, tag: &str) -> Result<&'a str, ConfluenceError> {
    xml_tag(xml, tag).ok_or_else(|| ConfluenceError::MissingMetadata(tag.to_string()))
}

fn require_usize(xml: &str, tag: &str) -> Result<usize, ConfluenceError> {
    let text = require_tag(xml, tag)?;
    text.parse().map_err(|_| {
        ConfluenceError::MalformedMetadata(format!("<{tag}> holds '{text}', expected an integer"))
    })
}

/// Scalars of the `scidac-private-file-xml` record.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct QioFileMetadata {
    /// Number of spacetime dimensions; must be 4.
    pub spacetime: usize,
    /// Global lattice extents `[Lx, Ly, Lz, Lt]`.
    pub dims: [usize; 4],
}

impl QioFileMetadata {
    /// Extract and validate the private file metadata.
    ///
    /// # Errors
    ///
    /// [`ConfluenceError::MissingMetadata`] on an absent tag;
    /// [`ConfluenceError::DimensionMismatch`] on `spacetime != 4` or a
    /// `dims` list that is not 4 integers.
    pub fn parse(xml: &str) -> Result<Self, ConfluenceError> {
        let spacetime = require_usize(xml, "spacetime")?;
        if spacetime != ND {
            return Err(ConfluenceError::DimensionMismatch(format!(
                "spacetime={spacetime}, this reader handles {ND}-dimensional lattices"
            )));
        }
        let dims_text = require_tag(xml, "dims")?;
        let parsed: Vec<usize> = dims_text
            .split_whitespace()
            .map(str::parse)
            .collect::<Result<_, _>>()
            .map_err(|_| {
                ConfluenceError::MalformedMetadata(format!(
                    "<dims> holds '{dims_text}', expected integers"
                ))
            })?;
        let dims: [usize; 4] = parsed.as_slice().try_into().map_err(|_| {
            ConfluenceError::DimensionMismatch(format!(
                "<dims> lists {} extents, expected 4",
                parsed.len()
            ))
        })?;
        Ok(Self { spacetime, dims })
    }
}

/// Scalars of the `scidac-private-record-xml` record.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct QioRecordMetadata {
    /// Bytes per real component (8 for `"D"`, 4 for `"S"`).
    pub precision: usize,
    /// Colors; must equal 3.
    pub colors: usize,
    /// Spins; absent for staggered data.
    pub spins: Option<usize>,
    /// Bytes per lattice site datum.
    pub typesize: usize,
    /// Data records per site; must equal 1.
    pub datacount: usize,
}

impl QioRecordMetadata {
    /// Extract and validate the private record metadata.
    ///
    /// # Errors
    ///
    /// [`ConfluenceError::MissingMetadata`],
    /// [`ConfluenceError::UnsupportedPrecision`],
    /// [`ConfluenceError::UnsupportedDataCount`], or
    /// [`ConfluenceError::MalformedMetadata`] when a declared scalar is
    /// absent, unknown, or inconsistent.
    pub fn parse(xml: &str) -> Result<Self, ConfluenceError> {
        let precision = match require_tag(xml, "precision")? {
            "D" => 8,
            "S" => 4,
            other => {
                return Err(ConfluenceError::UnsupportedPrecision(other.to_string()));
            }
        };
        let colors = require_usize(xml, "colors")?;
        if colors != NC {
            return Err(ConfluenceError::MalformedMetadata(format!(
                "colors={colors}, this reader handles {NC}-color data"
            )));
        }
        let spins = match xml_tag(xml, "spins") {
            Some(_) => Some(require_usize(xml, "spins")?),
            None => None,
        };
        if let Some(s) = spins {
            if s != NS {
                return Err(ConfluenceError::MalformedMetadata(format!(
                    "spins={s}, this reader handles {NS}-spin data"
                )));
            }
        }
        let typesize = require_usize(xml, "typesize")?;
        let datacount = require_usize(xml, "datacount")?;
        if datacount != 1 {
            return Err(ConfluenceError::UnsupportedDataCount(datacount));
        }
        Ok(Self {
            precision,
            colors,
            spins,
            typesize,
            datacount,
        })
    }

    /// Whether `typesize` declares color-only (staggered) site data.
    ///
    /// # Errors
    ///
    /// [`ConfluenceError::UnsupportedTypesize`] when `typesize` matches
    /// neither the spin-color nor the color-only element size for the
    /// declared precision.
    pub fn staggered(&self) -> Result<bool, ConfluenceError> {
        if self.typesize == NC * 2 * self.precision {
            Ok(true)
        } else if self.typesize == NS * NC * 2 * self.precision {
            Ok(false)
        } else {
            Err(ConfluenceError::UnsupportedTypesize(self.typesize))
        }
    }
}

/// Append one LIME record to a synthetic file image; returns the payload
/// offset. Test fixture shared with the QIO reader tests.
#[cfg(test)]
pub(crate) fn push_record(buf: &mut Vec<u8>, name: &str, payload: &[u8]) -> usize {
    buf.extend_from_slice(&LIME_MAGIC);
    buf.extend_from_slice(&[0x80, 0x00]); // message-boundary flags, unchecked
    buf.extend_from_slice(&(payload.len() as u64).to_be_bytes());
    let mut name_field = [0u8; 128];
    name_field[..name.len()].copy_from_slice(name.as_bytes());
    buf.extend_from_slice(&name_field);
    let offset = buf.len();
    buf.extend_from_slice(payload);
    let padded = payload.len().div_ceil(8) * 8;
    buf.resize(offset + padded, 0);
    offset
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_indexes_records_in_order() {
        let mut buf = Vec::new();
        let off_a = push_record(&mut buf, "alpha", b"0123456789");
        let off_b = push_record(&mut buf, "beta", b"xyz");
        let index = LimeIndex::parse(&buf).unwrap();
        assert_eq!(index.records().len(), 2);
        let a = index.occurrence("alpha", 0).unwrap();
        assert_eq!(a.offset, off_a);
        assert_eq!(a.padded_len, 16); // 10 rounded up
        let b = index.occurrence("beta", 0).unwrap();
        assert_eq!(b.offset, off_b);
        assert_eq!(b.padded_len, 8);
    }

    #[test]
    fn second_occurrence_resolved_by_index() {
        let mut buf = Vec::new();
        push_record(&mut buf, "scidac-private-record-xml", b"first");
        let second = push_record(&mut buf, "scidac-private-record-xml", b"second!!");
        let index = LimeIndex::parse(&buf).unwrap();
        let rec = index.occurrence("scidac-private-record-xml", 1).unwrap();
        assert_eq!(rec.offset, second);
        assert_eq!(rec.padded_len, 8);
        assert_eq!(&buf[rec.offset..rec.offset + 8], b"second!!");
    }

    #[test]
    fn missing_occurrence_is_typed_error() {
        let mut buf = Vec::new();
        push_record(&mut buf, "only-one", b"x");
        let index = LimeIndex::parse(&buf).unwrap();
        assert!(matches!(
            index.occurrence("only-one", 1),
            Err(ConfluenceError::MissingRecord(_))
        ));
        assert!(matches!(
            index.occurrence("absent", 0),
            Err(ConfluenceError::MissingRecord(_))
        ));
    }

    #[test]
    fn newline_sentinel_ends_stream() {
        let mut buf = Vec::new();
        push_record(&mut buf, "alpha", b"payload!");
        buf.push(b'\n');
        let index = LimeIndex::parse(&buf).unwrap();
        assert_eq!(index.records().len(), 1);
    }

    #[test]
    fn broken_magic_reports_offset() {
        let mut buf = Vec::new();
        push_record(&mut buf, "alpha", b"payload!");
        let bad_at = buf.len();
        buf.extend_from_slice(&[0u8; 144]);
        let err = LimeIndex::parse(&buf).unwrap_err();
        assert!(matches!(err, ConfluenceError::MalformedMagic(offset) if offset == bad_at));
    }

    #[test]
    fn truncated_payload_is_eof() {
        let mut buf = Vec::new();
        push_record(&mut buf, "alpha", b"payload!");
        buf.truncate(buf.len() - 3);
        assert!(matches!(
            LimeIndex::parse(&buf),
            Err(ConfluenceError::UnexpectedEof(_))
        ));
    }

    #[test]
    fn xml_payload_strips_null_padding() {
        let mut buf = Vec::new();
        push_record(&mut buf, "meta", b"<x>1</x>\x00\x00");
        let index = LimeIndex::parse(&buf).unwrap();
        let rec = index.occurrence("meta", 0).unwrap();
        assert_eq!(xml_payload(&buf, &rec).unwrap(), "<x>1</x>");
    }

    #[test]
    fn xml_tag_extracts_trimmed_text() {
        let xml = "<r><dims> 4 4 4 8 </dims><precision>D</precision></r>";
        assert_eq!(xml_tag(xml, "dims"), Some("4 4 4 8"));
        assert_eq!(xml_tag(xml, "precision"), Some("D"));
        assert_eq!(xml_tag(xml, "spins"), None);
    }

    #[test]
    fn file_metadata_parses_and_validates() {
        let xml = "<scidacFile><version>1.1</version><spacetime>4</spacetime>\
                   <dims>4 4 4 8 </dims><volfmt>0</volfmt></scidacFile>";
        let meta = QioFileMetadata::parse(xml).unwrap();
        assert_eq!(meta.dims, [4, 4, 4, 8]);

        let bad = "<scidacFile><spacetime>3</spacetime><dims>4 4 4</dims></scidacFile>";
        assert!(matches!(
            QioFileMetadata::parse(bad),
            Err(ConfluenceError::DimensionMismatch(_))
        ));
    }

    #[test]
    fn record_metadata_full_propagator() {
        let xml = "<scidacRecord><precision>D</precision><colors>3</colors>\
                   <spins>4</spins><typesize>192</typesize><datacount>1</datacount>\
                   </scidacRecord>";
        let meta = QioRecordMetadata::parse(xml).unwrap();
        assert_eq!(meta.precision, 8);
        assert_eq!(meta.spins, Some(4));
        assert!(!meta.staggered().unwrap());
    }

    #[test]
    fn record_metadata_staggered_single_precision() {
        let xml = "<scidacRecord><precision>S</precision><colors>3</colors>\
                   <typesize>24</typesize><datacount>1</datacount></scidacRecord>";
        let meta = QioRecordMetadata::parse(xml).unwrap();
        assert_eq!(meta.precision, 4);
        assert_eq!(meta.spins, None);
        assert!(meta.staggered().unwrap());
    }

    #[test]
    fn record_metadata_failure_taxonomy() {
        let no_precision = "<r><colors>3</colors><typesize>24</typesize>\
                            <datacount>1</datacount></r>";
        assert!(matches!(
            QioRecordMetadata::parse(no_precision),
            Err(ConfluenceError::MissingMetadata(_))
        ));

        let bad_precision = "<r><precision>Q</precision><colors>3</colors>\
                             <typesize>24</typesize><datacount>1</datacount></r>";
        assert!(matches!(
            QioRecordMetadata::parse(bad_precision),
            Err(ConfluenceError::UnsupportedPrecision(_))
        ));

        let bad_count = "<r><precision>D</precision><colors>3</colors>\
                         <typesize>48</typesize><datacount>2</datacount></r>";
        assert!(matches!(
            QioRecordMetadata::parse(bad_count),
            Err(ConfluenceError::UnsupportedDataCount(_))
        ));

        let odd_typesize = "<r><precision>D</precision><colors>3</colors>\
                            <typesize>97</typesize><datacount>1</datacount></r>";
        let meta = QioRecordMetadata::parse(odd_typesize).unwrap();
        assert!(matches!(
            meta.staggered(),
            Err(ConfluenceError::UnsupportedTypesize(97))
        ));
    }
}
