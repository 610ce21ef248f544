// SPDX-License-Identifier: AGPL-3.0-only

//! Lattice file inspector
//!
//! Sniffs a file's leading magic and prints what a loader would see:
//!
//! - MILC gauge configuration: byte order, extents, timestamp, order flag,
//!   stored checksums.
//! - LIME container: the full record table (name, occurrence, payload
//!   offset, padded length) plus QIO private metadata when present.
//!
//! Exit code 0 = recognized and printed; 1 = unrecognized or unreadable.

use std::process::ExitCode;

use hotspring_confluence::error::ConfluenceError;
use hotspring_confluence::lime::{self, LimeIndex, QioFileMetadata, QioRecordMetadata};
use hotspring_confluence::milc;

fn print_milc(bytes: &[u8]) -> Result<(), ConfluenceError> {
    let header = milc::parse_header(bytes)?;
    println!("  MILC gauge configuration");
    println!("  byte order: {:?}", header.endianness);
    println!(
        "  extents: {} {} {} {}",
        header.dims[0], header.dims[1], header.dims[2], header.dims[3]
    );
    println!("  timestamp: {}", header.time_stamp);
    println!("  order flag: {}", header.order_flag);
    println!(
        "  checksums: sum29=0x{:08x} sum31=0x{:08x} (stored, not verified)",
        header.sum29, header.sum31
    );
    let body = bytes.len().saturating_sub(milc::MILC_HEADER_LEN);
    println!("  body: {body} bytes");
    Ok(())
}

fn print_lime(bytes: &[u8]) -> Result<(), ConfluenceError> {
    let index = LimeIndex::parse(bytes)?;
    println!("  LIME container: {} records", index.records().len());
    println!("  {:<40} {:>4} {:>12} {:>12}", "name", "occ", "offset", "padded");

    let mut seen: Vec<(String, usize)> = Vec::new();
    for (name, record) in index.records() {
        let occ = match seen.iter_mut().find(|(n, _)| n == name) {
            Some((_, count)) => {
                *count += 1;
                *count
            }
            None => {
                seen.push((name.clone(), 0));
                0
            }
        };
        println!(
            "  {:<40} {:>4} {:>12} {:>12}",
            name, occ, record.offset, record.padded_len
        );
    }

    if let Ok(rec) = index.occurrence("scidac-private-file-xml", 0) {
        let meta = QioFileMetadata::parse(lime::xml_payload(bytes, &rec)?)?;
        println!(
            "  lattice: {} {} {} {}",
            meta.dims[0], meta.dims[1], meta.dims[2], meta.dims[3]
        );
    }
    if let Ok(rec) = index.occurrence("scidac-private-record-xml", 1) {
        let meta = QioRecordMetadata::parse(lime::xml_payload(bytes, &rec)?)?;
        let flavor = match meta.staggered() {
            Ok(true) => "staggered (color only)",
            Ok(false) => "full spin-color",
            Err(_) => "unrecognized typesize",
        };
        println!(
            "  record: precision={} colors={} typesize={} datacount={} -> {flavor}",
            meta.precision, meta.colors, meta.typesize, meta.datacount
        );
    }
    Ok(())
}

fn run(path: &str) -> Result<(), ConfluenceError> {
    let bytes = std::fs::read(path)?;
    println!("  file: {path} ({} bytes)", bytes.len());

    if bytes.len() >= lime::LIME_MAGIC.len() && bytes[..lime::LIME_MAGIC.len()] == lime::LIME_MAGIC
    {
        print_lime(&bytes)
    } else {
        print_milc(&bytes)
    }
}

fn main() -> ExitCode {
    let args: Vec<String> = std::env::args().collect();
    let Some(path) = args.get(1) else {
        eprintln!("usage: lattice_file_info <file>");
        return ExitCode::FAILURE;
    };
    match run(path) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("  ERROR: {e}");
            ExitCode::FAILURE
        }
    }
}
