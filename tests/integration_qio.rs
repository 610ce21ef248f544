// SPDX-License-Identifier: AGPL-3.0-only

//! Integration tests: LIME framing and the SCIDAC/QIO propagator reader.
//!
//! Builds byte-exact LIME files and checks the record-table conventions the
//! format fixes: file metadata at occurrence 0, record metadata at
//! occurrence 1, binary payloads at odd occurrences.

use hotspring_confluence::error::ConfluenceError;
use hotspring_confluence::field::{NC, NS};
use hotspring_confluence::lime::{self, LimeIndex, LIME_MAGIC};
use hotspring_confluence::qio::{self, QioPropagator};
use hotspring_confluence::topology::GridContext;
use hotspring_confluence::Complex64;

/// Append one LIME record: 144-byte header, payload padded to 8 bytes.
fn push_record(buf: &mut Vec<u8>, name: &str, payload: &[u8]) {
    buf.extend_from_slice(&LIME_MAGIC);
    buf.extend_from_slice(&[0x80, 0x00]);
    buf.extend_from_slice(&(payload.len() as u64).to_be_bytes());
    let mut name_field = [0u8; 128];
    name_field[..name.len()].copy_from_slice(name.as_bytes());
    buf.extend_from_slice(&name_field);
    let start = buf.len();
    buf.extend_from_slice(payload);
    buf.resize(start + payload.len().div_ceil(8) * 8, 0);
}

fn file_xml(dims: [usize; 4]) -> String {
    format!(
        "<scidacFile><version>1.1</version><spacetime>4</spacetime>\
         <dims>{} {} {} {} </dims><volfmt>0</volfmt></scidacFile>",
        dims[0], dims[1], dims[2], dims[3]
    )
}

fn record_xml(staggered: bool, precision: usize) -> String {
    let (spins, typesize) = if staggered {
        (String::new(), NC * 2 * precision)
    } else {
        (format!("<spins>{NS}</spins>"), NS * NC * 2 * precision)
    };
    let code = if precision == 8 { "D" } else { "S" };
    format!(
        "<scidacRecord><precision>{code}</precision><colors>{NC}</colors>\
         {spins}<typesize>{typesize}</typesize><datacount>1</datacount></scidacRecord>"
    )
}

/// Big-endian binary body tagging each complex with its flat index.
fn tagged_body(elements: usize, precision: usize) -> Vec<u8> {
    let mut body = Vec::with_capacity(elements * 2 * precision);
    for i in 0..elements {
        if precision == 8 {
            body.extend_from_slice(&(i as f64).to_be_bytes());
            body.extend_from_slice(&(-1.0f64).to_be_bytes());
        } else {
            body.extend_from_slice(&(i as f32).to_be_bytes());
            body.extend_from_slice(&(-1.0f32).to_be_bytes());
        }
    }
    body
}

/// Full QIO file: source record pair at occurrence 0, propagator at 1.
fn synth_file(dims: [usize; 4], staggered: bool, precision: usize) -> Vec<u8> {
    let volume: usize = dims.iter().product();
    let site_elems = if staggered { NC * NC } else { NS * NS * NC * NC };
    let mut buf = Vec::new();
    push_record(&mut buf, "scidac-private-file-xml", file_xml(dims).as_bytes());
    push_record(&mut buf, "scidac-file-xml", b"<title>test ensemble</title>");
    push_record(
        &mut buf,
        "scidac-private-record-xml",
        b"<scidacRecord>source</scidacRecord>",
    );
    push_record(&mut buf, "scidac-binary-data", &[0u8; 8]);
    push_record(
        &mut buf,
        "scidac-private-record-xml",
        record_xml(staggered, precision).as_bytes(),
    );
    push_record(
        &mut buf,
        "scidac-binary-data",
        &tagged_body(volume * site_elems, precision),
    );
    buf.push(b'\n');
    buf
}

#[test]
fn lime_index_walks_the_whole_file() {
    let buf = synth_file([4, 4, 4, 4], true, 8);
    let index = LimeIndex::parse(&buf).unwrap();
    assert_eq!(index.records().len(), 6);
    assert_eq!(index.occurrences("scidac-private-record-xml").len(), 2);
    assert_eq!(index.occurrences("scidac-binary-data").len(), 2);
    // Every payload sits right after its 144-byte header.
    for (_, record) in index.records() {
        assert_eq!(record.offset % 8, 0, "8-byte alignment of every record");
        assert_eq!(record.padded_len % 8, 0);
    }
}

#[test]
fn xml_metadata_comes_from_the_right_occurrences() {
    let buf = synth_file([4, 4, 8, 16], false, 8);
    let index = LimeIndex::parse(&buf).unwrap();

    let file_rec = index.occurrence("scidac-private-file-xml", 0).unwrap();
    let meta = lime::QioFileMetadata::parse(lime::xml_payload(&buf, &file_rec).unwrap()).unwrap();
    assert_eq!(meta.dims, [4, 4, 8, 16]);

    // Occurrence 0 is the source description; it lacks the scalars.
    let source_rec = index.occurrence("scidac-private-record-xml", 0).unwrap();
    let parse0 = lime::QioRecordMetadata::parse(lime::xml_payload(&buf, &source_rec).unwrap());
    assert!(matches!(parse0, Err(ConfluenceError::MissingMetadata(_))));

    let record_rec = index.occurrence("scidac-private-record-xml", 1).unwrap();
    let meta =
        lime::QioRecordMetadata::parse(lime::xml_payload(&buf, &record_rec).unwrap()).unwrap();
    assert_eq!(meta.precision, 8);
    assert_eq!(meta.spins, Some(NS));
    assert!(!meta.staggered().unwrap());
}

#[test]
fn staggered_propagator_loads_end_to_end() {
    let prop = qio::parse_propagator(&synth_file([4, 4, 4, 8], true, 8), &GridContext::single())
        .unwrap();
    let QioPropagator::Staggered(prop) = prop else {
        panic!("color-only typesize must produce a staggered propagator");
    };
    assert_eq!(prop.info().global_size, [4, 4, 4, 8]);
    assert_eq!(prop.shape(), &[2, 8, 4, 4, 2, NC, NC]);
    // Origin, sink color 0, source color 0: file element 0.
    assert_eq!(prop.data()[0], Complex64::new(0.0, -1.0));
}

#[test]
fn full_propagator_loads_end_to_end() {
    let prop = qio::parse_propagator(&synth_file([4, 4, 4, 4], false, 4), &GridContext::single())
        .unwrap();
    let QioPropagator::Full(prop) = prop else {
        panic!("spin-color typesize must produce a full propagator");
    };
    assert_eq!(prop.shape(), &[2, 4, 4, 4, 2, NS, NS, NC, NC]);
    assert_eq!(prop.data()[0], Complex64::new(0.0, -1.0));
    // Canonical source-spin index s1 sits inside the payload's outermost
    // axis: (origin, s2=0, s1=1, colors 0) is file element Nc * V * Ns * Nc.
    let volume = 256;
    assert_eq!(
        prop.data()[NC * NC],
        Complex64::new((NC * volume * NS * NC) as f64, -1.0)
    );
}

#[test]
fn single_precision_widens_to_f64() {
    let single =
        qio::parse_propagator(&synth_file([4, 4, 4, 4], true, 4), &GridContext::single()).unwrap();
    let double =
        qio::parse_propagator(&synth_file([4, 4, 4, 4], true, 8), &GridContext::single()).unwrap();
    let (QioPropagator::Staggered(s), QioPropagator::Staggered(d)) = (single, double) else {
        panic!("both files declare staggered typesizes");
    };
    // Tags are small integers, exactly representable in f32.
    assert_eq!(s.data(), d.data());
}

#[test]
fn time_split_ranks_see_disjoint_slabs() {
    let dims = [4, 4, 4, 8];
    let buf = synth_file(dims, true, 8);
    let lo = GridContext::new(0, 2, [1, 1, 1, 2], [0, 0, 0, 0]).unwrap();
    let hi = GridContext::new(1, 2, [1, 1, 1, 2], [0, 0, 0, 1]).unwrap();
    let (QioPropagator::Staggered(lo), QioPropagator::Staggered(hi)) = (
        qio::parse_propagator(&buf, &lo).unwrap(),
        qio::parse_propagator(&buf, &hi).unwrap(),
    ) else {
        panic!("staggered expected");
    };
    assert_eq!(lo.info().size, [4, 4, 4, 4]);
    assert_eq!(lo.data().len(), hi.data().len());
    // Rank 1's origin is global t=4: file element (c1=0, site t=4, c2=0).
    let t4_site = 4 * 4 * 4 * 4;
    assert_eq!(lo.data()[0], Complex64::new(0.0, -1.0));
    assert_eq!(hi.data()[0], Complex64::new((t4_site * NC) as f64, -1.0));
}

#[test]
fn missing_file_metadata_is_typed() {
    let mut buf = Vec::new();
    push_record(&mut buf, "scidac-file-xml", b"<title>no private xml</title>");
    assert!(matches!(
        qio::parse_propagator(&buf, &GridContext::single()),
        Err(ConfluenceError::MissingRecord(_))
    ));
}

#[test]
fn unknown_typesize_is_typed() {
    let mut buf = Vec::new();
    push_record(
        &mut buf,
        "scidac-private-file-xml",
        file_xml([4, 4, 4, 4]).as_bytes(),
    );
    push_record(&mut buf, "scidac-private-record-xml", b"<r>source</r>");
    push_record(
        &mut buf,
        "scidac-private-record-xml",
        b"<r><precision>D</precision><colors>3</colors><typesize>100</typesize>\
          <datacount>1</datacount></r>",
    );
    assert!(matches!(
        qio::parse_propagator(&buf, &GridContext::single()),
        Err(ConfluenceError::UnsupportedTypesize(100))
    ));
}

#[test]
fn corrupt_magic_reports_its_offset() {
    let mut buf = synth_file([4, 4, 4, 4], true, 8);
    // Corrupt the second record's header (first header is at 0; first
    // payload is the file XML, padded).
    let index = LimeIndex::parse(&buf).unwrap();
    let second_header = index.records()[0].1.offset + index.records()[0].1.padded_len;
    buf[second_header] ^= 0xFF;
    assert!(matches!(
        qio::parse_propagator(&buf, &GridContext::single()),
        Err(ConfluenceError::MalformedMagic(at)) if at == second_header
    ));
}

#[test]
fn read_propagator_loads_from_disk() {
    let path = std::env::temp_dir().join(format!(
        "confluence_qio_{}_{}.lime",
        std::process::id(),
        line!()
    ));
    std::fs::write(&path, synth_file([4, 4, 4, 4], true, 8)).unwrap();
    let prop = qio::read_propagator(&path, &GridContext::single()).unwrap();
    std::fs::remove_file(&path).ok();
    assert_eq!(prop.info().volume, 256);
}
