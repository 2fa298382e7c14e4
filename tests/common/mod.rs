//! Shared test helpers: byte-level assembly of minimal 7z archives.
//!
//! The helpers build archives with a single copy-coder folder, which is
//! enough to exercise the header parser, the codec graph, and the
//! sub-stream sequencer without an external compressor.
//!
//! Note: `#![allow(dead_code)]` is required because each integration test
//! file compiles as a separate crate and may only use a subset of these
//! helpers.

#![allow(dead_code)]

use sevenstream::checksum::Crc32;
use sevenstream::format::reader::write_number;

/// One archive entry: a file body, an empty file, or a directory.
#[derive(Debug, Clone, Copy)]
pub enum Entry<'a> {
    /// A regular file with the given body.
    File(&'a str, &'a [u8]),
    /// A zero-length file (empty stream, empty-file bit set).
    EmptyFile(&'a str),
    /// A directory (empty stream, empty-file bit clear).
    Dir(&'a str),
}

impl Entry<'_> {
    fn name(&self) -> &str {
        match self {
            Entry::File(name, _) => name,
            Entry::EmptyFile(name) => name,
            Entry::Dir(name) => name,
        }
    }

    fn body(&self) -> Option<&[u8]> {
        match self {
            Entry::File(_, body) if !body.is_empty() => Some(body),
            _ => None,
        }
    }

    fn is_empty_stream(&self) -> bool {
        self.body().is_none()
    }

    fn is_empty_file(&self) -> bool {
        matches!(self, Entry::File(_, b) if b.is_empty()) || matches!(self, Entry::EmptyFile(_))
    }
}

pub fn number(buf: &mut Vec<u8>, value: u64) {
    write_number(buf, value).unwrap();
}

fn utf16(buf: &mut Vec<u8>, s: &str) {
    for unit in s.encode_utf16() {
        buf.extend_from_slice(&unit.to_le_bytes());
    }
    buf.extend_from_slice(&[0, 0]);
}

fn bit_vector(bits: &[bool]) -> Vec<u8> {
    let mut bytes = vec![0u8; bits.len().div_ceil(8)];
    for (i, &bit) in bits.iter().enumerate() {
        if bit {
            bytes[i / 8] |= 0x80 >> (i % 8);
        }
    }
    bytes
}

/// Serialises the streams section for one copy-coder folder holding the
/// concatenation of `bodies`. `coder_id` is normally 0x00 (copy); tests
/// can substitute an unknown id.
fn streams_info(bodies: &[&[u8]], coder_id: u8) -> Vec<u8> {
    let total: u64 = bodies.iter().map(|b| b.len() as u64).sum();

    let mut out = Vec::new();

    // Pack info: one packed stream right at the data start.
    out.push(0x06);
    number(&mut out, 0); // pack position
    number(&mut out, 1); // stream count
    out.push(0x09); // sizes
    number(&mut out, total);
    out.push(0x00);

    // Unpack info: one folder, one simple coder.
    out.push(0x07);
    out.push(0x0B); // folder
    number(&mut out, 1);
    out.push(0x00); // not external
    number(&mut out, 1); // one coder
    out.push(0x01); // flags: 1-byte id, simple, no attributes
    out.push(coder_id);
    out.push(0x0C); // coders unpack size
    number(&mut out, total);
    out.push(0x00);

    // Sub-streams info: per-file sizes and CRCs.
    out.push(0x08);
    if bodies.len() > 1 {
        out.push(0x0D); // stream count per folder
        number(&mut out, bodies.len() as u64);
        out.push(0x09); // sizes; the last is implicit
        for body in &bodies[..bodies.len() - 1] {
            number(&mut out, body.len() as u64);
        }
    }
    out.push(0x0A); // digests
    out.push(0x01); // all defined
    for body in bodies {
        out.extend_from_slice(&Crc32::compute(body).to_le_bytes());
    }
    out.push(0x00);

    out.push(0x00); // end of streams info
    out
}

/// Serialises the files section for the given entries.
fn files_info(entries: &[Entry<'_>]) -> Vec<u8> {
    let mut out = Vec::new();
    out.push(0x05);
    number(&mut out, entries.len() as u64);

    let empty_bits: Vec<bool> = entries.iter().map(|e| e.is_empty_stream()).collect();
    if empty_bits.iter().any(|&b| b) {
        let bytes = bit_vector(&empty_bits);
        out.push(0x0E);
        number(&mut out, bytes.len() as u64);
        out.extend_from_slice(&bytes);

        let empty_file_bits: Vec<bool> = entries
            .iter()
            .filter(|e| e.is_empty_stream())
            .map(|e| e.is_empty_file())
            .collect();
        if empty_file_bits.iter().any(|&b| b) {
            let bytes = bit_vector(&empty_file_bits);
            out.push(0x0F);
            number(&mut out, bytes.len() as u64);
            out.extend_from_slice(&bytes);
        }
    }

    let mut names = vec![0x00u8]; // inline
    for entry in entries {
        utf16(&mut names, entry.name());
    }
    out.push(0x11);
    number(&mut out, names.len() as u64);
    out.extend_from_slice(&names);

    out.push(0x00);
    out
}

/// Serialises a plain header for the given entries.
fn plain_header(entries: &[Entry<'_>], coder_id: u8) -> Vec<u8> {
    let bodies: Vec<&[u8]> = entries.iter().filter_map(|e| e.body()).collect();

    let mut header = vec![0x01u8];
    if !bodies.is_empty() {
        header.push(0x04); // main streams info
        header.extend_from_slice(&streams_info(&bodies, coder_id));
    }
    header.extend_from_slice(&files_info(entries));
    header.push(0x00);
    header
}

/// Prepends a signature header to packed data plus a next-header region.
fn assemble(packed: &[u8], next_header: &[u8]) -> Vec<u8> {
    let mut start_header = Vec::with_capacity(20);
    start_header.extend_from_slice(&(packed.len() as u64).to_le_bytes());
    start_header.extend_from_slice(&(next_header.len() as u64).to_le_bytes());
    start_header.extend_from_slice(&Crc32::compute(next_header).to_le_bytes());

    let mut archive = Vec::new();
    archive.extend_from_slice(&[0x37, 0x7A, 0xBC, 0xAF, 0x27, 0x1C]);
    archive.extend_from_slice(&[0x00, 0x04]);
    archive.extend_from_slice(&Crc32::compute(&start_header).to_le_bytes());
    archive.extend_from_slice(&start_header);
    archive.extend_from_slice(packed);
    archive.extend_from_slice(next_header);
    archive
}

/// Builds an archive whose files are stored uncompressed in one folder.
pub fn build_archive(entries: &[Entry<'_>]) -> Vec<u8> {
    build_archive_with_coder(entries, 0x00)
}

/// Like [`build_archive`], with a substitute coder id for the folder.
pub fn build_archive_with_coder(entries: &[Entry<'_>], coder_id: u8) -> Vec<u8> {
    let packed: Vec<u8> = entries
        .iter()
        .filter_map(|e| e.body())
        .flat_map(|b| b.iter().copied())
        .collect();
    assemble(&packed, &plain_header(entries, coder_id))
}

/// Builds an archive whose next-header region is an encoded header: the
/// plain header bytes are stored as a copy-coder folder after the file
/// data, and the next-header region holds only the describing streams
/// info.
pub fn build_archive_encoded_header(entries: &[Entry<'_>]) -> Vec<u8> {
    let packed: Vec<u8> = entries
        .iter()
        .filter_map(|e| e.body())
        .flat_map(|b| b.iter().copied())
        .collect();
    let header = plain_header(entries, 0x00);

    let mut encoded = vec![0x17u8];
    // Pack info: the stored header sits right after the file data.
    encoded.push(0x06);
    number(&mut encoded, packed.len() as u64);
    number(&mut encoded, 1);
    encoded.push(0x09);
    number(&mut encoded, header.len() as u64);
    encoded.push(0x00);
    // Unpack info: one copy-coder folder with a folder-level CRC.
    encoded.push(0x07);
    encoded.push(0x0B);
    number(&mut encoded, 1);
    encoded.push(0x00);
    number(&mut encoded, 1);
    encoded.push(0x01);
    encoded.push(0x00);
    encoded.push(0x0C);
    number(&mut encoded, header.len() as u64);
    encoded.push(0x0A);
    encoded.push(0x01);
    encoded.extend_from_slice(&Crc32::compute(&header).to_le_bytes());
    encoded.push(0x00);
    encoded.push(0x00);

    let mut region = packed;
    region.extend_from_slice(&header);
    assemble(&region, &encoded)
}

/// Builds an archive whose single file runs through a two-coder chain:
/// the packed stream holds delta-encoded bytes fed through a copy coder
/// into the delta filter. `decoded` is the expected plaintext.
pub fn build_delta_chain_archive(name: &str, deltas: &[u8], decoded: &[u8]) -> Vec<u8> {
    let mut header = vec![0x01u8, 0x04];

    // Pack info.
    header.push(0x06);
    number(&mut header, 0);
    number(&mut header, 1);
    header.push(0x09);
    number(&mut header, deltas.len() as u64);
    header.push(0x00);

    // Unpack info: one folder, coders [delta, copy], copy's output bound
    // to delta's input. The single packed index is derived, not stored.
    header.push(0x07);
    header.push(0x0B);
    number(&mut header, 1);
    header.push(0x00);
    number(&mut header, 2);
    header.push(0x21); // delta: 1-byte id, has attributes
    header.push(0x03);
    number(&mut header, 1);
    header.push(0x00); // distance 1
    header.push(0x01); // copy
    header.push(0x00);
    number(&mut header, 0); // bind pair: delta input slot 0
    number(&mut header, 1); // takes copy output slot 1
    header.push(0x0C); // unpack size per output slot
    number(&mut header, decoded.len() as u64);
    number(&mut header, deltas.len() as u64);
    header.push(0x00);

    // Sub-streams: one file with the plaintext CRC.
    header.push(0x08);
    header.push(0x0A);
    header.push(0x01);
    header.extend_from_slice(&Crc32::compute(decoded).to_le_bytes());
    header.push(0x00);

    header.push(0x00); // end of streams info
    header.extend_from_slice(&files_info(&[Entry::File(name, decoded)]));
    header.push(0x00);

    assemble(deltas, &header)
}

/// Builds a valid archive with zero entries via an empty next header.
pub fn build_empty_archive() -> Vec<u8> {
    assemble(&[], &[])
}

/// Rewrites the signature header's start-header CRC so hand-patched
/// next-header fields still validate.
pub fn fix_start_header_crc(archive: &mut [u8]) {
    let crc = Crc32::compute(&archive[12..32]);
    archive[8..12].copy_from_slice(&crc.to_le_bytes());
}
