//! Archive header structure and tag dispatch.
//!
//! The header is a flat byte stream bounded by the declared next-header
//! size. Parsing is a recursive descent driven by one-byte property tags;
//! each structure loops until its end tag. The parser runs over an
//! [`io::Take`] so the remaining byte budget is available when sizing the
//! file list.
//!
//! [`io::Take`]: std::io::Take

use std::io::{Read, Take};

use crate::{Error, Result};

use super::files::{FileInfo, read_files_info};
use super::property_id;
use super::reader::read_u8;
use super::streams::StreamsInfo;

/// A parsed archive header: stream layout plus file metadata.
#[derive(Debug, Clone, Default)]
pub struct Header {
    /// Layout of the archive's packed streams and folders. Absent when the
    /// archive holds only empty entries.
    pub main_streams_info: Option<StreamsInfo>,
    /// File metadata, in declaration order.
    pub files_info: Vec<FileInfo>,
}

/// The two shapes the next-header region can take.
#[derive(Debug, Clone)]
pub(crate) enum RawHeader {
    /// A plain header, parsed in place.
    Plain(Header),
    /// An encoded header: a bare streams info describing how to decompress
    /// the real header.
    Encoded(StreamsInfo),
}

/// Reads the next-header region: either a plain header or the streams info
/// of an encoded header.
pub(crate) fn read_raw_header<R: Read>(r: &mut Take<R>) -> Result<RawHeader> {
    match read_u8(r)? {
        property_id::HEADER => Ok(RawHeader::Plain(read_header(r)?)),
        property_id::ENCODED_HEADER => Ok(RawHeader::Encoded(StreamsInfo::parse(r)?)),
        _ => Err(Error::UnexpectedPropertyId),
    }
}

/// Parses a header body, after the header property id.
pub(crate) fn read_header<R: Read>(r: &mut Take<R>) -> Result<Header> {
    let mut header = Header::default();
    let mut has_files_info = false;

    loop {
        match read_u8(r)? {
            property_id::ARCHIVE_PROPERTIES => {
                return Err(Error::ArchivePropertiesNotImplemented);
            }

            property_id::ADDITIONAL_STREAMS_INFO => {
                return Err(Error::AdditionalStreamsNotImplemented);
            }

            property_id::MAIN_STREAMS_INFO => {
                header.main_streams_info = Some(StreamsInfo::parse(r)?);
            }

            property_id::FILES_INFO => {
                header.files_info = read_files_info(r)?;
                has_files_info = true;
            }

            property_id::END => {
                if header.main_streams_info.is_none() && !has_files_info {
                    return Err(Error::UnexpectedPropertyId);
                }
                return Ok(header);
            }

            _ => return Err(Error::UnexpectedPropertyId),
        }
    }
}
