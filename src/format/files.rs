//! File metadata structures and parsing.

use std::io::{Read, Take};

use crate::timestamp::Timestamp;
use crate::{Error, Result};

use super::property_id;
use super::reader::{
    read_bool_vector, read_name, read_number, read_number_usize, read_optional_bool_vector,
    read_u8, read_u32, read_u64,
};

/// Metadata for one archived entry.
///
/// Parsed once when the archive is opened; read-only afterwards. An entry
/// with `is_empty_stream` set has no associated sub-stream: it is a
/// directory, an empty file (`is_empty_file`), or a deletion marker
/// (`is_anti_file`).
#[derive(Debug, Clone, Default)]
pub struct FileInfo {
    /// Entry path within the archive.
    pub name: String,
    /// Windows file attributes, when stored.
    pub attributes: Option<u32>,
    /// Creation time, when stored.
    pub created: Option<Timestamp>,
    /// Last access time, when stored.
    pub accessed: Option<Timestamp>,
    /// Last modification time, when stored.
    pub modified: Option<Timestamp>,
    /// The entry has no associated sub-stream.
    pub is_empty_stream: bool,
    /// The entry is a zero-length file rather than a directory.
    pub is_empty_file: bool,
    /// The entry marks a file for deletion when applied as an incremental
    /// update.
    pub is_anti_file: bool,
}

impl FileInfo {
    /// Returns `true` if this entry has a data sub-stream.
    pub fn has_stream(&self) -> bool {
        !self.is_empty_stream
    }

    /// Returns `true` if this entry is a directory.
    pub fn is_dir(&self) -> bool {
        self.is_empty_stream && !self.is_empty_file
    }
}

/// Parses the files info structure.
///
/// The reader is positioned after the files-info property id. The declared
/// file count is capped by the remaining header byte budget: each entry
/// needs at least a name terminator and a share of the bit vectors, so a
/// count above `remaining / 3` cannot be honest.
pub(crate) fn read_files_info<R: Read>(r: &mut Take<R>) -> Result<Vec<FileInfo>> {
    let max_files = (r.limit() / 3) as usize;
    let num_files = read_number_usize(r)?;
    if num_files > max_files {
        return Err(Error::InvalidFileCount);
    }

    let mut files = vec![FileInfo::default(); num_files];
    let mut num_empty_streams = 0usize;

    loop {
        let id = read_u8(r)?;
        if id == property_id::END {
            return Ok(files);
        }

        let size = read_number(r)?;

        match id {
            property_id::EMPTY_STREAM => {
                let (empty, count) = read_bool_vector(r, num_files)?;
                num_empty_streams = count;
                for (file, is_empty) in files.iter_mut().zip(empty) {
                    file.is_empty_stream = is_empty;
                }
            }

            // Both vectors cover only the empty-stream entries, in file
            // order.
            property_id::EMPTY_FILE | property_id::ANTI => {
                let (bits, _) = read_bool_vector(r, num_empty_streams)?;
                let mut bits = bits.into_iter();
                for file in files.iter_mut().filter(|f| f.is_empty_stream) {
                    let bit = bits.next().unwrap_or(false);
                    match id {
                        property_id::EMPTY_FILE => file.is_empty_file = bit,
                        _ => file.is_anti_file = bit,
                    }
                }
            }

            property_id::CTIME | property_id::ATIME | property_id::MTIME => {
                let times = read_datetime_vector(r, num_files)?;
                for (file, time) in files.iter_mut().zip(times) {
                    match id {
                        property_id::CTIME => file.created = time,
                        property_id::ATIME => file.accessed = time,
                        _ => file.modified = time,
                    }
                }
            }

            property_id::NAME => {
                let external = read_u8(r)?;
                if external != 0 {
                    return Err(Error::AdditionalStreamsNotImplemented);
                }
                for file in files.iter_mut() {
                    file.name = read_name(r)?;
                }
            }

            property_id::WIN_ATTRIBUTES => {
                let attributes = read_attribute_vector(r, num_files)?;
                for (file, attr) in files.iter_mut().zip(attributes) {
                    file.attributes = attr;
                }
            }

            property_id::DUMMY => {
                for _ in 0..size {
                    read_u8(r)?;
                }
            }

            property_id::START_POS => return Err(Error::UnexpectedPropertyId),

            _ => return Err(Error::UnexpectedPropertyId),
        }
    }
}

/// Reads a vector of optional FILETIME timestamps.
fn read_datetime_vector<R: Read>(r: &mut R, count: usize) -> Result<Vec<Option<Timestamp>>> {
    let (defined, _) = read_optional_bool_vector(r, count)?;

    let external = read_u8(r)?;
    if external != 0 {
        return Err(Error::AdditionalStreamsNotImplemented);
    }

    let mut times = Vec::with_capacity(count);
    for has_time in defined {
        if has_time {
            times.push(Some(Timestamp::from_filetime(read_u64(r)?)));
        } else {
            times.push(None);
        }
    }

    Ok(times)
}

/// Reads a vector of optional u32 attributes.
fn read_attribute_vector<R: Read>(r: &mut R, count: usize) -> Result<Vec<Option<u32>>> {
    let (defined, _) = read_optional_bool_vector(r, count)?;

    let external = read_u8(r)?;
    if external != 0 {
        return Err(Error::AdditionalStreamsNotImplemented);
    }

    let mut attributes = Vec::with_capacity(count);
    for has_attr in defined {
        if has_attr {
            attributes.push(Some(read_u32(r)?));
        } else {
            attributes.push(None);
        }
    }

    Ok(attributes)
}
