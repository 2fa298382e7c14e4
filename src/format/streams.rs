//! Streams info structures: packed streams, folders, coders, sub-streams.
//!
//! These structures describe where the compressed data lives in the archive
//! and how folders (solid blocks) are assembled from coders, bind pairs and
//! packed streams.

use std::io::Read;

use crate::{Error, Result};

use super::limits;
use super::property_id;
use super::reader::{
    read_bytes, read_digests, read_number, read_number_usize, read_u8, read_u8_expect,
};

/// Location and sizes of the packed streams.
#[derive(Debug, Clone, Default)]
pub struct PackInfo {
    /// Byte offset of the first packed stream, relative to the end of the
    /// signature header.
    pub pack_pos: u64,
    /// Size of each packed stream, in consumption order.
    pub pack_sizes: Vec<u64>,
}

impl PackInfo {
    /// Parses a pack info structure.
    ///
    /// The reader is positioned after the pack-info property id.
    pub(crate) fn parse<R: Read>(r: &mut R) -> Result<Self> {
        let pack_pos = read_number(r)?;
        let num_pack_streams = read_number_usize(r)?;

        let mut pack_sizes = Vec::new();
        loop {
            match read_u8(r)? {
                property_id::END => break,

                property_id::SIZE => {
                    pack_sizes.reserve(num_pack_streams);
                    for _ in 0..num_pack_streams {
                        pack_sizes.push(read_number(r)?);
                    }
                }

                // The format defines per-packed-stream CRCs, but no known
                // producer emits them.
                property_id::CRC => return Err(Error::PackInfoCrcsNotImplemented),

                _ => return Err(Error::UnexpectedPropertyId),
            }
        }

        Ok(Self {
            pack_pos,
            pack_sizes,
        })
    }
}

/// A single coder within a folder.
#[derive(Debug, Clone)]
pub struct Coder {
    /// Codec id, decoded big-endian from its 0-15 id bytes.
    pub method: u64,
    /// Codec property blob (empty when absent).
    pub properties: Vec<u8>,
    /// Number of input streams (1..=4).
    pub num_in_streams: usize,
    /// Number of output streams (1..=4).
    pub num_out_streams: usize,
}

impl Coder {
    fn parse<R: Read>(r: &mut R) -> Result<Self> {
        let flags = read_u8(r)?;

        let id_size = (flags & 0x0F) as usize;
        let is_complex = flags & 0x10 != 0;
        let has_attributes = flags & 0x20 != 0;

        let mut method = 0u64;
        for byte in read_bytes(r, id_size)? {
            method = (method << 8) | byte as u64;
        }

        let (num_in_streams, num_out_streams) = if is_complex {
            let num_in = read_number_usize(r)?;
            if num_in == 0 || num_in > limits::MAX_IN_OUT_STREAMS {
                return Err(Error::InvalidStreamCount);
            }
            let num_out = read_number_usize(r)?;
            if num_out == 0 || num_out > limits::MAX_IN_OUT_STREAMS {
                return Err(Error::InvalidStreamCount);
            }
            (num_in, num_out)
        } else {
            (1, 1)
        };

        let properties = if has_attributes {
            let size = read_number_usize(r)?;
            if size == 0 || size > limits::MAX_PROPERTY_DATA_SIZE {
                return Err(Error::InvalidPropertyDataSize);
            }
            read_bytes(r, size)?
        } else {
            Vec::new()
        };

        Ok(Self {
            method,
            properties,
            num_in_streams,
            num_out_streams,
        })
    }
}

/// An edge wiring one coder's output slot to another coder's input slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BindPair {
    /// Global input slot index across the folder's coders.
    pub in_index: usize,
    /// Global output slot index across the folder's coders.
    pub out_index: usize,
}

/// A folder: one solid block's coder graph declaration.
#[derive(Debug, Clone, Default)]
pub struct Folder {
    /// Coders in declaration order.
    pub coders: Vec<Coder>,
    /// Bind pairs; always `coders.len() - 1` entries.
    pub bind_pairs: Vec<BindPair>,
    /// Input slot index fed by each packed stream, in consumption order.
    pub packed_indices: Vec<usize>,
    /// Unpack size of each output slot, in slot order.
    pub unpack_sizes: Vec<u64>,
    /// CRC of the folder's final output; 0 means undefined.
    pub unpack_crc: u32,
}

impl Folder {
    fn parse<R: Read>(r: &mut R) -> Result<Self> {
        let num_coders = read_number_usize(r)?;
        if num_coders == 0 || num_coders > limits::MAX_CODERS_IN_FOLDER {
            return Err(Error::InvalidFolderCount);
        }

        let mut coders = Vec::with_capacity(num_coders);
        for _ in 0..num_coders {
            coders.push(Coder::parse(r)?);
        }

        let mut bind_pairs = Vec::with_capacity(num_coders - 1);
        for _ in 0..num_coders - 1 {
            bind_pairs.push(BindPair {
                in_index: read_number_usize(r)?,
                out_index: read_number_usize(r)?,
            });
        }

        let mut folder = Self {
            coders,
            bind_pairs,
            packed_indices: Vec::new(),
            unpack_sizes: Vec::new(),
            unpack_crc: 0,
        };

        let total_in = folder.total_in_streams();
        let num_packed = total_in
            .checked_sub(folder.bind_pairs.len())
            .ok_or(Error::InvalidStreamCount)?;

        if num_packed > 1 {
            if num_packed > limits::MAX_PACKED_STREAMS_IN_FOLDER {
                return Err(Error::InvalidPackedStreamsCount);
            }
            for _ in 0..num_packed {
                folder.packed_indices.push(read_number_usize(r)?);
            }
        } else if num_packed == 1 {
            // With a single packed stream its index is not stored: it is
            // the one input slot no bind pair feeds.
            for i in 0..total_in {
                if folder.find_bind_pair_for_in_stream(i).is_none() {
                    folder.packed_indices.push(i);
                    break;
                }
            }
        }

        Ok(folder)
    }

    /// Returns the total number of input slots across all coders.
    pub fn total_in_streams(&self) -> usize {
        self.coders.iter().map(|c| c.num_in_streams).sum()
    }

    /// Returns the total number of output slots across all coders.
    pub fn total_out_streams(&self) -> usize {
        self.coders.iter().map(|c| c.num_out_streams).sum()
    }

    /// Finds the bind pair feeding the given input slot.
    pub fn find_bind_pair_for_in_stream(&self, in_index: usize) -> Option<&BindPair> {
        self.bind_pairs.iter().find(|bp| bp.in_index == in_index)
    }

    /// Finds the bind pair consuming the given output slot.
    pub fn find_bind_pair_for_out_stream(&self, out_index: usize) -> Option<&BindPair> {
        self.bind_pairs.iter().find(|bp| bp.out_index == out_index)
    }

    /// Returns the folder's final unpack size: the size of the one output
    /// slot no bind pair consumes.
    pub fn unpack_size(&self) -> u64 {
        for (i, &size) in self.unpack_sizes.iter().enumerate() {
            if self.find_bind_pair_for_out_stream(i).is_none() {
                return size;
            }
        }
        0
    }

    /// Returns `(first_in_slot, first_out_slot)` for each coder.
    pub fn coder_slot_offsets(&self) -> Vec<(usize, usize)> {
        let mut offsets = Vec::with_capacity(self.coders.len());
        let mut in_offset = 0;
        let mut out_offset = 0;
        for coder in &self.coders {
            offsets.push((in_offset, out_offset));
            in_offset += coder.num_in_streams;
            out_offset += coder.num_out_streams;
        }
        offsets
    }
}

/// Folder definitions plus per-folder unpack sizes and CRCs.
#[derive(Debug, Clone, Default)]
pub struct UnpackInfo {
    /// The archive's folders, in order.
    pub folders: Vec<Folder>,
}

impl UnpackInfo {
    /// Parses an unpack info structure.
    ///
    /// The reader is positioned after the unpack-info property id.
    pub(crate) fn parse<R: Read>(r: &mut R) -> Result<Self> {
        read_u8_expect(r, property_id::FOLDER)?;

        let num_folders = read_number_usize(r)?;
        if num_folders as u64 > limits::MAX_FOLDER_COUNT {
            return Err(Error::InvalidFolderCount);
        }

        let external = read_u8(r)?;
        if external != 0 {
            return Err(Error::AdditionalStreamsNotImplemented);
        }

        let mut folders = Vec::with_capacity(num_folders.min(1024));
        for _ in 0..num_folders {
            folders.push(Folder::parse(r)?);
        }

        read_u8_expect(r, property_id::CODERS_UNPACK_SIZE)?;
        for folder in &mut folders {
            let num_sizes = folder.total_out_streams();
            folder.unpack_sizes.reserve(num_sizes);
            for _ in 0..num_sizes {
                folder.unpack_sizes.push(read_number(r)?);
            }
        }

        let mut id = read_u8(r)?;
        if id == property_id::CRC {
            let crcs = read_digests(r, folders.len())?;
            for (folder, crc) in folders.iter_mut().zip(crcs) {
                folder.unpack_crc = crc;
            }
            id = read_u8(r)?;
        }

        if id != property_id::END {
            return Err(Error::UnexpectedPropertyId);
        }

        Ok(Self { folders })
    }
}

/// Sub-stream layout within folders.
///
/// In solid archives several files share one folder; this structure carries
/// how many sub-streams each folder holds, their sizes, and their CRCs.
#[derive(Debug, Clone, Default)]
pub struct SubStreamsInfo {
    /// Number of sub-streams in each folder.
    pub num_unpack_streams_in_folders: Vec<usize>,
    /// Size of every sub-stream, across folders in order.
    pub unpack_sizes: Vec<u64>,
    /// CRC of every sub-stream, across folders in order; 0 means no check.
    pub digests: Vec<u32>,
}

impl SubStreamsInfo {
    /// Parses a sub-streams info structure.
    ///
    /// The reader is positioned after the substreams-info property id.
    pub(crate) fn parse<R: Read>(r: &mut R, folders: &[Folder]) -> Result<Self> {
        let mut id = read_u8(r)?;

        let mut counts = vec![1usize; folders.len()];
        if id == property_id::NUM_UNPACK_STREAM {
            for count in counts.iter_mut() {
                *count = read_number_usize(r)?;
            }
            id = read_u8(r)?;
        }

        // For each folder the sizes of the first N-1 sub-streams are
        // stored; the last is the remainder of the folder's unpack size.
        let mut unpack_sizes = Vec::new();
        for (folder, &count) in folders.iter().zip(counts.iter()) {
            if count == 0 {
                continue;
            }
            let mut sum = 0u64;
            if id == property_id::SIZE {
                for _ in 1..count {
                    let size = read_number(r)?;
                    sum = sum.saturating_add(size);
                    unpack_sizes.push(size);
                }
            }
            unpack_sizes.push(folder.unpack_size().saturating_sub(sum));
        }
        if id == property_id::SIZE {
            id = read_u8(r)?;
        }

        // CRCs are stored only for sub-streams the folder CRC cannot
        // vouch for: folders with more than one sub-stream, or with no
        // folder-level CRC at all.
        let mut num_digests = 0usize;
        for (folder, &count) in folders.iter().zip(counts.iter()) {
            if count != 1 || folder.unpack_crc == 0 {
                num_digests += count;
            }
        }

        let mut digests = Vec::new();
        if id == property_id::CRC {
            let stored = read_digests(r, num_digests)?;
            let mut stored = stored.into_iter();
            for (folder, &count) in folders.iter().zip(counts.iter()) {
                if count == 1 && folder.unpack_crc != 0 {
                    digests.push(folder.unpack_crc);
                } else {
                    for _ in 0..count {
                        digests.push(stored.next().unwrap_or(0));
                    }
                }
            }
            id = read_u8(r)?;
        }

        if id != property_id::END {
            return Err(Error::UnexpectedPropertyId);
        }

        if digests.is_empty() {
            for (folder, &count) in folders.iter().zip(counts.iter()) {
                if count == 1 {
                    digests.push(folder.unpack_crc);
                } else {
                    digests.extend(std::iter::repeat(0).take(count));
                }
            }
        }

        Ok(Self {
            num_unpack_streams_in_folders: counts,
            unpack_sizes,
            digests,
        })
    }

    /// Returns the total sub-stream count across all folders.
    pub fn total_streams(&self) -> usize {
        self.num_unpack_streams_in_folders.iter().sum()
    }
}

/// The streams section of an archive header.
#[derive(Debug, Clone)]
pub struct StreamsInfo {
    /// Packed stream locations.
    pub pack_info: PackInfo,
    /// Folder definitions.
    pub unpack_info: UnpackInfo,
    /// Sub-stream layout, absent when every folder holds one file.
    pub substreams_info: Option<SubStreamsInfo>,
}

impl StreamsInfo {
    /// Parses a streams info structure.
    ///
    /// The reader is positioned after the streams-info property id. Both
    /// pack info and unpack info must appear before the terminator, and
    /// sub-streams info cannot precede unpack info.
    pub(crate) fn parse<R: Read>(r: &mut R) -> Result<Self> {
        let mut pack_info = None;
        let mut unpack_info: Option<UnpackInfo> = None;
        let mut substreams_info = None;

        loop {
            match read_u8(r)? {
                property_id::PACK_INFO => {
                    pack_info = Some(PackInfo::parse(r)?);
                }

                property_id::UNPACK_INFO => {
                    unpack_info = Some(UnpackInfo::parse(r)?);
                }

                property_id::SUBSTREAMS_INFO => {
                    let folders = match &unpack_info {
                        Some(ui) => &ui.folders,
                        None => return Err(Error::UnexpectedPropertyId),
                    };
                    substreams_info = Some(SubStreamsInfo::parse(r, folders)?);
                }

                property_id::END => {
                    return match (pack_info, unpack_info) {
                        (Some(pack_info), Some(unpack_info)) => Ok(Self {
                            pack_info,
                            unpack_info,
                            substreams_info,
                        }),
                        _ => Err(Error::UnexpectedPropertyId),
                    };
                }

                _ => return Err(Error::UnexpectedPropertyId),
            }
        }
    }
}
