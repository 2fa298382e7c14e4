//! The streaming archive reader.
//!
//! [`Reader`] bootstraps an archive (decoding the header through the codec
//! graph when it is compressed), then iterates files in declared order.
//! [`Reader::next_entry`] yields the next [`FileInfo`]; the reader's
//! [`Read`] implementation delivers the current file's bytes.

mod options;
mod section;

use std::fs::File;
use std::io::{self, Cursor, Read, Seek, SeekFrom};
use std::path::Path;
use std::sync::{Arc, Mutex};

use crate::checksum::Crc32;
use crate::codec;
use crate::format::files::FileInfo;
use crate::format::header::SignatureHeader;
use crate::format::parser::{Header, RawHeader, read_raw_header};
use crate::format::streams::{Folder, StreamsInfo};
use crate::format::{SIGNATURE_HEADER_SIZE, limits};
use crate::solid::{Binder, SolidBlock};
use crate::{Error, READ_BUFFER_SIZE, Result};

pub use options::ReaderOptions;
#[cfg(feature = "aes")]
pub use options::PasswordCallback;

use section::SectionReader;

/// Everything needed to open one folder's codec graph on demand.
#[derive(Debug, Clone)]
struct BlockPlan {
    folder: Folder,
    /// Absolute source offset of each packed stream, in consumption order.
    pack_offsets: Vec<u64>,
    pack_sizes: Vec<u64>,
    /// Sub-stream sizes within this folder.
    sizes: Vec<u64>,
    /// Sub-stream CRCs; 0 means no check.
    crcs: Vec<u32>,
}

/// A streaming 7z archive reader.
///
/// Files are yielded in the exact order declared in the archive; within a
/// file, bytes are delivered in stream order. Folders are decoded lazily:
/// a folder's codec graph is built on the first [`next_entry`] that enters
/// it and torn down when iteration moves past it.
///
/// # Example
///
/// ```rust,no_run
/// use std::io::Read;
/// use sevenstream::Reader;
///
/// let mut reader = Reader::open_path("archive.7z")?;
/// while let Some(entry) = reader.next_entry()? {
///     let mut body = Vec::new();
///     if entry.has_stream() {
///         reader.read_to_end(&mut body)?;
///     }
///     println!("{}: {} bytes", entry.name, body.len());
/// }
/// # Ok::<(), sevenstream::Error>(())
/// ```
///
/// [`next_entry`]: Self::next_entry
pub struct Reader<R> {
    source: Arc<Mutex<R>>,
    options: Arc<ReaderOptions>,
    files: Vec<FileInfo>,
    plans: Vec<BlockPlan>,
    block: Option<SolidBlock>,
    folder_index: usize,
    file_index: usize,
    current_has_stream: bool,
    err: Option<Error>,
}

impl Reader<File> {
    /// Opens the 7z archive at the given path.
    pub fn open_path(path: impl AsRef<Path>) -> Result<Self> {
        Self::open_path_with_options(path, ReaderOptions::default())
    }

    /// Opens the 7z archive at the given path with options.
    pub fn open_path_with_options(
        path: impl AsRef<Path>,
        options: ReaderOptions,
    ) -> Result<Self> {
        let file = File::open(path)?;
        let size = file.metadata()?.len();
        Self::with_options(file, size, options)
    }
}

impl<R: Read + Seek + Send + 'static> Reader<R> {
    /// Creates a reader over a random-access source of known size.
    pub fn new(source: R, size: u64) -> Result<Self> {
        Self::with_options(source, size, ReaderOptions::default())
    }

    /// Creates a reader over a random-access source with options.
    pub fn with_options(mut source: R, size: u64, options: ReaderOptions) -> Result<Self> {
        let options = Arc::new(options);

        source.seek(SeekFrom::Start(0))?;
        let signature = SignatureHeader::parse(&mut source, options.ignores_checksum())?;

        let header_end = SIGNATURE_HEADER_SIZE
            .checked_add(signature.next_header_offset)
            .and_then(|pos| pos.checked_add(signature.next_header_size))
            .ok_or(Error::UnexpectedEof)?;
        if header_end > size {
            return Err(Error::UnexpectedEof);
        }

        let source = Arc::new(Mutex::new(source));

        let header = if signature.next_header_size == 0 {
            Header::default()
        } else {
            read_header_region(&source, &options, &signature)?
        };

        log::debug!(
            "opened archive: {} entries, {} folders",
            header.files_info.len(),
            header
                .main_streams_info
                .as_ref()
                .map_or(0, |si| si.unpack_info.folders.len())
        );

        let plans = match &header.main_streams_info {
            Some(streams_info) => block_plans(streams_info)?,
            None => Vec::new(),
        };

        Ok(Self {
            source,
            options,
            files: header.files_info,
            plans,
            block: None,
            folder_index: 0,
            file_index: 0,
            current_has_stream: false,
            err: None,
        })
    }

    /// Advances to the next entry.
    ///
    /// Returns `Ok(None)` once all entries are exhausted. Entries without a
    /// data stream (directories, empty files, anti-files) consume no
    /// sub-stream. The first error is sticky: it is returned again on
    /// every subsequent call.
    pub fn next_entry(&mut self) -> Result<Option<FileInfo>> {
        if let Some(err) = &self.err {
            return Err(err.clone());
        }
        match self.advance() {
            Ok(entry) => Ok(entry),
            Err(err) => {
                self.err = Some(err.clone());
                Err(err)
            }
        }
    }

    fn advance(&mut self) -> Result<Option<FileInfo>> {
        let Some(info) = self.files.get(self.file_index) else {
            return Ok(None);
        };
        let info = info.clone();
        self.file_index += 1;

        self.current_has_stream = info.has_stream();
        if !self.current_has_stream {
            return Ok(Some(info));
        }

        loop {
            if self.block.is_none() {
                if self.folder_index >= self.plans.len() {
                    return Ok(None);
                }
                log::debug!(
                    "entering folder {} ({} coders)",
                    self.folder_index,
                    self.plans[self.folder_index].folder.coders.len()
                );
                self.block = Some(self.open_block(self.folder_index)?);
            }

            let advanced = match self.block.as_mut() {
                Some(block) => block.next()?,
                None => false,
            };
            if advanced {
                return Ok(Some(info));
            }

            // Folder exhausted: drop its graph (and its pooled buffers)
            // and move on.
            self.block = None;
            self.folder_index += 1;
        }
    }

    /// Builds the codec graph and sequencer for one folder.
    fn open_block(&self, index: usize) -> Result<SolidBlock> {
        build_block(&self.source, &self.options, &self.plans[index])
    }

    fn read_data(&mut self, buf: &mut [u8]) -> Result<usize> {
        if let Some(err) = &self.err {
            return Err(err.clone());
        }
        if !self.current_has_stream {
            return Ok(0);
        }
        let Some(block) = self.block.as_mut() else {
            return Ok(0);
        };

        match block.read(buf) {
            Ok(n) => Ok(n),
            Err(err) => {
                self.err = Some(err.clone());
                Err(err)
            }
        }
    }
}

impl<R: Read + Seek + Send + 'static> Read for Reader<R> {
    /// Reads from the current file's body.
    ///
    /// Returns `Ok(0)` when the current file is exhausted (or has no
    /// stream); call [`Reader::next_entry`] to proceed.
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.read_data(buf).map_err(|err| match err {
            Error::Io(io_err) => io_err,
            other => io::Error::other(other),
        })
    }
}

/// Reads and verifies the next-header region, decoding it through the
/// codec graph when it is an encoded header.
fn read_header_region<R: Read + Seek + Send + 'static>(
    source: &Arc<Mutex<R>>,
    options: &Arc<ReaderOptions>,
    signature: &SignatureHeader,
) -> Result<Header> {
    let mut data = vec![0u8; signature.next_header_size as usize];
    {
        let mut src = source
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        src.seek(SeekFrom::Start(signature.next_header_position()))?;
        src.read_exact(&mut data).map_err(Error::from_read)?;
    }

    let actual = Crc32::compute(&data);
    if actual != signature.next_header_crc {
        if !options.ignores_checksum() {
            return Err(Error::ChecksumMismatch {
                expected: signature.next_header_crc,
                actual,
            });
        }
        log::warn!(
            "ignoring header CRC mismatch (expected {:#010x}, got {:#010x})",
            signature.next_header_crc,
            actual
        );
    }

    let len = data.len() as u64;
    let mut take = Cursor::new(data).take(len);
    match read_raw_header(&mut take)? {
        RawHeader::Plain(header) => Ok(header),
        RawHeader::Encoded(streams_info) => {
            decode_encoded_header(source, options, &streams_info)
        }
    }
}

/// Decodes an encoded header: drives a one-folder codec graph to
/// completion and parses its output as a plain header.
fn decode_encoded_header<R: Read + Seek + Send + 'static>(
    source: &Arc<Mutex<R>>,
    options: &Arc<ReaderOptions>,
    streams_info: &StreamsInfo,
) -> Result<Header> {
    let plans = block_plans(streams_info)?;
    if plans.len() != 1 {
        return Err(Error::NotSupported("encoded header folder count"));
    }
    let plan = &plans[0];

    let total: u64 = plan.sizes.iter().sum();
    if total > limits::MAX_DECODED_HEADER_SIZE {
        return Err(Error::NotSupported("encoded header size"));
    }

    let mut block = build_block(source, options, plan)?;
    if !block.next()? {
        return Err(Error::NotSupported("empty encoded header"));
    }

    let mut decoded = Vec::with_capacity(total.min(1 << 20) as usize);
    let mut buf = [0u8; READ_BUFFER_SIZE];
    loop {
        let n = block.read(&mut buf)?;
        if n == 0 {
            break;
        }
        decoded.extend_from_slice(&buf[..n]);
    }
    if block.next()? {
        return Err(Error::NotSupported("encoded header stream count"));
    }

    let len = decoded.len() as u64;
    let mut take = Cursor::new(decoded).take(len);
    match read_raw_header(&mut take)? {
        RawHeader::Plain(header) => Ok(header),
        RawHeader::Encoded(_) => Err(Error::NotSupported("nested encoded header")),
    }
}

/// Wires one folder's codec graph and wraps its sink in a sequencer.
///
/// Fails with [`Error::DecompressorNotFound`] before any wiring when a
/// coder id has no decoder, so unknown coders surface as soon as a folder
/// is entered.
fn build_block<R: Read + Seek + Send + 'static>(
    source: &Arc<Mutex<R>>,
    options: &Arc<ReaderOptions>,
    plan: &BlockPlan,
) -> Result<SolidBlock> {
    let folder = &plan.folder;

    for coder in &folder.coders {
        if !codec::is_known(coder.method) {
            return Err(Error::DecompressorNotFound {
                method: coder.method,
            });
        }
    }

    let mut binder = Binder::new();

    let offsets = folder.coder_slot_offsets();
    for (coder, &(_, out_slot)) in folder.coders.iter().zip(offsets.iter()) {
        let method = coder.method;
        let properties = coder.properties.clone();
        let unpack_size = folder.unpack_sizes.get(out_slot).copied().unwrap_or(0);
        let options = Arc::clone(options);

        binder.add_coder(
            coder.num_in_streams,
            coder.num_out_streams,
            Box::new(move |inputs| {
                codec::build_decoder(method, inputs, &properties, unpack_size, &options)
            }),
        )?;
    }

    for (k, &in_slot) in folder.packed_indices.iter().enumerate() {
        let section = SectionReader::new(
            Arc::clone(source),
            plan.pack_offsets[k],
            plan.pack_sizes[k],
        );
        binder.bind_input(in_slot, Box::new(section))?;
    }

    for bind_pair in &folder.bind_pairs {
        binder.pair(bind_pair.in_index, bind_pair.out_index)?;
    }

    let sink = binder.resolve()?;
    Ok(SolidBlock::new(sink, plan.sizes.clone(), plan.crcs.clone()))
}

/// Lays out per-folder block plans from a streams info: pack stream
/// offsets, and sub-stream sizes and CRCs.
fn block_plans(streams_info: &StreamsInfo) -> Result<Vec<BlockPlan>> {
    let folders = &streams_info.unpack_info.folders;
    let pack_info = &streams_info.pack_info;

    let (all_sizes, all_crcs, counts): (Vec<u64>, Vec<u32>, Vec<usize>) =
        match &streams_info.substreams_info {
            Some(substreams) => (
                substreams.unpack_sizes.clone(),
                substreams.digests.clone(),
                substreams.num_unpack_streams_in_folders.clone(),
            ),
            None => (
                folders.iter().map(|f| f.unpack_size()).collect(),
                folders.iter().map(|f| f.unpack_crc).collect(),
                vec![1; folders.len()],
            ),
        };

    if counts.len() != folders.len() {
        return Err(Error::InvalidStreamCount);
    }

    let mut plans = Vec::with_capacity(folders.len());
    let mut offset = SIGNATURE_HEADER_SIZE
        .checked_add(pack_info.pack_pos)
        .ok_or(Error::UnexpectedEof)?;
    let mut pack_cursor = 0usize;
    let mut stream_cursor = 0usize;

    for (folder, &count) in folders.iter().zip(counts.iter()) {
        let mut folder = folder.clone();
        if folder.packed_indices.is_empty() {
            folder.packed_indices.push(0);
        }

        let mut pack_offsets = Vec::with_capacity(folder.packed_indices.len());
        let mut pack_sizes = Vec::with_capacity(folder.packed_indices.len());
        for k in 0..folder.packed_indices.len() {
            let size = pack_info
                .pack_sizes
                .get(pack_cursor + k)
                .copied()
                .ok_or(Error::InvalidStreamCount)?;
            pack_offsets.push(offset);
            pack_sizes.push(size);
            offset = offset.checked_add(size).ok_or(Error::UnexpectedEof)?;
        }
        pack_cursor += folder.packed_indices.len();

        if stream_cursor + count > all_sizes.len() {
            return Err(Error::InvalidStreamCount);
        }
        let sizes = all_sizes[stream_cursor..stream_cursor + count].to_vec();
        let crcs = (0..count)
            .map(|i| all_crcs.get(stream_cursor + i).copied().unwrap_or(0))
            .collect();
        stream_cursor += count;

        plans.push(BlockPlan {
            folder,
            pack_offsets,
            pack_sizes,
            sizes,
            crcs,
        });
    }

    Ok(plans)
}
