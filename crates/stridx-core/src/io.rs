//! Persisted tensor container.
//!
//! Tensors are written as a small header followed by the row-major body.
//!
//! # Layout
//!
//! Native containers (written and read), all words native-endian `i32`:
//!
//! ```text
//! magic | rank | extent_0 | ... | extent_{max(rank,3)-1} | body
//! ```
//!
//! Missing trailing extents of a rank below 3 are written as 1 and ignored
//! when reading. Magic numbers:
//!
//! | magic        | element |
//! |--------------|---------|
//! | `0x1e3d4c51` | `f32`   |
//! | `0x1e3d4c53` | `f64`   |
//! | `0x1e3d4c54` | `i32` (read only) |
//! | `0x1e3d4c55` | `u8` (read only)  |
//!
//! Big-endian IDX files are also readable: a `u32` magic `0x0000TTRR` where
//! `TT` is the element code (`0x08` u8, `0x0C` i32, `0x0D` f32, `0x0E` f64)
//! and `RR` the rank, followed by exactly `rank` big-endian `u32` extents.
//!
//! Loading casts every element to the requested [`Element`] type.

use crate::element::{DType, Element};
use crate::error::{
    AllocationError, ContainerError, DimensionError, TensorError, TensorResult,
};
use crate::shape::{Dims, MAX_RANK};
use crate::tensor::Tensor;
use smallvec::SmallVec;
use std::fs::File;
use std::io::{BufReader, BufWriter, ErrorKind, Read, Write};
use std::path::Path;

/// Magic number of native `f32` containers.
pub const MAGIC_F32: i32 = 0x1e3d_4c51;
/// Magic number of native `f64` containers.
pub const MAGIC_F64: i32 = 0x1e3d_4c53;
/// Magic number of native `i32` containers.
pub const MAGIC_I32: i32 = 0x1e3d_4c54;
/// Magic number of native `u8` containers.
pub const MAGIC_U8: i32 = 0x1e3d_4c55;

const MIN_HEADER_EXTENTS: usize = 3;

/// Elements staged per `write_all` when saving.
const WRITE_CHUNK: usize = 1024;

/// Element encoding of a container body.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Encoding {
    F32,
    F64,
    I32,
    U8,
}

impl Encoding {
    /// Bytes per element.
    pub fn size_of(self) -> usize {
        match self {
            Encoding::F32 | Encoding::I32 => 4,
            Encoding::F64 => 8,
            Encoding::U8 => 1,
        }
    }

    fn native_magic(self) -> i32 {
        match self {
            Encoding::F32 => MAGIC_F32,
            Encoding::F64 => MAGIC_F64,
            Encoding::I32 => MAGIC_I32,
            Encoding::U8 => MAGIC_U8,
        }
    }

    fn from_native_magic(magic: i32) -> Option<Self> {
        match magic {
            MAGIC_F32 => Some(Encoding::F32),
            MAGIC_F64 => Some(Encoding::F64),
            MAGIC_I32 => Some(Encoding::I32),
            MAGIC_U8 => Some(Encoding::U8),
            _ => None,
        }
    }

    fn from_idx_code(code: u32) -> Option<Self> {
        match code {
            0x08 => Some(Encoding::U8),
            0x0C => Some(Encoding::I32),
            0x0D => Some(Encoding::F32),
            0x0E => Some(Encoding::F64),
            _ => None,
        }
    }

    fn of<T: Element>() -> Self {
        match T::DTYPE {
            DType::F32 => Encoding::F32,
            DType::F64 => Encoding::F64,
        }
    }
}

/// Decoded container header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Header {
    pub encoding: Encoding,
    pub extents: Dims,
    /// Whether the body is big-endian (IDX files).
    pub big_endian: bool,
}

impl Header {
    /// Number of body elements.
    pub fn element_count(&self) -> TensorResult<usize> {
        self.extents
            .iter()
            .try_fold(1usize, |acc, &e| acc.checked_mul(e))
            .ok_or_else(|| AllocationError::Overflow.into())
    }
}

fn read_word<R: Read>(reader: &mut R) -> TensorResult<[u8; 4]> {
    let mut word = [0u8; 4];
    reader.read_exact(&mut word)?;
    Ok(word)
}

fn check_container_rank(rank: usize) -> TensorResult<()> {
    if rank > MAX_RANK {
        return Err(ContainerError::RankTooLarge {
            rank,
            max: MAX_RANK,
        }
        .into());
    }
    Ok(())
}

/// Read and validate a container header.
///
/// # Errors
///
/// - [`ContainerError::UnknownMagic`] if the magic number is neither a native
///   nor an IDX one
/// - [`ContainerError::RankTooLarge`] above [`MAX_RANK`]
/// - [`ContainerError::NegativeExtent`] for a negative native extent
/// - [`TensorError::Io`] if the reader ends early
pub fn read_header<R: Read>(reader: &mut R) -> TensorResult<Header> {
    let magic = read_word(reader)?;

    if let Some(encoding) = Encoding::from_native_magic(i32::from_ne_bytes(magic)) {
        let rank = i32::from_ne_bytes(read_word(reader)?);
        let rank = usize::try_from(rank).map_err(|_| DimensionError::Invalid {
            operation: "read_header",
            reason: format!("negative rank {rank}"),
        })?;
        check_container_rank(rank)?;
        let mut extents: Dims = SmallVec::with_capacity(rank);
        for axis in 0..rank.max(MIN_HEADER_EXTENTS) {
            let extent = i32::from_ne_bytes(read_word(reader)?);
            if axis < rank {
                let extent = usize::try_from(extent)
                    .map_err(|_| ContainerError::NegativeExtent { axis, extent })?;
                extents.push(extent);
            }
        }
        return Ok(Header {
            encoding,
            extents,
            big_endian: false,
        });
    }

    let idx = u32::from_be_bytes(magic);
    match Encoding::from_idx_code((idx >> 8) & 0xff) {
        Some(encoding) if idx >> 16 == 0 => {
            let rank = (idx & 0xff) as usize;
            check_container_rank(rank)?;
            let mut extents: Dims = SmallVec::with_capacity(rank);
            for _ in 0..rank {
                extents.push(u32::from_be_bytes(read_word(reader)?) as usize);
            }
            Ok(Header {
                encoding,
                extents,
                big_endian: true,
            })
        }
        _ => Err(ContainerError::UnknownMagic {
            magic: u32::from_ne_bytes(magic),
        }
        .into()),
    }
}

fn reserve<V>(count: usize) -> TensorResult<Vec<V>> {
    let mut buffer = Vec::new();
    buffer
        .try_reserve_exact(count)
        .map_err(|_| AllocationError::OutOfMemory {
            capacity: 0,
            requested: count,
        })?;
    Ok(buffer)
}

/// Read exactly `len` body bytes. The buffer grows with the data actually
/// present, so a header announcing more elements than the body holds fails
/// without allocating for them.
fn read_bytes<R: Read>(reader: &mut R, len: usize) -> TensorResult<Vec<u8>> {
    let mut bytes = Vec::new();
    reader.by_ref().take(len as u64).read_to_end(&mut bytes)?;
    if bytes.len() != len {
        return Err(std::io::Error::new(
            ErrorKind::UnexpectedEof,
            format!("container body holds {} of {len} bytes", bytes.len()),
        )
        .into());
    }
    Ok(bytes)
}

fn read_body<T: Element, R: Read>(reader: &mut R, header: &Header) -> TensorResult<Vec<T>> {
    let count = header.element_count()?;
    let len = count
        .checked_mul(header.encoding.size_of())
        .ok_or(AllocationError::Overflow)?;
    let bytes = read_bytes(reader, len)?;

    if !header.big_endian && header.encoding == Encoding::of::<T>() {
        let mut data = reserve::<T>(count)?;
        data.resize(count, T::zero());
        bytemuck::cast_slice_mut::<T, u8>(data.as_mut_slice()).copy_from_slice(&bytes);
        return Ok(data);
    }

    let big = header.big_endian;
    let data = match header.encoding {
        Encoding::U8 => bytes.iter().map(|&b| T::from_f64(f64::from(b))).collect(),
        Encoding::I32 => bytes
            .chunks_exact(4)
            .map(|c| {
                let w = [c[0], c[1], c[2], c[3]];
                let v = if big { i32::from_be_bytes(w) } else { i32::from_ne_bytes(w) };
                T::from_f64(f64::from(v))
            })
            .collect(),
        Encoding::F32 => bytes
            .chunks_exact(4)
            .map(|c| {
                let w = [c[0], c[1], c[2], c[3]];
                let v = if big { f32::from_be_bytes(w) } else { f32::from_ne_bytes(w) };
                v.cast::<T>()
            })
            .collect(),
        Encoding::F64 => bytes
            .chunks_exact(8)
            .map(|c| {
                let mut w = [0u8; 8];
                w.copy_from_slice(c);
                let v = if big { f64::from_be_bytes(w) } else { f64::from_ne_bytes(w) };
                v.cast::<T>()
            })
            .collect(),
    };
    Ok(data)
}

/// Write `tensor` as a native container of its own element type.
///
/// # Arguments
///
/// * `tensor` - Row-major contiguous tensor to write
/// * `writer` - Destination
///
/// # Errors
///
/// Returns [`ContainerError::NotContiguous`] for a strided view; copy it with
/// [`Tensor::deep_copy`] first.
///
/// # Examples
///
/// ```
/// use stridx_core::{io, Tensor};
///
/// let t = Tensor::from_vec(vec![1.0f32, 2.0, 3.0, 4.0], &[2, 2]).unwrap();
/// let mut bytes = Vec::new();
/// io::save(&t, &mut bytes).unwrap();
///
/// let back: Tensor<f64> = io::load(&mut bytes.as_slice()).unwrap();
/// assert_eq!(back.extents(), &[2, 2]);
/// assert_eq!(back.to_vec(), vec![1.0, 2.0, 3.0, 4.0]);
/// ```
pub fn save<T: Element, W: Write>(tensor: &Tensor<T>, writer: &mut W) -> TensorResult<()> {
    if !tensor.is_contiguous() {
        return Err(ContainerError::NotContiguous {
            strides: tensor.strides().to_vec(),
            offset: tensor.offset(),
        }
        .into());
    }
    let rank = tensor.rank();
    let encoding = Encoding::of::<T>();

    writer.write_all(&encoding.native_magic().to_ne_bytes())?;
    writer.write_all(&(rank as i32).to_ne_bytes())?;
    for axis in 0..rank.max(MIN_HEADER_EXTENTS) {
        let extent = tensor.extents().get(axis).copied().unwrap_or(1);
        let extent = i32::try_from(extent).map_err(|_| DimensionError::Invalid {
            operation: "save",
            reason: format!("extent {extent} on axis {axis} does not fit the header"),
        })?;
        writer.write_all(&extent.to_ne_bytes())?;
    }

    let start = tensor.offset();
    let count = tensor.element_count();
    let cells = tensor.storage().cells();
    // footprint never exceeds capacity, so the range is in bounds
    let body = cells.get(start..start + count).unwrap_or_default();
    let mut staged = [T::zero(); WRITE_CHUNK];
    for run in body.chunks(WRITE_CHUNK) {
        for (slot, cell) in staged.iter_mut().zip(run) {
            *slot = cell.get();
        }
        writer.write_all(bytemuck::cast_slice(&staged[..run.len()]))?;
    }
    writer.flush()?;

    log::debug!(
        "saved {} container with extents {:?}",
        T::DTYPE,
        tensor.extents()
    );
    Ok(())
}

/// Read a container into a fresh row-major tensor, casting to `T`.
pub fn load<T: Element, R: Read>(reader: &mut R) -> TensorResult<Tensor<T>> {
    let header = read_header(reader)?;
    let data = read_body::<T, R>(reader, &header)?;
    log::debug!(
        "loaded {:?} container with extents {:?} as {}",
        header.encoding,
        header.extents,
        T::DTYPE
    );
    Tensor::from_vec(data, &header.extents)
}

/// Read a container into an existing tensor of the same rank.
///
/// The tensor is resized to the container's extents (growing its storage if
/// needed) and then overwritten. On error the tensor keeps its previous shape.
///
/// # Errors
///
/// Returns [`RankError::Mismatch`](crate::error::RankError::Mismatch) if the
/// container rank differs from the tensor's.
pub fn load_into<T: Element, R: Read>(tensor: &mut Tensor<T>, reader: &mut R) -> TensorResult<()> {
    let header = read_header(reader)?;
    if header.extents.len() != tensor.rank() {
        return Err(TensorError::rank_mismatch(
            "load_into",
            tensor.rank(),
            header.extents.len(),
        ));
    }
    let data = read_body::<T, R>(reader, &header)?;
    tensor.resize(&header.extents)?;

    let cells = tensor.storage().cells();
    for (position, value) in tensor.offsets().zip(data) {
        if let Some(cell) = cells.get(position) {
            cell.set(value);
        }
    }
    Ok(())
}

/// [`save`] to a file, creating or truncating it.
pub fn save_file<T: Element, P: AsRef<Path>>(tensor: &Tensor<T>, path: P) -> TensorResult<()> {
    let mut writer = BufWriter::new(File::create(path)?);
    save(tensor, &mut writer)
}

/// [`load`] from a file.
pub fn load_file<T: Element, P: AsRef<Path>>(path: P) -> TensorResult<Tensor<T>> {
    let mut reader = BufReader::new(File::open(path)?);
    load(&mut reader)
}
