//! Byte-stream serialization of `VastBitmap`.
//!
//! Layout (little-endian unless noted): a `u32` container count, then for
//! each container its 6-byte big-endian high key, a one-byte kind tag
//! (0 = array, 1 = bitmap, 2 = run), and the body — array: `u16 n` plus
//! `n × u16` ascending values; bitmap: `u16 n` plus 1024 `u64` words; run:
//! `u16 r` plus `r × (u16 start, u16 length − 1)`. Containers appear in
//! ascending key order.
//!
//! The format is not promised stable across versions: readers must accept
//! their own round-trip and may reject anything else. There is no header
//! and no checksum; durability is the caller's responsibility.

use std::io::{self, Read, Write};

use crate::container::{
    ArrayContainer, BitmapContainer, Container, Interval, RunContainer, ARRAY_MAX_SIZE,
    BITMAP_WORDS,
};
use crate::error::{Error, Result};
use crate::key::{HighKey, KEY_BYTES};
use crate::VastBitmap;

const KIND_ARRAY: u8 = 0;
const KIND_BITMAP: u8 = 1;
const KIND_RUN: u8 = 2;

/// Largest run count accepted from serialized input.
const MAX_SERIALIZED_RUNS: usize = 2048;

impl VastBitmap {
    /// Writes the bitmap to a byte stream.
    ///
    /// Consider calling [`run_optimize`](VastBitmap::run_optimize) first to
    /// improve compression. The bitmap itself is not modified.
    ///
    /// # Errors
    ///
    /// [`Error::Io`] when the underlying writer fails; output written so
    /// far is then truncated.
    pub fn serialize_into<W: Write>(&self, mut writer: W) -> Result<()> {
        writer.write_all(&(self.index.len() as u32).to_le_bytes())?;
        for (high, container) in self.index.iter() {
            writer.write_all(high)?;
            match container {
                Container::Array(values) => {
                    writer.write_all(&[KIND_ARRAY])?;
                    writer.write_all(&(values.len() as u16).to_le_bytes())?;
                    for &value in values.as_slice() {
                        writer.write_all(&value.to_le_bytes())?;
                    }
                }
                Container::Bitmap(bitmap) => {
                    writer.write_all(&[KIND_BITMAP])?;
                    // Wraps to 0 for a full container; readers recount.
                    writer.write_all(&(bitmap.cardinality() as u16).to_le_bytes())?;
                    for &word in bitmap.words().iter() {
                        writer.write_all(&word.to_le_bytes())?;
                    }
                }
                Container::Run(runs) => {
                    writer.write_all(&[KIND_RUN])?;
                    writer.write_all(&(runs.num_runs() as u16).to_le_bytes())?;
                    for interval in runs.intervals() {
                        writer.write_all(&interval.start.to_le_bytes())?;
                        writer.write_all(&(interval.end - interval.start).to_le_bytes())?;
                    }
                }
            }
        }
        Ok(())
    }

    /// Reads a bitmap previously written by
    /// [`serialize_into`](VastBitmap::serialize_into).
    ///
    /// # Errors
    ///
    /// [`Error::Format`] when the input fails structural validation
    /// (unknown kind tag, oversized or unsorted payloads, out-of-order
    /// keys, truncation); [`Error::Io`] on other reader failures. No
    /// partially-built bitmap is ever returned.
    pub fn deserialize_from<R: Read>(mut reader: R) -> Result<Self> {
        let count = read_u32(&mut reader)?;
        let mut bitmap = VastBitmap::new();
        let mut prev_high: Option<HighKey> = None;
        for _ in 0..count {
            let mut high = [0u8; KEY_BYTES];
            read_exact(&mut reader, &mut high)?;
            if prev_high.is_some_and(|prev| prev >= high) {
                return Err(Error::Format("high keys out of order"));
            }
            prev_high = Some(high);

            let mut container = match read_u8(&mut reader)? {
                KIND_ARRAY => read_array(&mut reader)?,
                KIND_BITMAP => read_bitmap(&mut reader)?,
                KIND_RUN => read_run(&mut reader)?,
                _ => return Err(Error::Format("unknown container kind")),
            };
            if container.is_empty() {
                return Err(Error::Format("empty container"));
            }
            container.normalize();
            bitmap.index.insert(high, container);
        }
        Ok(bitmap)
    }

    /// Serializes to an in-memory buffer.
    #[must_use]
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut buffer = Vec::with_capacity(self.serialized_size() as usize);
        self.serialize_into(&mut buffer)
            .expect("writing to a Vec cannot fail");
        buffer
    }

    /// Deserializes from an in-memory buffer. Trailing bytes are ignored.
    ///
    /// # Errors
    ///
    /// Same as [`deserialize_from`](VastBitmap::deserialize_from).
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        Self::deserialize_from(bytes)
    }

    /// Exact size of the serialized form in bytes.
    #[must_use]
    pub fn serialized_size(&self) -> u64 {
        4 + self
            .index
            .iter()
            .map(|(_, container)| (KEY_BYTES + 1 + container.serialized_size()) as u64)
            .sum::<u64>()
    }

    /// An *estimate* of the in-memory footprint, defined as the serialized
    /// size. Heap bookkeeping, tree nodes, and slack capacity are not
    /// measured, so the true usage is somewhat higher.
    #[must_use]
    pub fn size_in_bytes(&self) -> u64 {
        self.serialized_size()
    }
}

fn read_array<R: Read>(reader: &mut R) -> Result<Container> {
    let n = read_u16(reader)? as usize;
    if n > ARRAY_MAX_SIZE {
        return Err(Error::Format("array container over capacity"));
    }
    let mut values = Vec::with_capacity(n);
    for _ in 0..n {
        values.push(read_u16(reader)?);
    }
    if values.windows(2).any(|pair| pair[0] >= pair[1]) {
        return Err(Error::Format("array values out of order"));
    }
    Ok(Container::Array(ArrayContainer::from_sorted(values)))
}

fn read_bitmap<R: Read>(reader: &mut R) -> Result<Container> {
    // The u16 cardinality is advisory (it wraps for a full container).
    let _ = read_u16(reader)?;
    let mut words = Box::new([0u64; BITMAP_WORDS]);
    for word in words.iter_mut() {
        *word = read_u64(reader)?;
    }
    Ok(Container::Bitmap(BitmapContainer::from_words(words)))
}

fn read_run<R: Read>(reader: &mut R) -> Result<Container> {
    let n = read_u16(reader)? as usize;
    if n > MAX_SERIALIZED_RUNS {
        return Err(Error::Format("run container over capacity"));
    }
    let mut runs = Vec::with_capacity(n);
    for _ in 0..n {
        let start = read_u16(reader)?;
        let length_minus_one = read_u16(reader)?;
        let end = start
            .checked_add(length_minus_one)
            .ok_or(Error::Format("run overflows the container"))?;
        runs.push(Interval::new(start, end));
    }
    let disordered = runs
        .windows(2)
        .any(|pair| (pair[0].end as u32) + 1 >= pair[1].start as u32);
    if disordered {
        return Err(Error::Format("runs out of order"));
    }
    Ok(Container::Run(RunContainer::from_intervals(runs)))
}

fn read_exact<R: Read>(reader: &mut R, buf: &mut [u8]) -> Result<()> {
    reader.read_exact(buf).map_err(|err| match err.kind() {
        io::ErrorKind::UnexpectedEof => Error::Format("truncated input"),
        _ => Error::Io(err),
    })
}

fn read_u8<R: Read>(reader: &mut R) -> Result<u8> {
    let mut buf = [0; 1];
    read_exact(reader, &mut buf)?;
    Ok(buf[0])
}

fn read_u16<R: Read>(reader: &mut R) -> Result<u16> {
    let mut buf = [0; 2];
    read_exact(reader, &mut buf)?;
    Ok(u16::from_le_bytes(buf))
}

fn read_u32<R: Read>(reader: &mut R) -> Result<u32> {
    let mut buf = [0; 4];
    read_exact(reader, &mut buf)?;
    Ok(u32::from_le_bytes(buf))
}

fn read_u64<R: Read>(reader: &mut R) -> Result<u64> {
    let mut buf = [0; 8];
    read_exact(reader, &mut buf)?;
    Ok(u64::from_le_bytes(buf))
}
