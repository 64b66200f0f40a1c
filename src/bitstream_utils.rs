// Copyright 2024 The ChromiumOS Authors
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

//! Bitstream synthesis: a bit-level writer with Exp-Golomb support and an
//! emulation-prevention inserting byte sink. These are the encoding
//! counterparts of the readers in [`crate::codec::h264::rbsp`] and exist
//! mainly so tests and tools can build conformant payloads.

use std::fmt;
use std::io::Write;

#[derive(Debug)]
pub enum BitWriterError {
    InvalidBitCount,
    Io(std::io::Error),
}

impl fmt::Display for BitWriterError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            BitWriterError::InvalidBitCount => write!(f, "invalid bit count"),
            BitWriterError::Io(x) => write!(f, "{}", x),
        }
    }
}

impl From<std::io::Error> for BitWriterError {
    fn from(err: std::io::Error) -> Self {
        BitWriterError::Io(err)
    }
}

pub type BitWriterResult<T> = std::result::Result<T, BitWriterError>;

pub struct BitWriter<W: Write> {
    out: W,
    nth_bit: u8,
    curr_byte: u8,
}

impl<W: Write> BitWriter<W> {
    pub fn new(writer: W) -> Self {
        Self {
            out: writer,
            curr_byte: 0,
            nth_bit: 0,
        }
    }

    /// Writes fixed bit size integer (up to 32 bit).
    pub fn write_f<T: Into<u32>>(&mut self, bits: usize, value: T) -> BitWriterResult<usize> {
        let value = value.into();

        if bits > 32 {
            return Err(BitWriterError::InvalidBitCount);
        }

        let mut written = 0;
        for bit in (0..bits).rev() {
            let bit = (1 << bit) as u32;

            self.write_bit((value & bit) == bit)?;
            written += 1;
        }

        Ok(written)
    }

    /// Writes an unsigned Exp-Golomb codeword: the zero-run prefix, the
    /// marker bit and the suffix. See 9.1 in the specification.
    pub fn write_ue<T: Into<u32>>(&mut self, value: T) -> BitWriterResult<usize> {
        self.write_ue_code(u64::from(value.into()))
    }

    /// Writes a signed Exp-Golomb codeword using the 0, 1, -1, 2, -2, ...
    /// mapping. See 9.1.1 in the specification.
    pub fn write_se(&mut self, value: i32) -> BitWriterResult<usize> {
        let code = if value <= 0 {
            (-i64::from(value) * 2) as u64
        } else {
            (i64::from(value) * 2 - 1) as u64
        };

        self.write_ue_code(code)
    }

    fn write_ue_code(&mut self, value: u64) -> BitWriterResult<usize> {
        let code = value + 1;
        let len = 64 - code.leading_zeros() as usize;

        for _ in 0..len - 1 {
            self.write_bit(false)?;
        }
        for bit in (0..len).rev() {
            self.write_bit((code >> bit) & 1 == 1)?;
        }

        Ok(2 * len - 1)
    }

    /// Takes a single bit that will be outputed to [`std::io::Write`].
    pub fn write_bit(&mut self, bit: bool) -> BitWriterResult<()> {
        self.curr_byte |= (bit as u8) << (7u8 - self.nth_bit);
        self.nth_bit += 1;

        if self.nth_bit == 8 {
            self.out.write_all(&[self.curr_byte])?;
            self.nth_bit = 0;
            self.curr_byte = 0;
        }

        Ok(())
    }

    /// Immediately outputs any cached bits to [`std::io::Write`].
    pub fn flush(&mut self) -> BitWriterResult<()> {
        if self.nth_bit != 0 {
            self.out.write_all(&[self.curr_byte])?;
            self.nth_bit = 0;
            self.curr_byte = 0;
        }

        self.out.flush()?;
        Ok(())
    }

    /// Returns `true` if [`Self`] holds data that wasn't written to
    /// [`std::io::Write`].
    pub fn has_data_pending(&self) -> bool {
        self.nth_bit != 0
    }
}

impl<W: Write> Drop for BitWriter<W> {
    fn drop(&mut self) {
        if let Err(e) = self.flush() {
            log::error!("Unable to flush bits {e:?}");
        }
    }
}

/// Wrapper over [`std::io::Write`] inserting emulation prevention bytes:
/// any payload byte of `0x03` or less following two zero bytes gets a
/// `0x03` stuffed in front of it, keeping start-code patterns out of the
/// output.
pub struct EmulationPrevention<W: Write> {
    out: W,
    prev_bytes: [Option<u8>; 2],
}

impl<W: Write> EmulationPrevention<W> {
    pub fn new(writer: W) -> Self {
        Self {
            out: writer,
            prev_bytes: [None; 2],
        }
    }

    fn write_byte(&mut self, curr_byte: u8) -> std::io::Result<()> {
        if self.prev_bytes[1] == Some(0x00) && self.prev_bytes[0] == Some(0x00) && curr_byte <= 0x03
        {
            self.out.write_all(&[0x00, 0x00, 0x03, curr_byte])?;
            self.prev_bytes = [None; 2];
        } else {
            if let Some(byte) = self.prev_bytes[1] {
                self.out.write_all(&[byte])?;
            }

            self.prev_bytes[1] = self.prev_bytes[0];
            self.prev_bytes[0] = Some(curr_byte);
        }

        Ok(())
    }
}

impl<W: Write> Write for EmulationPrevention<W> {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        for byte in buf {
            self.write_byte(*byte)?;
        }

        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        if let Some(byte) = self.prev_bytes[1].take() {
            self.out.write_all(&[byte])?;
        }

        if let Some(byte) = self.prev_bytes[0].take() {
            self.out.write_all(&[byte])?;
        }

        self.out.flush()
    }
}

impl<W: Write> Drop for EmulationPrevention<W> {
    fn drop(&mut self) {
        if let Err(e) = self.flush() {
            log::error!("Unable to flush pending bytes {e:?}");
        }
    }
}

/// Runs `payload` through the emulation-prevention writer, returning the
/// protected bytes.
pub fn insert_emulation_prevention(payload: &[u8]) -> std::io::Result<Vec<u8>> {
    let mut out = Vec::with_capacity(payload.len());

    let mut writer = EmulationPrevention::new(&mut out);
    writer.write_all(payload)?;
    writer.flush()?;
    drop(writer);

    Ok(out)
}

/// Appends a four-byte start code, the NALU header byte and the
/// emulation-protected `rbsp` to `out`.
pub fn write_nalu(out: &mut Vec<u8>, ref_idc: u8, type_: u8, rbsp: &[u8]) -> std::io::Result<()> {
    out.extend_from_slice(&[
        0x00,
        0x00,
        0x00,
        0x01,
        (ref_idc & 0b11) << 5 | (type_ & 0b11111),
    ]);

    let mut writer = EmulationPrevention::new(out);
    writer.write_all(rbsp)?;
    writer.flush()?;

    Ok(())
}
