// Copyright 2024 The ChromiumOS Authors
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

//! RBSP handling: emulation-prevention removal and bit-level reading.
//!
//! The reader operates on a payload whose emulation-prevention bytes have
//! already been removed, so it never has to special-case `0x000003`
//! sequences while decoding.

use std::io::Cursor;

use bytes::Buf;
use thiserror::Error;

/// Removes emulation-prevention bytes from `src`, appending the result to
/// `dst`.
///
/// Every `00 00 03` triple is rewritten as `00 00` and the scan resumes
/// after the consumed triple, undoing the stuffing an encoder inserts to
/// keep start-code patterns out of the payload.
pub fn strip_emulation_prevention(src: &[u8], dst: &mut Vec<u8>) {
    dst.reserve(src.len());

    let mut i = 0;
    while i < src.len() {
        if src.len() - i >= 3 && src[i] == 0x00 && src[i + 1] == 0x00 && src[i + 2] == 0x03 {
            dst.extend_from_slice(&[0x00, 0x00]);
            i += 3;
        } else {
            dst.push(src[i]);
            i += 1;
        }
    }
}

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum ReadBitsError {
    /// A read would consume bits past the end of the payload. This is a
    /// hard failure: substituting zero bits would let a variable-length
    /// codeword loop forever on truncated input.
    #[error("reader ran out of bits")]
    UnexpectedEndOfStream,
    #[error("more than 31 ({0}) bits were requested")]
    TooManyBitsRequested(usize),
    #[error("failed to convert read input to target type")]
    ConversionFailed,
    /// An Exp-Golomb codeword with more than 31 leading zeros.
    #[error("exp-golomb codeword too long for a 32-bit value")]
    OversizedCodeword,
    #[error("value {got} outside the expected range {min}..={max}")]
    OutOfRange { got: i64, min: i64, max: i64 },
}

/// A bit reader for a single RBSP. Bits are consumed most-significant-first
/// within each byte, and the cursor only ever moves forward.
pub struct BitReader<'a> {
    /// A reference into the next unread byte in the payload.
    data: Cursor<&'a [u8]>,
    /// Contents of the current byte. First unread bit starting at position
    /// 8 - num_remaining_bits_in_curr_byte.
    curr_byte: u32,
    /// Number of bits remaining in `curr_byte`.
    num_remaining_bits_in_curr_byte: usize,
    /// Number of bits consumed so far.
    position: usize,
}

impl<'a> BitReader<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self {
            data: Cursor::new(data),
            curr_byte: Default::default(),
            num_remaining_bits_in_curr_byte: Default::default(),
            position: 0,
        }
    }

    /// Read a single bit from the payload.
    pub fn read_bit(&mut self) -> Result<bool, ReadBitsError> {
        let bit = self.read_bits::<u32>(1)?;
        Ok(bit == 1)
    }

    /// Read up to 31 bits from the payload, packed big-endian: the first
    /// bit read lands in the most significant position of the result.
    pub fn read_bits<U: TryFrom<u32>>(&mut self, num_bits: usize) -> Result<U, ReadBitsError> {
        if num_bits > 31 {
            return Err(ReadBitsError::TooManyBitsRequested(num_bits));
        }

        let mut bits_left = num_bits;
        let mut out = 0;

        while self.num_remaining_bits_in_curr_byte < bits_left {
            out |= self.curr_byte << (bits_left - self.num_remaining_bits_in_curr_byte);
            bits_left -= self.num_remaining_bits_in_curr_byte;
            self.update_curr_byte()?;
        }

        out |= self.curr_byte >> (self.num_remaining_bits_in_curr_byte - bits_left);
        out &= (1 << num_bits) - 1;
        self.num_remaining_bits_in_curr_byte -= bits_left;
        self.position += num_bits;

        U::try_from(out).map_err(|_| ReadBitsError::ConversionFailed)
    }

    /// Skip `num_bits` bits from the payload.
    pub fn skip_bits(&mut self, mut num_bits: usize) -> Result<(), ReadBitsError> {
        while num_bits > 0 {
            let n = std::cmp::min(num_bits, 31);
            self.read_bits::<u32>(n)?;
            num_bits -= n;
        }

        Ok(())
    }

    /// Returns the amount of bits left in the payload.
    pub fn num_bits_left(&self) -> usize {
        self.data.remaining() * 8 + self.num_remaining_bits_in_curr_byte
    }

    /// Returns the number of bits consumed so far.
    pub fn position(&self) -> usize {
        self.position
    }

    /// Reads an unsigned Exp-Golomb codeword: `leading_zero_bits` zeros, a
    /// one marker, then `leading_zero_bits` suffix bits. See 9.1 in the
    /// specification.
    pub fn read_ue<U: TryFrom<u32>>(&mut self) -> Result<U, ReadBitsError> {
        let mut num_bits = 0;

        while !self.read_bit()? {
            num_bits += 1;
            if num_bits > 31 {
                return Err(ReadBitsError::OversizedCodeword);
            }
        }

        let value = ((1u32 << num_bits) - 1)
            .checked_add(self.read_bits::<u32>(num_bits)?)
            .ok_or(ReadBitsError::OversizedCodeword)?;

        U::try_from(value).map_err(|_| ReadBitsError::ConversionFailed)
    }

    pub fn read_ue_bounded<U: TryFrom<u32>>(
        &mut self,
        min: u32,
        max: u32,
    ) -> Result<U, ReadBitsError> {
        let ue = self.read_ue::<u32>()?;
        if ue > max || ue < min {
            Err(ReadBitsError::OutOfRange {
                got: i64::from(ue),
                min: i64::from(min),
                max: i64::from(max),
            })
        } else {
            U::try_from(ue).map_err(|_| ReadBitsError::ConversionFailed)
        }
    }

    pub fn read_ue_max<U: TryFrom<u32>>(&mut self, max: u32) -> Result<U, ReadBitsError> {
        self.read_ue_bounded(0, max)
    }

    /// Reads a signed Exp-Golomb codeword. The unsigned code `k` maps to
    /// 0, 1, -1, 2, -2, ... See 9.1.1 in the specification.
    pub fn read_se<U: TryFrom<i32>>(&mut self) -> Result<U, ReadBitsError> {
        let k = self.read_ue::<u32>()?;

        let value = if k % 2 == 0 {
            -((k / 2) as i32)
        } else {
            (k / 2 + 1) as i32
        };

        U::try_from(value).map_err(|_| ReadBitsError::ConversionFailed)
    }

    pub fn read_se_bounded<U: TryFrom<i32>>(
        &mut self,
        min: i32,
        max: i32,
    ) -> Result<U, ReadBitsError> {
        let se = self.read_se::<i32>()?;
        if se < min || se > max {
            Err(ReadBitsError::OutOfRange {
                got: i64::from(se),
                min: i64::from(min),
                max: i64::from(max),
            })
        } else {
            U::try_from(se).map_err(|_| ReadBitsError::ConversionFailed)
        }
    }

    /// Advances the cursor over `count` Exp-Golomb codewords, discarding
    /// their values. Signed and unsigned codewords have the same wire
    /// length, so this serves both.
    pub fn skip_codewords(&mut self, count: usize) -> Result<(), ReadBitsError> {
        for _ in 0..count {
            self.read_ue::<u32>()?;
        }

        Ok(())
    }

    fn update_curr_byte(&mut self) -> Result<(), ReadBitsError> {
        if self.data.remaining() == 0 {
            return Err(ReadBitsError::UnexpectedEndOfStream);
        }

        self.curr_byte = u32::from(self.data.get_u8());
        self.num_remaining_bits_in_curr_byte = 8;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // These tests are adapted from the chromium tests at
    // media/video/h264_bit_reader_unitttest.cc

    #[test]
    fn read_stream_without_trailing_zero_bytes() {
        const RBSP: [u8; 6] = [0x01, 0x23, 0x45, 0x67, 0x89, 0xa0];

        let mut reader = BitReader::new(&RBSP);
        assert_eq!(reader.read_bits::<u32>(1).unwrap(), 0);
        assert_eq!(reader.num_bits_left(), 47);

        assert_eq!(reader.read_bits::<u32>(8).unwrap(), 0x02);
        assert_eq!(reader.num_bits_left(), 39);

        assert_eq!(reader.read_bits::<u32>(31).unwrap(), 0x23456789);
        assert_eq!(reader.num_bits_left(), 8);

        assert_eq!(reader.read_bits::<u32>(1).unwrap(), 1);
        assert_eq!(reader.num_bits_left(), 7);
        assert_eq!(reader.position(), 41);
    }

    #[test]
    fn read_past_the_end() {
        let mut reader = BitReader::new(&[0x18]);
        assert_eq!(reader.read_bits::<u32>(4).unwrap(), 1);
        assert_eq!(
            reader.read_bits::<u32>(5).unwrap_err(),
            ReadBitsError::UnexpectedEndOfStream
        );
    }

    #[test]
    fn zero_bit_read_consumes_nothing() {
        let mut reader = BitReader::new(&[0xff]);
        assert_eq!(reader.read_bits::<u32>(0).unwrap(), 0);
        assert_eq!(reader.num_bits_left(), 8);
    }

    #[test]
    fn too_many_bits_requested() {
        let mut reader = BitReader::new(&[0x00; 8]);
        assert_eq!(
            reader.read_bits::<u32>(32).unwrap_err(),
            ReadBitsError::TooManyBitsRequested(32)
        );
    }

    // Check that read_ue behaves properly with input at the limits.
    #[test]
    fn read_ue() {
        // Regular value.
        let mut reader = BitReader::new(&[0b0001_1010]);
        assert_eq!(reader.read_ue::<u32>().unwrap(), 12);
        assert_eq!(reader.num_bits_left(), 1);

        // 0 value.
        let mut reader = BitReader::new(&[0b1000_0000]);
        assert_eq!(reader.read_ue::<u32>().unwrap(), 0);
        assert_eq!(reader.num_bits_left(), 7);

        // No prefix stop bit: the codeword runs off the end of the payload.
        let mut reader = BitReader::new(&[0b0000_0000]);
        assert_eq!(
            reader.read_ue::<u32>().unwrap_err(),
            ReadBitsError::UnexpectedEndOfStream
        );

        // u32 max value: 31 0-bits, 1 bit marker, 31 suffix bits.
        let mut reader = BitReader::new(&[
            0b0000_0000,
            0b0000_0000,
            0b0000_0000,
            0b0000_0001,
            0b1111_1111,
            0b1111_1111,
            0b1111_1111,
            0b1111_1110,
        ]);
        assert_eq!(reader.read_ue::<u32>().unwrap(), 0xffff_fffe);
        assert_eq!(reader.num_bits_left(), 1);
    }

    #[test]
    fn read_ue_oversized_codeword() {
        // 32 leading zeros can never form a valid 32-bit codeword.
        let mut reader = BitReader::new(&[0x00, 0x00, 0x00, 0x00, 0xff, 0xff, 0xff, 0xff, 0xff]);
        assert_eq!(
            reader.read_ue::<u32>().unwrap_err(),
            ReadBitsError::OversizedCodeword
        );
    }

    #[test]
    fn read_se() {
        // Codes 0..=4 map to 0, 1, -1, 2, -2.
        let mut reader = BitReader::new(&[0b1_010_011_0, 0b0100_0010, 0b1000_0000]);
        assert_eq!(reader.read_se::<i32>().unwrap(), 0);
        assert_eq!(reader.read_se::<i32>().unwrap(), 1);
        assert_eq!(reader.read_se::<i32>().unwrap(), -1);
        assert_eq!(reader.read_se::<i32>().unwrap(), 2);
        assert_eq!(reader.read_se::<i32>().unwrap(), -2);
    }

    #[test]
    fn bounded_reads() {
        let mut reader = BitReader::new(&[0b0001_1010]);
        assert!(matches!(
            reader.read_ue_max::<u32>(11).unwrap_err(),
            ReadBitsError::OutOfRange { got: 12, .. }
        ));

        let mut reader = BitReader::new(&[0b0001_1010]);
        assert_eq!(reader.read_ue_max::<u32>(12).unwrap(), 12);

        // Code 3 decodes to +2.
        let mut reader = BitReader::new(&[0b0010_0000]);
        assert!(matches!(
            reader.read_se_bounded::<i32>(-1, 1).unwrap_err(),
            ReadBitsError::OutOfRange { got: 2, .. }
        ));
    }

    #[test]
    fn skip_codewords_advances_cursor() {
        // ue(0) ue(1) ue(2) then a 4-bit literal 0b1010.
        let mut reader = BitReader::new(&[0b1_010_011_1, 0b010_00000]);
        reader.skip_codewords(3).unwrap();
        assert_eq!(reader.read_bits::<u32>(4).unwrap(), 0b1010);
    }

    #[test]
    fn strip_emulation_prevention_rewrites_triples() {
        let mut dst = Vec::new();
        strip_emulation_prevention(&[0x00, 0x00, 0x03, 0x01], &mut dst);
        assert_eq!(dst, vec![0x00, 0x00, 0x01]);

        dst.clear();
        strip_emulation_prevention(&[0x00, 0x00, 0x03, 0x00, 0x00, 0x03, 0x03], &mut dst);
        assert_eq!(dst, vec![0x00, 0x00, 0x00, 0x00, 0x03]);

        // A trailing triple is still consumed.
        dst.clear();
        strip_emulation_prevention(&[0x42, 0x00, 0x00, 0x03], &mut dst);
        assert_eq!(dst, vec![0x42, 0x00, 0x00]);
    }

    #[test]
    fn strip_emulation_prevention_is_identity_without_triples() {
        let payload = [0x00, 0x01, 0x02, 0x03, 0x00, 0x00, 0x04, 0x00, 0x03];
        let mut dst = Vec::new();
        strip_emulation_prevention(&payload, &mut dst);
        assert_eq!(dst, payload);
    }
}
