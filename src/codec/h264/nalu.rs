// Copyright 2024 The ChromiumOS Authors
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

//! Annex B NAL unit delimitation: start-code scanning, span accumulation
//! and header/RBSP extraction.

use enumn::N;
use thiserror::Error;

use crate::codec::h264::rbsp;

/// See table 7-1 in the specification. Every 5-bit code has a variant so
/// that reserved and unspecified units still surface to the caller.
#[derive(N, Debug, PartialEq, Eq, Clone, Copy)]
#[repr(u8)]
pub enum NaluType {
    Unknown = 0,
    Slice = 1,
    SliceDpa = 2,
    SliceDpb = 3,
    SliceDpc = 4,
    SliceIdr = 5,
    Sei = 6,
    Sps = 7,
    Pps = 8,
    AuDelimiter = 9,
    SeqEnd = 10,
    StreamEnd = 11,
    FillerData = 12,
    SpsExtension = 13,
    PrefixUnit = 14,
    SubsetSps = 15,
    DepthSps = 16,
    Reserved17 = 17,
    Reserved18 = 18,
    SliceAux = 19,
    SliceExt = 20,
    SliceDepth = 21,
    Reserved22 = 22,
    Reserved23 = 23,
    Unspecified24 = 24,
    Unspecified25 = 25,
    Unspecified26 = 26,
    Unspecified27 = 27,
    Unspecified28 = 28,
    Unspecified29 = 29,
    Unspecified30 = 30,
    Unspecified31 = 31,
}

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum NaluError {
    /// A zero-length span was handed to the extractor.
    #[error("zero-length NAL unit span")]
    TruncatedNalUnit,
}

/// A start code found by [`find_start_code`]: byte offset of the first
/// prefix byte and the prefix length (3 or 4).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StartCode {
    pub pos: usize,
    pub prefix_len: usize,
}

/// Finds the first `00 00 01` or `00 00 00 01` start code at or after
/// `from`.
///
/// The four-byte form is recognized by the zero_byte preceding a
/// three-byte match; when both forms coincide the longer one wins and
/// `pos` points at its leading zero. A `00 00` pair with any other
/// continuation is not a marker and the scan moves on.
pub fn find_start_code(data: &[u8], from: usize) -> Option<StartCode> {
    let offset = data
        .get(from..)?
        .windows(3)
        .position(|window| window == [0x00, 0x00, 0x01])?;

    let mut pos = from + offset;
    let mut prefix_len = 3;

    if pos > 0 && data[pos - 1] == 0x00 {
        pos -= 1;
        prefix_len = 4;
    }

    Some(StartCode { pos, prefix_len })
}

/// Reusable buffer for assembling the span between two start codes.
///
/// The logical length resets between units while the backing allocation is
/// retained, so a long stream settles into a steady state with no further
/// allocation.
#[derive(Debug, Default)]
pub struct NaluBuffer {
    buf: Vec<u8>,
}

/// Extra capacity reserved beyond an append that outgrows the buffer.
const GROW_SLACK: usize = 1024;

impl NaluBuffer {
    pub fn new() -> Self {
        Default::default()
    }

    /// Appends `bytes` to the logical region, growing the backing
    /// allocation with slack when it no longer fits.
    pub fn append(&mut self, bytes: &[u8]) {
        if self.buf.len() + bytes.len() > self.buf.capacity() {
            self.buf.reserve(bytes.len() + GROW_SLACK);
        }

        self.buf.extend_from_slice(bytes);
    }

    /// Resets the logical length to zero without releasing capacity.
    pub fn clear(&mut self) {
        self.buf.clear();
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.buf
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.buf.capacity()
    }
}

/// The one-byte header leading every NAL unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NaluHeader {
    /// Must be zero in a conforming stream. A set bit is recorded as a
    /// data-integrity signal rather than treated as fatal.
    pub forbidden_zero_bit: bool,
    /// Two-bit reference importance of the unit.
    pub ref_idc: u8,
    pub type_: NaluType,
}

/// One delimited NAL unit: its header and the owned, already-filtered
/// payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Nalu {
    pub header: NaluHeader,
    /// The unit's payload with emulation-prevention bytes removed.
    pub rbsp: Vec<u8>,
}

impl Nalu {
    /// Splits the header byte off `raw` and filters the remainder into an
    /// owned RBSP.
    pub fn extract(raw: &[u8]) -> Result<Nalu, NaluError> {
        let (first, payload) = raw.split_first().ok_or(NaluError::TruncatedNalUnit)?;

        let header = NaluHeader {
            forbidden_zero_bit: (first & 0x80) != 0,
            ref_idc: (first & 0x60) >> 5,
            type_: NaluType::n(first & 0x1f).unwrap_or(NaluType::Unknown),
        };

        if header.forbidden_zero_bit {
            log::debug!("forbidden_zero_bit set on a {:?} unit", header.type_);
        }

        let mut rbsp = Vec::new();
        rbsp::strip_emulation_prevention(payload, &mut rbsp);

        Ok(Nalu { header, rbsp })
    }
}

/// Iterator over the NAL units of a complete Annex B buffer.
///
/// Each unit's span is accumulated into a reusable buffer before
/// extraction; zero-length spans (consecutive start codes) are skipped.
pub struct NaluIterator<'a> {
    data: &'a [u8],
    cursor: usize,
    buffer: NaluBuffer,
}

impl<'a> NaluIterator<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self {
            data,
            cursor: 0,
            buffer: NaluBuffer::new(),
        }
    }
}

impl Iterator for NaluIterator<'_> {
    type Item = Nalu;

    fn next(&mut self) -> Option<Nalu> {
        loop {
            let sc = find_start_code(self.data, self.cursor)?;
            let data_start = sc.pos + sc.prefix_len;

            let mut data_end = match find_start_code(self.data, data_start) {
                Some(next) => next.pos,
                None => self.data.len(),
            };
            self.cursor = data_end;

            // Discard trailing_zero_8bits.
            while data_end > data_start && self.data[data_end - 1] == 0x00 {
                data_end -= 1;
            }

            self.buffer.clear();
            self.buffer.append(&self.data[data_start..data_end]);

            match Nalu::extract(self.buffer.as_slice()) {
                Ok(nalu) => return Some(nalu),
                Err(err) => {
                    log::debug!("skipping empty span at offset {}: {}", sc.pos, err);
                }
            }
        }
    }
}
