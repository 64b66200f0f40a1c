// Copyright 2024 The ChromiumOS Authors
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

//! Structural parsing of H.264 Annex B elementary streams.
//!
//! This crate locates NAL unit boundaries inside a raw byte buffer, strips
//! emulation-prevention bytes to recover each unit's RBSP, and decodes the
//! sequence and picture parameter set fields that describe the stream
//! layout. Pixel data is never decoded; the output is purely structural
//! metadata, one record per NAL unit.

pub mod bitstream_utils;
pub mod codec;

pub use codec::h264::nalu::Nalu;
pub use codec::h264::nalu::NaluHeader;
pub use codec::h264::nalu::NaluIterator;
pub use codec::h264::nalu::NaluType;
pub use codec::h264::parser::NaluRecord;
pub use codec::h264::parser::Parser;
pub use codec::h264::parser::Pps;
pub use codec::h264::parser::Sps;
