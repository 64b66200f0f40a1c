// Copyright 2024 The ChromiumOS Authors
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

//! Prints the structure of a raw H.264 Annex B elementary stream.

use std::path::PathBuf;

use anyhow::Context;
use argh::FromArgs;

use h264_annexb::Parser;

/// Dump NAL unit structure and parameter sets from a .h264 file.
#[derive(Debug, FromArgs)]
struct Args {
    /// input file
    #[argh(positional)]
    input: PathBuf,
}

fn main() -> anyhow::Result<()> {
    env_logger::init();

    let args: Args = argh::from_env();

    let data = std::fs::read(&args.input)
        .with_context(|| format!("failed to read {}", args.input.display()))?;

    let mut parser = Parser::default();
    let records = parser.parse_stream(&data)?;

    for record in &records {
        println!(
            "{:?} (ref_idc {})",
            record.header.type_, record.header.ref_idc
        );

        if let Some(sps) = &record.sps {
            let (width, height) = sps.visible_size();
            println!(
                "  SPS {}: profile_idc {} level_idc {} {}x{}",
                sps.seq_parameter_set_id, sps.profile_idc, sps.level_idc, width, height
            );
        }

        if let Some(pps) = &record.pps {
            println!(
                "  PPS {} -> SPS {}: {} entropy coding, {} slice group(s)",
                pps.pic_parameter_set_id,
                pps.seq_parameter_set_id,
                if pps.entropy_coding_mode_flag {
                    "CABAC"
                } else {
                    "CAVLC"
                },
                pps.num_slice_groups_minus1() + 1,
            );
        }
    }

    println!("{} NAL unit(s) total", records.len());

    Ok(())
}
