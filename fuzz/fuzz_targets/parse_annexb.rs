#![no_main]

use h264_annexb::Parser;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let mut parser = Parser::default();
    let _ = parser.parse_stream(data);
});
