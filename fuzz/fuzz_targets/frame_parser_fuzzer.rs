#![no_main]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use pulseframe::FrameParser;

/// Arbitrary chunk boundaries, so the fuzzer explores both "whole frame fed
/// at once" and "one byte at a time" feeding patterns without needing a
/// second corpus.
#[derive(Debug, Arbitrary)]
struct Input {
    chunk_size: u8,
    bytes: Vec<u8>,
}

fuzz_target!(|input: Input| {
    let chunk_size = (input.chunk_size as usize).max(1);
    let mut parser = FrameParser::new();

    for chunk in input.bytes.chunks(chunk_size) {
        parser.feed(chunk);
        // Never panic, never hang: every complete frame must eventually
        // drain, and malformed headers must surface as an `Err`, not a loop.
        while let Ok(Some(_frame)) = parser.parse_one() {}
    }
});
