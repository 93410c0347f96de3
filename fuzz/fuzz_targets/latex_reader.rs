#![no_main]

use libfuzzer_sys::fuzz_target;
use paperscope_core::{ParseOptions, Parser};

fuzz_target!(|data: &[u8]| {
    // Arbitrary bytes must parse or fail cleanly, never panic
    let _ = paperscope_read_latex::LatexParser.parse(data, &ParseOptions::default());
});
