#![no_main]

use libfuzzer_sys::fuzz_target;
use paperscope_core::{ParseOptions, Parser};

fuzz_target!(|data: &[u8]| {
    let _ = paperscope_read_xml::XmlParser.parse(data, &ParseOptions::default());
});
