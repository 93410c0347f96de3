#![no_main]

use libfuzzer_sys::fuzz_target;
use paperscope_resolve::Resolver;
use paperscope_score::FidelityScorer;

fuzz_target!(|data: &[u8]| {
    let Ok(s) = std::str::from_utf8(data) else {
        return;
    };
    let Ok(parsed) = paperscope_read_latex::parse(s) else {
        return;
    };
    let doc = Resolver::new().resolve(parsed.value).value;

    // Any document scored against itself is perfect
    let report = FidelityScorer::new().score(&doc, &doc);
    assert_eq!(report.overall_score, 100.0);
    assert!(report.issues.is_empty(), "{:?}", report.issues);
});
