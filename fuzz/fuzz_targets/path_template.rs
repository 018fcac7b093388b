//! Fuzz target for path template compilation.
//!
//! Arbitrary templates must compile or fail with a structured error, and
//! compiled templates must answer arbitrary paths without panicking.

#![no_main]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;

use keystone_core::{Error, PathTemplate};

#[derive(Debug, Arbitrary)]
struct FuzzTemplate {
    template: String,
    paths: Vec<String>,
}

fuzz_target!(|data: FuzzTemplate| {
    if data.template.len() > 512 {
        return;
    }

    let template = match PathTemplate::compile(&data.template) {
        Ok(template) => template,
        Err(Error::InvalidPathTemplate(_)) => return,
        Err(other) => panic!("unexpected error kind: {:?}", other),
    };

    for path in data.paths.iter().take(32) {
        let matched = template.matches(path);
        let values = template.extract(path);
        assert_eq!(matched, values.is_some());

        if let Some(values) = values {
            for name in template.variables() {
                let _ = values.get(name);
            }
        }
    }
});
