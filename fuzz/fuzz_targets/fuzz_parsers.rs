// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

#![no_main]

use libfuzzer_sys::fuzz_target;
use utilkit::tools::files::hasher::parse_manifest;
use utilkit::tools::pdf::{text::parse_page_ranges, toolbox};

fuzz_target!(|data: &[u8]| {
    if let Ok(input) = std::str::from_utf8(data) {
        let _ = parse_manifest(input);
        let _ = parse_page_ranges(input);
        let _ = toolbox::parse_ranges(input, 500);
        let _ = toolbox::parse_pages(input);
    }
});
