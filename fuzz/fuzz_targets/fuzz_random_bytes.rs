#![no_main]

use libfuzzer_sys::fuzz_target;
use json_revisions::archive::read_chain_file;
use json_revisions::document::parse_document_bytes;
use std::io::Write;
use tempfile::NamedTempFile;

fuzz_target!(|data: &[u8]| {
    // Arbitrary bytes must come back as a document or a diagnostic, never a panic
    if let Err(diagnostic) = parse_document_bytes(data) {
        assert!(!diagnostic.description.is_empty());
    }

    // Same for a revision file with garbage in it
    if let Ok(mut temp_file) = NamedTempFile::new() {
        if temp_file.write_all(data).is_ok() {
            let _ = read_chain_file(temp_file.path());
        }
    }
});
