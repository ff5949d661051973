use std::io::Write;

use tempfile::NamedTempFile;

pub fn fixture(path: &str) -> String {
    format!(
        "{}/testdata/dumps/{path}",
        env!("CARGO_MANIFEST_DIR").replace("\\", "/")
    )
}

/// Writes `content` to a temporary dump file that lives as long as the handle.
pub fn write_dump(content: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().expect("temp dump file should be created");
    file.write_all(content.as_bytes())
        .expect("temp dump file should be writable");
    file
}
