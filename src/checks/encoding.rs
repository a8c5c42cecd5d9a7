use super::StructureCheck;
use crate::error::ConformanceError;
use crate::validators::ValidationInput;

/// Binary and free-form documentation files are not checked.
const UNCHECKED_SUFFIXES: &[&str] = &[".md", ".png"];

#[derive(Debug, Default, Clone, Copy)]
pub struct Utf8EncodingCheck;

impl StructureCheck for Utf8EncodingCheck {
    fn name(&self) -> &str {
        "utf8-file-encoding"
    }

    fn description(&self) -> &str {
        "Text assets are encoded as UTF-8"
    }

    fn check(&self, input: &ValidationInput<'_>) -> Result<(), ConformanceError> {
        let file_name = input.path.file_name();
        if UNCHECKED_SUFFIXES.iter().any(|suffix| file_name.ends_with(suffix)) {
            return Ok(());
        }
        std::str::from_utf8(input.content).map(|_| ()).map_err(|e| {
            ConformanceError::Structure(format!(
                "File is not UTF-8 encoded: {}: invalid byte at offset {}",
                input.path,
                e.valid_up_to()
            ))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::AssetPath;
    use std::path::Path;

    fn run(name: &str, content: &[u8]) -> Result<(), ConformanceError> {
        let asset = AssetPath::new(Path::new("/repo"), &Path::new("/repo/assets").join(name));
        Utf8EncodingCheck.check(&ValidationInput::new(&asset, content))
    }

    #[test]
    fn utf8_text_passes() {
        assert!(run("città.csv", "città,è\n".as_bytes()).is_ok());
    }

    #[test]
    fn latin1_fails_with_offset() {
        let error = run("x.csv", b"citt\xe0\n").unwrap_err();
        assert!(error.to_string().contains("offset 4"));
    }

    #[test]
    fn images_are_skipped() {
        assert!(run("logo.png", &[0x89, b'P', b'N', b'G', 0xff]).is_ok());
    }
}
