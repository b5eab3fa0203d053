//! Library command handler.
//!
//! Resolves one name to a path: a toolkit library, a toolkit binary, an
//! optional library, or `libdevice`.

use std::path::Path;

use anyhow::{Result, bail};
use cuprobe_core::{Discovery, OptionalLibrary, ToolkitBinary, ToolkitLibrary};

/// What a name on the command line refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Target {
    Library(ToolkitLibrary),
    Binary(ToolkitBinary),
    Optional(OptionalLibrary),
    Libdevice,
}

impl Target {
    pub fn parse(name: &str) -> Option<Self> {
        if name.eq_ignore_ascii_case("libdevice") {
            return Some(Self::Libdevice);
        }
        name.parse()
            .map(Self::Library)
            .or_else(|_| name.parse().map(Self::Binary))
            .or_else(|_| name.parse().map(Self::Optional))
            .ok()
    }
}

pub fn execute(discovery: &Discovery, name: &str) -> Result<()> {
    let Some(target) = Target::parse(name) else {
        bail!("Unknown library or binary: {name}");
    };

    let path: &Path = match target {
        Target::Library(library) => discovery.library_path(library)?,
        Target::Binary(binary) => discovery.binary_path(binary)?,
        Target::Optional(library) => discovery.optional_library_path(library)?,
        Target::Libdevice => discovery.libdevice()?,
    };
    println!("{}", path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_names() {
        assert_eq!(Target::parse("cudart"), Some(Target::Library(ToolkitLibrary::Cudart)));
        assert_eq!(
            Target::parse("cublasLt"),
            Some(Target::Library(ToolkitLibrary::CublasLt))
        );
        assert_eq!(Target::parse("NVCC"), Some(Target::Binary(ToolkitBinary::Nvcc)));
        assert_eq!(
            Target::parse("cudnn"),
            Some(Target::Optional(OptionalLibrary::Cudnn))
        );
        assert_eq!(Target::parse("libdevice"), Some(Target::Libdevice));
        assert_eq!(Target::parse("libfoo"), None);
    }
}
