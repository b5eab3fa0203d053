//! Shared library validation.
//!
//! Mapping a library into the process needs `unsafe`, which this workspace
//! denies. Instead the loader checks that the file is a regular, readable
//! file carrying the object-format magic of the target platform, which
//! catches the failures that matter in practice: dangling symlinks, stubs
//! and truncated downloads, and libraries built for a different OS.

use std::fs::File;
use std::io::Read;
use std::path::Path;

use cuprobe_core::{LibraryLoader, LoadError, OsFamily};
use tracing::trace;

const ELF_MAGIC: &[u8] = b"\x7fELF";
const PE_MAGIC: &[u8] = b"MZ";
const MACHO_MAGICS: &[[u8; 4]] = &[
    [0xfe, 0xed, 0xfa, 0xce],
    [0xfe, 0xed, 0xfa, 0xcf],
    [0xce, 0xfa, 0xed, 0xfe],
    [0xcf, 0xfa, 0xed, 0xfe],
    [0xca, 0xfe, 0xba, 0xbe],
];

/// [`LibraryLoader`] that validates the object-file header.
#[derive(Debug, Clone, Copy)]
pub struct HeaderCheckLoader {
    family: OsFamily,
}

impl HeaderCheckLoader {
    pub const fn new(family: OsFamily) -> Self {
        Self { family }
    }

    fn accepts(&self, header: &[u8]) -> bool {
        match self.family {
            OsFamily::Linux => header.starts_with(ELF_MAGIC),
            OsFamily::Windows => header.starts_with(PE_MAGIC),
            OsFamily::MacOs => MACHO_MAGICS.iter().any(|magic| header.starts_with(magic)),
        }
    }
}

impl LibraryLoader for HeaderCheckLoader {
    fn load(&self, path: &Path) -> Result<(), LoadError> {
        let metadata = std::fs::metadata(path).map_err(|e| LoadError::new(path, e.to_string()))?;
        if !metadata.is_file() {
            return Err(LoadError::new(path, "not a regular file"));
        }

        let mut header = [0u8; 4];
        let mut file = File::open(path).map_err(|e| LoadError::new(path, e.to_string()))?;
        let read = file
            .read(&mut header)
            .map_err(|e| LoadError::new(path, e.to_string()))?;

        if !self.accepts(&header[..read]) {
            return Err(LoadError::new(
                path,
                format!("not a {} shared library", self.family.tag()),
            ));
        }

        trace!(path = %path.display(), "library header ok");
        Ok(())
    }
}
