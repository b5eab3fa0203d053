//! Closed sets of the files a toolkit provides.
//!
//! Each library and binary is an enum variant rather than a string so that
//! the resolved toolkit is a plain map with a fixed key space.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString, IntoStaticStr};

/// Libraries shipped with every toolkit.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Display,
    EnumIter,
    EnumString,
    IntoStaticStr,
    Serialize,
    Deserialize,
)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
#[serde(rename_all = "lowercase")]
pub enum ToolkitLibrary {
    Cudart,
    Cublas,
    CublasLt,
    Cufft,
    Curand,
    Cusolver,
    Cusparse,
    Nvrtc,
    Cupti,
}

impl ToolkitLibrary {
    /// File stem before platform decoration (`cublasLt` → `libcublasLt.so.12`).
    pub const fn stem(self) -> &'static str {
        match self {
            Self::Cudart => "cudart",
            Self::Cublas => "cublas",
            Self::CublasLt => "cublasLt",
            Self::Cufft => "cufft",
            Self::Curand => "curand",
            Self::Cusolver => "cusolver",
            Self::Cusparse => "cusparse",
            Self::Nvrtc => "nvrtc",
            Self::Cupti => "cupti",
        }
    }

    /// CUPTI lives in `extras/CUPTI` in local installations.
    pub const fn extra_subdir(self) -> Option<&'static str> {
        match self {
            Self::Cupti => Some("extras/CUPTI"),
            _ => None,
        }
    }
}

/// Executables shipped with every toolkit.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Display,
    EnumIter,
    EnumString,
    IntoStaticStr,
    Serialize,
    Deserialize,
)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
#[serde(rename_all = "lowercase")]
pub enum ToolkitBinary {
    Nvcc,
    Ptxas,
    Nvlink,
    Nvdisasm,
}

impl ToolkitBinary {
    pub fn stem(self) -> &'static str {
        self.into()
    }
}

/// Auxiliary libraries whose absence is not fatal.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Display,
    EnumIter,
    EnumString,
    IntoStaticStr,
    Serialize,
    Deserialize,
)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
#[serde(rename_all = "lowercase")]
pub enum OptionalLibrary {
    Cudnn,
    Cutensor,
}

impl OptionalLibrary {
    pub fn stem(self) -> &'static str {
        self.into()
    }

    /// Environment variable naming a root directory for this library.
    pub const fn root_var(self) -> &'static str {
        match self {
            Self::Cudnn => "CUDNN_PATH",
            Self::Cutensor => "CUTENSOR_PATH",
        }
    }

    /// Major version of the library's own soname, when the toolkit release
    /// does not determine it.
    pub const fn soname_major(self) -> u32 {
        match self {
            Self::Cudnn => 9,
            Self::Cutensor => 2,
        }
    }
}
