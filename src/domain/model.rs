use crate::utils::error::{CopytoolError, Result};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;

/// Content type used for every archived object.
pub const OCTET_STREAM: &str = "application/octet-stream";

fn fid_regex() -> &'static Regex {
    static FID_RE: OnceLock<Regex> = OnceLock::new();
    FID_RE.get_or_init(|| {
        Regex::new(r"^\[?(0x[0-9a-f]+:0x[0-9a-f]+:0x[0-9a-f]+)\]?$").expect("valid FID regex")
    })
}

/// Lustre file identifier in its canonical `0xSEQ:0xOID:0xVER` form.
///
/// The canonical text is also the object name in Google Drive.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct LustreFid(String);

impl LustreFid {
    /// Accepts the bare form or the bracketed form printed by `lfs path2fid`.
    pub fn parse(raw: &str) -> Result<Self> {
        fid_regex()
            .captures(raw)
            .and_then(|caps| caps.get(1))
            .map(|m| Self(m.as_str().to_string()))
            .ok_or_else(|| CopytoolError::MalformedFid {
                fid: raw.to_string(),
            })
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for LustreFid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for LustreFid {
    type Err = CopytoolError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[cfg_attr(feature = "cli", derive(clap::ValueEnum))]
pub enum HsmAction {
    /// Archive the Lustre file to Google Drive.
    Push,
    /// Restore the Lustre file from Google Drive.
    Pull,
}

impl fmt::Display for HsmAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HsmAction::Push => f.write_str("push"),
            HsmAction::Pull => f.write_str("pull"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DriveFile {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct FileList {
    #[serde(default)]
    pub files: Vec<DriveFile>,
}

/// Metadata body sent along with media on create and update.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FileMetadata {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub mime_type: String,
    pub description: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub parents: Vec<String>,
}

impl FileMetadata {
    pub fn for_create(fid: &LustreFid, description: String, parent: &str) -> Self {
        Self {
            name: Some(fid.to_string()),
            mime_type: OCTET_STREAM.to_string(),
            description,
            parents: vec![parent.to_string()],
        }
    }

    /// Updates only replace content and description; name and parents stay.
    pub fn for_update(description: String) -> Self {
        Self {
            name: None,
            mime_type: OCTET_STREAM.to_string(),
            description,
            parents: Vec::new(),
        }
    }
}
