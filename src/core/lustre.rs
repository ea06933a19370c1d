use crate::domain::model::LustreFid;
use crate::domain::ports::Describer;
use crate::utils::error::{CopytoolError, Result};
use async_trait::async_trait;
use std::path::PathBuf;
use tokio::process::Command;

/// Takes ownership of a file descriptor inherited from lhsmtool_cmd.
///
/// The agent opens the Lustre file (for reading on archive, writing on
/// restore) and passes its number through the `{fd}` placeholder. The
/// descriptor is closed when the returned file is dropped.
#[cfg(unix)]
pub fn inherited_fd(fd: i32) -> Result<tokio::fs::File> {
    use std::os::unix::io::{FromRawFd, RawFd};

    if fd < 0 {
        return Err(CopytoolError::InvalidConfigValueError {
            field: "fd".to_string(),
            value: fd.to_string(),
            reason: "file descriptor must not be negative".to_string(),
        });
    }

    // fcntl(F_GETFD) fails with EBADF if nothing is open under that number
    let raw: RawFd = fd;
    // SAFETY: F_GETFD only inspects the descriptor table.
    if unsafe { libc::fcntl(raw, libc::F_GETFD) } < 0 {
        return Err(CopytoolError::IoError(std::io::Error::last_os_error()));
    }

    // SAFETY: the descriptor is open and nothing else in this process owns it;
    // it was handed to us by the parent agent for exclusive use.
    let file = unsafe { std::fs::File::from_raw_fd(raw) };
    Ok(tokio::fs::File::from_std(file))
}

#[cfg(not(unix))]
pub fn inherited_fd(fd: i32) -> Result<tokio::fs::File> {
    Err(CopytoolError::InvalidConfigValueError {
        field: "fd".to_string(),
        value: fd.to_string(),
        reason: "inherited descriptors are only supported on unix".to_string(),
    })
}

/// Node name from gethostname(2), "unknown" if it cannot be read.
#[cfg(unix)]
pub fn hostname() -> String {
    let mut buf = [0u8; 256];
    // SAFETY: the length passed is the size of `buf`.
    if unsafe { libc::gethostname(buf.as_mut_ptr().cast(), buf.len()) } != 0 {
        return "unknown".to_string();
    }
    let len = buf.iter().position(|&b| b == 0).unwrap_or(buf.len());
    match String::from_utf8_lossy(&buf[..len]).trim() {
        "" => "unknown".to_string(),
        name => name.to_string(),
    }
}

#[cfg(not(unix))]
pub fn hostname() -> String {
    std::env::var("COMPUTERNAME").unwrap_or_else(|_| "unknown".to_string())
}

/// Builds the Drive description of an archived file from the Lustre
/// namespace: its path(s), its `stat` output and an archive stamp.
#[derive(Debug, Clone)]
pub struct ShellDescriber {
    lustre_root: PathBuf,
}

impl ShellDescriber {
    pub fn new<P: Into<PathBuf>>(lustre_root: P) -> Self {
        Self {
            lustre_root: lustre_root.into(),
        }
    }

    async fn command_output(program: &str, args: &[&str]) -> Option<String> {
        match Command::new(program).args(args).output().await {
            Ok(output) if output.status.success() => {
                Some(String::from_utf8_lossy(&output.stdout).into_owned())
            }
            Ok(output) => {
                tracing::warn!(
                    "{} exited with {}: {}",
                    program,
                    output.status,
                    String::from_utf8_lossy(&output.stderr).trim()
                );
                None
            }
            Err(e) => {
                tracing::warn!("failed to run {}: {}", program, e);
                None
            }
        }
    }

    /// Last line of every description.
    pub fn archive_stamp() -> String {
        format!(
            "Archived by {} on {}\n",
            hostname(),
            chrono::Local::now().format("%a %b %e %H:%M:%S %Z %Y")
        )
    }
}

#[async_trait]
impl Describer for ShellDescriber {
    async fn describe(&self, fid: &LustreFid) -> String {
        let root = self.lustre_root.to_string_lossy();
        let fid_path = self.lustre_root.join(".lustre/fid").join(fid.as_str());
        let fid_path = fid_path.to_string_lossy();

        let mut description = String::new();
        if let Some(paths) = Self::command_output("lfs", &["fid2path", &*root, fid.as_str()]).await {
            description.push_str(&paths);
        }
        if let Some(stat) = Self::command_output("stat", &[&*fid_path]).await {
            description.push_str(&stat);
        }
        description.push_str(&Self::archive_stamp());
        description
    }
}
