pub mod backoff;
pub mod copytool;
pub mod drive;
pub mod lustre;
pub mod oauth;
pub mod query;

pub use crate::domain::model::{DriveFile, FileMetadata, HsmAction, LustreFid};
pub use crate::domain::ports::{Describer, DriveApi};
pub use crate::utils::error::Result;
