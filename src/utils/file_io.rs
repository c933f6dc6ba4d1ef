use std::fs::create_dir_all;
use std::fs::File;
use std::fs::OpenOptions;
use std::path::Path;

use tracing::error;

pub fn create_parent_dir_if_not_exist(path: &Path) -> std::io::Result<()> {
    if let Some(parent_dir) = path.parent() {
        if !parent_dir.as_os_str().is_empty() && !parent_dir.exists() {
            if let Err(e) = create_dir_all(parent_dir) {
                error!("Failed to create log directory: {:?}", e);
                return Err(e);
            }
        }
    }
    Ok(())
}

/// Open (creating if needed) a file for appending, creating its parent
/// directories first.
pub fn open_file_for_append(path: &Path) -> std::io::Result<File> {
    create_parent_dir_if_not_exist(path)?;
    OpenOptions::new().append(true).create(true).open(path)
}
