//! Small file-system helpers shared by workflow and config persistence.

use std::io::{self, Write};
use std::path::Path;

/// Write `contents` to `path`, creating or truncating it with mode 0600 on unix.
///
/// Permissions of an existing file are tightened as well.
pub fn write_private(path: &Path, contents: &[u8]) -> io::Result<()> {
    let mut options = std::fs::OpenOptions::new();
    options.write(true).create(true).truncate(true);

    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o600);
    }

    let mut file = options.open(path)?;
    file.write_all(contents)?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        file.set_permissions(std::fs::Permissions::from_mode(0o600))?;
    }

    Ok(())
}

/// Returns true if `name` has a `.yml` or `.yaml` extension.
pub fn is_yaml_file(name: &Path) -> bool {
    matches!(
        name.extension().and_then(|e| e.to_str()),
        Some("yml") | Some("yaml")
    )
}
