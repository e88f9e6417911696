use std::path::Path;

/// Converts a path to a POSIX-style string, replacing backslashes with forward slashes.
#[must_use]
pub fn to_posix_string(path: &Path) -> String {
    path.to_string_lossy().replace('\\', "/")
}

/// Short `parent/name` label for a folder, used in logs and progress bars.
#[must_use]
pub fn folder_label(folder: &Path) -> String {
    let name = folder.file_name().map(|n| n.to_string_lossy());
    let parent = folder
        .parent()
        .and_then(Path::file_name)
        .map(|n| n.to_string_lossy());
    match (parent, name) {
        (Some(parent), Some(name)) => format!("{parent}/{name}"),
        (None, Some(name)) => name.into_owned(),
        _ => to_posix_string(folder),
    }
}
