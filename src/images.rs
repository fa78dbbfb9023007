//! Discovers local images for a post by filename convention.
use crate::model::LocalImageRef;
use anyhow::{Context, Result};
use regex::Regex;
use std::path::Path;

/// Return the images for `post_number` inside `folder`, sorted ascending by
/// the numeric sequence in the filename. Convention: `<n>-<seq>.<ext>` with
/// ext in {jpg, jpeg, png, gif}, case-insensitive. A missing folder yields an
/// empty list, not an error.
pub fn images_for(post_number: u32, folder: &Path) -> Result<Vec<LocalImageRef>> {
    if !folder.exists() {
        return Ok(Vec::new());
    }

    let pattern = Regex::new(&format!(r"(?i)^{post_number}-(\d+)\.(jpg|jpeg|png|gif)$"))
        .expect("valid image pattern");

    let mut images = Vec::new();
    let entries = std::fs::read_dir(folder)
        .with_context(|| format!("failed to list image folder {}", folder.display()))?;
    for entry in entries {
        let entry = entry?;
        let name = entry.file_name();
        let Some(name) = name.to_str() else {
            continue;
        };
        // The sequence comes from the same capture that admitted the file,
        // so every retained entry is sortable by construction.
        if let Some(caps) = pattern.captures(name) {
            let sequence: u32 = caps[1]
                .parse()
                .with_context(|| format!("unsortable image name {name}"))?;
            images.push(LocalImageRef {
                path: entry.path(),
                post_number,
                sequence,
            });
        }
    }

    images.sort_by_key(|img| img.sequence);
    Ok(images)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;
    use tempfile::tempdir;

    fn touch(dir: &Path, name: &str) {
        File::create(dir.join(name)).unwrap();
    }

    #[test]
    fn missing_folder_yields_empty() {
        let images = images_for(1, Path::new("/no/such/folder")).unwrap();
        assert!(images.is_empty());
    }

    #[test]
    fn sorts_numerically_not_lexically() {
        let td = tempdir().unwrap();
        touch(td.path(), "3-10.jpg");
        touch(td.path(), "3-1.jpg");
        touch(td.path(), "3-2.PNG");
        let images = images_for(3, td.path()).unwrap();
        let names: Vec<String> = images
            .iter()
            .map(|i| i.path.file_name().unwrap().to_str().unwrap().to_string())
            .collect();
        assert_eq!(names, vec!["3-1.jpg", "3-2.PNG", "3-10.jpg"]);
        assert_eq!(
            images.iter().map(|i| i.sequence).collect::<Vec<_>>(),
            vec![1, 2, 10]
        );
    }

    #[test]
    fn excludes_other_posts_and_unrelated_files() {
        let td = tempdir().unwrap();
        touch(td.path(), "3-1.jpg");
        touch(td.path(), "30-1.jpg");
        touch(td.path(), "3-1.txt");
        touch(td.path(), "notes.md");
        touch(td.path(), "3.jpg");
        let images = images_for(3, td.path()).unwrap();
        assert_eq!(images.len(), 1);
        assert_eq!(images[0].post_number, 3);
    }

    #[test]
    fn accepts_all_supported_extensions_case_insensitively() {
        let td = tempdir().unwrap();
        touch(td.path(), "5-1.JPG");
        touch(td.path(), "5-2.jpeg");
        touch(td.path(), "5-3.Png");
        touch(td.path(), "5-4.GIF");
        touch(td.path(), "5-5.bmp");
        let images = images_for(5, td.path()).unwrap();
        assert_eq!(images.len(), 4);
    }

    #[test]
    fn empty_folder_yields_empty() {
        let td = tempdir().unwrap();
        assert!(images_for(9, td.path()).unwrap().is_empty());
    }
}
