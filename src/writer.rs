//! Idempotent file output
//!
//! Entity files are owned by the generator and rewritten on every run.
//! Repository files are created once and afterwards only ever receive a
//! single marker insertion, so hand-written methods survive regeneration.

use std::fs;
use std::io;
use std::path::PathBuf;

use tracing::{debug, warn};

/// Text inserted into an existing file that lacks it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MarkerPatch {
    /// Presence of this text means the file is already up to date
    pub detect: String,
    /// Block inserted before the anchor line, without trailing newline
    pub marker: String,
    /// Start of the line the marker goes in front of
    pub anchor: String,
}

impl MarkerPatch {
    /// Insert the marker into `content`
    ///
    /// Returns `None` when `content` already carries the marker or has no
    /// anchor line. Otherwise the marker lands in front of the first
    /// anchor line and every other byte is kept.
    pub fn apply(&self, content: &str) -> Option<String> {
        if content.contains(&self.detect) {
            return None;
        }
        let offset = self.anchor_offset(content)?;
        let newline = if content.contains("\r\n") { "\r\n" } else { "\n" };

        let mut patched = String::with_capacity(content.len() + self.marker.len() + 2);
        patched.push_str(&content[..offset]);
        patched.push_str(&self.marker.replace('\n', newline));
        patched.push_str(newline);
        patched.push_str(&content[offset..]);
        Some(patched)
    }

    /// Byte offset of the start of the first anchor line
    ///
    /// Class modifiers in front of the anchor (`final class ...`) still
    /// count as the anchor line.
    fn anchor_offset(&self, content: &str) -> Option<usize> {
        let mut offset = 0;
        for line in content.split_inclusive('\n') {
            if strip_class_modifiers(line.trim_start()).starts_with(&self.anchor) {
                return Some(offset);
            }
            offset += line.len();
        }
        None
    }
}

const CLASS_MODIFIERS: [&str; 3] = ["final", "abstract", "readonly"];

fn strip_class_modifiers(mut line: &str) -> &str {
    while let Some(rest) = CLASS_MODIFIERS.iter().find_map(|modifier| {
        line.strip_prefix(*modifier)
            .filter(|rest| rest.starts_with(char::is_whitespace))
    }) {
        line = rest.trim_start();
    }
    line
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WritePolicy {
    /// Replace whatever is on disk
    Overwrite,
    /// Write when absent, otherwise patch in the marker at most once
    CreateOrPatch(MarkerPatch),
}

/// A file the generator wants on disk
#[derive(Debug, Clone)]
pub struct GeneratedFile {
    pub path: PathBuf,
    pub contents: String,
    pub policy: WritePolicy,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteOutcome {
    Created,
    Replaced,
    Patched,
    Unchanged,
    /// Existing file had neither the marker nor an anchor line; left alone
    AnchorMissing,
}

/// Persist `file` according to its policy
pub fn write(file: &GeneratedFile) -> io::Result<WriteOutcome> {
    if let Some(parent) = file.path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }

    let exists = file.path.try_exists()?;
    match &file.policy {
        WritePolicy::Overwrite => {
            if exists {
                fs::remove_file(&file.path)?;
            }
            fs::write(&file.path, &file.contents)?;
            debug!(path = ?file.path, replaced = exists, "Wrote generated file");
            Ok(if exists {
                WriteOutcome::Replaced
            } else {
                WriteOutcome::Created
            })
        }
        WritePolicy::CreateOrPatch(_) if !exists => {
            fs::write(&file.path, &file.contents)?;
            debug!(path = ?file.path, "Created file");
            Ok(WriteOutcome::Created)
        }
        WritePolicy::CreateOrPatch(patch) => {
            let current = fs::read_to_string(&file.path)?;
            if current.contains(&patch.detect) {
                debug!(path = ?file.path, "Marker present, leaving file untouched");
                return Ok(WriteOutcome::Unchanged);
            }
            match patch.apply(&current) {
                Some(patched) => {
                    fs::write(&file.path, patched)?;
                    debug!(path = ?file.path, "Inserted marker");
                    Ok(WriteOutcome::Patched)
                }
                None => {
                    warn!(path = ?file.path, anchor = ?patch.anchor, "Anchor line not found, file left untouched");
                    Ok(WriteOutcome::AnchorMissing)
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    fn patch() -> MarkerPatch {
        MarkerPatch {
            detect: "@generated".to_string(),
            marker: "/**\n * @generated\n */".to_string(),
            anchor: "class Foo".to_string(),
        }
    }

    fn patched_file(dir: &TempDir, contents: &str) -> GeneratedFile {
        GeneratedFile {
            path: dir.path().join("Foo.php"),
            contents: contents.to_string(),
            policy: WritePolicy::CreateOrPatch(patch()),
        }
    }

    #[test]
    fn test_apply_inserts_before_anchor() {
        let original = "<?php\n\nuse Bar;\n\nclass Foo extends Bar\n{\n    // mine\n}\n";
        let patched = patch().apply(original).unwrap();
        assert_eq!(
            patched,
            "<?php\n\nuse Bar;\n\n/**\n * @generated\n */\nclass Foo extends Bar\n{\n    // mine\n}\n"
        );
    }

    #[test]
    fn test_apply_is_single_shot() {
        let original = "class Foo\n{\n}\n";
        let once = patch().apply(original).unwrap();
        assert_eq!(once.matches("@generated").count(), 1);
        assert_eq!(patch().apply(&once), None);
    }

    #[test]
    fn test_apply_only_first_anchor() {
        let original = "class Foo\n{\n}\nclass Foo\n";
        let patched = patch().apply(original).unwrap();
        assert_eq!(patched.matches("@generated").count(), 1);
        assert!(patched.ends_with("}\nclass Foo\n"));
    }

    #[test]
    fn test_apply_keeps_crlf() {
        let original = "<?php\r\nclass Foo\r\n{\r\n}\r\n";
        let patched = patch().apply(original).unwrap();
        assert_eq!(
            patched,
            "<?php\r\n/**\r\n * @generated\r\n */\r\nclass Foo\r\n{\r\n}\r\n"
        );
    }

    #[test]
    fn test_apply_before_modified_class() {
        let original = "<?php\n\nfinal readonly class Foo extends Bar\n{\n}\n";
        let patched = patch().apply(original).unwrap();
        assert_eq!(
            patched,
            "<?php\n\n/**\n * @generated\n */\nfinal readonly class Foo extends Bar\n{\n}\n"
        );
    }

    #[test]
    fn test_modifier_must_be_a_whole_word() {
        assert_eq!(patch().apply("<?php\nfinalclass Foo\n"), None);
    }

    #[test]
    fn test_apply_without_anchor() {
        assert_eq!(patch().apply("<?php\ninterface Foo {}\n"), None);
    }

    #[test]
    fn test_overwrite_replaces_existing() {
        let dir = TempDir::new().unwrap();
        let file = GeneratedFile {
            path: dir.path().join("nested/Entity/Foo.php"),
            contents: "fresh".to_string(),
            policy: WritePolicy::Overwrite,
        };

        assert_eq!(write(&file).unwrap(), WriteOutcome::Created);
        fs::write(&file.path, "edited by hand").unwrap();
        assert_eq!(write(&file).unwrap(), WriteOutcome::Replaced);
        assert_eq!(fs::read_to_string(&file.path).unwrap(), "fresh");
    }

    #[test]
    fn test_create_or_patch_creates() {
        let dir = TempDir::new().unwrap();
        let file = patched_file(&dir, "generated body");

        assert_eq!(write(&file).unwrap(), WriteOutcome::Created);
        assert_eq!(fs::read_to_string(&file.path).unwrap(), "generated body");
    }

    #[test]
    fn test_create_or_patch_leaves_marked_file() {
        let dir = TempDir::new().unwrap();
        let file = patched_file(&dir, "generated body");
        let custom = "/**\n * @generated\n */\nclass Foo\n{\n    public function mine() {}\n}\n";
        fs::write(&file.path, custom).unwrap();

        assert_eq!(write(&file).unwrap(), WriteOutcome::Unchanged);
        assert_eq!(fs::read(&file.path).unwrap(), custom.as_bytes());
    }

    #[test]
    fn test_create_or_patch_upgrades_old_file() {
        let dir = TempDir::new().unwrap();
        let file = patched_file(&dir, "generated body");
        let old = "<?php\nclass Foo\n{\n    public function mine() {}\n}\n";
        fs::write(&file.path, old).unwrap();

        assert_eq!(write(&file).unwrap(), WriteOutcome::Patched);
        let patched = fs::read_to_string(&file.path).unwrap();
        assert_eq!(patched.matches("@generated").count(), 1);
        let kept: Vec<_> = patched
            .lines()
            .filter(|l| !["/**", " * @generated", " */"].contains(l))
            .collect();
        assert_eq!(kept, old.lines().collect::<Vec<_>>());

        assert_eq!(write(&file).unwrap(), WriteOutcome::Unchanged);
    }

    #[test]
    fn test_create_or_patch_reports_missing_anchor() {
        let dir = TempDir::new().unwrap();
        let file = patched_file(&dir, "generated body");
        fs::write(&file.path, "<?php\n// nothing here\n").unwrap();

        assert_eq!(write(&file).unwrap(), WriteOutcome::AnchorMissing);
        assert_eq!(
            fs::read_to_string(&file.path).unwrap(),
            "<?php\n// nothing here\n"
        );
    }
}
