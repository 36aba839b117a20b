//! Permission file in Subversion's `authz` format.
//!
//! ```text
//! [group_0001:/]
//! admin = rw
//! alice = r
//! ```
//!
//! A section per repository, rooted at `/`. Other sections (such as
//! `[groups]` or path rules below a repository root) and comments outside
//! repository sections are kept as they are.

use std::path::Path;

use grouprepo_core::permission::{Document, Grants, Permission, PermissionFormat, PermissionSet};
use grouprepo_core::repo::{Error, Result};

#[derive(Clone, Copy, Debug, Default)]
pub struct AuthzFormat;

enum Section {
    /// Before the first section header.
    Preamble,
    Repository(String),
    Foreign,
}

impl PermissionFormat for AuthzFormat {
    fn parse(&self, text: &str, path: &Path) -> Result<Document> {
        let invalid = |line: usize, reason: String| Error::InvalidPermissionFile {
            path: path.to_path_buf(),
            line,
            reason,
        };

        let mut document = Document::default();
        let mut section = Section::Preamble;

        for (n, raw) in text.lines().enumerate() {
            let line = raw.trim();
            if line.is_empty() {
                continue;
            }

            if line.starts_with('[') {
                if !line.ends_with(']') {
                    return Err(invalid(n + 1, format!("unterminated section `{}`", line)));
                }
                let name = &line[1..line.len() - 1];
                section = match name.strip_suffix(":/") {
                    Some(repo) if !repo.is_empty() => Section::Repository(repo.to_string()),
                    _ => {
                        document.kept.push(raw.to_string());
                        Section::Foreign
                    }
                };
                continue;
            }

            let comment = line.starts_with('#') || line.starts_with(';');
            let repo = match &section {
                Section::Repository(repo) => repo,
                Section::Foreign => {
                    document.kept.push(raw.to_string());
                    continue;
                }
                Section::Preamble if comment => {
                    document.kept.push(raw.to_string());
                    continue;
                }
                Section::Preamble => {
                    return Err(invalid(n + 1, "entry outside of a section".to_string()))
                }
            };
            // Repository sections are regenerated on every update.
            if comment {
                continue;
            }

            let mut kv = line.splitn(2, '=');
            let principal = kv.next().unwrap_or_default().trim();
            let level = match kv.next() {
                Some(level) => level.trim(),
                None => return Err(invalid(n + 1, format!("expected `user = level`, got `{}`", line))),
            };

            let level = match level {
                "rw" | "wr" => Permission::ReadWrite,
                "r" => Permission::Read,
                "" => Permission::None,
                other => return Err(invalid(n + 1, format!("unknown access level `{}`", other))),
            };

            if principal.is_empty() {
                return Err(invalid(n + 1, "missing user name".to_string()));
            }

            document
                .grants
                .entry(repo.clone())
                .or_insert_with(PermissionSet::new)
                .insert(principal, level);
        }

        Ok(document)
    }

    fn render(&self, grants: &Grants) -> String {
        let mut text = String::new();
        for (repo, set) in grants {
            text.push_str(&format!("[{}:/]\n", repo));
            for (principal, level) in set.iter() {
                match level {
                    Permission::None => text.push_str(&format!("{} =\n", principal)),
                    _ => text.push_str(&format!("{} = {}\n", principal, level)),
                }
            }
            text.push('\n');
        }
        text
    }
}
