//! Permission file in gitolite's configuration format.
//!
//! ```text
//! repo group_0001
//!     RW+ = admin grader
//!     R = alice
//! ```
//!
//! Grouprepo manages `repo` blocks that name a single repository and hold
//! only plain `R`, `RW` and `RW+` rules for individual users. Everything
//! else (group definitions, deny rules, refexes, blocks naming several
//! repositories or groups) is kept as written, ahead of the managed blocks,
//! so gitolite still sees it first.

use std::path::Path;

use grouprepo_core::permission::{Document, Grants, Permission, PermissionFormat, PermissionSet};
use grouprepo_core::repo::{Error, Result};

#[derive(Clone, Copy, Debug, Default)]
pub struct GitoliteFormat;

/// One `repo` line and the lines below it.
struct Block {
    repos: Vec<String>,
    lines: Vec<String>,
    rules: Vec<(Permission, Vec<String>)>,
    managed: bool,
}

impl Block {
    fn new(repos: Vec<String>, line: &str) -> Block {
        let managed = repos.len() == 1 && !repos[0].starts_with('@');
        Block {
            repos,
            lines: vec![line.to_string()],
            rules: Vec::new(),
            managed,
        }
    }

    fn finish(self, document: &mut Document) {
        if !self.managed {
            document.kept.extend(self.lines);
            return;
        }

        for repo in self.repos {
            let set = document
                .grants
                .entry(repo)
                .or_insert_with(PermissionSet::new);
            for (level, users) in &self.rules {
                for user in users {
                    // Gitolite applies the first matching rule.
                    if !set.contains(user) {
                        set.insert(user.as_str(), *level);
                    }
                }
            }
        }
    }
}

impl PermissionFormat for GitoliteFormat {
    fn parse(&self, text: &str, path: &Path) -> Result<Document> {
        let invalid = |line: usize, reason: String| Error::InvalidPermissionFile {
            path: path.to_path_buf(),
            line,
            reason,
        };

        let mut document = Document::default();
        let mut block: Option<Block> = None;

        for (n, raw) in text.lines().enumerate() {
            let line = raw.trim();
            if line.is_empty() {
                continue;
            }

            if let Some(names) = line.strip_prefix("repo ") {
                let repos: Vec<String> = names.split_whitespace().map(str::to_string).collect();
                if repos.is_empty() {
                    return Err(invalid(n + 1, "`repo` without a name".to_string()));
                }
                if let Some(done) = block.take() {
                    done.finish(&mut document);
                }
                block = Some(Block::new(repos, raw));
                continue;
            }

            let current = match block.as_mut() {
                Some(current) => current,
                None if line.starts_with('#') || line.starts_with('@') || line.starts_with("include ") => {
                    document.kept.push(raw.to_string());
                    continue;
                }
                None => {
                    return Err(invalid(n + 1, "rule outside of a `repo` block".to_string()))
                }
            };
            current.lines.push(raw.to_string());

            // Comments in managed blocks are not carried over; group
            // definitions and options make the block foreign.
            if line.starts_with('#') {
                continue;
            }
            let first = line.split_whitespace().next().unwrap_or_default();
            if line.starts_with('@') || first == "config" || first == "option" {
                current.managed = false;
                continue;
            }

            let mut rule = line.splitn(2, '=');
            let access = rule.next().unwrap_or_default();
            let users = match rule.next() {
                Some(users) => users,
                None => return Err(invalid(n + 1, format!("expected `access = users`, got `{}`", line))),
            };

            let mut words = access.split_whitespace();
            let level = match words.next() {
                Some("R") => Some(Permission::Read),
                Some("RW") | Some("RW+") => Some(Permission::ReadWrite),
                Some("-") => None,
                Some(other) if is_extended_access(other) => None,
                Some(other) => {
                    return Err(invalid(n + 1, format!("unknown access level `{}`", other)))
                }
                None => return Err(invalid(n + 1, "missing access level".to_string())),
            };
            let users: Vec<String> = users.split_whitespace().map(str::to_string).collect();

            // A refex after the access level limits the rule to some refs.
            let refex = words.next().is_some();
            match level {
                Some(level) if !refex && users.iter().all(|user| !user.starts_with('@')) => {
                    current.rules.push((level, users));
                }
                _ => current.managed = false,
            }
        }

        if let Some(done) = block.take() {
            done.finish(&mut document);
        }
        Ok(document)
    }

    fn render(&self, grants: &Grants) -> String {
        let mut text = String::new();
        for (repo, set) in grants {
            text.push_str(&format!("repo {}\n", repo));
            for &(access, level) in &[("RW+", Permission::ReadWrite), ("R", Permission::Read)] {
                let users: Vec<&str> = set
                    .iter()
                    .filter(|(_, l)| *l == level)
                    .map(|(user, _)| user)
                    .collect();
                if !users.is_empty() {
                    text.push_str(&format!("    {} = {}\n", access, users.join(" ")));
                }
            }
            text.push('\n');
        }
        text
    }
}

/// Write access with extra rights, such as `RW+C` or `RWCD`.
fn is_extended_access(access: &str) -> bool {
    access.starts_with("RW")
        && access.len() > 2
        && access[2..].chars().all(|c| "+CDM".contains(c))
}
