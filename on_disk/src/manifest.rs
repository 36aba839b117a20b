//! Text description of one revision, stored at `db/revs/<n>`.
//!
//! ```text
//! revision 2
//! date 2026-10-18T09:30:00.000000000Z
//! author alice
//! message first submission\nwith a second line
//! file d670460b4b4aece5915caf5c68d12f560a9fe3e4 13 2026-10-18T09:30:00.000000000Z A1/main.c
//! ```
//!
//! The path is the last field of a `file` line and may contain spaces.

use std::collections::BTreeMap;
use std::io;

use chrono::{DateTime, SecondsFormat, Utc};
use grouprepo_core::path::RepoPath;

use crate::blob::BlobId;

#[derive(Clone, Debug, PartialEq)]
pub(crate) struct Entry {
    pub blob: BlobId,
    pub size: u64,
    pub last_modified: DateTime<Utc>,
}

#[derive(Clone, Debug, PartialEq)]
pub(crate) struct Manifest {
    pub number: u64,
    pub date: DateTime<Utc>,
    pub author: String,
    pub message: String,
    pub files: BTreeMap<RepoPath, Entry>,
}

impl Manifest {
    pub(crate) fn render(&self) -> String {
        let mut text = format!(
            "revision {}\ndate {}\nauthor {}\nmessage {}\n",
            self.number,
            format_time(&self.date),
            escape(&self.author),
            escape(&self.message)
        );

        for (path, entry) in &self.files {
            text.push_str(&format!(
                "file {} {} {} {}\n",
                entry.blob,
                entry.size,
                format_time(&entry.last_modified),
                path
            ));
        }
        text
    }

    pub(crate) fn parse(text: &str) -> io::Result<Manifest> {
        let mut number = None;
        let mut date = None;
        let mut author = String::new();
        let mut message = String::new();
        let mut files = BTreeMap::new();

        for line in text.lines() {
            let mut fields = line.splitn(2, ' ');
            let key = fields.next().unwrap_or_default();
            let value = fields.next().unwrap_or_default();

            match key {
                "revision" => {
                    number = Some(value.parse::<u64>().map_err(|_| invalid(line))?);
                }
                "date" => date = Some(parse_time(value).ok_or_else(|| invalid(line))?),
                "author" => author = unescape(value),
                "message" => message = unescape(value),
                "file" => {
                    let (path, entry) = parse_file(value).ok_or_else(|| invalid(line))?;
                    files.insert(path, entry);
                }
                "" => {}
                _ => return Err(invalid(line)),
            }
        }

        Ok(Manifest {
            number: number.ok_or_else(|| invalid("missing revision"))?,
            date: date.ok_or_else(|| invalid("missing date"))?,
            author,
            message,
            files,
        })
    }
}

fn parse_file(value: &str) -> Option<(RepoPath, Entry)> {
    let mut fields = value.splitn(4, ' ');
    let blob = BlobId::from_hex(fields.next()?)?;
    let size = fields.next()?.parse().ok()?;
    let last_modified = parse_time(fields.next()?)?;
    let path = RepoPath::new(fields.next()?).ok()?;

    Some((
        path,
        Entry {
            blob,
            size,
            last_modified,
        },
    ))
}

fn format_time(time: &DateTime<Utc>) -> String {
    time.to_rfc3339_opts(SecondsFormat::Nanos, true)
}

fn parse_time(s: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .ok()
        .map(|time| time.with_timezone(&Utc))
}

fn escape(s: &str) -> String {
    s.replace('\\', "\\\\").replace('\n', "\\n")
}

fn unescape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut chars = s.chars();
    while let Some(c) = chars.next() {
        if c == '\\' {
            match chars.next() {
                Some('n') => out.push('\n'),
                Some(other) => out.push(other),
                None => out.push('\\'),
            }
        } else {
            out.push(c);
        }
    }
    out
}

fn invalid(line: &str) -> io::Error {
    io::Error::new(
        io::ErrorKind::InvalidData,
        format!("malformed revision manifest: `{}`", line),
    )
}
