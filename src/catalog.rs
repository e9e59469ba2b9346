//! # Grouping Configuration Catalog
//!
//! Parses the grouping configuration document into an ordered list of
//! [`Group`]s. The document is plain text, extracted line by line:
//!
//! ```text
//! ## Tools <!-- 1.1高地 -->
//! - alpha
//! - beta
//!
//! ## Libraries
//! - gamma
//! ```
//!
//! A `## <name>` heading introduces a group; an optional `<!-- tag -->`
//! inline comment on the heading becomes the group's tag label. Subsequent
//! `- <short-name>` bullet lines belong to the group until the next heading
//! or end of input. Blank and other lines are ignored.
//!
//! Tags carrying a numeric hill marker (`<digits>[.<digits>]高地`) are
//! normalized by inserting `号` before `高地`, so `1.1高地` becomes
//! `1.1号高地`.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use regex::Regex;

use crate::defaults;
use crate::error::{Error, Result};

fn heading_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^##\s+(.+)$").expect("valid heading pattern"))
}

fn tag_comment_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"<!--\s*(.*?)\s*-->").expect("valid tag comment pattern"))
}

fn hill_tag_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^(\d+(?:\.\d+)?)高地$").expect("valid hill tag pattern"))
}

/// A named, optionally tagged, ordered set of repository short names mapped
/// to one local directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Group {
    /// Group name, unique within the catalog.
    pub name: String,
    /// Optional tag label, already normalized.
    pub tag: Option<String>,
    /// Repository short names in declared order.
    pub repos: Vec<String>,
}

impl Group {
    /// Directory name for this group: `<name>` or `<name> (<tag>)`.
    pub fn dir_name(&self) -> String {
        match &self.tag {
            Some(tag) => format!("{} ({})", self.name, tag),
            None => self.name.clone(),
        }
    }

    /// Target directory for this group under the mirror root.
    pub fn target_dir(&self, root: &Path) -> PathBuf {
        root.join(defaults::REPOS_SUBDIR).join(self.dir_name())
    }
}

/// The parsed grouping configuration: groups in document order.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    groups: Vec<Group>,
}

impl Catalog {
    /// Load the catalog from a configuration document on disk.
    ///
    /// A missing document is fatal: everything downstream needs the declared
    /// configuration to reconcile against.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.is_file() {
            return Err(Error::ConfigMissing {
                path: path.display().to_string(),
                hint: Some(format!(
                    "Create {} with '## <group>' headings and '- <repo>' bullets,\n  \
                     or point --config at an existing document",
                    defaults::CONFIG_FILE
                )),
            });
        }

        let text = fs::read_to_string(path)?;
        Ok(Self::parse(&text))
    }

    /// Parse catalog text into groups.
    pub fn parse(text: &str) -> Self {
        let mut groups: Vec<Group> = Vec::new();

        for line in text.lines() {
            let line = line.trim_end();

            if let Some(caps) = heading_re().captures(line) {
                let heading = caps[1].trim();
                let (name, tag) = split_heading(heading);
                groups.push(Group {
                    name,
                    tag,
                    repos: Vec::new(),
                });
                continue;
            }

            let trimmed = line.trim_start();
            if let Some(rest) = trimmed.strip_prefix("- ") {
                let short = rest.trim();
                if short.is_empty() {
                    continue;
                }
                // Bullets before the first heading have no group to join.
                if let Some(group) = groups.last_mut() {
                    group.repos.push(short.to_string());
                }
            }
        }

        Self { groups }
    }

    /// All groups in document order.
    pub fn groups(&self) -> &[Group] {
        &self.groups
    }

    /// Total number of configured repository short names.
    pub fn repo_count(&self) -> usize {
        self.groups.iter().map(|g| g.repos.len()).sum()
    }

    /// Find a group by fuzzy name: an exact match wins, otherwise the first
    /// case-insensitive substring match in catalog order.
    pub fn find_group_fuzzy(&self, input: &str) -> Option<&Group> {
        if let Some(group) = self.groups.iter().find(|g| g.name == input) {
            return Some(group);
        }

        let needle = input.to_lowercase();
        self.groups
            .iter()
            .find(|g| g.name.to_lowercase().contains(&needle))
    }

    /// Comma-separated group names, used in error hints.
    pub fn group_names(&self) -> String {
        self.groups
            .iter()
            .map(|g| g.name.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    }
}

/// Split a heading into group name and optional normalized tag.
fn split_heading(heading: &str) -> (String, Option<String>) {
    if let Some(caps) = tag_comment_re().captures(heading) {
        let raw_tag = caps[1].to_string();
        let name = tag_comment_re().replace(heading, "").trim().to_string();
        let tag = if raw_tag.is_empty() {
            None
        } else {
            Some(normalize_tag(&raw_tag))
        };
        (name, tag)
    } else {
        (heading.to_string(), None)
    }
}

/// Insert `号` before `高地` in numeric hill tags; other tags pass through.
fn normalize_tag(raw: &str) -> String {
    let tag = raw.trim();
    if let Some(caps) = hill_tag_re().captures(tag) {
        format!("{}号高地", &caps[1])
    } else {
        tag.to_string()
    }
}
