//! List bundle splitter
//!
//! The sync server answers a list request with every requested list in one
//! text body, each wrapped in `--startlist <name>` / `--endlist` markers. A
//! list the server could not produce contains an `http-result 404` line.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use crate::config::list_file_name;

const START_MARKER: &str = "--startlist";
const END_MARKER: &str = "--endlist";
const NOT_FOUND_LINE: &str = "http-result 404";

/// One list extracted from a bundle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BundledList {
    /// Relative list path as announced by the start marker
    pub name: String,
    /// List lines, each terminated by `\n`
    pub contents: String,
}

/// Result of splitting a bundle.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListBundle {
    pub lists: Vec<BundledList>,
    /// Names of lists the server reported as failed
    pub failed: Vec<String>,
}

impl ListBundle {
    /// Split bundle text into its lists.
    ///
    /// Blank lines are dropped. Lines outside a start/end pair are ignored.
    pub fn parse(text: &str) -> Self {
        let mut bundle = Self::default();
        let mut current: Option<String> = None;
        let mut failed = false;
        let mut contents = String::new();

        for line in text.lines() {
            if line.trim().is_empty() {
                continue;
            }

            if let Some(idx) = line.find(START_MARKER) {
                let name = line[idx + START_MARKER.len()..].trim().to_string();
                log::info!("Processing list {}", name);
                current = Some(name);
                failed = false;
                contents.clear();
            } else if line.starts_with(END_MARKER) {
                match current.take() {
                    Some(name) if failed => bundle.failed.push(name),
                    Some(name) => bundle.lists.push(BundledList {
                        name,
                        contents: std::mem::take(&mut contents),
                    }),
                    None => log::debug!("End marker without a list"),
                }
                failed = false;
                contents.clear();
            } else if current.is_some() {
                if line == NOT_FOUND_LINE {
                    log::warn!("404 returned for list {}", current.as_deref().unwrap_or_default());
                    failed = true;
                    continue;
                }
                contents.push_str(line);
                contents.push('\n');
            }
        }

        if let Some(name) = current {
            log::warn!("List {} is missing its end marker", name);
        }

        bundle
    }

    /// Write every list into `dir` under its flattened file name.
    pub fn write_to(&self, dir: &Path) -> io::Result<Vec<PathBuf>> {
        let mut written = Vec::with_capacity(self.lists.len());
        for list in &self.lists {
            let path = dir.join(list_file_name(&list.name));
            log::info!("Writing list {}", path.display());
            fs::write(&path, &list.contents)?;
            written.push(path);
        }
        Ok(written)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const BUNDLE: &str = "--startlist /adult/domains.txt\r\n\
        ||porn.example^\r\n\
        \r\n\
        ||xxx.example^\r\n\
        --endlist\r\n\
        --startlist /news/triggers.txt\n\
        http-result 404\n\
        --endlist\n\
        --startlist  /social/feeds.txt \n\
        ||feeds.example^\n\
        --endlist\n";

    #[test]
    fn splits_lists() {
        let bundle = ListBundle::parse(BUNDLE);
        assert_eq!(
            bundle.lists,
            vec![
                BundledList {
                    name: "/adult/domains.txt".to_string(),
                    contents: "||porn.example^\n||xxx.example^\n".to_string(),
                },
                BundledList {
                    name: "/social/feeds.txt".to_string(),
                    contents: "||feeds.example^\n".to_string(),
                },
            ]
        );
        assert_eq!(bundle.failed, vec!["/news/triggers.txt"]);
    }

    #[test]
    fn ignores_stray_lines_and_unterminated_lists() {
        let bundle = ListBundle::parse("noise\n--endlist\n--startlist /a/b.txt\nrule\n");
        assert!(bundle.lists.is_empty());
        assert!(bundle.failed.is_empty());
    }

    #[test]
    fn failed_list_does_not_leak_into_next() {
        let bundle = ListBundle::parse(
            "--startlist /a/x.txt\nleftover\nhttp-result 404\n--endlist\n--startlist /a/y.txt\nrule\n--endlist\n",
        );
        assert_eq!(bundle.lists.len(), 1);
        assert_eq!(bundle.lists[0].contents, "rule\n");
    }

    #[test]
    fn writes_flattened_files() {
        let dir = tempfile::tempdir().unwrap();
        let bundle = ListBundle::parse(BUNDLE);
        let written = bundle.write_to(dir.path()).unwrap();

        assert_eq!(written.len(), 2);
        let domains = fs::read_to_string(dir.path().join(".adult.domains.txt")).unwrap();
        assert_eq!(domains, "||porn.example^\n||xxx.example^\n");
        assert!(dir.path().join(".social.feeds.txt").exists());
    }
}
