//! Multi-section configuration documents.

use std::collections::HashSet;
use std::fmt;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use crate::error::{ConfigError, Result};
use crate::section::{banner_line, Section};

/// A configuration member. Anything that is not a section is rejected by `format()`.
#[derive(Debug, Clone)]
pub enum Entry {
    Section(Section),
    /// A non-section value, kept by its textual form for error reporting.
    Foreign(String),
}

impl From<Section> for Entry {
    fn from(section: Section) -> Self {
        Entry::Section(section)
    }
}

impl From<&str> for Entry {
    fn from(value: &str) -> Self {
        Entry::Foreign(value.to_string())
    }
}

impl From<String> for Entry {
    fn from(value: String) -> Self {
        Entry::Foreign(value)
    }
}

/// Ordered collection of sections rendered into one INI document.
#[derive(Debug, Clone, Default)]
pub struct Configuration {
    entries: Vec<Entry>,
    autoinclude_sections: bool,
    banner: bool,
}

impl Configuration {
    pub fn new<I, E>(entries: I) -> Self
    where
        I: IntoIterator<Item = E>,
        E: Into<Entry>,
    {
        Configuration {
            entries: entries.into_iter().map(Into::into).collect(),
            autoinclude_sections: false,
            banner: false,
        }
    }

    /// Make every section include every other named section (`ini = :name`).
    pub fn with_autoinclude(mut self, enabled: bool) -> Self {
        self.autoinclude_sections = enabled;
        self
    }

    /// Start the document with the generation banner comment.
    pub fn with_banner(mut self, enabled: bool) -> Self {
        self.banner = enabled;
        self
    }

    pub fn push(&mut self, entry: impl Into<Entry>) {
        self.entries.push(entry.into());
    }

    pub fn entries(&self) -> &[Entry] {
        &self.entries
    }

    /// Sections among the entries.
    pub fn sections(&self) -> impl Iterator<Item = &Section> {
        self.entries.iter().filter_map(|entry| match entry {
            Entry::Section(section) => Some(section),
            Entry::Foreign(_) => None,
        })
    }

    /// Validate and render the whole document.
    pub fn format(&self) -> Result<String> {
        let mut sections = self.validated_sections()?;

        if self.autoinclude_sections {
            let named: Vec<(usize, Section)> = sections
                .iter()
                .enumerate()
                .filter(|(_, section)| section.name().is_some())
                .map(|(idx, section)| (idx, section.clone()))
                .collect();

            for (idx, section) in sections.iter_mut().enumerate() {
                for (other_idx, other) in &named {
                    if *other_idx != idx {
                        section.include(other)?;
                    }
                }
            }
        }

        let mut rendered: Vec<String> = sections
            .iter()
            .map(|section| section.render(false))
            .collect();

        if self.banner {
            rendered.insert(0, banner_line());
        }

        Ok(rendered.join("\n"))
    }

    /// Write the document to `path`, or to a new temporary `.ini` file when `None`.
    ///
    /// Returns the path written.
    pub fn tofile(&self, path: Option<&Path>) -> Result<PathBuf> {
        let text = self.format()?;

        let path = match path {
            Some(path) => {
                let mut file = fs::File::create(path)?;
                file.write_all(text.as_bytes())?;
                path.to_path_buf()
            }
            None => {
                let mut file = tempfile::Builder::new()
                    .prefix("uwsgiconf-")
                    .suffix(".ini")
                    .tempfile()?;
                file.write_all(text.as_bytes())?;
                let (_file, path) = file.keep().map_err(|e| e.error)?;
                path
            }
        };

        tracing::info!(path = %path.display(), "configuration written");
        Ok(path)
    }

    /// Write the document to `writer`.
    pub fn write_ini<W: Write>(&self, mut writer: W) -> Result<()> {
        let text = self.format()?;
        writer.write_all(text.as_bytes())?;
        writer.flush()?;
        Ok(())
    }

    /// Write the document to standard output.
    pub fn print_ini(&self) -> Result<()> {
        let stdout = io::stdout();
        self.write_ini(stdout.lock())
    }

    fn validated_sections(&self) -> Result<Vec<Section>> {
        let mut seen: HashSet<&str> = HashSet::new();
        let mut sections = Vec::with_capacity(self.entries.len());

        for entry in &self.entries {
            let section = match entry {
                Entry::Section(section) => section,
                Entry::Foreign(value) => return Err(ConfigError::NotASection(value.clone())),
            };

            if !seen.insert(section.effective_name()) {
                return Err(ConfigError::DuplicateSectionName(
                    section.effective_name().to_string(),
                ));
            }

            sections.push(section.clone());
        }

        Ok(sections)
    }
}

impl fmt::Display for Entry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Entry::Section(section) => write!(f, "Section[{}]", section.effective_name()),
            Entry::Foreign(value) => f.write_str(value),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::options::Mutation;

    #[test]
    fn test_non_section_member_rejected() {
        let config = Configuration::new([Entry::from(Section::new()), Entry::from("some")]);
        let result = config.format();
        assert!(matches!(&result, Err(ConfigError::NotASection(v)) if v == "some"));
        assert!(result.unwrap_err().to_string().contains("Section"));
    }

    #[test]
    fn test_duplicate_names_rejected_until_renamed() {
        let s1 = Section::new();
        let mut s2 = Section::new();

        let result = Configuration::new([s1.clone(), s2.clone()]).format();
        assert!(matches!(&result, Err(ConfigError::DuplicateSectionName(n)) if n == "uwsgi"));
        assert!(result.unwrap_err().to_string().contains("unique"));

        let same = Configuration::new([Section::named("a"), Section::named("a")]).format();
        assert!(matches!(same, Err(ConfigError::DuplicateSectionName(_))));

        s2.set_name(Some("another"));
        assert!(Configuration::new([s1, s2]).format().is_ok());
    }

    #[test]
    fn test_autoinclude_links_named_sections() {
        let s1 = Section::new();
        let s2 = Section::named("another");
        let s3 = Section::named("third");

        let text = Configuration::new([s1, s2, s3])
            .with_autoinclude(true)
            .format()
            .unwrap();

        assert_eq!(
            text,
            "[uwsgi]\nini = :another\nini = :third\n\n\
             [another]\nini = :third\n\n\
             [third]\nini = :another\n"
        );
    }

    #[test]
    fn test_format_does_not_mutate_sections() {
        let config = Configuration::new([Section::named("a"), Section::named("b")])
            .with_autoinclude(true);
        let first = config.format().unwrap();
        let second = config.format().unwrap();
        assert_eq!(first, second);
        assert!(config.sections().all(|s| s.options().is_empty()));
    }

    #[test]
    fn test_banner_prepended() {
        let text = Section::new().as_configuration().with_banner(true).format().unwrap();
        assert!(text.starts_with("; This configuration was automatically generated"));
    }

    #[test]
    fn test_tofile_explicit_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.ini");

        let mut section = Section::named("app");
        section.set(Mutation::new("workers", 2));
        let written = section.as_configuration().tofile(Some(&path)).unwrap();

        assert_eq!(written, path);
        assert_eq!(
            std::fs::read_to_string(&path).unwrap(),
            "[app]\nworkers = 2\n"
        );
    }

    #[test]
    fn test_tofile_temporary_path() {
        let path = Section::new().as_configuration().tofile(None).unwrap();
        assert!(path.exists());
        assert_eq!(path.extension().and_then(|e| e.to_str()), Some("ini"));
        std::fs::remove_file(path).unwrap();
    }

    #[test]
    fn test_tofile_propagates_validation_error() {
        let config = Configuration::new([Section::new(), Section::new()]);
        assert!(matches!(
            config.tofile(None),
            Err(ConfigError::DuplicateSectionName(_))
        ));
    }

    #[test]
    fn test_write_ini() {
        let mut buffer = Vec::new();
        Section::named("x")
            .as_configuration()
            .write_ini(&mut buffer)
            .unwrap();
        assert_eq!(String::from_utf8(buffer).unwrap(), "[x]\n");
    }

    #[test]
    fn test_print_ini() {
        assert!(Configuration::new([Section::new()]).print_ini().is_ok());
    }
}
