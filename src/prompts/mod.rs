//! Saved prompt templates
//!
//! A directory of `*.txt` files, one template per file. The file name is
//! the template's identity; the contents are the prompt text.

use chrono::Local;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;
use tracing::debug;

use crate::config::Config;
use crate::errors::{Result, WorkflowError};

/// Templates written by `seed_defaults`
const DEFAULT_TEMPLATES: &[(&str, &str)] = &[
    (
        "Generate a Lesson Plan for New Officers",
        "Generate a comprehensive lesson plan tailored for new officers.\n\
         Imagine you've just joined the team: what critical duties, protocols, and skills do you need to master?\n\
         What operational challenges might you face on day one?\n\
         List the specific questions you'd ask your trainer or supervisor (e.g., about standard operating procedures, \
         escalation pathways, stakeholder engagement, or emergency response) to ensure you're fully prepared.\n\
         Then outline the sequence of modules, learning objectives, practical exercises, and reflection prompts that address those questions.",
    ),
    (
        "Generate a Lesson Plan for Licensing Criteria",
        "Generate a lesson plan for new officers on the key licensing criteria under the relevant regulations.\n\
         Imagine you're a newcomer seeking to understand documentation requirements, fit-and-proper assessments, and approval workflows.\n\
         What questions would you ask your mentor about each step?\n\
         Then structure a session with clear learning objectives, module titles, hands-on activities, and quiz prompts to reinforce those questions.",
    ),
    (
        "Generate a Lesson Plan for On-site Compliance Audits",
        "Generate a lesson plan for new officers on conducting on-site compliance audits at licensed venues.\n\
         Put yourself in the shoes of a fresh recruit: what checklists, risk indicators, and escalation protocols do you need clarified?\n\
         List the questions you'd pose to the audit lead, then design modules, exercises (e.g., mock inspections), \
         and reflection prompts to turn those questions into learning outcomes.",
    ),
    (
        "Generate a Lesson Plan for Responsible Gambling Measures",
        "Generate a lesson plan for new officers on responsible-gambling requirements.\n\
         Imagine you're asking: which self-exclusion tools, deposit-limit controls, and reporting metrics must operators provide?\n\
         What clarifications would you seek from the policy team?\n\
         Then outline learning objectives, demo activities, and knowledge checks that ensure mastery of each measure.",
    ),
    (
        "Generate a Lesson Plan for Enforcement Escalation",
        "Generate a lesson plan for new officers on enforcement-escalation pathways under the relevant laws.\n\
         Think like a new recruit: what triggers, reporting flows, and penalty scales do you need unpacked?\n\
         Formulate the key questions you'd ask your supervisor, then map out modules, role-play scenarios, \
         and quiz questions that address those queries step by step.",
    ),
    (
        "Compare the regulatory reports for the periods 2017–2018 and 2021–2022",
        "Compare the regulatory reports for the periods 2017–2018 and 2021–2022.\n\
         Highlight key differences in findings, metrics, and outcomes.\n\
         What were the major changes in regulatory focus, compliance metrics, or operational challenges between these two periods?\n\
         Identify the most significant shifts in the regulatory approach to casino regulation and enforcement, \
         and discuss the implications for future regulatory practices.",
    ),
    (
        "What are the key differences observed between Pulse Survey of 2022, 2023 and 2024",
        "what are the key differences observed between Pulse Survey of 2022, 2023 and 2024",
    ),
];

/// One saved template
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PromptTemplate {
    /// File name, including `.txt`
    pub name: String,
    pub text: String,
}

/// Runs of characters that may not appear in a template file name
static UNSAFE_RUN: LazyLock<Option<Regex>> = LazyLock::new(|| Regex::new(r"[^\w\- ]+").ok());

/// Sanitize a display name into a template file name.
///
/// Keeps word characters, `-` and spaces from the name's stem, replaces
/// every other run of characters with `_`, and appends `.txt`.
pub fn clean_filename(name: &str) -> String {
    let name = name.trim();
    let stem = Path::new(name)
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("");

    let cleaned = match UNSAFE_RUN.as_ref() {
        Some(re) => re.replace_all(stem, "_"),
        None => Cow::Borrowed(stem),
    };

    let cleaned = cleaned.trim();
    if cleaned.is_empty() {
        "untitled.txt".to_string()
    } else {
        format!("{}.txt", cleaned)
    }
}

/// File-backed template store
#[derive(Debug, Clone)]
pub struct PromptStore {
    dir: PathBuf,
}

impl PromptStore {
    /// Open a store, creating the directory if needed
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    pub fn from_config(config: &Config) -> Result<Self> {
        Self::new(config.prompt_dir())
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Write the built-in templates that are not on disk yet.
    /// Returns how many were written.
    pub fn seed_defaults(&self) -> Result<usize> {
        let mut written = 0;
        for (name, text) in DEFAULT_TEMPLATES {
            let path = self.dir.join(clean_filename(name));
            if !path.exists() {
                fs::write(&path, text)?;
                written += 1;
            }
        }
        debug!(written, dir = %self.dir.display(), "default prompts seeded");
        Ok(written)
    }

    /// All templates, sorted by file name
    pub fn list(&self) -> Result<Vec<PromptTemplate>> {
        let mut paths = Vec::new();
        for entry in fs::read_dir(&self.dir)? {
            let path = entry?.path();
            if path.is_file() && path.extension().map_or(false, |ext| ext == "txt") {
                paths.push(path);
            }
        }
        paths.sort();

        paths
            .into_iter()
            .map(|path| {
                let text = fs::read_to_string(&path)?;
                let name = path
                    .file_name()
                    .and_then(|n| n.to_str())
                    .unwrap_or_default()
                    .to_string();
                Ok(PromptTemplate { name, text })
            })
            .collect()
    }

    pub fn get(&self, name: &str) -> Result<PromptTemplate> {
        let path = self.existing_path(name)?;
        Ok(PromptTemplate {
            name: name.to_string(),
            text: fs::read_to_string(path)?,
        })
    }

    /// Save new prompt text under a timestamped name
    pub fn add(&self, text: &str) -> Result<PromptTemplate> {
        if text.trim().is_empty() {
            return Err(WorkflowError::PromptStore("prompt text is empty".to_string()));
        }

        let base = format!("prompt_{}", Local::now().format("%Y%m%d_%H%M%S"));
        let mut name = format!("{}.txt", base);
        let mut suffix = 1;
        while self.dir.join(&name).exists() {
            name = format!("{}_{}.txt", base, suffix);
            suffix += 1;
        }

        fs::write(self.dir.join(&name), text)?;
        debug!(name = %name, "prompt saved");
        Ok(PromptTemplate {
            name,
            text: text.to_string(),
        })
    }

    /// Replace the text of an existing template
    pub fn update(&self, name: &str, text: &str) -> Result<()> {
        let path = self.existing_path(name)?;
        fs::write(path, text)?;
        Ok(())
    }

    /// Rename a template; the new name is sanitized. Returns the final name.
    pub fn rename(&self, old: &str, new: &str) -> Result<String> {
        let from = self.existing_path(old)?;
        let new_name = clean_filename(new);
        if new_name == old {
            return Ok(new_name);
        }

        let to = self.dir.join(&new_name);
        if to.exists() {
            return Err(WorkflowError::PromptStore(format!(
                "a prompt named '{}' already exists",
                new_name
            )));
        }

        fs::rename(from, to)?;
        Ok(new_name)
    }

    /// Delete a template; a missing file is not an error
    pub fn delete(&self, name: &str) -> Result<()> {
        let path = self.path_for(name)?;
        match fs::remove_file(path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    /// Path for a bare file name inside the store
    fn path_for(&self, name: &str) -> Result<PathBuf> {
        let is_bare = Path::new(name).file_name().and_then(|n| n.to_str()) == Some(name);
        if name.is_empty() || !is_bare {
            return Err(WorkflowError::PromptStore(format!("invalid prompt name '{}'", name)));
        }
        Ok(self.dir.join(name))
    }

    fn existing_path(&self, name: &str) -> Result<PathBuf> {
        let path = self.path_for(name)?;
        if !path.is_file() {
            return Err(WorkflowError::PromptStore(format!("no prompt named '{}'", name)));
        }
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn store() -> (TempDir, PromptStore) {
        let dir = TempDir::new().unwrap();
        let store = PromptStore::new(dir.path().join("prompts")).unwrap();
        (dir, store)
    }

    #[test]
    fn test_clean_filename() {
        assert_eq!(clean_filename("My Prompt"), "My Prompt.txt");
        assert_eq!(clean_filename("  notes.md "), "notes.txt");
        assert_eq!(clean_filename("a/b/c.txt"), "c.txt");
        assert_eq!(clean_filename("what?! really"), "what_ really.txt");
        assert_eq!(clean_filename("2017–2018 report"), "2017_2018 report.txt");
        assert_eq!(clean_filename("Über-Bericht 2024"), "Über-Bericht 2024.txt");
        assert_eq!(clean_filename("???"), "_.txt");
        assert_eq!(clean_filename("   "), "untitled.txt");
    }

    #[test]
    fn test_seed_defaults_once() {
        let (_dir, store) = store();
        let first = store.seed_defaults().unwrap();
        assert_eq!(first, DEFAULT_TEMPLATES.len());
        assert_eq!(store.seed_defaults().unwrap(), 0);

        let names: Vec<String> = store.list().unwrap().into_iter().map(|t| t.name).collect();
        assert!(names.contains(&"Generate a Lesson Plan for New Officers.txt".to_string()));
        let mut sorted = names.clone();
        sorted.sort();
        assert_eq!(names, sorted);
    }

    #[test]
    fn test_seed_keeps_edited_template() {
        let (_dir, store) = store();
        store.seed_defaults().unwrap();
        store
            .update("Generate a Lesson Plan for New Officers.txt", "edited")
            .unwrap();
        store.seed_defaults().unwrap();

        let template = store.get("Generate a Lesson Plan for New Officers.txt").unwrap();
        assert_eq!(template.text, "edited");
    }

    #[test]
    fn test_add_and_list() {
        let (_dir, store) = store();
        let saved = store.add("Summarize the audit guide").unwrap();
        assert!(saved.name.starts_with("prompt_"));
        assert!(saved.name.ends_with(".txt"));

        let again = store.add("Another one").unwrap();
        assert_ne!(saved.name, again.name);
        assert_eq!(store.list().unwrap().len(), 2);
    }

    #[test]
    fn test_add_rejects_empty_text() {
        let (_dir, store) = store();
        assert!(matches!(store.add("  \n"), Err(WorkflowError::PromptStore(_))));
    }

    #[test]
    fn test_rename() {
        let (_dir, store) = store();
        let saved = store.add("text").unwrap();
        store.add("other").unwrap();

        let renamed = store.rename(&saved.name, "Audit: checklist").unwrap();
        assert_eq!(renamed, "Audit_ checklist.txt");
        assert_eq!(store.get(&renamed).unwrap().text, "text");
        assert!(store.get(&saved.name).is_err());
    }

    #[test]
    fn test_rename_refuses_existing_target() {
        let (_dir, store) = store();
        let first = store.add("first").unwrap();
        let second = store.add("second").unwrap();
        let target = store.rename(&second.name, "taken").unwrap();

        assert!(store.rename(&first.name, &target).is_err());
        assert_eq!(store.get(&first.name).unwrap().text, "first");
    }

    #[test]
    fn test_delete_ignores_missing() {
        let (_dir, store) = store();
        let saved = store.add("text").unwrap();
        store.delete(&saved.name).unwrap();
        store.delete(&saved.name).unwrap();
        assert!(store.list().unwrap().is_empty());
    }

    #[test]
    fn test_rejects_path_names() {
        let (_dir, store) = store();
        assert!(store.get("../secret.txt").is_err());
        assert!(store.delete("nested/file.txt").is_err());
    }
}
