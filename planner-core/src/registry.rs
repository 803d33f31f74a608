//! Ordered registry of class names, one per line.
//!
//! Names are stored as typed. Two names that differ only in case are treated
//! as the same class: adding a case variant is rejected, and events are tied
//! to their class case-insensitively. `exists` stays an exact check.

use std::path::{Path, PathBuf};

use crate::error::{PlannerError, PlannerResult};
use crate::event::names_match;
use crate::storage::{self, Transaction};

#[derive(Debug, Clone)]
pub struct ClassRegistry {
    path: PathBuf,
}

impl ClassRegistry {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        ClassRegistry { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn load_all(&self) -> PlannerResult<Vec<String>> {
        Ok(storage::read_lines(&self.path)?
            .into_iter()
            .filter(|line| !line.trim().is_empty())
            .collect())
    }

    pub fn exists(&self, name: &str) -> PlannerResult<bool> {
        Ok(self.load_all()?.iter().any(|c| c == name))
    }

    /// Register a class. Returns `false` when the exact name is already there.
    pub fn add(&self, name: &str) -> PlannerResult<bool> {
        validate_class_name(name)?;
        let classes = self.load_all()?;

        if classes.iter().any(|c| c == name) {
            return Ok(false);
        }
        if let Some(existing) = classes.iter().find(|c| names_match(c, name)) {
            return Err(PlannerError::DuplicateClass(existing.clone()));
        }

        storage::append_lines(&self.path, [name])?;
        tracing::debug!(class = name, "registered class");
        Ok(true)
    }

    pub fn stage_replace(&self, tx: &mut Transaction, classes: &[String]) -> PlannerResult<()> {
        tx.stage(&self.path, classes)?;
        Ok(())
    }
}

/// Class names must be non-blank single lines.
pub fn validate_class_name(name: &str) -> PlannerResult<()> {
    if name.trim().is_empty() || name.contains(['\n', '\r']) {
        return Err(PlannerError::InvalidClassName(name.to_string()));
    }
    Ok(())
}

/// Registry contents after renaming `old` to `new`, keeping its position.
pub(crate) fn renamed(classes: &[String], old: &str, new: &str) -> PlannerResult<Vec<String>> {
    validate_class_name(new)?;

    let position = classes
        .iter()
        .position(|c| c == old)
        .or_else(|| classes.iter().position(|c| names_match(c, old)))
        .ok_or_else(|| PlannerError::ClassNotFound(old.to_string()))?;

    let collision = classes
        .iter()
        .enumerate()
        .any(|(idx, c)| idx != position && names_match(c, new));
    if collision {
        return Err(PlannerError::DuplicateClass(new.to_string()));
    }

    let mut updated = classes.to_vec();
    updated[position] = new.to_string();
    Ok(updated)
}

/// Registry contents without `name`, and whether anything was removed.
pub(crate) fn without(classes: Vec<String>, name: &str) -> (Vec<String>, bool) {
    let before = classes.len();
    let kept: Vec<String> = classes.into_iter().filter(|c| !names_match(c, name)).collect();
    let removed = kept.len() != before;
    (kept, removed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn names(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_add_appends_in_order_and_ignores_exact_duplicate() {
        let dir = TempDir::new().unwrap();
        let registry = ClassRegistry::new(dir.path().join("classes.txt"));

        assert!(registry.add("Math101").unwrap());
        assert!(registry.add("History").unwrap());
        assert!(!registry.add("Math101").unwrap());

        assert_eq!(registry.load_all().unwrap(), names(&["Math101", "History"]));
    }

    #[test]
    fn test_add_after_unterminated_last_line() {
        let dir = TempDir::new().unwrap();
        let registry = ClassRegistry::new(dir.path().join("classes.txt"));
        std::fs::write(registry.path(), "Math").unwrap();

        assert!(registry.add("Art").unwrap());

        assert_eq!(registry.load_all().unwrap(), names(&["Math", "Art"]));
        assert!(registry.exists("Math").unwrap());
    }

    #[test]
    fn test_add_rejects_case_variant() {
        let dir = TempDir::new().unwrap();
        let registry = ClassRegistry::new(dir.path().join("classes.txt"));
        registry.add("Math101").unwrap();

        let err = registry.add("MATH101").unwrap_err();
        assert!(matches!(err, PlannerError::DuplicateClass(ref c) if c == "Math101"));
    }

    #[test]
    fn test_add_rejects_blank_and_multiline_names() {
        let dir = TempDir::new().unwrap();
        let registry = ClassRegistry::new(dir.path().join("classes.txt"));

        assert!(matches!(
            registry.add("  ").unwrap_err(),
            PlannerError::InvalidClassName(_)
        ));
        assert!(matches!(
            registry.add("a\nb").unwrap_err(),
            PlannerError::InvalidClassName(_)
        ));
        assert!(registry.load_all().unwrap().is_empty());
    }

    #[test]
    fn test_exists_is_exact() {
        let dir = TempDir::new().unwrap();
        let registry = ClassRegistry::new(dir.path().join("classes.txt"));
        registry.add("Math101").unwrap();

        assert!(registry.exists("Math101").unwrap());
        assert!(!registry.exists("math101").unwrap());
    }

    #[test]
    fn test_load_skips_blank_lines_and_carriage_returns() {
        let dir = TempDir::new().unwrap();
        let registry = ClassRegistry::new(dir.path().join("classes.txt"));
        std::fs::write(registry.path(), "Math\r\n\r\n\nArt\n").unwrap();

        assert_eq!(registry.load_all().unwrap(), names(&["Math", "Art"]));
    }

    #[test]
    fn test_renamed_keeps_position() {
        let updated = renamed(&names(&["A", "B", "C"]), "B", "Bee").unwrap();
        assert_eq!(updated, names(&["A", "Bee", "C"]));
    }

    #[test]
    fn test_renamed_allows_case_change_of_itself() {
        let updated = renamed(&names(&["math", "Art"]), "math", "Math").unwrap();
        assert_eq!(updated, names(&["Math", "Art"]));
    }

    #[test]
    fn test_renamed_rejects_collision() {
        let err = renamed(&names(&["Math", "Art"]), "Math", "art").unwrap_err();
        assert!(matches!(err, PlannerError::DuplicateClass(_)));
    }

    #[test]
    fn test_renamed_missing_class() {
        let err = renamed(&names(&["Math"]), "Art", "Music").unwrap_err();
        assert!(matches!(err, PlannerError::ClassNotFound(_)));
    }

    #[test]
    fn test_without() {
        let (kept, removed) = without(names(&["Math", "Art"]), "math");
        assert!(removed);
        assert_eq!(kept, names(&["Art"]));

        let (kept, removed) = without(kept, "Music");
        assert!(!removed);
        assert_eq!(kept, names(&["Art"]));
    }
}
