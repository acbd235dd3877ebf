use std::io::{self, Write};

use anyhow::Result;
use console::style;
use serde::Serialize;

use crate::store::{ArtifactStore, ClearReport};

#[derive(Debug, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum ClearOutcome {
    Empty,
    Cancelled,
    Cleared(ClearReport),
}

impl ClearOutcome {
    /// False when some artifact could not be removed.
    pub fn is_complete(&self) -> bool {
        match self {
            Self::Cleared(report) => report.failed.is_empty(),
            Self::Empty | Self::Cancelled => true,
        }
    }
}

pub fn run(force: bool, store: &ArtifactStore) -> Result<ClearOutcome> {
    run_with(force, store, prompt_for_clear)
}

fn run_with(
    force: bool,
    store: &ArtifactStore,
    confirm: impl FnOnce(usize) -> Result<bool>,
) -> Result<ClearOutcome> {
    let count = store.list()?.len();
    if count == 0 {
        return Ok(ClearOutcome::Empty);
    }

    // --force skips prompting
    if !force && !confirm(count)? {
        return Ok(ClearOutcome::Cancelled);
    }

    Ok(ClearOutcome::Cleared(store.clear()?))
}

/// Ask once before deleting every diagram.
fn prompt_for_clear(count: usize) -> Result<bool> {
    let mut stdout = io::stdout().lock();
    write!(
        stdout,
        "Remove {} diagram(s) from the output directory? [y/N] ",
        style(count).bold(),
    )?;
    stdout.flush()?;

    let mut input = String::new();
    io::stdin().read_line(&mut input)?;
    Ok(input.trim().eq_ignore_ascii_case("y"))
}

#[cfg(test)]
mod tests {
    use std::fs;

    use tempfile::TempDir;

    use super::*;
    use crate::store::ClearFailure;

    fn store_with(names: &[&str]) -> (TempDir, ArtifactStore) {
        let dir = TempDir::new().unwrap();
        for name in names {
            fs::write(dir.path().join(name), b"x").unwrap();
        }
        let store = ArtifactStore::new(dir.path());
        (dir, store)
    }

    #[test]
    fn test_empty_store_never_prompts() {
        let (_dir, store) = store_with(&[]);
        let outcome = run_with(false, &store, |_| panic!("should not prompt")).unwrap();
        assert!(matches!(outcome, ClearOutcome::Empty));
    }

    #[test]
    fn test_declined_prompt_keeps_files() {
        let (_dir, store) = store_with(&["a.png", "b.png"]);
        let outcome = run_with(false, &store, |count| {
            assert_eq!(count, 2);
            Ok(false)
        })
        .unwrap();

        assert!(matches!(outcome, ClearOutcome::Cancelled));
        assert_eq!(store.list().unwrap().len(), 2);
    }

    #[test]
    fn test_force_clears_without_prompt() {
        let (_dir, store) = store_with(&["a.png", "b.png", "notes.txt"]);
        let ClearOutcome::Cleared(report) =
            run_with(true, &store, |_| panic!("should not prompt")).unwrap()
        else {
            panic!("expected a clear report");
        };

        assert_eq!(report.removed.len(), 2);
        assert!(report.failed.is_empty());
        assert!(store.list().unwrap().is_empty());
    }

    #[test]
    fn test_skipped_files_make_clear_incomplete() {
        let partial = ClearOutcome::Cleared(ClearReport {
            removed: vec!["a.png".into()],
            failed: vec![ClearFailure {
                path: "b.png".into(),
                error: "Permission denied".to_string(),
            }],
        });
        assert!(!partial.is_complete());
        assert!(ClearOutcome::Cleared(ClearReport::default()).is_complete());
        assert!(ClearOutcome::Cancelled.is_complete());

        let json = serde_json::to_value(&partial).unwrap();
        assert_eq!(json["status"], "cleared");
        assert_eq!(json["failed"][0]["error"], "Permission denied");
    }
}
