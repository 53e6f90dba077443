use std::collections::BTreeMap;
use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::decision::Decision;
use crate::fingerprint::fingerprint;
use crate::paths::contains;

/// All recorded decisions, keyed by fingerprint.
///
/// The matrix is the sole source of truth; the on-disk document and the
/// policy directory are projections of it. A `BTreeMap` keeps both the
/// serialized document and the scan order sorted by fingerprint, which
/// makes match ranking deterministic when folder lengths tie.
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DecisionMatrix {
    entries: BTreeMap<String, Decision>,
}

impl DecisionMatrix {
    /// Reads the decision document at `path`.
    ///
    /// Any failure (missing file, malformed JSON, unrecognized response
    /// name) yields an empty matrix: a decision that cannot be read is a
    /// decision that gets asked again.
    pub fn load(path: &Path) -> Self {
        match fs::read_to_string(path) {
            Ok(contents) => match serde_json::from_str(&contents) {
                Ok(matrix) => matrix,
                Err(err) => {
                    tracing::warn!(
                        path = %path.display(),
                        error = %err,
                        "decision store unreadable, starting empty"
                    );
                    Self::default()
                }
            },
            Err(err) => {
                if err.kind() != std::io::ErrorKind::NotFound {
                    tracing::warn!(
                        path = %path.display(),
                        error = %err,
                        "decision store unreadable, starting empty"
                    );
                }
                Self::default()
            }
        }
    }

    /// Writes the full matrix to `path`, indented with sorted keys.
    ///
    /// The document is written to a sibling temp file, set to mode 0664,
    /// and renamed into place, so a concurrent reader sees either the old
    /// or the new complete document.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("create store dir {}", parent.display()))?;
        }
        let contents = serde_json::to_string_pretty(self).context("render decision store JSON")?;
        let tmp = tmp_sibling(path);
        fs::write(&tmp, contents)
            .with_context(|| format!("write decision store {}", tmp.display()))?;
        fs::set_permissions(&tmp, fs::Permissions::from_mode(0o664))
            .with_context(|| format!("set permissions on {}", tmp.display()))?;
        fs::rename(&tmp, path)
            .with_context(|| format!("replace decision store {}", path.display()))?;
        Ok(())
    }

    /// Resolves a request against prior decisions.
    ///
    /// An entry matches when its source and target equal the request's and
    /// its folder contains the requested folder. Matches are ranked by
    /// folder length descending, fingerprint ascending; the first
    /// allow-type match wins, otherwise the most specific match. Without
    /// any match, the prospective fingerprint for the exact triple is
    /// returned so the caller can record a fresh decision under it.
    pub fn lookup_decision(
        &self,
        source: &str,
        target: &str,
        folder: &Path,
    ) -> (Option<&Decision>, String) {
        let mut matches: Vec<(&String, &Decision)> = self
            .entries
            .iter()
            .filter(|(_, decision)| {
                source == decision.source
                    && target == decision.target
                    && contains(folder, &decision.folder)
            })
            .collect();
        // Stable sort: equal-length folders stay in fingerprint order.
        matches.sort_by(|a, b| {
            b.1.folder
                .as_os_str()
                .len()
                .cmp(&a.1.folder.as_os_str().len())
        });
        if let Some(&(fp, decision)) = matches
            .iter()
            .find(|(_, decision)| decision.response.is_allow())
            .or_else(|| matches.first())
        {
            return (Some(decision), fp.clone());
        }
        (None, fingerprint(source, target, folder))
    }

    pub fn get(&self, fingerprint: &str) -> Option<&Decision> {
        self.entries.get(fingerprint)
    }

    pub fn insert(&mut self, fingerprint: String, decision: Decision) -> Option<Decision> {
        self.entries.insert(fingerprint, decision)
    }

    pub fn remove(&mut self, fingerprint: &str) -> Option<Decision> {
        self.entries.remove(fingerprint)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Decision)> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

fn tmp_sibling(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_os_string();
    name.push(".tmp");
    PathBuf::from(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::response::Response;
    use tempfile::TempDir;

    fn matrix_with(decisions: &[(&str, &str, &str, Response)]) -> DecisionMatrix {
        let mut matrix = DecisionMatrix::default();
        for (source, target, folder, response) in decisions {
            let fp = fingerprint(source, target, Path::new(folder));
            matrix.insert(fp, Decision::new(*source, *target, *folder, *response));
        }
        matrix
    }

    #[test]
    fn test_save_load_round_trip() {
        let dir = TempDir::new().unwrap();
        let db = dir.path().join("policy.db");
        let matrix = matrix_with(&[
            ("work", "vault", "/home/user/docs", Response::AllowAlways),
            ("play", "vault", "/srv/media", Response::DenyOnetime),
        ]);
        matrix.save(&db).unwrap();

        let loaded = DecisionMatrix::load(&db);
        assert_eq!(loaded.len(), 2);
        for (fp, decision) in matrix.iter() {
            assert_eq!(loaded.get(fp), Some(decision));
        }
    }

    #[test]
    fn test_saved_document_is_sorted_and_group_readable() {
        let dir = TempDir::new().unwrap();
        let db = dir.path().join("policy.db");
        let matrix = matrix_with(&[
            ("work", "vault", "/a", Response::AllowAlways),
            ("work", "vault", "/b", Response::DenyAlways),
            ("work", "vault", "/c", Response::AllowOnetime),
        ]);
        matrix.save(&db).unwrap();

        let contents = fs::read_to_string(&db).unwrap();
        // Fingerprints must appear in the document in sorted order.
        let offsets: Vec<usize> = matrix
            .iter()
            .map(|(fp, _)| contents.find(fp.as_str()).unwrap())
            .collect();
        assert!(offsets.windows(2).all(|pair| pair[0] < pair[1]));
        assert!(contents.contains('\n'), "document is indented");

        let mode = fs::metadata(&db).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o664);
        assert!(!db.with_extension("db.tmp").exists());
    }

    #[test]
    fn test_missing_and_corrupt_documents_load_empty() {
        let dir = TempDir::new().unwrap();
        let db = dir.path().join("policy.db");
        assert!(DecisionMatrix::load(&db).is_empty());

        fs::write(&db, "{ not json").unwrap();
        assert!(DecisionMatrix::load(&db).is_empty());
    }

    #[test]
    fn test_unknown_response_name_loads_empty() {
        let dir = TempDir::new().unwrap();
        let db = dir.path().join("policy.db");
        fs::write(
            &db,
            r#"{"0123456789abcdef0123456789abcdef": {
                "source": "work", "target": "vault",
                "folder": "/home/user", "response": "ALLOW_SOMETIMES"
            }}"#,
        )
        .unwrap();
        assert!(DecisionMatrix::load(&db).is_empty());
    }

    #[test]
    fn test_broader_grant_covers_subfolders() {
        let matrix = matrix_with(&[("work", "vault", "/home/user/docs", Response::AllowAlways)]);
        let (decision, _) = matrix.lookup_decision("work", "vault", Path::new("/home/user/docs/sub"));
        assert_eq!(decision.unwrap().response, Response::AllowAlways);
    }

    #[test]
    fn test_match_requires_same_machine_pair() {
        let matrix = matrix_with(&[("work", "vault", "/home/user/docs", Response::AllowAlways)]);
        let (decision, _) = matrix.lookup_decision("play", "vault", Path::new("/home/user/docs"));
        assert!(decision.is_none());
        let (decision, _) = matrix.lookup_decision("work", "media", Path::new("/home/user/docs"));
        assert!(decision.is_none());
    }

    #[test]
    fn test_no_match_returns_prospective_fingerprint() {
        let matrix = DecisionMatrix::default();
        let folder = Path::new("/home/user/docs");
        let (decision, fp) = matrix.lookup_decision("work", "vault", folder);
        assert!(decision.is_none());
        assert_eq!(fp, fingerprint("work", "vault", folder));
    }

    #[test]
    fn test_allow_wins_over_more_specific_deny() {
        let matrix = matrix_with(&[
            ("work", "vault", "/home/user/docs", Response::AllowAlways),
            ("work", "vault", "/home/user/docs/private", Response::DenyAlways),
        ]);
        let (decision, fp) =
            matrix.lookup_decision("work", "vault", Path::new("/home/user/docs/private"));
        let decision = decision.unwrap();
        assert_eq!(decision.response, Response::AllowAlways);
        assert_eq!(fp, fingerprint("work", "vault", Path::new("/home/user/docs")));
    }

    #[test]
    fn test_most_specific_allow_wins() {
        let matrix = matrix_with(&[
            ("work", "vault", "/home/user", Response::AllowAlways),
            ("work", "vault", "/home/user/docs", Response::AllowOnetime),
        ]);
        let (decision, _) =
            matrix.lookup_decision("work", "vault", Path::new("/home/user/docs/report"));
        assert_eq!(decision.unwrap().response, Response::AllowOnetime);
    }

    #[test]
    fn test_no_allow_returns_most_specific() {
        let matrix = matrix_with(&[
            ("work", "vault", "/home/user", Response::DenyAlways),
            ("work", "vault", "/home/user/docs", Response::DenyOnetime),
        ]);
        let (decision, fp) =
            matrix.lookup_decision("work", "vault", Path::new("/home/user/docs/report"));
        assert_eq!(decision.unwrap().response, Response::DenyOnetime);
        assert_eq!(fp, fingerprint("work", "vault", Path::new("/home/user/docs")));
    }

    #[test]
    fn test_equal_length_tiebreak_is_fingerprint_order() {
        // Two spellings of the same folder with the same raw length, so
        // specificity cannot separate them: the lowest fingerprint wins.
        let matrix = matrix_with(&[
            ("work", "vault", "/shared/./docs", Response::DenyAlways),
            ("work", "vault", "/shared/docs/.", Response::DenyOnetime),
        ]);
        let fp_one = fingerprint("work", "vault", Path::new("/shared/./docs"));
        let fp_two = fingerprint("work", "vault", Path::new("/shared/docs/."));
        let expected = fp_one.clone().min(fp_two.clone());
        assert_ne!(fp_one, fp_two);

        let (decision, fp) =
            matrix.lookup_decision("work", "vault", Path::new("/shared/docs/report"));
        assert!(decision.is_some());
        assert_eq!(fp, expected);
    }

    #[test]
    fn test_replacing_a_decision_keeps_one_entry_per_fingerprint() {
        let mut matrix = DecisionMatrix::default();
        let folder = Path::new("/home/user/docs");
        let fp = fingerprint("work", "vault", folder);
        matrix.insert(
            fp.clone(),
            Decision::new("work", "vault", folder, Response::AllowOnetime),
        );
        let previous = matrix.insert(
            fp.clone(),
            Decision::new("work", "vault", folder, Response::DenyAlways),
        );
        assert_eq!(previous.unwrap().response, Response::AllowOnetime);
        assert_eq!(matrix.len(), 1);
        assert_eq!(matrix.get(&fp).unwrap().response, Response::DenyAlways);
    }
}
