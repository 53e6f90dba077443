use std::collections::HashSet;
use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use walkdir::WalkDir;

use crate::config::StorePaths;
use crate::matrix::DecisionMatrix;

/// Projects the matrix into a directory of per-grant policy files read by
/// the inter-VM RPC dispatcher.
///
/// Stateless: holds only the target directory and file prefix, and is
/// constructed fresh wherever reconciliation is needed. Each allow-type
/// decision owns one file named `<prefix>+<fingerprint>` whose single line
/// is `"<source> <target> allow"`; non-allow decisions own no file.
#[derive(Debug, Clone)]
pub struct PolicySync {
    policy_dir: PathBuf,
    file_prefix: String,
}

impl PolicySync {
    pub fn new(paths: &StorePaths) -> Self {
        Self::with_dir(paths.policy_dir.clone(), paths.policy_file_prefix.clone())
    }

    pub fn with_dir(policy_dir: PathBuf, file_prefix: String) -> Self {
        Self {
            policy_dir,
            file_prefix,
        }
    }

    /// Path of the policy file owned by `fingerprint`.
    pub fn policy_path(&self, fingerprint: &str) -> PathBuf {
        self.policy_dir
            .join(format!("{}+{}", self.file_prefix, fingerprint))
    }

    /// Creates the policy file for an allow decision. Existing files are
    /// left untouched.
    pub fn grant_for(&self, source: &str, target: &str, fingerprint: &str) -> Result<()> {
        let path = self.policy_path(fingerprint);
        if path.is_file() {
            return Ok(());
        }
        fs::create_dir_all(&self.policy_dir)
            .with_context(|| format!("create policy dir {}", self.policy_dir.display()))?;
        tracing::info!(path = %path.display(), "creating policy file");
        let tmp = PathBuf::from({
            let mut name = path.as_os_str().to_os_string();
            name.push(".tmp");
            name
        });
        fs::write(&tmp, format!("{} {} allow", source, target))
            .with_context(|| format!("write policy file {}", tmp.display()))?;
        fs::set_permissions(&tmp, fs::Permissions::from_mode(0o664))
            .with_context(|| format!("set permissions on {}", tmp.display()))?;
        fs::rename(&tmp, &path)
            .with_context(|| format!("replace policy file {}", path.display()))?;
        Ok(())
    }

    /// Removes the policy file for `fingerprint`. Already absent is fine.
    pub fn revoke_for(&self, fingerprint: &str) -> Result<()> {
        let path = self.policy_path(fingerprint);
        remove_tolerant(&path)
    }

    /// Reconciles the policy directory with `matrix`: creates files for
    /// allow decisions, removes files for non-allow decisions, and sweeps
    /// away files whose fingerprint is no longer in the matrix.
    pub fn apply_policy_changes_from(&self, matrix: &DecisionMatrix) -> Result<()> {
        let mut existing = self.existing_policy_files()?;
        for (fingerprint, decision) in matrix.iter() {
            existing.remove(&self.policy_path(fingerprint));
            if decision.response.is_allow() {
                self.grant_for(&decision.source, &decision.target, fingerprint)?;
            } else {
                self.revoke_for(fingerprint)?;
            }
        }
        for stale in existing {
            remove_tolerant(&stale)?;
        }
        Ok(())
    }

    fn existing_policy_files(&self) -> Result<HashSet<PathBuf>> {
        let mut files = HashSet::new();
        if !self.policy_dir.is_dir() {
            return Ok(files);
        }
        let marker = format!("{}+", self.file_prefix);
        for entry in WalkDir::new(&self.policy_dir).min_depth(1).max_depth(1) {
            let entry = entry
                .with_context(|| format!("scan policy dir {}", self.policy_dir.display()))?;
            if !entry.file_type().is_file() {
                continue;
            }
            if entry.file_name().to_string_lossy().starts_with(&marker) {
                files.insert(entry.into_path());
            }
        }
        Ok(files)
    }
}

fn remove_tolerant(path: &Path) -> Result<()> {
    match fs::remove_file(path) {
        Ok(()) => {
            tracing::info!(path = %path.display(), "removing policy file");
            Ok(())
        }
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(err) => {
            Err(err).with_context(|| format!("remove policy file {}", path.display()))
        }
    }
}
