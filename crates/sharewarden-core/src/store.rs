use std::path::{Path, PathBuf};

use anyhow::Result;

use crate::config::StorePaths;
use crate::decision::Decision;
use crate::fingerprint::fingerprint;
use crate::matrix::DecisionMatrix;
use crate::paths::contains;
use crate::response::Response;
use crate::sync::PolicySync;

/// The store the authorization and connection handlers talk to.
///
/// Owns the loaded matrix plus the resolved paths, and runs policy-file
/// reconciliation and persistence after every mutation. Operations that
/// can consume or drop a grant say so in their name; plain lookups live
/// on [`DecisionMatrix`] and never mutate.
#[derive(Debug)]
pub struct DecisionStore {
    matrix: DecisionMatrix,
    paths: StorePaths,
}

impl DecisionStore {
    /// Loads the matrix at the configured db path. Load failures are
    /// absorbed into an empty matrix.
    pub fn open(paths: StorePaths) -> Self {
        let matrix = DecisionMatrix::load(&paths.db_path);
        Self { matrix, paths }
    }

    pub fn matrix(&self) -> &DecisionMatrix {
        &self.matrix
    }

    pub fn decisions(&self) -> impl Iterator<Item = (&String, &Decision)> {
        self.matrix.iter()
    }

    /// Drops the entry for `fingerprint` if it is a one-time grant, then
    /// reconciles and persists. Returns whether a grant was consumed.
    pub fn revoke_onetime_access(&mut self, fingerprint: &str) -> Result<bool> {
        let is_onetime = self
            .matrix
            .get(fingerprint)
            .map(|decision| decision.response.is_onetime())
            .unwrap_or(false);
        if !is_onetime {
            return Ok(false);
        }
        tracing::info!(fingerprint, "one-time decision expired, applying policy changes");
        self.matrix.remove(fingerprint);
        self.reconcile_and_save()?;
        Ok(true)
    }

    /// Authorizing-side lookup. Resolves the request against prior
    /// decisions and consumes a matching one-time grant as a side effect:
    /// the first qualifying read erases it. A consumed one-time decision
    /// is not reported back as a standing one, so the returned response is
    /// `None` both when nothing matched and when a one-time grant was just
    /// spent; the fingerprint is returned either way for recording a new
    /// decision.
    pub fn consume_prior_authorization(
        &mut self,
        source: &str,
        target: &str,
        folder: &Path,
    ) -> Result<(Option<Response>, String)> {
        let (decision, fingerprint) = self.matrix.lookup_decision(source, target, folder);
        let response = decision.map(|decision| decision.response);
        self.revoke_onetime_access(&fingerprint)?;
        match response {
            Some(response) if !response.is_onetime() => Ok((Some(response), fingerprint)),
            _ => Ok((None, fingerprint)),
        }
    }

    /// Records a fresh authorization outcome and returns its fingerprint.
    ///
    /// `Block` means "stop asking, forever, for this machine pair": it is
    /// stored as a `DenyAlways` for the root folder, which every later
    /// request on the pair matches.
    pub fn record_authorization(
        &mut self,
        source: &str,
        target: &str,
        folder: &Path,
        response: Response,
    ) -> Result<String> {
        let (folder, response) = if response.is_block() {
            (PathBuf::from("/"), Response::DenyAlways)
        } else {
            (folder.to_path_buf(), response)
        };
        let fingerprint = fingerprint(source, target, &folder);
        self.matrix.insert(
            fingerprint.clone(),
            Decision::new(source, target, folder, response),
        );
        self.reconcile_and_save()?;
        Ok(fingerprint)
    }

    /// Target-side check, after the requesting machine has connected:
    /// looks up the decision by exact fingerprint, consumes it if
    /// one-time, and returns the authorized folder when the requested
    /// folder is the same or nested under it.
    pub fn consume_decision_folder(
        &mut self,
        fingerprint: &str,
        requested_folder: &Path,
    ) -> Result<Option<PathBuf>> {
        let matched = self.matrix.get(fingerprint).cloned();
        self.revoke_onetime_access(fingerprint)?;
        match matched {
            Some(decision) if contains(requested_folder, &decision.folder) => {
                tracing::info!(
                    requested = %requested_folder.display(),
                    authorized = %decision.folder.display(),
                    "requested folder is within the authorized folder"
                );
                Ok(Some(decision.folder))
            }
            _ => {
                tracing::info!(
                    requested = %requested_folder.display(),
                    "no approved request covers the folder"
                );
                Ok(None)
            }
        }
    }

    /// Drops any decision for `fingerprint`, reconciles, persists.
    /// Returns whether an entry existed.
    pub fn forget(&mut self, fingerprint: &str) -> Result<bool> {
        if self.matrix.remove(fingerprint).is_none() {
            return Ok(false);
        }
        self.reconcile_and_save()?;
        Ok(true)
    }

    /// Reconciles the policy directory against the current matrix without
    /// mutating the matrix itself.
    pub fn sync_policy_files(&self) -> Result<()> {
        PolicySync::new(&self.paths).apply_policy_changes_from(&self.matrix)
    }

    fn reconcile_and_save(&self) -> Result<()> {
        self.sync_policy_files()?;
        self.matrix.save(&self.paths.db_path)
    }
}
