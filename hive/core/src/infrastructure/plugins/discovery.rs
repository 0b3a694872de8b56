// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

// Plugin Discovery - Manifest Scanning with Partial-Failure Semantics
//
// Each configured location is scanned for `*.json` plugin manifests. A
// manifest names a provider from the built-in provider table; the provider
// constructs the implementation, which is then checked structurally against
// its declared category before registration. A bad candidate (unreadable
// file, malformed manifest, unknown provider, category mismatch, duplicate
// key) is recorded and skipped — discovery never aborts as a whole.

use crate::domain::plugin::PluginCategory;
use crate::infrastructure::plugins::builtin::{EchoAction, LocalConnection};
use crate::infrastructure::plugins::registry::{PluginHandle, PluginRegistry};
use serde::Deserialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;
use tracing::{info, warn};

/// A plugin manifest file (`<location>/<anything>.json`).
#[derive(Debug, Clone, Deserialize)]
pub struct PluginManifest {
    pub category: PluginCategory,
    pub name: String,
    pub version: String,
    /// Key into the provider table naming the implementation.
    pub provider: String,
    /// Provider-specific construction options.
    #[serde(default)]
    pub config: serde_json::Value,
}

/// Why one discovery candidate was skipped.
#[derive(Debug, Error)]
pub enum PluginLoadError {
    #[error("{path}: unreadable manifest: {reason}")]
    Unreadable { path: PathBuf, reason: String },

    #[error("{path}: malformed manifest: {reason}")]
    Malformed { path: PathBuf, reason: String },

    #[error("{path}: unknown provider '{provider}'")]
    UnknownProvider { path: PathBuf, provider: String },

    #[error("{path}: provider '{provider}' failed to construct plugin: {reason}")]
    Construction {
        path: PathBuf,
        provider: String,
        reason: String,
    },

    #[error("{path}: capability mismatch: manifest declares {declared} but provider built a {built} plugin")]
    CapabilityMismatch {
        path: PathBuf,
        declared: PluginCategory,
        built: PluginCategory,
    },

    #[error("{path}: {reason}")]
    Rejected { path: PathBuf, reason: String },
}

#[derive(Default)]
pub struct DiscoveryReport {
    pub registered: usize,
    pub errors: Vec<PluginLoadError>,
}

type ProviderFn =
    Box<dyn Fn(&PluginManifest) -> Result<PluginHandle, String> + Send + Sync>;

/// Scans plugin locations and registers what it finds.
pub struct PluginDiscovery {
    providers: HashMap<String, ProviderFn>,
}

impl PluginDiscovery {
    pub fn new() -> Self {
        Self { providers: HashMap::new() }
    }

    /// Discovery pre-loaded with the in-tree providers.
    pub fn with_builtin_providers() -> Self {
        let mut discovery = Self::new();
        discovery.add_provider("echo", |manifest| {
            Ok(PluginHandle::Action(Arc::new(EchoAction::new(
                manifest.name.clone(),
                manifest.version.clone(),
            ))))
        });
        discovery.add_provider("local", |manifest| {
            Ok(PluginHandle::Connection(Arc::new(LocalConnection::new(
                manifest.name.clone(),
                manifest.version.clone(),
            ))))
        });
        discovery
    }

    pub fn add_provider(
        &mut self,
        key: impl Into<String>,
        provider: impl Fn(&PluginManifest) -> Result<PluginHandle, String> + Send + Sync + 'static,
    ) {
        self.providers.insert(key.into(), Box::new(provider));
    }

    /// Scan every location and register each well-formed candidate into
    /// `registry`. Returns how many registered and the per-candidate
    /// failures; never fails as a whole.
    pub fn discover(&self, registry: &PluginRegistry, locations: &[PathBuf]) -> DiscoveryReport {
        let mut report = DiscoveryReport::default();

        for location in locations {
            if !location.exists() {
                warn!(location = %location.display(), "plugin location does not exist, skipping");
                continue;
            }
            let entries = match std::fs::read_dir(location) {
                Ok(entries) => entries,
                Err(e) => {
                    report.errors.push(PluginLoadError::Unreadable {
                        path: location.clone(),
                        reason: e.to_string(),
                    });
                    continue;
                }
            };

            let mut paths: Vec<PathBuf> = entries
                .flatten()
                .map(|entry| entry.path())
                .filter(|path| path.extension().is_some_and(|ext| ext == "json"))
                .collect();
            paths.sort();

            for path in paths {
                match self.load_candidate(registry, &path) {
                    Ok(manifest) => {
                        info!(
                            category = %manifest.category,
                            name = %manifest.name,
                            provider = %manifest.provider,
                            "plugin discovered"
                        );
                        report.registered += 1;
                    }
                    Err(e) => {
                        warn!(error = %e, "skipping plugin candidate");
                        report.errors.push(e);
                    }
                }
            }
        }

        report
    }

    fn load_candidate(
        &self,
        registry: &PluginRegistry,
        path: &Path,
    ) -> Result<PluginManifest, PluginLoadError> {
        let raw = std::fs::read_to_string(path).map_err(|e| PluginLoadError::Unreadable {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        let manifest: PluginManifest =
            serde_json::from_str(&raw).map_err(|e| PluginLoadError::Malformed {
                path: path.to_path_buf(),
                reason: e.to_string(),
            })?;

        let provider = self.providers.get(&manifest.provider).ok_or_else(|| {
            PluginLoadError::UnknownProvider {
                path: path.to_path_buf(),
                provider: manifest.provider.clone(),
            }
        })?;

        let handle = provider(&manifest).map_err(|reason| PluginLoadError::Construction {
            path: path.to_path_buf(),
            provider: manifest.provider.clone(),
            reason,
        })?;

        // Structural capability check: the constructed implementation must
        // expose the surface of its declared category.
        if handle.category() != manifest.category {
            return Err(PluginLoadError::CapabilityMismatch {
                path: path.to_path_buf(),
                declared: manifest.category,
                built: handle.category(),
            });
        }

        registry
            .register(handle, false)
            .map_err(|e| PluginLoadError::Rejected {
                path: path.to_path_buf(),
                reason: e.to_string(),
            })?;

        Ok(manifest)
    }
}

impl Default for PluginDiscovery {
    fn default() -> Self {
        Self::with_builtin_providers()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_manifest(dir: &Path, file: &str, body: &str) {
        std::fs::write(dir.join(file), body).unwrap();
    }

    fn action_manifest(name: &str) -> String {
        format!(
            r#"{{"category": "action", "name": "{name}", "version": "1.0.0", "provider": "echo"}}"#
        )
    }

    #[test]
    fn partial_failure_registers_good_candidates() {
        let dir = tempfile::tempdir().unwrap();
        write_manifest(dir.path(), "a.json", &action_manifest("a"));
        write_manifest(dir.path(), "b.json", &action_manifest("b"));
        write_manifest(dir.path(), "c.json", &action_manifest("c"));
        write_manifest(dir.path(), "broken.json", "{not a manifest");

        let registry = PluginRegistry::new();
        let discovery = PluginDiscovery::with_builtin_providers();
        let report = discovery.discover(&registry, &[dir.path().to_path_buf()]);

        assert_eq!(report.registered, 3);
        assert_eq!(report.errors.len(), 1);
        assert!(matches!(report.errors[0], PluginLoadError::Malformed { .. }));
        assert!(registry.get_action("a").is_ok());
        assert!(registry.get_action("c").is_ok());
    }

    #[test]
    fn unknown_provider_is_collected() {
        let dir = tempfile::tempdir().unwrap();
        write_manifest(
            dir.path(),
            "x.json",
            r#"{"category": "action", "name": "x", "version": "1.0.0", "provider": "dlopen"}"#,
        );

        let registry = PluginRegistry::new();
        let report =
            PluginDiscovery::with_builtin_providers().discover(&registry, &[dir.path().to_path_buf()]);

        assert_eq!(report.registered, 0);
        assert!(matches!(report.errors[0], PluginLoadError::UnknownProvider { .. }));
    }

    #[test]
    fn capability_mismatch_is_collected() {
        let dir = tempfile::tempdir().unwrap();
        // Declares a connection but the `echo` provider builds an action.
        write_manifest(
            dir.path(),
            "x.json",
            r#"{"category": "connection", "name": "x", "version": "1.0.0", "provider": "echo"}"#,
        );

        let registry = PluginRegistry::new();
        let report =
            PluginDiscovery::with_builtin_providers().discover(&registry, &[dir.path().to_path_buf()]);

        assert_eq!(report.registered, 0);
        assert!(matches!(
            report.errors[0],
            PluginLoadError::CapabilityMismatch { .. }
        ));
        assert!(registry.get_connection("x").is_err());
    }

    #[test]
    fn duplicate_candidate_is_collected_not_fatal() {
        let dir = tempfile::tempdir().unwrap();
        write_manifest(dir.path(), "a.json", &action_manifest("same"));
        write_manifest(dir.path(), "b.json", &action_manifest("same"));

        let registry = PluginRegistry::new();
        let report =
            PluginDiscovery::with_builtin_providers().discover(&registry, &[dir.path().to_path_buf()]);

        assert_eq!(report.registered, 1);
        assert_eq!(report.errors.len(), 1);
    }

    #[test]
    fn missing_location_is_skipped_silently() {
        let registry = PluginRegistry::new();
        let report = PluginDiscovery::with_builtin_providers()
            .discover(&registry, &[PathBuf::from("/nonexistent/plugins")]);
        assert_eq!(report.registered, 0);
        assert!(report.errors.is_empty());
    }
}
