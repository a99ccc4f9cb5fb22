// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Code provenance: which installed package owns each file seen in a profile.

use crate::config::RuntimeInfo;
use crate::pprof;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use tracing::trace;

/// An installed distribution, as reported by the package lookup.
#[derive(Clone, Debug, Eq, PartialEq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Distribution {
    pub name: String,
    pub version: String,
}

impl Distribution {
    pub fn new(name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
        }
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub enum PackageKind {
    #[serde(rename = "standard library")]
    StandardLibrary,
    #[serde(rename = "library")]
    Library,
    #[serde(rename = "unknown")]
    Unknown,
}

#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct Package {
    pub name: String,
    pub version: String,
    pub kind: PackageKind,
    pub paths: Vec<String>,
}

/// Maps a source filename to the distribution that installed it.
pub trait PackageResolver {
    fn filename_to_package(&self, filename: &str) -> Option<Distribution>;
}

impl<F> PackageResolver for F
where
    F: Fn(&str) -> Option<Distribution>,
{
    fn filename_to_package(&self, filename: &str) -> Option<Distribution> {
        self(filename)
    }
}

/// An index of install roots. A filename belongs to the distribution with the
/// longest root that is a path prefix of it, compared component by component.
#[derive(Clone, Debug, Default)]
pub struct InstalledPackages {
    roots: Vec<(PathBuf, Distribution)>,
}

impl InstalledPackages {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, root: impl Into<PathBuf>, distribution: Distribution) {
        self.roots.push((root.into(), distribution));
    }

    pub fn with(mut self, root: impl Into<PathBuf>, distribution: Distribution) -> Self {
        self.add(root, distribution);
        self
    }

    pub fn len(&self) -> usize {
        self.roots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.roots.is_empty()
    }
}

impl PackageResolver for InstalledPackages {
    fn filename_to_package(&self, filename: &str) -> Option<Distribution> {
        let path = Path::new(filename);
        let mut best: Option<(usize, &Distribution)> = None;
        let mut ambiguous = false;
        for (root, distribution) in self.roots.iter() {
            if !path.starts_with(root) {
                continue;
            }
            let depth = root.components().count();
            match best {
                Some((best_depth, best_distribution)) if depth == best_depth => {
                    ambiguous |= best_distribution != distribution;
                }
                Some((best_depth, _)) if depth < best_depth => {}
                _ => {
                    best = Some((depth, distribution));
                    ambiguous = false;
                }
            }
        }
        match best {
            Some((_, distribution)) if !ambiguous => Some(distribution.clone()),
            _ => None,
        }
    }
}

/// Distinct filenames of every location in the profile, excluding the empty
/// filename of synthetic locations.
pub fn referenced_filenames(profile: &pprof::Profile) -> BTreeSet<&str> {
    let functions: BTreeMap<u64, &pprof::Function> = profile
        .functions
        .iter()
        .map(|function| (function.id, function))
        .collect();

    profile
        .locations
        .iter()
        .flat_map(|location| location.lines.iter())
        .filter_map(|line| functions.get(&line.function_id))
        .filter_map(|function| profile.string(function.filename))
        .filter(|filename| !filename.is_empty())
        .collect()
}

/// Resolves the profile's filenames to packages, then appends the fixed
/// entries for the runtime's own install locations. Filenames that resolve to
/// nothing are left out.
pub fn resolve_packages<R: PackageResolver + ?Sized>(
    profile: &pprof::Profile,
    resolver: &R,
    runtime: &RuntimeInfo,
) -> Vec<Package> {
    let filenames = referenced_filenames(profile);
    let mut owned: BTreeMap<Distribution, BTreeSet<String>> = BTreeMap::new();
    for filename in filenames.iter() {
        if let Some(distribution) = resolver.filename_to_package(filename) {
            owned
                .entry(distribution)
                .or_default()
                .insert(filename.to_string());
        }
    }
    trace!(
        filenames = filenames.len(),
        packages = owned.len(),
        "Resolved code provenance"
    );

    let mut packages: Vec<Package> = owned
        .into_iter()
        .map(|(distribution, paths)| Package {
            name: distribution.name,
            version: distribution.version,
            kind: PackageKind::Library,
            paths: paths.into_iter().collect(),
        })
        .collect();

    packages.push(Package {
        name: "stdlib".to_string(),
        version: runtime.version.clone(),
        kind: PackageKind::StandardLibrary,
        paths: non_empty_paths(&runtime.stdlib_paths),
    });

    // Code can live in the generic install directory without belonging to
    // any known distribution.
    let platlib_paths = non_empty_paths(&runtime.platlib_paths);
    if !platlib_paths.is_empty() {
        packages.push(Package {
            name: "platlib".to_string(),
            version: String::new(),
            kind: PackageKind::Unknown,
            paths: platlib_paths,
        });
    }
    packages
}

fn non_empty_paths(paths: &[String]) -> Vec<String> {
    let unique: BTreeSet<&str> = paths
        .iter()
        .map(String::as_str)
        .filter(|path| !path.is_empty())
        .collect();
    unique.into_iter().map(String::from).collect()
}
