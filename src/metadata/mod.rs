pub mod description;
pub mod fetchers;

use std::collections::{BTreeMap, HashMap};
use std::path::PathBuf;

use anyhow::Result;
use reqwest::blocking::Client;
use serde_json::Value;

use crate::cache::MetadataCache;
use crate::constants;
use crate::error::MetadataFetchError;
use crate::model::{PackageVersion, Source};
use crate::resolver::version::compare_versions;

/// Resolver-facing view of package metadata. The HTTP-backed provider is the
/// production implementation; `InMemoryMetadata` serves fixtures for tests
/// and offline use.
pub trait MetadataStore {
    fn get_versions(
        &mut self,
        package: &str,
        source: Source,
        bioc_release: Option<&str>,
        github_ref: Option<&str>,
        github_token: Option<&str>,
    ) -> Result<Vec<PackageVersion>, MetadataFetchError>;

    fn get_github_version(
        &mut self,
        owner: &str,
        repo: &str,
        git_ref: Option<&str>,
        token: Option<&str>,
    ) -> Result<PackageVersion, MetadataFetchError>;

    fn bioconductor_r_version(&self, release: &str) -> Option<String> {
        constants::bioconductor_r_series(release).map(str::to_string)
    }

    fn latest_bioconductor_release(&self) -> Option<String> {
        constants::latest_bioconductor_release().map(str::to_string)
    }
}

/// Caches, deduplicates, and serves normalized package versions.
///
/// Owns the on-disk cache and the HTTP client; both live as long as the
/// provider and are released when it drops. In-memory memos guarantee each
/// (source, key) is fetched at most once per process; fetch failures are not
/// memoized, so a later call may retry.
pub struct MetadataProvider {
    cache: MetadataCache,
    client: Client,
    include_optional: bool,
    cran: HashMap<String, Vec<PackageVersion>>,
    bioc: HashMap<String, BTreeMap<String, PackageVersion>>,
    github: HashMap<(String, String, String), PackageVersion>,
}

impl MetadataProvider {
    pub fn new(cache_root: impl Into<PathBuf>) -> Result<Self> {
        Self::with_options(cache_root, false)
    }

    pub fn with_options(cache_root: impl Into<PathBuf>, include_optional: bool) -> Result<Self> {
        let cache = MetadataCache::new(cache_root);
        cache.ensure()?;
        Ok(Self {
            cache,
            client: fetchers::build_client(),
            include_optional,
            cran: HashMap::new(),
            bioc: HashMap::new(),
            github: HashMap::new(),
        })
    }

    /// All published versions of a CRAN package, newest first.
    pub fn get_cran_versions(
        &mut self,
        package: &str,
    ) -> Result<Vec<PackageVersion>, MetadataFetchError> {
        if let Some(versions) = self.cran.get(package) {
            return Ok(versions.clone());
        }
        let key = format!("{package}.json");
        let segments = ["cran", key.as_str()];
        let raw = match self.cache.load(&segments) {
            Some(raw) => raw,
            None => {
                let raw = fetchers::fetch_cran_package(&self.client, package)?;
                self.persist(&raw, &segments);
                raw
            }
        };
        let mut versions = Vec::new();
        if let Some(entries) = raw.get("versions").and_then(Value::as_object) {
            for (version, payload) in entries {
                let payload = payload.as_object().ok_or_else(|| {
                    MetadataFetchError::new(format!(
                        "Failed to normalize CRAN metadata for {package} {version}"
                    ))
                })?;
                versions.push(description::normalize_cran_payload(
                    package,
                    payload,
                    version,
                    self.include_optional,
                ));
            }
        }
        versions.sort_by(|a, b| compare_versions(&b.version, &a.version));
        self.cran.insert(package.to_string(), versions.clone());
        Ok(versions)
    }

    fn load_bioc_release(&mut self, release: &str) -> Result<(), MetadataFetchError> {
        if self.bioc.contains_key(release) {
            return Ok(());
        }
        let key = format!("{release}.json");
        let segments = ["bioconductor", key.as_str()];
        let raw = match self.cache.load(&segments) {
            Some(raw) => raw,
            None => {
                let raw = fetchers::fetch_bioconductor_release(&self.client, release)?;
                self.persist(&raw, &segments);
                raw
            }
        };
        let mut normalized = BTreeMap::new();
        if let Some(entries) = raw.as_object() {
            for (name, payload) in entries {
                let payload = payload.as_object().ok_or_else(|| {
                    MetadataFetchError::new(format!(
                        "Failed to normalize Bioconductor metadata for {name}@{release}"
                    ))
                })?;
                let version = description::normalize_bioc_payload(
                    name,
                    payload,
                    release,
                    self.include_optional,
                )?;
                normalized.insert(name.clone(), version);
            }
        }
        self.bioc.insert(release.to_string(), normalized);
        Ok(())
    }

    /// Zero or one versions: a Bioconductor release pins each package to a
    /// single version. A package absent from the release is a fetch error.
    pub fn get_bioconductor_versions(
        &mut self,
        package: &str,
        release: &str,
    ) -> Result<Vec<PackageVersion>, MetadataFetchError> {
        self.load_bioc_release(release)?;
        match self
            .bioc
            .get(release)
            .and_then(|packages| packages.get(package))
        {
            Some(version) => Ok(vec![version.clone()]),
            None => Err(MetadataFetchError::new(format!(
                "{package} not found in Bioconductor release {release}"
            ))),
        }
    }

    /// Warm the in-memory and on-disk caches for a whole release.
    pub fn prime_bioconductor_release(&mut self, release: &str) -> Result<(), MetadataFetchError> {
        self.load_bioc_release(release)
    }

    pub fn get_github_version(
        &mut self,
        owner: &str,
        repo: &str,
        git_ref: Option<&str>,
        token: Option<&str>,
    ) -> Result<PackageVersion, MetadataFetchError> {
        // A ref that is already a resolved commit is served from the memo.
        if let Some(reference) = git_ref {
            let key = (owner.to_string(), repo.to_string(), reference.to_string());
            if let Some(version) = self.github.get(&key) {
                return Ok(version.clone());
            }
        }
        let descriptor =
            fetchers::fetch_github_description(&self.client, owner, repo, git_ref, token)?;
        let version = description::normalize_github_payload(&descriptor, self.include_optional)?;

        let key = format!("{owner}__{repo}__{}.json", descriptor.commit);
        let payload = serde_json::json!({
            "owner": owner,
            "repo": repo,
            "commit": descriptor.commit,
            "ref": descriptor.git_ref,
            "timestamp": descriptor.commit_timestamp,
            "url": descriptor.url,
            "description": description::parse_description(&descriptor.description),
        });
        self.persist(&payload, &["github", key.as_str()]);

        self.github.insert(
            (owner.to_string(), repo.to_string(), descriptor.commit.clone()),
            version.clone(),
        );
        Ok(version)
    }

    fn persist(&self, value: &Value, segments: &[&str]) {
        if let Err(err) = self.cache.store(value, segments) {
            log::warn!("failed to persist metadata cache entry: {err}");
        }
    }
}

impl MetadataStore for MetadataProvider {
    fn get_versions(
        &mut self,
        package: &str,
        source: Source,
        bioc_release: Option<&str>,
        github_ref: Option<&str>,
        github_token: Option<&str>,
    ) -> Result<Vec<PackageVersion>, MetadataFetchError> {
        match source {
            Source::Cran => self.get_cran_versions(package),
            Source::Bioc => {
                let release = bioc_release.ok_or_else(|| {
                    MetadataFetchError::new(
                        "Bioconductor release must be specified for Bioconductor packages",
                    )
                })?;
                self.get_bioconductor_versions(package, release)
            }
            Source::Github => {
                let (owner, repo) = package.split_once('/').ok_or_else(|| {
                    MetadataFetchError::new("GitHub packages must be provided as owner/repo")
                })?;
                let (owner, repo) = (owner.to_string(), repo.to_string());
                let version =
                    MetadataProvider::get_github_version(self, &owner, &repo, github_ref, github_token)?;
                Ok(vec![version])
            }
        }
    }

    fn get_github_version(
        &mut self,
        owner: &str,
        repo: &str,
        git_ref: Option<&str>,
        token: Option<&str>,
    ) -> Result<PackageVersion, MetadataFetchError> {
        MetadataProvider::get_github_version(self, owner, repo, git_ref, token)
    }
}

/// Fixture-backed metadata store. Register versions up front; lookups behave
/// like the HTTP provider, including "missing package" being a fetch error.
#[derive(Debug, Default)]
pub struct InMemoryMetadata {
    cran: BTreeMap<String, Vec<PackageVersion>>,
    bioc: BTreeMap<(String, String), PackageVersion>,
    github: BTreeMap<String, PackageVersion>,
}

impl InMemoryMetadata {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_cran(&mut self, version: PackageVersion) {
        let entry = self.cran.entry(version.name.clone()).or_default();
        entry.push(version);
        entry.sort_by(|a, b| compare_versions(&b.version, &a.version));
    }

    pub fn add_bioconductor(&mut self, release: &str, version: PackageVersion) {
        self.bioc
            .insert((release.to_string(), version.name.clone()), version);
    }

    pub fn add_github(&mut self, slug: &str, version: PackageVersion) {
        self.github.insert(slug.to_string(), version);
    }
}

impl MetadataStore for InMemoryMetadata {
    fn get_versions(
        &mut self,
        package: &str,
        source: Source,
        bioc_release: Option<&str>,
        _github_ref: Option<&str>,
        _github_token: Option<&str>,
    ) -> Result<Vec<PackageVersion>, MetadataFetchError> {
        match source {
            Source::Cran => self
                .cran
                .get(package)
                .cloned()
                .ok_or_else(|| MetadataFetchError::new(format!("no CRAN metadata for {package}"))),
            Source::Bioc => {
                let release = bioc_release.ok_or_else(|| {
                    MetadataFetchError::new(
                        "Bioconductor release must be specified for Bioconductor packages",
                    )
                })?;
                self.bioc
                    .get(&(release.to_string(), package.to_string()))
                    .map(|version| vec![version.clone()])
                    .ok_or_else(|| {
                        MetadataFetchError::new(format!(
                            "{package} not found in Bioconductor release {release}"
                        ))
                    })
            }
            Source::Github => self
                .github
                .get(package)
                .map(|version| vec![version.clone()])
                .ok_or_else(|| {
                    MetadataFetchError::new(format!("no GitHub metadata for {package}"))
                }),
        }
    }

    fn get_github_version(
        &mut self,
        owner: &str,
        repo: &str,
        _git_ref: Option<&str>,
        _token: Option<&str>,
    ) -> Result<PackageVersion, MetadataFetchError> {
        let slug = format!("{owner}/{repo}");
        self.github
            .get(&slug)
            .cloned()
            .ok_or_else(|| MetadataFetchError::new(format!("no GitHub metadata for {slug}")))
    }
}
