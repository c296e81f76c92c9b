use std::time::Duration;

use reqwest::blocking::Client;
use serde_json::{Map, Value};

use crate::error::MetadataFetchError;

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);
pub const USER_AGENT: &str = "rondo/0.1.0";

const BIOC_CATEGORIES: [&str; 4] = ["bioc", "data/annotation", "data/experiment", "workflows"];

/// Build the blocking HTTP client shared by every fetch in a provider's
/// lifetime. Connection reuse across CRAN/Bioconductor/GitHub calls is the
/// whole point of owning a single client.
pub fn build_client() -> Client {
    Client::builder()
        .timeout(DEFAULT_TIMEOUT)
        .user_agent(USER_AGENT)
        .gzip(true)
        .brotli(true)
        .deflate(true)
        .build()
        .expect("Failed to build HTTP client")
}

fn request_json(client: &Client, url: &str, token: Option<&str>) -> Result<Value, MetadataFetchError> {
    let mut request = client.get(url);
    if let Some(token) = token {
        request = request.bearer_auth(token);
    }
    let response = request
        .send()
        .map_err(|err| MetadataFetchError::new(format!("Failed to fetch {url}: {err}")))?;
    let status = response.status().as_u16();
    if status >= 400 {
        return Err(MetadataFetchError::http(url, status));
    }
    response
        .json()
        .map_err(|_| MetadataFetchError::invalid_json(url))
}

/// Full version history for one CRAN package, as served by crandb.
pub fn fetch_cran_package(client: &Client, package: &str) -> Result<Value, MetadataFetchError> {
    let url = format!("https://crandb.r-pkg.org/{package}/all");
    request_json(client, &url, None)
}

/// Merge every category of a Bioconductor release into one name -> payload
/// map. Older releases are missing some categories; those are skipped, but a
/// release with no packages at all is an error. Each payload is tagged with
/// the category it came from under the `.category` key.
pub fn fetch_bioconductor_release(
    client: &Client,
    release: &str,
) -> Result<Value, MetadataFetchError> {
    let mut aggregated = Map::new();
    for category in BIOC_CATEGORIES {
        let url = format!("https://bioconductor.org/packages/json/{release}/{category}/packages.json");
        let data = match request_json(client, &url, None) {
            Ok(data) => data,
            Err(_) => continue,
        };
        let Some(entries) = data.as_object() else {
            continue;
        };
        for (name, payload) in entries {
            let mut payload = payload.clone();
            if let Some(fields) = payload.as_object_mut() {
                fields.insert(".category".to_string(), Value::String(category.to_string()));
            }
            aggregated.insert(name.clone(), payload);
        }
    }
    if aggregated.is_empty() {
        return Err(MetadataFetchError::new(format!(
            "No packages found for Bioconductor release {release}"
        )));
    }
    Ok(Value::Object(aggregated))
}

/// Everything needed to normalize a GitHub-hosted package: the pinned
/// commit, the raw DESCRIPTION at that commit, and commit metadata.
#[derive(Debug, Clone)]
pub struct GithubDescriptor {
    pub owner: String,
    pub repo: String,
    pub commit: String,
    pub git_ref: String,
    pub description: String,
    pub commit_timestamp: Option<String>,
    pub url: Option<String>,
}

/// Resolve a GitHub ref to a commit and download the DESCRIPTION file at
/// that commit. When no ref is given the repository's default branch is
/// looked up first. The token, if any, is attached to all three requests.
pub fn fetch_github_description(
    client: &Client,
    owner: &str,
    repo: &str,
    git_ref: Option<&str>,
    token: Option<&str>,
) -> Result<GithubDescriptor, MetadataFetchError> {
    let resolved_ref = match git_ref {
        Some(reference) => reference.to_string(),
        None => {
            let url = format!("https://api.github.com/repos/{owner}/{repo}");
            let repo_data = request_json(client, &url, token).map_err(|_| {
                MetadataFetchError::new(format!(
                    "Failed to resolve default branch for {owner}/{repo}"
                ))
            })?;
            repo_data
                .get("default_branch")
                .and_then(Value::as_str)
                .map(str::to_string)
                .ok_or_else(|| {
                    MetadataFetchError::new(format!(
                        "Repository {owner}/{repo} has no default branch metadata"
                    ))
                })?
        }
    };

    let commit_url = format!("https://api.github.com/repos/{owner}/{repo}/commits/{resolved_ref}");
    let commit_data = request_json(client, &commit_url, token).map_err(|_| {
        MetadataFetchError::new(format!(
            "Failed to resolve commit for {owner}/{repo}@{resolved_ref}"
        ))
    })?;
    let commit = commit_data
        .get("sha")
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| {
            MetadataFetchError::new(format!(
                "Commit information missing for {owner}/{repo}@{resolved_ref}"
            ))
        })?;

    let raw_url = format!("https://raw.githubusercontent.com/{owner}/{repo}/{commit}/DESCRIPTION");
    let mut request = client
        .get(&raw_url)
        .header(reqwest::header::ACCEPT, "application/vnd.github.v3.raw");
    if let Some(token) = token {
        request = request.bearer_auth(token);
    }
    let response = request
        .send()
        .map_err(|err| MetadataFetchError::new(format!("Failed to fetch {raw_url}: {err}")))?;
    if response.status().as_u16() >= 400 {
        return Err(MetadataFetchError::new(format!(
            "DESCRIPTION not found for {owner}/{repo}@{commit}"
        )));
    }
    let description = response
        .text()
        .map_err(|err| MetadataFetchError::new(format!("Failed to read {raw_url}: {err}")))?;

    let commit_timestamp = commit_data
        .pointer("/commit/committer/date")
        .and_then(Value::as_str)
        .map(str::to_string);
    let url = commit_data
        .get("html_url")
        .and_then(Value::as_str)
        .map(str::to_string);

    Ok(GithubDescriptor {
        owner: owner.to_string(),
        repo: repo.to_string(),
        commit,
        git_ref: resolved_ref,
        description,
        commit_timestamp,
        url,
    })
}
