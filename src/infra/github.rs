//! GitHub contents-API implementation of the content store.
//!
//! Each post is one file under the configured posts directory of the
//! content repository. The blob `sha` GitHub reports is the version
//! token: writes send it back and GitHub rejects stale tokens (and
//! creates that race an existing file) with 409/422, which surface as
//! [`StoreError::Conflict`].

use async_trait::async_trait;
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use url::Url;

use crate::application::stores::{
    ContentStore, FileHandle, StoreError, StoredDocument, VersionToken, slug_for_path,
};
use crate::config::ContentSettings;

use super::blob::user_agent;
use super::error::InfraError;

const GITHUB_ACCEPT: &str = "application/vnd.github.v3+json";

pub struct GithubContentStore {
    client: Client,
    contents_base: Url,
    token: String,
    branch: String,
}

impl GithubContentStore {
    pub fn new(settings: &ContentSettings) -> Result<Self, InfraError> {
        let raw = format!(
            "{}/repos/{}/{}/contents/{}/",
            settings.api_base.trim_end_matches('/'),
            settings.owner,
            settings.repo,
            settings.posts_dir.trim_matches('/'),
        );
        let contents_base = Url::parse(&raw)
            .map_err(|err| InfraError::configuration(format!("invalid contents URL: {err}")))?;

        let client = Client::builder()
            .user_agent(user_agent())
            .build()
            .map_err(|err| InfraError::http(err.to_string()))?;

        Ok(Self {
            client,
            contents_base,
            token: settings.token.clone(),
            branch: settings.branch.clone(),
        })
    }

    fn item_url(&self, path: &str) -> Result<Url, StoreError> {
        self.contents_base
            .join(path)
            .map_err(|err| StoreError::protocol(format!("invalid document path `{path}`: {err}")))
    }

    fn directory_url(&self) -> Url {
        // The trailing slash is stripped so GitHub lists the directory
        // itself.
        let mut url = self.contents_base.clone();
        if let Ok(mut segments) = url.path_segments_mut() {
            segments.pop_if_empty();
        }
        url
    }
}

#[derive(Debug, Deserialize)]
struct DirectoryItem {
    name: String,
    #[serde(rename = "type")]
    kind: String,
}

#[derive(Debug, Deserialize)]
struct FileResponse {
    sha: String,
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct WriteResponse {
    content: WrittenFile,
}

#[derive(Debug, Deserialize)]
struct WrittenFile {
    sha: String,
}

#[derive(Debug, Serialize)]
struct WritePayload<'a> {
    message: String,
    content: String,
    branch: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    sha: Option<&'a str>,
}

#[derive(Debug, Serialize)]
struct DeletePayload<'a> {
    message: String,
    sha: &'a str,
    branch: &'a str,
}

#[async_trait]
impl ContentStore for GithubContentStore {
    async fn list_files(&self) -> Result<Vec<FileHandle>, StoreError> {
        let response = self
            .client
            .get(self.directory_url())
            .query(&[("ref", self.branch.as_str())])
            .bearer_auth(&self.token)
            .header(reqwest::header::ACCEPT, GITHUB_ACCEPT)
            .send()
            .await
            .map_err(transport_error)?;

        let response = check_status(response).await?;
        let items: Vec<DirectoryItem> = response.json().await.map_err(transport_error)?;

        Ok(items
            .into_iter()
            .filter(|item| item.kind == "file" && slug_for_path(&item.name).is_some())
            .map(|item| FileHandle { path: item.name })
            .collect())
    }

    async fn read_file(&self, path: &str) -> Result<StoredDocument, StoreError> {
        let response = self
            .client
            .get(self.item_url(path)?)
            .query(&[("ref", self.branch.as_str())])
            .bearer_auth(&self.token)
            .header(reqwest::header::ACCEPT, GITHUB_ACCEPT)
            .send()
            .await
            .map_err(transport_error)?;

        let response = check_status(response).await?;
        let file: FileResponse = response.json().await.map_err(transport_error)?;

        let encoded = file.content.ok_or_else(|| {
            StoreError::protocol(format!("`{path}` has no inline content in the response"))
        })?;
        let content = decode_content(path, &encoded)?;

        Ok(StoredDocument {
            content,
            version: VersionToken::new(file.sha),
        })
    }

    async fn write_file(
        &self,
        path: &str,
        content: &str,
        expected: Option<&VersionToken>,
    ) -> Result<VersionToken, StoreError> {
        let slug = slug_for_path(path).unwrap_or(path);
        let payload = WritePayload {
            message: match expected {
                Some(_) => format!("Update post: {slug}"),
                None => format!("Create post: {slug}"),
            },
            content: BASE64.encode(content.as_bytes()),
            branch: &self.branch,
            sha: expected.map(VersionToken::as_str),
        };

        let response = self
            .client
            .put(self.item_url(path)?)
            .bearer_auth(&self.token)
            .header(reqwest::header::ACCEPT, GITHUB_ACCEPT)
            .json(&payload)
            .send()
            .await
            .map_err(transport_error)?;

        let response = check_status(response).await?;
        let written: WriteResponse = response.json().await.map_err(transport_error)?;
        Ok(VersionToken::new(written.content.sha))
    }

    async fn delete_file(&self, path: &str, version: &VersionToken) -> Result<(), StoreError> {
        let slug = slug_for_path(path).unwrap_or(path);
        let payload = DeletePayload {
            message: format!("Delete post: {slug}"),
            sha: version.as_str(),
            branch: &self.branch,
        };

        let response = self
            .client
            .delete(self.item_url(path)?)
            .bearer_auth(&self.token)
            .header(reqwest::header::ACCEPT, GITHUB_ACCEPT)
            .json(&payload)
            .send()
            .await
            .map_err(transport_error)?;

        check_status(response).await?;
        Ok(())
    }
}

async fn check_status(response: reqwest::Response) -> Result<reqwest::Response, StoreError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    Err(match status {
        StatusCode::NOT_FOUND => StoreError::NotFound,
        StatusCode::CONFLICT | StatusCode::UNPROCESSABLE_ENTITY => {
            StoreError::conflict(format!("{status}: {body}"))
        }
        status if status.is_server_error() => {
            StoreError::unavailable(format!("{status}: {body}"))
        }
        status => StoreError::protocol(format!("{status}: {body}")),
    })
}

fn transport_error(err: reqwest::Error) -> StoreError {
    StoreError::unavailable(err.to_string())
}

/// GitHub wraps base64 payloads at 60 columns; strip whitespace before
/// decoding.
fn decode_content(path: &str, encoded: &str) -> Result<String, StoreError> {
    let compact: String = encoded.chars().filter(|ch| !ch.is_whitespace()).collect();
    let bytes = BASE64
        .decode(compact.as_bytes())
        .map_err(|err| StoreError::protocol(format!("`{path}` content is not base64: {err}")))?;
    String::from_utf8(bytes)
        .map_err(|err| StoreError::protocol(format!("`{path}` content is not UTF-8: {err}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ContentSettings;

    fn settings() -> ContentSettings {
        ContentSettings {
            api_base: "https://api.github.com".to_string(),
            owner: "octocat".to_string(),
            repo: "blog".to_string(),
            branch: "main".to_string(),
            token: "t0ken".to_string(),
            posts_dir: "content/posts".to_string(),
        }
    }

    #[test]
    fn urls_are_rooted_at_the_posts_directory() {
        let store = GithubContentStore::new(&settings()).expect("store");

        let item = store.item_url("first.md").expect("url");
        assert_eq!(
            item.as_str(),
            "https://api.github.com/repos/octocat/blog/contents/content/posts/first.md"
        );

        let dir = store.directory_url();
        assert_eq!(
            dir.as_str(),
            "https://api.github.com/repos/octocat/blog/contents/content/posts"
        );
    }

    #[test]
    fn wrapped_base64_payloads_decode() {
        let encoded = "LS0tCnRpdGxlOiBU\nZXN0Ci0tLQoK";
        let decoded = decode_content("first.md", encoded).expect("decode");
        assert_eq!(decoded, "---\ntitle: Test\n---\n\n");
    }

    #[test]
    fn invalid_base64_is_a_protocol_error() {
        let result = decode_content("first.md", "!!!not base64!!!");
        assert!(matches!(result, Err(StoreError::Protocol { .. })));
    }
}
