use super::types::{self, CreateOutcome, ReleasePlatform, ReleaseSpec, RepoSlug};
use crate::error::PlatformError;
use octocrab::models;
use octocrab::Octocrab;
use regex::Regex;
use std::path::Path;
use std::sync::LazyLock;
use tracing::{debug, info};

static ALREADY_EXISTS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)already[_ ]exists").unwrap());

pub struct GitHubClient {
    client: Octocrab,
    repo: RepoSlug,
}

impl GitHubClient {
    pub fn new(token: String, repo: RepoSlug) -> Result<Self, PlatformError> {
        let client = Octocrab::builder().personal_token(token).build()?;
        Ok(Self::with_client(client, repo))
    }

    pub fn with_client(client: Octocrab, repo: RepoSlug) -> Self {
        Self { client, repo }
    }

    fn repos(&self) -> octocrab::repos::RepoHandler<'_> {
        self.client.repos(&self.repo.owner, &self.repo.name)
    }

    pub async fn get_release(&self, tag: &str) -> Result<Option<models::repos::Release>, PlatformError> {
        let result = self.repos().releases().get_by_tag(tag).await;

        match result {
            Ok(release) => Ok(Some(release)),
            Err(octocrab::Error::GitHub { source, .. }) if source.status_code.as_u16() == 404 => {
                Ok(None)
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn require_release(&self, tag: &str) -> Result<models::repos::Release, PlatformError> {
        self.get_release(tag)
            .await?
            .ok_or_else(|| PlatformError::ReleaseNotFound(tag.to_string()))
    }

    async fn delete_named_assets(
        &self,
        release: &models::repos::Release,
        name: &str,
    ) -> Result<(), PlatformError> {
        for asset in release.assets.iter().filter(|a| a.name == name) {
            debug!(asset = %asset.name, "deleting existing asset");
            self.repos().release_assets().delete(asset.id.0).await?;
        }
        Ok(())
    }
}

/// Sort a failed create into "tag already taken" or a real failure.
pub fn classify_create_error(err: octocrab::Error) -> CreateOutcome {
    if let octocrab::Error::GitHub { source, .. } = &err {
        let codes = source
            .errors
            .iter()
            .flatten()
            .filter_map(|e| e.get("code").and_then(|c| c.as_str()));
        if is_already_exists(source.status_code.as_u16(), &source.message, codes) {
            return CreateOutcome::AlreadyExists;
        }
    }
    CreateOutcome::Failed(err.into())
}

fn is_already_exists<'a>(
    status: u16,
    message: &str,
    codes: impl IntoIterator<Item = &'a str>,
) -> bool {
    status == 422
        && (codes.into_iter().any(|code| code == "already_exists")
            || ALREADY_EXISTS.is_match(message))
}

impl ReleasePlatform for GitHubClient {
    async fn create_release(&self, spec: &ReleaseSpec) -> CreateOutcome {
        debug!(repo = %self.repo, tag = %spec.name, target = %spec.target, "creating release");
        let result = self
            .repos()
            .releases()
            .create(&spec.name)
            .name(&spec.name)
            .target_commitish(&spec.target)
            .prerelease(spec.prerelease)
            .send()
            .await;

        match result {
            Ok(release) => {
                info!(url = %release.html_url, "release created");
                CreateOutcome::Created
            }
            Err(e) => classify_create_error(e),
        }
    }

    async fn upload_asset(&self, tag: &str, path: &Path) -> Result<(), PlatformError> {
        let io_error = |source| PlatformError::Io {
            path: path.to_path_buf(),
            source,
        };
        let file_name = path.file_name().and_then(|n| n.to_str()).ok_or_else(|| {
            io_error(std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                "path has no usable file name",
            ))
        })?;
        let data = tokio::fs::read(path).await.map_err(io_error)?;

        let release = self.require_release(tag).await?;
        self.delete_named_assets(&release, file_name).await?;

        info!(asset = file_name, bytes = data.len(), "uploading asset");
        self.repos()
            .releases()
            .upload_asset(release.id.0, file_name, bytes::Bytes::from(data))
            .send()
            .await?;
        Ok(())
    }

    async fn delete_asset(&self, tag: &str, name: &str) -> Result<(), PlatformError> {
        let release = self.require_release(tag).await?;
        self.delete_named_assets(&release, name).await
    }

    async fn latest_stable_tag(&self, exclude: &str) -> Result<Option<String>, PlatformError> {
        match self.repos().releases().get_latest().await {
            Ok(latest) if latest.tag_name != exclude => return Ok(Some(latest.tag_name)),
            Ok(_) => debug!(tag = exclude, "latest release is the one being published"),
            Err(octocrab::Error::GitHub { source, .. }) if source.status_code.as_u16() == 404 => {
                return Ok(None);
            }
            Err(e) => return Err(e.into()),
        }

        let first_page = self.repos().releases().list().per_page(100).send().await?;
        let releases: Vec<types::Release> = self
            .client
            .all_pages(first_page)
            .await?
            .iter()
            .map(types::Release::from)
            .collect();

        Ok(types::previous_stable(&releases, exclude))
    }

    async fn set_notes(&self, tag: &str, body: &str) -> Result<(), PlatformError> {
        let release = self.require_release(tag).await?;
        self.repos()
            .releases()
            .update(release.id.0)
            .body(body)
            .send()
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::{Matcher, Server};
    use serde_json::{json, Value};

    fn client_for(server: &Server) -> GitHubClient {
        let octocrab = Octocrab::builder()
            .base_uri(server.url())
            .unwrap()
            .personal_token("test-token".to_string())
            .build()
            .unwrap();
        GitHubClient::with_client(octocrab, "octo-org/widgets".parse().unwrap())
    }

    fn user() -> Value {
        let api = "https://api.github.com/users/octocat";
        json!({
            "login": "octocat",
            "id": 1,
            "node_id": "MDQ6VXNlcjE=",
            "avatar_url": "https://github.com/images/error/octocat_happy.gif",
            "gravatar_id": "",
            "url": api,
            "html_url": "https://github.com/octocat",
            "followers_url": format!("{api}/followers"),
            "following_url": format!("{api}/following{{/other_user}}"),
            "gists_url": format!("{api}/gists{{/gist_id}}"),
            "starred_url": format!("{api}/starred{{/owner}}{{/repo}}"),
            "subscriptions_url": format!("{api}/subscriptions"),
            "organizations_url": format!("{api}/orgs"),
            "repos_url": format!("{api}/repos"),
            "events_url": format!("{api}/events{{/privacy}}"),
            "received_events_url": format!("{api}/received_events"),
            "type": "User",
            "site_admin": false
        })
    }

    fn asset_json(id: u64, name: &str) -> Value {
        json!({
            "url": format!("https://api.github.com/repos/octo-org/widgets/releases/assets/{id}"),
            "browser_download_url": format!("https://github.com/octo-org/widgets/releases/download/v1.0.0/{name}"),
            "id": id,
            "node_id": format!("RA_{id}"),
            "name": name,
            "label": null,
            "state": "uploaded",
            "content_type": "application/zip",
            "size": 11,
            "download_count": 0,
            "created_at": "2024-01-01T00:00:00Z",
            "updated_at": "2024-01-01T00:00:00Z",
            "uploader": user()
        })
    }

    fn release_json(
        server: &Server,
        id: u64,
        tag: &str,
        prerelease: bool,
        published_at: &str,
        assets: Vec<Value>,
    ) -> Value {
        let api = "https://api.github.com/repos/octo-org/widgets";
        json!({
            "url": format!("{api}/releases/{id}"),
            "html_url": format!("https://github.com/octo-org/widgets/releases/tag/{tag}"),
            "assets_url": format!("{api}/releases/{id}/assets"),
            "upload_url": format!("{}/repos/octo-org/widgets/releases/{id}/assets{{?name,label}}", server.url()),
            "tarball_url": null,
            "zipball_url": null,
            "id": id,
            "node_id": format!("RE_{id}"),
            "tag_name": tag,
            "target_commitish": "main",
            "name": tag,
            "body": null,
            "draft": false,
            "prerelease": prerelease,
            "created_at": published_at,
            "published_at": published_at,
            "author": user(),
            "assets": assets
        })
    }

    fn spec() -> ReleaseSpec {
        ReleaseSpec {
            name: "v1.0.0".to_string(),
            target: "main".to_string(),
            prerelease: true,
        }
    }

    #[test]
    fn already_exists_needs_422() {
        assert!(is_already_exists(422, "Validation Failed", ["already_exists"]));
        assert!(is_already_exists(422, "Release already exists", []));
        assert!(!is_already_exists(422, "Validation Failed", ["invalid"]));
        assert!(!is_already_exists(500, "already exists", ["already_exists"]));
    }

    #[tokio::test]
    async fn create_conflict_is_already_exists() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/repos/octo-org/widgets/releases")
            .with_status(422)
            .with_header("content-type", "application/json")
            .with_body(
                json!({
                    "message": "Validation Failed",
                    "errors": [{"resource": "Release", "code": "already_exists", "field": "tag_name"}],
                    "documentation_url": "https://docs.github.com/rest/releases/releases#create-a-release"
                })
                .to_string(),
            )
            .create_async()
            .await;

        let outcome = client_for(&server).create_release(&spec()).await;

        mock.assert_async().await;
        assert!(matches!(outcome, CreateOutcome::AlreadyExists), "{outcome:?}");
    }

    #[tokio::test]
    async fn create_with_invalid_target_fails() {
        let mut server = Server::new_async().await;
        server
            .mock("POST", "/repos/octo-org/widgets/releases")
            .with_status(422)
            .with_header("content-type", "application/json")
            .with_body(
                json!({
                    "message": "Validation Failed",
                    "errors": [{"resource": "Release", "code": "invalid", "field": "target_commitish"}]
                })
                .to_string(),
            )
            .create_async()
            .await;

        let outcome = client_for(&server).create_release(&spec()).await;

        assert!(
            matches!(
                outcome,
                CreateOutcome::Failed(PlatformError::Api { status: Some(422), .. })
            ),
            "{outcome:?}"
        );
    }

    #[tokio::test]
    async fn create_with_bad_credentials_fails() {
        let mut server = Server::new_async().await;
        server
            .mock("POST", "/repos/octo-org/widgets/releases")
            .with_status(401)
            .with_header("content-type", "application/json")
            .with_body(json!({"message": "Bad credentials"}).to_string())
            .create_async()
            .await;

        let outcome = client_for(&server).create_release(&spec()).await;

        match outcome {
            CreateOutcome::Failed(PlatformError::Api { status, message }) => {
                assert_eq!(status, Some(401));
                assert_eq!(message, "Bad credentials");
            }
            other => panic!("expected failure, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn no_latest_release_means_no_baseline() {
        let mut server = Server::new_async().await;
        server
            .mock("GET", "/repos/octo-org/widgets/releases/latest")
            .with_status(404)
            .with_header("content-type", "application/json")
            .with_body(json!({"message": "Not Found"}).to_string())
            .create_async()
            .await;

        let baseline = client_for(&server).latest_stable_tag("v1.0.0").await.unwrap();

        assert_eq!(baseline, None);
    }

    #[tokio::test]
    async fn missing_release_for_notes_is_reported() {
        let mut server = Server::new_async().await;
        server
            .mock("GET", "/repos/octo-org/widgets/releases/tags/v1.0.0")
            .with_status(404)
            .with_header("content-type", "application/json")
            .with_body(json!({"message": "Not Found"}).to_string())
            .create_async()
            .await;

        let err = client_for(&server)
            .set_notes("v1.0.0", "notes")
            .await
            .unwrap_err();

        assert!(matches!(err, PlatformError::ReleaseNotFound(ref tag) if tag == "v1.0.0"));
    }

    #[tokio::test]
    async fn upload_replaces_same_named_asset() {
        let mut server = Server::new_async().await;
        let release = release_json(
            &server,
            1,
            "v1.0.0",
            true,
            "2024-01-01T00:00:00Z",
            vec![asset_json(7, "dist.zip"), asset_json(8, "checksums.txt")],
        );
        server
            .mock("GET", "/repos/octo-org/widgets/releases/tags/v1.0.0")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(release.to_string())
            .create_async()
            .await;
        // octocrab's upload builder re-fetches the release by id to read `upload_url`.
        server
            .mock("GET", "/repos/octo-org/widgets/releases/1")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(release.to_string())
            .create_async()
            .await;
        let delete = server
            .mock("DELETE", "/repos/octo-org/widgets/releases/assets/7")
            .with_status(204)
            .expect(1)
            .create_async()
            .await;
        let keep = server
            .mock("DELETE", "/repos/octo-org/widgets/releases/assets/8")
            .with_status(204)
            .expect(0)
            .create_async()
            .await;
        let upload = server
            .mock("POST", "/repos/octo-org/widgets/releases/1/assets")
            .match_query(Matcher::UrlEncoded("name".into(), "dist.zip".into()))
            .match_body("second build")
            .with_status(201)
            .with_header("content-type", "application/json")
            .with_body(asset_json(9, "dist.zip").to_string())
            .expect(1)
            .create_async()
            .await;

        let dir = tempfile::tempdir().unwrap();
        let bundle = dir.path().join("dist.zip");
        std::fs::write(&bundle, "second build").unwrap();

        client_for(&server).upload_asset("v1.0.0", &bundle).await.unwrap();

        delete.assert_async().await;
        keep.assert_async().await;
        upload.assert_async().await;
    }

    #[tokio::test]
    async fn latest_being_published_falls_back_to_previous_stable() {
        let mut server = Server::new_async().await;
        let current = release_json(&server, 3, "v1.0.0", false, "2024-03-01T00:00:00Z", vec![]);
        let listed = json!([
            current.clone(),
            release_json(&server, 2, "v1.0.0-rc.1", true, "2024-02-01T00:00:00Z", vec![]),
            release_json(&server, 1, "v0.9.0", false, "2024-01-01T00:00:00Z", vec![]),
        ]);
        server
            .mock("GET", "/repos/octo-org/widgets/releases/latest")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(current.to_string())
            .create_async()
            .await;
        let list = server
            .mock("GET", "/repos/octo-org/widgets/releases")
            .match_query(Matcher::UrlEncoded("per_page".into(), "100".into()))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(listed.to_string())
            .expect(1)
            .create_async()
            .await;

        let baseline = client_for(&server).latest_stable_tag("v1.0.0").await.unwrap();

        list.assert_async().await;
        assert_eq!(baseline.as_deref(), Some("v0.9.0"));
    }

    #[tokio::test]
    async fn latest_other_release_is_the_baseline() {
        let mut server = Server::new_async().await;
        let latest = release_json(&server, 1, "v0.9.0", false, "2024-01-01T00:00:00Z", vec![]);
        server
            .mock("GET", "/repos/octo-org/widgets/releases/latest")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(latest.to_string())
            .create_async()
            .await;
        let list = server
            .mock("GET", "/repos/octo-org/widgets/releases")
            .match_query(Matcher::Any)
            .expect(0)
            .create_async()
            .await;

        let baseline = client_for(&server).latest_stable_tag("v1.0.0").await.unwrap();

        list.assert_async().await;
        assert_eq!(baseline.as_deref(), Some("v0.9.0"));
    }
}
