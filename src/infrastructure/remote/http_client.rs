use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::DateTime;
use reqwest::multipart::{Form, Part};
use reqwest::{RequestBuilder, Response, StatusCode};
use serde::{Deserialize, Serialize};

use crate::application::ports::remote::FeedApi;
use crate::application::services::session::AuthSession;
use crate::domain::entities::auth::AuthState;
use crate::domain::entities::post::{
    Attachment, AttachmentKind, FeedEntry, Media, MediaUpload,
};
use crate::shared::config::RemoteConfig;
use crate::shared::error::{FeedError, Result};

/// JSON-over-HTTP implementation of [`FeedApi`]. The bearer token comes from
/// the injected session; a bounded request timeout makes a hung call behave
/// exactly like any other network failure.
pub struct HttpFeedApi {
    base_url: String,
    http: reqwest::Client,
    session: Arc<AuthSession>,
}

impl HttpFeedApi {
    pub fn new(config: &RemoteConfig, session: Arc<AuthSession>) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout))
            .build()
            .map_err(classify)?;

        Ok(Self {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            http,
            session,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/api/{path}", self.base_url)
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        match self.session.current().token {
            Some(token) => request.header("Authorization", token),
            None => request,
        }
    }

    async fn fetch_entries(&self, url: String) -> Result<Vec<FeedEntry>> {
        let response = self
            .authorized(self.http.get(url))
            .send()
            .await
            .map_err(classify)?;
        let body: Vec<PostDto> = json_body(response).await?;
        body.into_iter().map(PostDto::into_entry).collect()
    }
}

#[async_trait]
impl FeedApi for HttpFeedApi {
    async fn latest(&self, limit: u32) -> Result<Vec<FeedEntry>> {
        self.fetch_entries(format!("{}?count={limit}", self.url("posts/latest")))
            .await
    }

    async fn before(&self, anchor: i64, limit: u32) -> Result<Vec<FeedEntry>> {
        self.fetch_entries(format!(
            "{}?count={limit}",
            self.url(&format!("posts/{anchor}/before"))
        ))
        .await
    }

    async fn after(&self, anchor: i64) -> Result<Vec<FeedEntry>> {
        self.fetch_entries(self.url(&format!("posts/{anchor}/after")))
            .await
    }

    async fn like(&self, id: i64) -> Result<FeedEntry> {
        let response = self
            .authorized(self.http.post(self.url(&format!("posts/{id}/likes"))))
            .send()
            .await
            .map_err(classify)?;
        let body: PostDto = json_body(response).await?;
        body.into_entry()
    }

    async fn dislike(&self, id: i64) -> Result<FeedEntry> {
        let response = self
            .authorized(self.http.delete(self.url(&format!("posts/{id}/likes"))))
            .send()
            .await
            .map_err(classify)?;
        let body: PostDto = json_body(response).await?;
        body.into_entry()
    }

    async fn create(&self, entry: &FeedEntry) -> Result<FeedEntry> {
        let response = self
            .authorized(self.http.post(self.url("posts")))
            .json(&PostDto::from_entry(entry))
            .send()
            .await
            .map_err(classify)?;
        let body: PostDto = json_body(response).await?;
        body.into_entry()
    }

    async fn delete(&self, id: i64) -> Result<()> {
        let response = self
            .authorized(self.http.delete(self.url(&format!("posts/{id}"))))
            .send()
            .await
            .map_err(classify)?;
        check_status(response.status())
    }

    async fn upload_media(&self, upload: MediaUpload) -> Result<Media> {
        let form = Form::new().part(
            "file",
            Part::bytes(upload.bytes).file_name(upload.file_name),
        );
        let response = self
            .authorized(self.http.post(self.url("media")))
            .multipart(form)
            .send()
            .await
            .map_err(classify)?;
        let body: MediaDto = json_body(response).await?;
        Ok(Media { id: body.id })
    }

    async fn sign_in(&self, login: &str, pass: &str) -> Result<AuthState> {
        let response = self
            .http
            .post(self.url("users/authentication"))
            .form(&[("login", login), ("pass", pass)])
            .send()
            .await
            .map_err(classify)?;
        let body: AuthDto = json_body(response).await?;
        Ok(body.into_auth(login))
    }

    async fn register(&self, login: &str, pass: &str, name: &str) -> Result<AuthState> {
        let response = self
            .http
            .post(self.url("users/registration"))
            .form(&[("login", login), ("pass", pass), ("name", name)])
            .send()
            .await
            .map_err(classify)?;
        let body: AuthDto = json_body(response).await?;
        Ok(body.into_auth(login))
    }

    async fn register_with_avatar(
        &self,
        login: &str,
        pass: &str,
        name: &str,
        avatar: MediaUpload,
    ) -> Result<AuthState> {
        let form = Form::new()
            .text("login", login.to_string())
            .text("pass", pass.to_string())
            .text("name", name.to_string())
            .part(
                "file",
                Part::bytes(avatar.bytes).file_name(avatar.file_name),
            );
        let response = self
            .http
            .post(self.url("users/registration"))
            .multipart(form)
            .send()
            .await
            .map_err(classify)?;
        let body: AuthDto = json_body(response).await?;
        Ok(body.into_auth(login))
    }
}

fn classify(err: reqwest::Error) -> FeedError {
    if err.is_decode() {
        FeedError::Unknown(err.to_string())
    } else if err.is_timeout() || err.is_connect() || err.is_request() || err.is_body() {
        FeedError::Network(err.to_string())
    } else {
        FeedError::Unknown(err.to_string())
    }
}

fn check_status(status: StatusCode) -> Result<()> {
    if status.is_success() {
        Ok(())
    } else {
        Err(FeedError::api(
            status.as_u16(),
            status.canonical_reason().unwrap_or("request failed"),
        ))
    }
}

async fn json_body<T: serde::de::DeserializeOwned>(response: Response) -> Result<T> {
    check_status(response.status())?;
    response.json::<T>().await.map_err(classify)
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PostDto {
    id: i64,
    author: String,
    author_id: i64,
    #[serde(default)]
    author_avatar: Option<String>,
    content: String,
    published: i64,
    #[serde(default)]
    likes: i64,
    #[serde(default)]
    liked_by_me: bool,
    #[serde(default)]
    owned_by_me: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    attachment: Option<AttachmentDto>,
}

#[derive(Debug, Serialize, Deserialize)]
struct AttachmentDto {
    url: String,
    #[serde(rename = "type")]
    kind: String,
}

#[derive(Debug, Deserialize)]
struct MediaDto {
    id: String,
}

#[derive(Debug, Deserialize)]
struct AuthDto {
    id: i64,
    token: String,
}

impl PostDto {
    fn into_entry(self) -> Result<FeedEntry> {
        let published = DateTime::from_timestamp(self.published, 0).ok_or_else(|| {
            FeedError::Unknown(format!("invalid published timestamp {}", self.published))
        })?;

        let attachment = self
            .attachment
            .map(|dto| {
                let kind = AttachmentKind::parse(&dto.kind.to_ascii_lowercase())
                    .ok_or_else(|| {
                        FeedError::Unknown(format!("unknown attachment kind {}", dto.kind))
                    })?;
                Ok::<_, FeedError>(Attachment { url: dto.url, kind })
            })
            .transpose()?;

        Ok(FeedEntry {
            id: self.id,
            author: self.author,
            author_id: self.author_id,
            author_avatar: self.author_avatar,
            content: self.content,
            published,
            likes: self.likes,
            liked_by_me: self.liked_by_me,
            owned_by_me: self.owned_by_me,
            attachment,
            pending: false,
            visible: true,
        })
    }

    fn from_entry(entry: &FeedEntry) -> Self {
        Self {
            id: entry.id,
            author: entry.author.clone(),
            author_id: entry.author_id,
            author_avatar: entry.author_avatar.clone(),
            content: entry.content.clone(),
            published: entry.published.timestamp(),
            likes: entry.likes,
            liked_by_me: entry.liked_by_me,
            owned_by_me: entry.owned_by_me,
            attachment: entry.attachment.as_ref().map(|a| AttachmentDto {
                url: a.url.clone(),
                kind: a.kind.as_str().to_ascii_uppercase(),
            }),
        }
    }
}

impl AuthDto {
    fn into_auth(self, login: &str) -> AuthState {
        AuthState::new(self.id, self.token, login.to_string())
    }
}
