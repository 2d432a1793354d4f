//! HTTP client for the remote catalog service, plus the multipart form
//! binder shared by every mutation.
use async_trait::async_trait;
use reqwest::multipart;
use reqwest::{Client, Response, Url};
use serde_json::Value;
use std::any::Any;
use std::fmt;
use std::path::Path;
use thiserror::Error;
use tracing::{info, warn};

use crate::api::model::{Envelope, ErrorBody};
use crate::model::EntityKind;

pub mod model;

#[derive(Debug, Error)]
pub enum ApiError {
    /// Request never completed (DNS, TLS, connection reset, timeout).
    #[error("network error: {0}")]
    Network(#[source] reqwest::Error),
    /// Non-2xx with a parseable error body; carries the server's message.
    #[error("{0}")]
    Server(String),
    /// Non-2xx and the body could not be parsed.
    #[error("operation failed (status {0})")]
    Status(u16),
    /// The 2xx body did not match the expected envelope.
    #[error("invalid response body: {0}")]
    BadBody(#[source] serde_json::Error),
}

/// One text field of a mutation, in submission order.
///
/// The backend expects every known key on every mutation, so the binder
/// starts from the full field list for the entity kind with empty values and
/// only ever overwrites.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormFields(Vec<(String, String)>);

impl FormFields {
    pub fn for_kind(kind: EntityKind) -> Self {
        Self(
            kind.form_field_names()
                .iter()
                .map(|name| (name.to_string(), String::new()))
                .collect(),
        )
    }

    /// Set a field value, trimming surrounding whitespace. Unknown names are
    /// appended after the standard set (used for e.g. the edit image policy).
    pub fn set(&mut self, name: &str, value: &str) -> &mut Self {
        let value = value.trim().to_string();
        match self.0.iter_mut().find(|(n, _)| n.as_str() == name) {
            Some(slot) => slot.1 = value,
            None => self.0.push((name.to_string(), value)),
        }
        self
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(n, _)| n.as_str() == name)
            .map(|(_, v)| v.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(n, v)| (n.as_str(), v.as_str()))
    }
}

/// A locally selected image, loaded and ready to ship as one file part.
#[derive(Debug, Clone)]
pub struct ImageFile {
    pub file_name: String,
    pub bytes: Vec<u8>,
    pub content_type: &'static str,
}

impl ImageFile {
    pub async fn from_path(path: &Path) -> anyhow::Result<Self> {
        use anyhow::Context;
        let file_name = path
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| anyhow::anyhow!("invalid file name: {}", path.display()))?
            .to_string();
        let bytes = tokio::fs::read(path)
            .await
            .with_context(|| format!("failed to read image: {}", path.display()))?;
        Ok(Self {
            content_type: image_content_type(path),
            file_name,
            bytes,
        })
    }
}

/// Content type by extension; no sniffing, the backend only needs a hint.
pub fn image_content_type(path: &Path) -> &'static str {
    match path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|s| s.to_ascii_lowercase())
    {
        Some(ext) if ext == "jpg" || ext == "jpeg" => "image/jpeg",
        Some(ext) if ext == "png" => "image/png",
        Some(ext) if ext == "gif" => "image/gif",
        Some(ext) if ext == "webp" => "image/webp",
        _ => "application/octet-stream",
    }
}

/// Map every field to its own part, then append each image as a repeated
/// file part under the entity's fixed field name, in selection order.
pub fn bind_form(
    fields: &FormFields,
    image_field: &str,
    images: Vec<ImageFile>,
) -> Result<multipart::Form, ApiError> {
    let mut form = multipart::Form::new();
    for (name, value) in fields.iter() {
        form = form.text(name.to_string(), value.to_string());
    }
    for img in images {
        let part = multipart::Part::bytes(img.bytes)
            .file_name(img.file_name)
            .mime_str(img.content_type)
            .map_err(ApiError::Network)?;
        form = form.part(image_field.to_string(), part);
    }
    Ok(form)
}

/// The four catalog operations per entity collection, plus the single-record
/// fetch the product details view needs. Seam for tests.
#[async_trait]
pub trait CatalogService: Send + Sync + Any {
    async fn fetch_all(&self, kind: EntityKind) -> Result<Vec<Value>, ApiError>;

    async fn fetch_one(&self, kind: EntityKind, id: &str) -> Result<Value, ApiError>;

    async fn create(
        &self,
        kind: EntityKind,
        fields: FormFields,
        images: Vec<ImageFile>,
    ) -> Result<(), ApiError>;

    async fn update(
        &self,
        kind: EntityKind,
        id: &str,
        fields: FormFields,
        images: Vec<ImageFile>,
    ) -> Result<(), ApiError>;

    async fn delete(&self, kind: EntityKind, id: &str) -> Result<(), ApiError>;
}

#[derive(Clone)]
pub struct CatalogClient {
    http: Client,
    base_url: Url,
    token: Option<String>,
}

impl fmt::Debug for CatalogClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CatalogClient")
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

impl CatalogClient {
    /// Build a client for a backend origin such as `https://api.example.com`.
    /// `token` is the opaque bearer token from a stored login session.
    pub fn new(origin: &str, token: Option<String>) -> Result<Self, ApiError> {
        // Url::join needs the trailing slash to keep the /api prefix intact.
        let base_url = Url::parse(&format!("{}/", origin.trim_end_matches('/')))
            .map_err(|_| ApiError::Server(format!("invalid backend origin: {origin}")))?;
        let http = Client::builder()
            .user_agent("marble-admin/0.1")
            .build()
            .map_err(ApiError::Network)?;
        Ok(Self {
            http,
            base_url,
            token,
        })
    }

    fn endpoint(&self, kind: EntityKind, tail: &str) -> Result<Url, ApiError> {
        let path = if tail.is_empty() {
            format!("api/{}", kind.path())
        } else {
            format!("api/{}/{}", kind.path(), tail)
        };
        self.base_url
            .join(&path)
            .map_err(|_| ApiError::Server(format!("invalid endpoint path: {path}")))
    }

    fn authorized(&self, req: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.token {
            Some(token) => req.header("Authorization", format!("Bearer {token}")),
            None => req,
        }
    }

    async fn check(res: Response) -> Result<Response, ApiError> {
        check_status(res).await
    }
}

/// Turn a non-2xx response into the single display string the screens show:
/// the server's message when the body parses, a status fallback otherwise.
pub(crate) async fn error_from_response(res: Response) -> ApiError {
    let status = res.status().as_u16();
    let body = res.text().await.unwrap_or_default();
    match serde_json::from_str::<ErrorBody>(&body) {
        Ok(parsed) => match parsed.display() {
            Some(message) => ApiError::Server(message.to_string()),
            None => ApiError::Status(status),
        },
        Err(_) => {
            warn!(status, "unparseable error body from catalog service");
            ApiError::Status(status)
        }
    }
}

pub(crate) async fn check_status(res: Response) -> Result<Response, ApiError> {
    if res.status().is_success() {
        Ok(res)
    } else {
        Err(error_from_response(res).await)
    }
}

#[async_trait]
impl CatalogService for CatalogClient {
    async fn fetch_all(&self, kind: EntityKind) -> Result<Vec<Value>, ApiError> {
        let url = self.endpoint(kind, "all")?;
        let res = self
            .authorized(self.http.get(url))
            .send()
            .await
            .map_err(ApiError::Network)?;
        let res = Self::check(res).await?;
        let body = res.text().await.map_err(ApiError::Network)?;
        let envelope: Envelope<Vec<Value>> =
            serde_json::from_str(&body).map_err(ApiError::BadBody)?;
        Ok(envelope.data.unwrap_or_default())
    }

    async fn fetch_one(&self, kind: EntityKind, id: &str) -> Result<Value, ApiError> {
        let url = self.endpoint(kind, id)?;
        let res = self
            .authorized(self.http.get(url))
            .send()
            .await
            .map_err(ApiError::Network)?;
        let res = Self::check(res).await?;
        let body = res.text().await.map_err(ApiError::Network)?;
        let envelope: Envelope<Value> = serde_json::from_str(&body).map_err(ApiError::BadBody)?;
        envelope
            .data
            .ok_or_else(|| ApiError::Server(format!("{} {} not found", kind.display_name(), id)))
    }

    async fn create(
        &self,
        kind: EntityKind,
        fields: FormFields,
        images: Vec<ImageFile>,
    ) -> Result<(), ApiError> {
        let url = self.endpoint(kind, "create")?;
        let image_field = image_field_for(kind);
        let image_count = images.len();
        let form = bind_form(&fields, image_field, images)?;
        info!(kind = kind.display_name(), image_count, "creating record");
        let res = self
            .authorized(self.http.post(url).multipart(form))
            .send()
            .await
            .map_err(ApiError::Network)?;
        Self::check(res).await.map(|_| ())
    }

    async fn update(
        &self,
        kind: EntityKind,
        id: &str,
        fields: FormFields,
        images: Vec<ImageFile>,
    ) -> Result<(), ApiError> {
        let url = self.endpoint(kind, &format!("edit/{id}"))?;
        let image_field = image_field_for(kind);
        let image_count = images.len();
        let form = bind_form(&fields, image_field, images)?;
        info!(kind = kind.display_name(), id, image_count, "updating record");
        let res = self
            .authorized(self.http.put(url).multipart(form))
            .send()
            .await
            .map_err(ApiError::Network)?;
        Self::check(res).await.map(|_| ())
    }

    async fn delete(&self, kind: EntityKind, id: &str) -> Result<(), ApiError> {
        let url = self.endpoint(kind, &format!("delete/{id}"))?;
        info!(kind = kind.display_name(), id, "deleting record");
        let res = self
            .authorized(self.http.delete(url))
            .send()
            .await
            .map_err(ApiError::Network)?;
        Self::check(res).await.map(|_| ())
    }
}

fn image_field_for(kind: EntityKind) -> &'static str {
    match kind {
        EntityKind::Category => "categoryImage",
        EntityKind::Subcategory => "subCategoryImage",
        EntityKind::Product => "productImages",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn form_fields_start_complete_and_empty() {
        let fields = FormFields::for_kind(EntityKind::Product);
        let names: Vec<&str> = fields.iter().map(|(n, _)| n).collect();
        assert_eq!(
            names,
            vec!["MarbleName", "lenthincm", "widthincm", "noofslabs", "description"]
        );
        assert!(fields.iter().all(|(_, v)| v.is_empty()));
    }

    #[test]
    fn form_fields_set_trims_and_overwrites_in_place() {
        let mut fields = FormFields::for_kind(EntityKind::Category);
        fields.set("categoryName", "  Marbles  ");
        assert_eq!(fields.get("categoryName"), Some("Marbles"));

        fields.set("categoryName", "Granite");
        let names: Vec<&str> = fields.iter().map(|(n, _)| n).collect();
        assert_eq!(names, vec!["categoryName"]);
        assert_eq!(fields.get("categoryName"), Some("Granite"));
    }

    #[test]
    fn form_fields_unknown_names_append_after_standard_set() {
        let mut fields = FormFields::for_kind(EntityKind::Product);
        fields.set("imagePolicy", "append");
        let names: Vec<&str> = fields.iter().map(|(n, _)| n).collect();
        assert_eq!(names.last(), Some(&"imagePolicy"));
        assert_eq!(fields.get("imagePolicy"), Some("append"));
    }

    #[test]
    fn content_type_by_extension() {
        assert_eq!(image_content_type(Path::new("a.JPG")), "image/jpeg");
        assert_eq!(image_content_type(Path::new("a.jpeg")), "image/jpeg");
        assert_eq!(image_content_type(Path::new("a.png")), "image/png");
        assert_eq!(image_content_type(Path::new("a.webp")), "image/webp");
        assert_eq!(
            image_content_type(Path::new("a.raw")),
            "application/octet-stream"
        );
    }

    #[test]
    fn bind_form_accepts_fields_and_repeated_images() {
        let mut fields = FormFields::for_kind(EntityKind::Product);
        fields.set("MarbleName", "Statuario");
        let images = vec![
            ImageFile {
                file_name: "a.png".into(),
                bytes: vec![1, 2, 3],
                content_type: "image/png",
            },
            ImageFile {
                file_name: "b.jpg".into(),
                bytes: vec![4, 5],
                content_type: "image/jpeg",
            },
        ];
        // Form internals are opaque; building without error is the contract.
        bind_form(&fields, "productImages", images).unwrap();
    }

    #[test]
    fn error_body_prefers_message_then_error_field() {
        let body: ErrorBody =
            serde_json::from_str(r#"{"message":"bad name","error":"other"}"#).unwrap();
        assert_eq!(body.display(), Some("bad name"));

        let body: ErrorBody = serde_json::from_str(r#"{"error":"boom"}"#).unwrap();
        assert_eq!(body.display(), Some("boom"));

        let body: ErrorBody = serde_json::from_str(r#"{"message":"  "}"#).unwrap();
        assert_eq!(body.display(), None);
    }

    #[test]
    fn endpoints_keep_api_prefix() {
        let client = CatalogClient::new("https://api.example.com", None).unwrap();
        let url = client.endpoint(EntityKind::Category, "all").unwrap();
        assert_eq!(url.as_str(), "https://api.example.com/api/category/all");
        let url = client.endpoint(EntityKind::Product, "edit/507f").unwrap();
        assert_eq!(url.as_str(), "https://api.example.com/api/product/edit/507f");
    }
}
