//! Generic list controller: one instance owns one entity collection and
//! mediates every mutation against it.
//!
//! All three catalog screens share this shape; parameterizing over the
//! entity keeps the create/edit/list/filter logic from diverging per screen.
use serde_json::Value;
use tracing::{info, warn};

use crate::api::{CatalogService, FormFields, ImageFile};
use crate::model::{filter, Entity};

pub struct EntityController<E: Entity> {
    items: Vec<E>,
    error: Option<String>,
    loading: bool,
}

impl<E: Entity> Default for EntityController<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E: Entity> EntityController<E> {
    pub fn new() -> Self {
        Self {
            items: Vec::new(),
            error: None,
            loading: false,
        }
    }

    /// Last successful fetch result. A failed mutation never touches this;
    /// it is only ever replaced wholesale by a reload.
    pub fn items(&self) -> &[E] {
        &self.items
    }

    /// Current error message, if the last operation failed.
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    /// Case-insensitive free-text view over the held collection.
    pub fn filtered(&self, query: &str) -> Vec<E> {
        filter(&self.items, query)
    }

    pub fn find(&self, id: &str) -> Option<&E> {
        self.items.iter().find(|e| e.id() == id)
    }

    /// Fetch the full collection. On failure the held list stays untouched
    /// and the error is recorded; the caller may simply invoke again.
    pub async fn load(&mut self, svc: &dyn CatalogService) -> bool {
        self.loading = true;
        self.error = None;
        let result = svc.fetch_all(E::KIND).await;
        self.loading = false;
        match result {
            Ok(values) => match parse_items::<E>(values) {
                Ok(items) => {
                    info!(
                        kind = E::KIND.display_name(),
                        count = items.len(),
                        "loaded collection"
                    );
                    self.items = items;
                    true
                }
                Err(err) => {
                    warn!(kind = E::KIND.display_name(), %err, "bad list payload");
                    self.error = Some(format!(
                        "failed to fetch {} list: {err}",
                        E::KIND.display_name()
                    ));
                    false
                }
            },
            Err(err) => {
                self.error = Some(err.to_string());
                false
            }
        }
    }

    /// Create a record. Required fields and the image mandate are checked
    /// locally first; a validation failure records a field-named error and
    /// performs no I/O. A successful submit triggers exactly one reload.
    pub async fn create(
        &mut self,
        svc: &dyn CatalogService,
        fields: FormFields,
        images: Vec<ImageFile>,
    ) -> bool {
        self.error = None;
        if let Some(message) = validate::<E>(&fields, Some(&images)) {
            self.error = Some(message);
            return false;
        }
        match svc.create(E::KIND, fields, images).await {
            Ok(()) => self.load(svc).await,
            Err(err) => {
                self.error = Some(err.to_string());
                false
            }
        }
    }

    /// Update an existing record. Same validation as create except the image
    /// list is optional; sending no images preserves the stored references.
    pub async fn update(
        &mut self,
        svc: &dyn CatalogService,
        id: &str,
        fields: FormFields,
        images: Vec<ImageFile>,
    ) -> bool {
        self.error = None;
        if id.trim().is_empty() {
            self.error = Some("id is required".to_string());
            return false;
        }
        if let Some(message) = validate::<E>(&fields, None) {
            self.error = Some(message);
            return false;
        }
        match svc.update(E::KIND, id, fields, images).await {
            Ok(()) => self.load(svc).await,
            Err(err) => {
                self.error = Some(err.to_string());
                false
            }
        }
    }

    /// Delete behind an explicit confirmation gate. Declining is a silent
    /// no-op; confirming issues the delete and then one reload.
    pub async fn delete<F>(&mut self, svc: &dyn CatalogService, id: &str, confirm: F) -> bool
    where
        F: FnOnce(&E) -> bool,
    {
        self.error = None;
        let Some(target) = self.find(id) else {
            self.error = Some(format!("no {} with id {id}", E::KIND.display_name()));
            return false;
        };
        if !confirm(target) {
            return false;
        }
        match svc.delete(E::KIND, id).await {
            Ok(()) => self.load(svc).await,
            Err(err) => {
                self.error = Some(err.to_string());
                false
            }
        }
    }
}

fn parse_items<E: Entity>(values: Vec<Value>) -> Result<Vec<E>, serde_json::Error> {
    values.into_iter().map(serde_json::from_value).collect()
}

/// Local validation: every required field non-empty, plus the image mandate
/// when `images` is supplied (create only).
fn validate<E: Entity>(fields: &FormFields, images: Option<&[ImageFile]>) -> Option<String> {
    for name in E::REQUIRED_FIELDS {
        if fields.get(name).map_or(true, |v| v.trim().is_empty()) {
            return Some(format!("{name} is required"));
        }
    }
    if let Some(images) = images {
        if E::IMAGES_REQUIRED_ON_CREATE && images.is_empty() {
            return Some(format!("{} is required", E::IMAGE_FIELD));
        }
    }
    None
}
