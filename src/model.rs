//! Catalog entity records and the small pure helpers shared by every screen.
//!
//! Field names mirror the backend wire format exactly (including its
//! `lenthincm` spelling), so records round-trip verbatim.
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

/// The three entity collections exposed by the remote catalog service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityKind {
    Category,
    Subcategory,
    Product,
}

impl EntityKind {
    /// Path segment under `/api/` for this collection.
    pub fn path(&self) -> &'static str {
        match self {
            EntityKind::Category => "category",
            EntityKind::Subcategory => "subcategory",
            EntityKind::Product => "product",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            EntityKind::Category => "category",
            EntityKind::Subcategory => "subcategory",
            EntityKind::Product => "product",
        }
    }

    /// Every text form field the backend expects for this collection. The
    /// multipart binder sends all of them on every mutation, empty-valued
    /// when unset, never omitted.
    pub fn form_field_names(&self) -> &'static [&'static str] {
        match self {
            EntityKind::Category => &["categoryName"],
            EntityKind::Subcategory => &["categoryId", "categoryName", "subCategoryName"],
            EntityKind::Product => &[
                "MarbleName",
                "lenthincm",
                "widthincm",
                "noofslabs",
                "description",
            ],
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Category {
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(rename = "categoryName", default)]
    pub category_name: String,
    #[serde(rename = "categoryImage", default)]
    pub category_image: String,
    #[serde(rename = "createdAt", default)]
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Subcategory {
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(rename = "categoryId", default)]
    pub category_id: String,
    /// Denormalized parent name; sent alongside the id on every mutation.
    #[serde(rename = "categoryName", default)]
    pub category_name: String,
    #[serde(rename = "subCategoryName", default)]
    pub sub_category_name: String,
    #[serde(rename = "subCategoryImage", default)]
    pub sub_category_image: String,
    #[serde(rename = "createdAt", default)]
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Product {
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(rename = "MarbleName", default)]
    pub marble_name: String,
    #[serde(rename = "lenthincm", default)]
    pub length_in_cm: f64,
    #[serde(rename = "widthincm", default)]
    pub width_in_cm: f64,
    #[serde(rename = "noofslabs", default)]
    pub no_of_slabs: i64,
    #[serde(default)]
    pub description: String,
    /// Stored image references, ordered, at most [`MAX_PRODUCT_IMAGES`].
    #[serde(rename = "productImages", default)]
    pub product_images: Vec<String>,
    #[serde(rename = "createdAt", default)]
    pub created_at: Option<DateTime<Utc>>,
}

/// Hard cap on images held against one product.
pub const MAX_PRODUCT_IMAGES: usize = 10;

/// One catalog record type, as the list controller sees it.
pub trait Entity: DeserializeOwned + Clone + Send + Sync + 'static {
    const KIND: EntityKind;
    /// Wire name of the repeated multipart file part for this entity.
    const IMAGE_FIELD: &'static str;
    /// Whether `create` demands at least one image.
    const IMAGES_REQUIRED_ON_CREATE: bool;
    /// Form fields that must be non-empty before any network call.
    const REQUIRED_FIELDS: &'static [&'static str];

    fn id(&self) -> &str;
    /// Human-facing label for confirmation prompts and pick lists.
    fn label(&self) -> String;
    /// Designated text attributes the free-text filter matches against.
    fn search_haystack(&self) -> Vec<&str>;
    /// Flatten the stored record back into form fields, so an edit starts
    /// from current values instead of blanks.
    fn fields(&self) -> crate::api::FormFields;
}

impl Entity for Category {
    const KIND: EntityKind = EntityKind::Category;
    const IMAGE_FIELD: &'static str = "categoryImage";
    const IMAGES_REQUIRED_ON_CREATE: bool = true;
    const REQUIRED_FIELDS: &'static [&'static str] = &["categoryName"];

    fn id(&self) -> &str {
        &self.id
    }

    fn label(&self) -> String {
        self.category_name.clone()
    }

    fn search_haystack(&self) -> Vec<&str> {
        vec![&self.category_name]
    }

    fn fields(&self) -> crate::api::FormFields {
        let mut fields = crate::api::FormFields::for_kind(Self::KIND);
        fields.set("categoryName", &self.category_name);
        fields
    }
}

impl Entity for Subcategory {
    const KIND: EntityKind = EntityKind::Subcategory;
    const IMAGE_FIELD: &'static str = "subCategoryImage";
    const IMAGES_REQUIRED_ON_CREATE: bool = true;
    const REQUIRED_FIELDS: &'static [&'static str] =
        &["categoryId", "categoryName", "subCategoryName"];

    fn id(&self) -> &str {
        &self.id
    }

    fn label(&self) -> String {
        format!("{} ({})", self.sub_category_name, self.category_name)
    }

    fn search_haystack(&self) -> Vec<&str> {
        vec![&self.sub_category_name, &self.category_name]
    }

    fn fields(&self) -> crate::api::FormFields {
        let mut fields = crate::api::FormFields::for_kind(Self::KIND);
        fields
            .set("categoryId", &self.category_id)
            .set("categoryName", &self.category_name)
            .set("subCategoryName", &self.sub_category_name);
        fields
    }
}

impl Entity for Product {
    const KIND: EntityKind = EntityKind::Product;
    const IMAGE_FIELD: &'static str = "productImages";
    const IMAGES_REQUIRED_ON_CREATE: bool = true;
    const REQUIRED_FIELDS: &'static [&'static str] =
        &["MarbleName", "lenthincm", "widthincm", "noofslabs"];

    fn id(&self) -> &str {
        &self.id
    }

    fn label(&self) -> String {
        self.marble_name.clone()
    }

    fn search_haystack(&self) -> Vec<&str> {
        vec![&self.marble_name, &self.description]
    }

    fn fields(&self) -> crate::api::FormFields {
        let mut fields = crate::api::FormFields::for_kind(Self::KIND);
        fields
            .set("MarbleName", &self.marble_name)
            .set("lenthincm", &self.length_in_cm.to_string())
            .set("widthincm", &self.width_in_cm.to_string())
            .set("noofslabs", &self.no_of_slabs.to_string())
            .set("description", &self.description);
        fields
    }
}

/// Whether a screen is creating a fresh record or editing an existing one.
/// Edit carries the original so unsupplied fields fall back to stored values.
#[derive(Debug, Clone)]
pub enum FormMode<E: Entity> {
    Create,
    Edit(E),
}

impl<E: Entity> FormMode<E> {
    pub fn is_edit(&self) -> bool {
        matches!(self, FormMode::Edit(_))
    }

    /// Starting field set for the form: blank for create, prefilled from the
    /// stored record for edit.
    pub fn starting_fields(&self) -> crate::api::FormFields {
        match self {
            FormMode::Create => crate::api::FormFields::for_kind(E::KIND),
            FormMode::Edit(original) => original.fields(),
        }
    }
}

/// Resolve a stored image reference to a displayable URL.
///
/// Absolute references (anything with an http(s) scheme) pass through
/// unchanged; relative paths are prefixed with the backend origin,
/// normalizing to exactly one separating slash.
pub fn resolve_image_url(origin: &str, reference: &str) -> String {
    if reference.is_empty() {
        return String::new();
    }
    if reference.starts_with("http://") || reference.starts_with("https://") {
        return reference.to_string();
    }
    let origin = origin.trim_end_matches('/');
    let path = reference.trim_start_matches('/');
    format!("{}/{}", origin, path)
}

/// Case-insensitive substring filter over the designated text attributes.
/// An empty (or whitespace-only) query returns the list unchanged; ordering
/// is always preserved.
pub fn filter<E: Entity>(list: &[E], query: &str) -> Vec<E> {
    let needle = query.trim().to_lowercase();
    if needle.is_empty() {
        return list.to_vec();
    }
    list.iter()
        .filter(|e| {
            e.search_haystack()
                .iter()
                .any(|field| field.to_lowercase().contains(&needle))
        })
        .cloned()
        .collect()
}
