use async_trait::async_trait;
use serde_json::{json, Value};
use std::collections::VecDeque;
use std::sync::Mutex;

use marble_admin::api::{ApiError, CatalogService, FormFields, ImageFile};
use marble_admin::controller::EntityController;
use marble_admin::model::{Category, EntityKind};

#[derive(Debug, Default)]
struct Calls {
    fetch_all: usize,
    create: usize,
    update: usize,
    delete: usize,
    deleted_ids: Vec<String>,
    create_image_counts: Vec<usize>,
    update_image_counts: Vec<usize>,
    update_fields: Vec<FormFields>,
}

/// Scripted catalog fake: queued responses per operation, call log for
/// count assertions.
#[derive(Default)]
struct RecordingCatalog {
    list_responses: Mutex<VecDeque<Result<Vec<Value>, ApiError>>>,
    create_responses: Mutex<VecDeque<Result<(), ApiError>>>,
    update_responses: Mutex<VecDeque<Result<(), ApiError>>>,
    delete_responses: Mutex<VecDeque<Result<(), ApiError>>>,
    calls: Mutex<Calls>,
}

impl RecordingCatalog {
    fn push_list(&self, response: Result<Vec<Value>, ApiError>) {
        self.list_responses.lock().unwrap().push_back(response);
    }

    fn push_create(&self, response: Result<(), ApiError>) {
        self.create_responses.lock().unwrap().push_back(response);
    }

    fn push_delete(&self, response: Result<(), ApiError>) {
        self.delete_responses.lock().unwrap().push_back(response);
    }

    fn calls<T>(&self, f: impl FnOnce(&Calls) -> T) -> T {
        f(&self.calls.lock().unwrap())
    }
}

#[async_trait]
impl CatalogService for RecordingCatalog {
    async fn fetch_all(&self, _kind: EntityKind) -> Result<Vec<Value>, ApiError> {
        self.calls.lock().unwrap().fetch_all += 1;
        self.list_responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok(Vec::new()))
    }

    async fn fetch_one(&self, kind: EntityKind, id: &str) -> Result<Value, ApiError> {
        Err(ApiError::Server(format!(
            "{} {} not found",
            kind.display_name(),
            id
        )))
    }

    async fn create(
        &self,
        _kind: EntityKind,
        _fields: FormFields,
        images: Vec<ImageFile>,
    ) -> Result<(), ApiError> {
        let mut calls = self.calls.lock().unwrap();
        calls.create += 1;
        calls.create_image_counts.push(images.len());
        drop(calls);
        self.create_responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(Ok(()))
    }

    async fn update(
        &self,
        _kind: EntityKind,
        _id: &str,
        fields: FormFields,
        images: Vec<ImageFile>,
    ) -> Result<(), ApiError> {
        let mut calls = self.calls.lock().unwrap();
        calls.update += 1;
        calls.update_image_counts.push(images.len());
        calls.update_fields.push(fields);
        drop(calls);
        self.update_responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(Ok(()))
    }

    async fn delete(&self, _kind: EntityKind, id: &str) -> Result<(), ApiError> {
        let mut calls = self.calls.lock().unwrap();
        calls.delete += 1;
        calls.deleted_ids.push(id.to_string());
        drop(calls);
        self.delete_responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(Ok(()))
    }
}

fn category_json(id: &str, name: &str) -> Value {
    json!({ "_id": id, "categoryName": name, "categoryImage": "/uploads/a.png" })
}

fn one_image() -> Vec<ImageFile> {
    vec![ImageFile {
        file_name: "a.png".into(),
        bytes: vec![0u8; 4],
        content_type: "image/png",
    }]
}

fn named_fields(name: &str) -> FormFields {
    let mut fields = FormFields::for_kind(EntityKind::Category);
    fields.set("categoryName", name);
    fields
}

#[tokio::test]
async fn load_replaces_the_collection_on_success() {
    let svc = RecordingCatalog::default();
    svc.push_list(Ok(vec![
        category_json("1", "Marble"),
        category_json("2", "Granite"),
    ]));

    let mut ctl = EntityController::<Category>::new();
    assert!(ctl.load(&svc).await);
    assert_eq!(ctl.items().len(), 2);
    assert_eq!(ctl.items()[0].category_name, "Marble");
    assert!(ctl.error().is_none());
}

#[tokio::test]
async fn failed_load_leaves_the_collection_untouched() {
    let svc = RecordingCatalog::default();
    svc.push_list(Ok(vec![category_json("1", "Marble")]));
    svc.push_list(Err(ApiError::Server("backend down".into())));

    let mut ctl = EntityController::<Category>::new();
    assert!(ctl.load(&svc).await);
    assert!(!ctl.load(&svc).await);

    assert_eq!(ctl.items().len(), 1);
    assert_eq!(ctl.error(), Some("backend down"));
}

#[tokio::test]
async fn create_validation_short_circuits_with_zero_network_calls() {
    let svc = RecordingCatalog::default();
    let mut ctl = EntityController::<Category>::new();

    let ok = ctl.create(&svc, named_fields(""), one_image()).await;
    assert!(!ok);
    assert_eq!(ctl.error(), Some("categoryName is required"));

    let ok = ctl.create(&svc, named_fields("Marble"), Vec::new()).await;
    assert!(!ok);
    assert_eq!(ctl.error(), Some("categoryImage is required"));

    assert_eq!(svc.calls(|c| (c.create, c.fetch_all)), (0, 0));
}

#[tokio::test]
async fn failed_create_leaves_list_then_success_reloads_exactly_once() {
    let svc = RecordingCatalog::default();
    svc.push_list(Ok(vec![category_json("1", "Marble")]));

    let mut ctl = EntityController::<Category>::new();
    assert!(ctl.load(&svc).await);

    svc.push_create(Err(ApiError::Server("name already exists".into())));
    let ok = ctl.create(&svc, named_fields("Marble"), one_image()).await;
    assert!(!ok);
    assert_eq!(ctl.error(), Some("name already exists"));
    assert_eq!(ctl.items().len(), 1);
    // failure must not trigger a reload
    assert_eq!(svc.calls(|c| c.fetch_all), 1);

    svc.push_list(Ok(vec![
        category_json("1", "Marble"),
        category_json("2", "Granite"),
    ]));
    let ok = ctl.create(&svc, named_fields("Granite"), one_image()).await;
    assert!(ok);
    assert_eq!(ctl.items().len(), 2);
    assert_eq!(svc.calls(|c| (c.create, c.fetch_all)), (2, 2));
}

#[tokio::test]
async fn server_failure_without_message_uses_the_status_fallback() {
    let svc = RecordingCatalog::default();
    svc.push_create(Err(ApiError::Status(502)));

    let mut ctl = EntityController::<Category>::new();
    let ok = ctl.create(&svc, named_fields("Marble"), one_image()).await;
    assert!(!ok);
    assert_eq!(ctl.error(), Some("operation failed (status 502)"));
}

#[tokio::test]
async fn update_without_images_sends_complete_fields_and_no_file_parts() {
    let svc = RecordingCatalog::default();
    svc.push_list(Ok(vec![category_json("1", "Marble")]));
    svc.push_list(Ok(vec![category_json("1", "Quartzite")]));

    let mut ctl = EntityController::<Category>::new();
    assert!(ctl.load(&svc).await);

    let ok = ctl
        .update(&svc, "1", named_fields("Quartzite"), Vec::new())
        .await;
    assert!(ok);
    assert_eq!(ctl.items()[0].category_name, "Quartzite");

    let (counts, sent) = svc.calls(|c| (c.update_image_counts.clone(), c.update_fields.clone()));
    assert_eq!(counts, vec![0]);
    // all known keys stay present on the wire even when only one changed
    assert_eq!(sent[0].get("categoryName"), Some("Quartzite"));
}

#[tokio::test]
async fn declined_confirmation_is_a_silent_no_op() {
    let svc = RecordingCatalog::default();
    svc.push_list(Ok(vec![category_json("1", "Marble")]));

    let mut ctl = EntityController::<Category>::new();
    assert!(ctl.load(&svc).await);

    let ok = ctl.delete(&svc, "1", |_| false).await;
    assert!(!ok);
    assert!(ctl.error().is_none());
    assert_eq!(svc.calls(|c| c.delete), 0);
    assert_eq!(ctl.items().len(), 1);
}

#[tokio::test]
async fn confirmed_delete_issues_the_call_then_one_reload() {
    let svc = RecordingCatalog::default();
    svc.push_list(Ok(vec![
        category_json("1", "Marble"),
        category_json("2", "Granite"),
    ]));
    svc.push_list(Ok(vec![category_json("2", "Granite")]));

    let mut ctl = EntityController::<Category>::new();
    assert!(ctl.load(&svc).await);

    let ok = ctl.delete(&svc, "1", |item| item.category_name == "Marble").await;
    assert!(ok);
    assert_eq!(svc.calls(|c| c.deleted_ids.clone()), vec!["1".to_string()]);
    assert_eq!(svc.calls(|c| c.fetch_all), 2);
    assert_eq!(ctl.items().len(), 1);
}

#[tokio::test]
async fn delete_of_unknown_id_errors_without_io() {
    let svc = RecordingCatalog::default();
    svc.push_list(Ok(vec![category_json("1", "Marble")]));

    let mut ctl = EntityController::<Category>::new();
    assert!(ctl.load(&svc).await);

    let ok = ctl.delete(&svc, "999", |_| true).await;
    assert!(!ok);
    assert_eq!(ctl.error(), Some("no category with id 999"));
    assert_eq!(svc.calls(|c| c.delete), 0);
}

#[tokio::test]
async fn failed_delete_surfaces_the_server_message_and_keeps_the_list() {
    let svc = RecordingCatalog::default();
    svc.push_list(Ok(vec![category_json("1", "Marble")]));
    svc.push_delete(Err(ApiError::Server("category is in use".into())));

    let mut ctl = EntityController::<Category>::new();
    assert!(ctl.load(&svc).await);

    let ok = ctl.delete(&svc, "1", |_| true).await;
    assert!(!ok);
    assert_eq!(ctl.error(), Some("category is in use"));
    assert_eq!(ctl.items().len(), 1);
}
