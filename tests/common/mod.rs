#![allow(dead_code)]

use async_trait::async_trait;
use crudaction::{
    ActionConfig, ActionContext, CrudController, CrudModel, CrudStore, FormModel, RequestContext,
    RouteUrls, SaveError, SeaOrmStore, Validatable, ValidationError, ValidationErrors,
    binding::{as_i64, as_string},
};
use sea_orm::{
    ActiveModelTrait, ActiveValue, ConnectionTrait, Database, DatabaseConnection, DbErr,
    EntityTrait, PaginatorTrait,
};
use serde::Serialize;
use serde_json::Value;
use std::marker::PhantomData;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

pub mod post_entity;

pub use post_entity::Post;

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}

pub async fn setup_test_db() -> Result<DatabaseConnection, DbErr> {
    init_tracing();
    let db = Database::connect("sqlite::memory:").await?;

    db.execute_unprepared(
        "CREATE TABLE posts (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            title TEXT NOT NULL,
            body TEXT NOT NULL,
            published BOOLEAN NOT NULL
        )",
    )
    .await?;

    Ok(db)
}

pub async fn insert_post(db: &DatabaseConnection, title: &str, body: &str) -> i32 {
    let row = post_entity::ActiveModel {
        id: ActiveValue::NotSet,
        title: ActiveValue::Set(title.to_string()),
        body: ActiveValue::Set(body.to_string()),
        published: ActiveValue::Set(false),
    }
    .insert(db)
    .await
    .expect("Failed to insert post");
    row.id
}

pub async fn find_post(db: &DatabaseConnection, id: i32) -> Option<post_entity::Model> {
    post_entity::Entity::find_by_id(id)
        .one(db)
        .await
        .expect("Failed to query post")
}

pub async fn count_posts(db: &DatabaseConnection) -> u64 {
    post_entity::Entity::find()
        .count(db)
        .await
        .expect("Failed to count posts")
}

/// Controller over model `M` persisted through `S`, filtered by `F`
pub struct TestController<M, S, F = M> {
    pub config: ActionConfig,
    pub store: S,
    pub urls: RouteUrls,
    marker: PhantomData<fn() -> (M, F)>,
}

impl<M, S, F> TestController<M, S, F> {
    pub fn new(store: S, base: &str) -> Self {
        Self {
            config: ActionConfig::default(),
            store,
            urls: RouteUrls::new(base),
            marker: PhantomData,
        }
    }

    pub fn with_config(mut self, config: ActionConfig) -> Self {
        self.config = config;
        self
    }
}

#[async_trait]
impl<M, S, F> CrudController for TestController<M, S, F>
where
    M: CrudModel + Serialize,
    F: FormModel + Serialize,
    S: CrudStore<M> + 'static,
{
    type Model = M;
    type Filter = F;
    type Store = S;
    type Urls = RouteUrls;

    fn config(&self) -> &ActionConfig {
        &self.config
    }

    fn store(&self) -> &S {
        &self.store
    }

    fn urls(&self) -> &RouteUrls {
        &self.urls
    }
}

pub type PostController<S = SeaOrmStore> = TestController<Post, S>;

pub fn post_controller(db: DatabaseConnection) -> PostController {
    TestController::new(SeaOrmStore::new(db), "/posts")
}

pub fn counting_controller(db: DatabaseConnection) -> PostController<CountingStore> {
    TestController::new(CountingStore::new(db), "/posts")
}

pub fn context<'a, C: CrudController>(
    controller: &'a C,
    request: &'a RequestContext,
) -> ActionContext<'a, C> {
    ActionContext::new(controller, request)
}

/// Sea-ORM store that counts how often it is called
pub struct CountingStore {
    inner: SeaOrmStore,
    finds: AtomicUsize,
    saves: AtomicUsize,
    deletes: AtomicUsize,
}

impl CountingStore {
    pub fn new(db: DatabaseConnection) -> Self {
        Self {
            inner: SeaOrmStore::new(db),
            finds: AtomicUsize::new(0),
            saves: AtomicUsize::new(0),
            deletes: AtomicUsize::new(0),
        }
    }

    pub fn connection(&self) -> &DatabaseConnection {
        self.inner.connection()
    }

    pub fn finds(&self) -> usize {
        self.finds.load(Ordering::SeqCst)
    }

    pub fn saves(&self) -> usize {
        self.saves.load(Ordering::SeqCst)
    }

    pub fn deletes(&self) -> usize {
        self.deletes.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CrudStore<Post> for CountingStore {
    async fn find_by_key(&self, key: &str) -> Result<Option<Post>, DbErr> {
        self.finds.fetch_add(1, Ordering::SeqCst);
        CrudStore::<Post>::find_by_key(&self.inner, key).await
    }

    async fn save(&self, model: &mut Post) -> Result<(), SaveError> {
        self.saves.fetch_add(1, Ordering::SeqCst);
        self.inner.save(model).await
    }

    async fn delete(&self, model: &Post) -> Result<(), DbErr> {
        self.deletes.fetch_add(1, Ordering::SeqCst);
        self.inner.delete(model).await
    }
}

/// Store whose writes always fail
pub struct FailingStore;

#[async_trait]
impl CrudStore<Post> for FailingStore {
    async fn find_by_key(&self, key: &str) -> Result<Option<Post>, DbErr> {
        Ok(key.parse().ok().map(|id| Post {
            id: Some(id),
            title: "Stored".to_string(),
            body: "Stored body".to_string(),
            ..Post::default()
        }))
    }

    async fn save(&self, _model: &mut Post) -> Result<(), SaveError> {
        Err(SaveError::Database(DbErr::Custom("disk full".to_string())))
    }

    async fn delete(&self, _model: &Post) -> Result<(), DbErr> {
        Err(DbErr::Custom("disk full".to_string()))
    }
}

/// In-memory store for models that are always keyed
pub struct MemoryStore<M> {
    records: Mutex<Vec<M>>,
}

impl<M> MemoryStore<M> {
    pub fn new(records: Vec<M>) -> Self {
        Self {
            records: Mutex::new(records),
        }
    }
}

#[async_trait]
impl<M: CrudModel + Clone> CrudStore<M> for MemoryStore<M> {
    async fn find_by_key(&self, key: &str) -> Result<Option<M>, DbErr> {
        let records = self.records.lock().unwrap();
        Ok(records
            .iter()
            .find(|record| record.primary_key().as_deref() == Some(key))
            .cloned())
    }

    async fn save(&self, model: &mut M) -> Result<(), SaveError> {
        let mut records = self.records.lock().unwrap();
        records.retain(|record| record.primary_key() != model.primary_key());
        records.push(model.clone());
        Ok(())
    }

    async fn delete(&self, model: &M) -> Result<(), DbErr> {
        let mut records = self.records.lock().unwrap();
        records.retain(|record| record.primary_key() != model.primary_key());
        Ok(())
    }
}

/// Link table row keyed by two columns
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct TagLink {
    pub post_id: i64,
    pub tag: String,
    #[serde(skip)]
    pub scenario: String,
}

impl FormModel for TagLink {
    const MODEL_NAME: &'static str = "TagLink";

    fn new_instance() -> Self {
        Self::default()
    }

    fn scenario(&self) -> &str {
        &self.scenario
    }

    fn set_scenario(&mut self, scenario: &str) {
        self.scenario = scenario.to_string();
    }

    fn safe_attributes(&self) -> Vec<&'static str> {
        vec!["post_id", "tag"]
    }

    fn set_attribute(&mut self, name: &str, value: &Value) -> Result<(), ValidationError> {
        match name {
            "post_id" => self.post_id = as_i64(name, value)?,
            "tag" => self.tag = as_string(name, value)?,
            _ => {}
        }
        Ok(())
    }
}

impl Validatable for TagLink {
    fn validate(&self) -> Result<(), ValidationErrors> {
        Ok(())
    }
}

impl CrudModel for TagLink {
    fn primary_key_columns() -> &'static [&'static str] {
        &["post_id", "tag"]
    }

    fn primary_key(&self) -> Option<String> {
        (!self.tag.is_empty()).then(|| format!("{}:{}", self.post_id, self.tag))
    }
}

pub fn tag_link(post_id: i64, tag: &str) -> TagLink {
    TagLink {
        post_id,
        tag: tag.to_string(),
        scenario: String::new(),
    }
}
