use crudaction::binding::{as_bool, as_string};
use crudaction::validation::validators::{validate_length, validate_required};
use crudaction::{
    CrudModel, FormModel, SeaOrmRecord, Validatable, ValidationError, ValidationErrors,
};
use sea_orm::{ActiveValue, entity::prelude::*};
use serde::Serialize;
use serde_json::Value;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "posts")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub title: String,
    pub body: String,
    pub published: bool,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

/// Form model of a blog post; doubles as its own filter
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct Post {
    pub id: Option<i32>,
    pub title: String,
    pub body: String,
    pub published: bool,
    #[serde(skip)]
    pub scenario: String,
}

impl FormModel for Post {
    const MODEL_NAME: &'static str = "Post";

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
        match self.scenario.as_str() {
            "filter" => vec!["title", "published"],
            _ => vec!["title", "body", "published"],
        }
    }

    fn set_attribute(&mut self, name: &str, value: &Value) -> Result<(), ValidationError> {
        match name {
            "title" => self.title = as_string(name, value)?,
            "body" => self.body = as_string(name, value)?,
            "published" => self.published = as_bool(name, value)?,
            _ => {}
        }
        Ok(())
    }
}

impl Validatable for Post {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        errors.check(validate_required("title", &self.title));
        errors.check(validate_length("title", &self.title, None, Some(100)));
        if self.scenario == "create" {
            errors.check(validate_required("body", &self.body));
        }
        errors.result()
    }
}

impl CrudModel for Post {
    fn primary_key(&self) -> Option<String> {
        self.id.map(|id| id.to_string())
    }
}

impl SeaOrmRecord for Post {
    type Entity = Entity;
    type ActiveModel = ActiveModel;

    fn parse_key(key: &str) -> Option<i32> {
        key.parse().ok()
    }

    fn from_db(model: Model) -> Self {
        Self {
            id: Some(model.id),
            title: model.title,
            body: model.body,
            published: model.published,
            scenario: String::new(),
        }
    }

    fn to_active_model(&self) -> ActiveModel {
        ActiveModel {
            id: self.id.map_or(ActiveValue::NotSet, ActiveValue::Unchanged),
            title: ActiveValue::Set(self.title.clone()),
            body: ActiveValue::Set(self.body.clone()),
            published: ActiveValue::Set(self.published),
        }
    }
}
