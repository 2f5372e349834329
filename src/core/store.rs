use async_trait::async_trait;
use sea_orm::{
    ActiveModelBehavior, ActiveModelTrait, DatabaseConnection, DbErr, EntityTrait,
    IntoActiveModel, PrimaryKeyTrait, SqlErr,
};
use std::fmt;

use crate::core::CrudModel;
use crate::validation::{ValidationError, ValidationErrors};

/// Why a save did not go through
#[derive(Debug)]
pub enum SaveError {
    /// The store rejected the values (e.g. a unique constraint)
    Validation(ValidationErrors),
    /// Any other database failure
    Database(DbErr),
}

impl fmt::Display for SaveError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Validation(errors) => write!(f, "{errors}"),
            Self::Database(err) => write!(f, "{err}"),
        }
    }
}

impl std::error::Error for SaveError {}

impl From<DbErr> for SaveError {
    fn from(err: DbErr) -> Self {
        if let Some(SqlErr::UniqueConstraintViolation(_)) = err.sql_err() {
            return Self::Validation(ValidationError::form("A record with these values already exists").into());
        }
        Self::Database(err)
    }
}

impl From<ValidationErrors> for SaveError {
    fn from(errors: ValidationErrors) -> Self {
        Self::Validation(errors)
    }
}

/// Finder and persister for one model type
#[async_trait]
pub trait CrudStore<M: CrudModel>: Send + Sync {
    /// Look a record up by the key taken from the request
    ///
    /// Keys that cannot name a record (wrong type, empty) are `Ok(None)`.
    async fn find_by_key(&self, key: &str) -> Result<Option<M>, DbErr>;

    /// Insert a new record or update an existing one.
    ///
    /// On success `model` reflects the stored row (new records receive their
    /// key) and keeps its scenario.
    async fn save(&self, model: &mut M) -> Result<(), SaveError>;

    async fn delete(&self, model: &M) -> Result<(), DbErr>;
}

/// Bridges a [`CrudModel`] to a Sea-ORM entity so [`SeaOrmStore`] can persist it.
pub trait SeaOrmRecord: CrudModel {
    type Entity: EntityTrait;
    type ActiveModel: ActiveModelTrait<Entity = Self::Entity> + ActiveModelBehavior + Send + Sync;

    /// Parse a request key into the entity's primary key value
    fn parse_key(
        key: &str,
    ) -> Option<<<Self::Entity as EntityTrait>::PrimaryKey as PrimaryKeyTrait>::ValueType>;

    fn from_db(model: <Self::Entity as EntityTrait>::Model) -> Self;

    /// Active model for insert (key `NotSet` or generated) or update (key
    /// `Unchanged`, changed columns `Set`)
    fn to_active_model(&self) -> Self::ActiveModel;
}

/// [`CrudStore`] backed by a Sea-ORM connection
#[derive(Debug, Clone)]
pub struct SeaOrmStore {
    db: DatabaseConnection,
}

impl SeaOrmStore {
    #[must_use]
    pub const fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    #[must_use]
    pub const fn connection(&self) -> &DatabaseConnection {
        &self.db
    }
}

#[async_trait]
impl<M> CrudStore<M> for SeaOrmStore
where
    M: SeaOrmRecord,
    <M::Entity as EntityTrait>::Model: IntoActiveModel<M::ActiveModel> + Sync,
{
    async fn find_by_key(&self, key: &str) -> Result<Option<M>, DbErr> {
        let Some(id) = M::parse_key(key) else {
            return Ok(None);
        };
        let found = M::Entity::find_by_id(id).one(&self.db).await?;
        Ok(found.map(M::from_db))
    }

    async fn save(&self, model: &mut M) -> Result<(), SaveError> {
        let active_model = model.to_active_model();
        let stored = if model.is_new_record() {
            active_model.insert(&self.db).await?
        } else {
            active_model.update(&self.db).await?
        };

        let scenario = model.scenario().to_owned();
        *model = M::from_db(stored);
        model.set_scenario(&scenario);
        Ok(())
    }

    async fn delete(&self, model: &M) -> Result<(), DbErr> {
        let result = model.to_active_model().delete(&self.db).await?;
        match result.rows_affected {
            0 => Err(DbErr::RecordNotFound(format!("{} not found", M::MODEL_NAME))),
            _ => Ok(()),
        }
    }
}
