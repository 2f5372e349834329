// Models and the store they are persisted through

pub mod store;
pub mod traits;

pub use store::{CrudStore, SaveError, SeaOrmRecord, SeaOrmStore};
pub use traits::{CrudModel, FormModel};
