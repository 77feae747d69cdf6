//! # Data Models
//!
//! Task records and the owner entities that sponsor them.
//!
//! - [`task_record`] - the persisted tracking entity and its creation input
//! - [`task_type`] - enumerated task kinds and their typed parameters
//! - [`owner`] - tagged owner references and integration capability flags
//! - [`repository`], [`product`], [`content_host`] - owner entities

pub mod content_host;
pub mod owner;
pub mod product;
pub mod repository;
pub mod task_record;
pub mod task_type;

pub use content_host::ContentHost;
pub use owner::{Integrations, OwnerKind, OwnerRef};
pub use product::Product;
pub use repository::Repository;
pub use task_record::{NewTaskRecord, NewTaskRecordBuilder, TaskId, TaskRecord, ValidatedTaskRecord};
pub use task_type::{ParameterKind, TaskParameters, TaskType};
