// Stateful objects module
// One actor per object id, each with its own embedded store

mod error;
mod id;
mod namespace;
mod object;
mod storage;

pub use error::ObjectError;
pub use id::ObjectId;
pub use namespace::{ObjectInfo, ObjectNamespace};
pub use storage::StorageLocation;
