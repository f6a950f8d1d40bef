pub mod firestore;
pub mod memory;
pub mod storage;
pub mod traits;

pub use firestore::{Firestore, FirestoreConfig};
pub use memory::{MemoryObjects, MemoryStore};
pub use storage::FirebaseStorage;
pub use traits::{DocumentStore, ObjectStore, StoreError};
