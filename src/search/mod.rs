pub mod classify;
pub mod coordinator;
pub mod debounce;

pub use classify::{classify, Classification, PhoneQuery, QueryClassifier, QueryKind};
pub use coordinator::{QueryGate, SearchCoordinator, SearchDomain, SearchFuture};
pub use debounce::DebounceTimer;
