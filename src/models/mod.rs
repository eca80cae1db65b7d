pub mod criteria;
pub mod patient_search;
pub mod reference;

pub use criteria::*;
pub use patient_search::*;
pub use reference::*;
