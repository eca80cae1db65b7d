pub mod controller;
pub mod reference_data;
pub mod validation;

pub use controller::{
    active_filter_count, has_active_filters, FilterController, ParamChangeCallback,
    SearchCallback, SearchError,
};
pub use reference_data::{ReferenceData, ReferenceSlice, ReferenceSource, RetryPolicy, SliceState};
pub use validation::{parse_date_input, parse_time_input, validate, ValidationError};
