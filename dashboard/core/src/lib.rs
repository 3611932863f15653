#![deny(warnings, rust_2018_idioms)]
#![forbid(unsafe_code)]

mod answer;
mod violations;

pub use self::{
    answer::ErrorAnswer,
    violations::{sort_by_violations, total_violations},
};
