pub mod compare;
pub mod domain;
pub mod error;
pub mod extract;
pub mod metrics;
pub mod normalize;
pub mod report;
pub mod verdict;
