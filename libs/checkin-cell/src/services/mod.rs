pub mod dashboard;
pub mod date_resolver;
pub mod feed;
pub mod pipeline;
pub mod status_classifier;
pub mod time_buckets;
pub mod version_guard;
pub mod version_store;

pub use dashboard::*;
pub use date_resolver::*;
pub use feed::*;
pub use pipeline::*;
pub use status_classifier::*;
pub use time_buckets::*;
pub use version_guard::*;
pub use version_store::*;
