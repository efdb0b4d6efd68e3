mod annotation_store;
mod bundle;

pub use annotation_store::{
    AnnotationStore, DEFAULT_FREE_REGION, FREE_REGION_HALF_WIDTH, PENDING_LABEL,
};
pub use bundle::{default_bundle_path, open_bundle, AnnotationBundle, BUNDLE_EXTENSION};
