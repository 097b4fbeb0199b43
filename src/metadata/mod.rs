//! Split-metadata storage: index, category shards, defaults, and the
//! repository facade that merges them into effective records.

mod checker;
mod defaults;
mod index;
mod record;
mod repository;
mod shards;

pub use checker::{ConsistencyChecker, CoverageStats};
pub use defaults::DefaultsStore;
pub use index::Index;
pub use record::{
    Constraints, DefaultsRecord, MetadataRecord, References, SpecifierInfo, Technical,
    Terminology, TranslationGuidance, UiContext, UsageContext,
};
pub use repository::{
    MetadataRepository, StorageFormat, DEFAULT_METADATA_SUBDIR, LEGACY_FILE,
};
pub use shards::{ShardContents, ShardStore};
