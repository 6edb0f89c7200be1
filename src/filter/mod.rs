//! Filter model: the strategy registry, the item descriptor, and the one
//! strategy shipped with the crate.

mod item;
mod option;
mod registry;

pub use item::{find_by_label, FilterItem, Removal};
pub use option::{ColumnOption, OptionFilter, OptionFilterConfig, ValueChange};
pub use registry::{EditorEvent, EditorState, FilterRegistry, FilterRegistryBuilder, FilterStrategy};

/// Registry with every strategy this crate ships
pub fn default_registry() -> FilterRegistry {
  FilterRegistry::builder().register(OptionFilter).build()
}
