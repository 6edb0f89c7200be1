mod filter_chips;
mod filter_panel;
mod filter_selector;
mod input;
mod key_result;
mod popover;
mod search_list;

pub use filter_chips::{active_chips, ChipEvent, ChipSegment, FilterChips};
pub use filter_panel::{FilterPanel, PanelEvent, PanelFocus};
pub use filter_selector::{FilterSelector, SelectorDelays, SelectorEvent, SelectorMode, FILTER_ICON};
pub use input::{InputResult, TextInput};
pub use key_result::KeyResult;
pub use search_list::{SearchEntry, SearchList, SearchListEvent};
