use super::{Column, OptionTransform, TableEngine};
use crate::filter::{
  ColumnOption, FilterItem, FilterStrategy, OptionFilter, OptionFilterConfig, Removal,
};
use std::cell::RefCell;
use std::rc::Rc;

/// Cap on options derived from observed column values
pub const MAX_DERIVED_OPTIONS: usize = 5000;

/// Turn observed raw values into options: sorted ascending by raw value,
/// truncated to [`MAX_DERIVED_OPTIONS`], then mapped through `transform`.
pub fn derive_options<'a>(
  values: impl IntoIterator<Item = &'a String>,
  transform: Option<&OptionTransform>,
) -> Vec<ColumnOption> {
  let mut raw: Vec<&String> = values.into_iter().collect();
  raw.sort_unstable();
  raw.dedup();
  raw.truncate(MAX_DERIVED_OPTIONS);

  raw
    .into_iter()
    .map(|v| match transform {
      Some(f) => f(v.as_str()),
      None => ColumnOption::new(v.clone(), v.clone()),
    })
    .collect()
}

/// Build one filter item per filterable column that carries filter metadata.
///
/// Items are cheap to rebuild and hold no copy of state beyond this pass;
/// their callbacks write straight back into `table`.
pub fn filter_items<E: TableEngine + 'static>(table: &Rc<RefCell<E>>) -> Vec<FilterItem> {
  let engine = table.borrow();
  engine
    .columns()
    .iter()
    .filter(|column| column.can_filter)
    .filter_map(|column| column.filter.as_ref().map(|meta| (column, meta)))
    .map(|(column, meta)| {
      let value = engine.filter_value(&column.id);
      let is_set = value.is_some();

      let item = if meta.filter_type == OptionFilter::TAG {
        let config = OptionFilterConfig {
          options: options_for(&*engine, column),
          value,
          on_value_change: {
            let table = table.clone();
            let id = column.id.clone();
            Rc::new(move |v: Option<String>| table.borrow_mut().set_filter_value(&id, v))
          },
        };
        FilterItem::new::<OptionFilter>(meta.label.clone(), config)
      } else {
        // No payload builder for this tag; it renders only if the caller
        // registered a strategy that accepts a unit payload
        FilterItem::with_tag(meta.label.clone(), meta.filter_type.clone(), ())
      };

      let remove = {
        let table = table.clone();
        let id = column.id.clone();
        Removal::action(move || table.borrow_mut().set_filter_value(&id, None))
      };

      item
        .icon(meta.icon.clone())
        .enabled(true)
        .set(is_set)
        .removal(remove)
    })
    .collect()
}

fn options_for<E: TableEngine + ?Sized>(engine: &E, column: &Column) -> Vec<ColumnOption> {
  let Some(meta) = &column.filter else {
    return Vec::new();
  };
  if let Some(options) = &meta.options {
    return options.clone();
  }
  let facets = engine.faceted_unique_values(&column.id);
  derive_options(facets.keys(), meta.transform.as_ref())
}
