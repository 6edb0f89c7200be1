//! Filter panel for tabular data in the terminal.
//!
//! A [`filter::FilterRegistry`] maps filter type tags to strategies that know
//! how to display and edit a value. The [`table`] adapter turns a table's
//! filterable columns into [`filter::FilterItem`]s, and the
//! [`ui::components::FilterPanel`] renders them as a selector plus a list of
//! chips for the filters currently set.

pub mod app;
pub mod config;
pub mod event;
pub mod filter;
pub mod logging;
pub mod table;
pub mod ui;
