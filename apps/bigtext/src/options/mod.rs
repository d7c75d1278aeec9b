// Option model: the spec compiler, the live table and the store that is its
// single write path. `catalog` declares the big-text option tree.

pub mod catalog;
pub mod descriptor;
pub mod sanitize;
pub mod spec;
pub mod store;
pub mod table;
pub mod value;

pub use descriptor::{CssValue, OptionDescriptor, Render};
pub use spec::{compile, CompiledSpec, Group, OptionDef, SpecError, SpecNode};
pub use store::{ExportFilter, FitTrigger, OptionError, OptionStore};
pub use table::{OptionTable, OptionView};
pub use value::OptionValue;
