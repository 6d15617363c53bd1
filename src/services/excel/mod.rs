pub mod builder;
pub mod layout;
pub mod styles;

pub use builder::WorkbookBuilder;
pub use layout::{SheetKind, SheetLayout};
