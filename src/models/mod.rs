pub mod entry;
pub mod navbar;
pub mod page;
pub mod settings;
pub mod site_meta;
