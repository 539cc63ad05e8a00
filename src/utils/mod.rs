pub mod atomic_file;
pub mod logging;
pub mod text;

pub use atomic_file::write_atomic;
pub use text::{slugify, truncate_chars, truncate_text};
