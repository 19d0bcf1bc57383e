pub mod field;
pub mod post;
