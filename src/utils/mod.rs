pub mod cursor;
pub mod naming;
