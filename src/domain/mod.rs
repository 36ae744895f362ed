pub mod digest;
pub mod error;
pub mod hash;
pub mod options;
pub mod tree;
