mod habit;

pub use habit::*;
