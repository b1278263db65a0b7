pub mod pools;
pub mod series;
pub mod table;

pub mod errors;
