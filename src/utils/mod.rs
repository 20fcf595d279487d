pub mod io;
pub mod normalizer;
pub mod sort;
