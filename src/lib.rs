// lib.rs
pub mod classify;
pub mod commands;
pub mod counts;
pub mod coverage;
pub mod dedup;
pub mod error;
pub mod feature;
pub mod gff;
pub mod input;
pub mod limits;
pub mod merge;
pub mod polya;
pub mod reference;
pub mod table;
pub mod vicinity;
