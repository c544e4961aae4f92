pub mod classify;
pub mod merge;
pub mod run;
