//! Command implementations for runmerge-cmd

pub mod dump_lexicon;
pub mod inspect_run;
pub mod merge;
