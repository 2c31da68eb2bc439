//! Core library: filing datasets, paragraph reading, the four-level
//! analyser, keyword ranking, term matching and report output.

pub mod analyser;
pub mod config;
pub mod dataset;
pub mod keywords;
pub mod models;
pub mod pipeline;
pub mod reader;
pub mod report;
pub mod terms;
