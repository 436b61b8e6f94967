//! Core record types shared by every stage of the hanjadata pipeline.

pub mod records;
