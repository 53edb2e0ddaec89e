//! WAL test target

mod entry_tests;
mod reader_tests;
mod writer_tests;
