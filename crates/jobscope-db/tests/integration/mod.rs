pub mod common;
mod posting_tests;
