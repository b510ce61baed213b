//! Host-side test suites for the LCD bus decoder

pub mod property_tests;
pub mod mailbox_tests;
