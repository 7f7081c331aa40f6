mod common;

mod build_tests;
mod plan_tests;
mod spec_tests;
