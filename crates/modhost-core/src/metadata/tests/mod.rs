// Metadata test module
#[cfg(test)]
mod filename_tests;
