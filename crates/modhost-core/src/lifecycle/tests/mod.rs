#[cfg(test)]
mod classify_tests;
#[cfg(test)]
mod manager_tests;
