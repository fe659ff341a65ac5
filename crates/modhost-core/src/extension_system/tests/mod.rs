#[cfg(test)]
mod host_tests;
#[cfg(test)]
mod jail_tests;
#[cfg(test)]
pub(crate) mod support;
