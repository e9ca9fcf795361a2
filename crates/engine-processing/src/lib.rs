pub mod context;
pub mod error;
pub mod importer;
pub mod importers;
pub mod numbers;
pub mod outcome;
pub mod resolver;
pub mod writers;

#[cfg(test)]
pub(crate) mod test_support;
