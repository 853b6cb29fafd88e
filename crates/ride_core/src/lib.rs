pub mod catalog;
pub mod geo;
pub mod matching;
pub mod routing;

#[cfg(feature = "test-helpers")]
pub mod test_helpers;
