//! Errors raised when loading navigation data from disk
//!

use thiserror::Error;

/// Failures from reading settings or terrain. Failing to find a path is not an
/// error, it is reported through [crate::prelude::PathOutcome]
#[derive(Debug, Error)]
pub enum NavigationError {
	/// A file could not be opened or read
	#[error("failed to read navigation data: {0}")]
	Io(#[from] std::io::Error),
	/// A `.ron` file did not describe the expected structure
	#[cfg(feature = "ron")]
	#[error("failed to parse ron: {0}")]
	Ron(#[from] ron::error::SpannedError),
	/// A `.csv` file could not be parsed into material ids
	#[cfg(feature = "csv")]
	#[error("failed to parse csv: {0}")]
	Csv(#[from] csv::Error),
	/// An image could not be decoded into material ids
	#[cfg(feature = "bitmap")]
	#[error("failed to decode bitmap: {0}")]
	Bitmap(String),
	/// Settings were readable but hold values navigation cannot work with
	#[error("invalid navigation settings: {0}")]
	InvalidSettings(String),
	/// The data was readable but does not describe a usable terrain
	#[error("invalid terrain: {0}")]
	InvalidTerrain(String),
}

/// Result alias for fallible navigation I/O
pub type NavigationResult<T> = Result<T, NavigationError>;
