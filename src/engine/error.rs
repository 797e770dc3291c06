//! Engine error type.

/// Failures surfaced by the graph engine.
///
/// Dangling links and degenerate geometry are deliberately absent: the engine
/// resolves those on its own.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum EngineError {
	/// The viewport was given a non-positive or non-finite size.
	#[error("invalid viewport dimensions {width}x{height}: both must be finite and > 0")]
	InvalidDimensions {
		/// Requested width.
		width: f64,
		/// Requested height.
		height: f64,
	},
	/// Two nodes in the same graph share an id.
	#[error("graph contains duplicate node id: {id}")]
	DuplicateNodeId {
		/// The repeated id.
		id: String,
	},
	/// A layout run observed its cancellation token.
	#[error("layout cancelled after {completed} iteration(s)")]
	Cancelled {
		/// Steps finished before the token fired.
		completed: usize,
	},
}

/// Engine result alias.
pub type Result<T> = std::result::Result<T, EngineError>;

/// Rejects sizes the viewport and solver cannot divide by.
pub(crate) fn check_dimensions(width: f64, height: f64) -> Result<()> {
	if width.is_finite() && height.is_finite() && width > 0.0 && height > 0.0 {
		Ok(())
	} else {
		Err(EngineError::InvalidDimensions { width, height })
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn rejects_zero_negative_and_nan_sizes() {
		assert!(check_dimensions(800.0, 600.0).is_ok());
		assert!(check_dimensions(0.0, 600.0).is_err());
		assert!(check_dimensions(800.0, -1.0).is_err());
		assert!(check_dimensions(f64::NAN, 600.0).is_err());
		assert!(check_dimensions(f64::INFINITY, 600.0).is_err());
	}

	#[test]
	fn error_messages_name_the_offending_input() {
		let err = EngineError::DuplicateNodeId { id: "a".into() };
		assert_eq!(err.to_string(), "graph contains duplicate node id: a");
	}
}
