//! Errors raised by sketch construction, updates and queries
//!
//! Every fallible operation validates its inputs before touching any counter,
//! so an `Err` always leaves the sketch exactly as it was.

/// Broad classification of a [`SketchError`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// A construction parameter is outside its valid range
    InvalidParameter,
    /// A value or range lies outside the domain of the sketch
    Domain,
    /// The requested sketch would exceed the configured memory ceiling
    Resource,
}

/// Error returned by fallible sketch operations
#[derive(Debug, Clone, PartialEq)]
pub enum SketchError {
    /// `epsilon`, `delta` or a dimension is invalid
    InvalidParameter {
        name: &'static str,
        value: f64,
        expected: &'static str,
    },
    /// `max_value` is zero or larger than the supported domain
    InvalidMaxValue { max_value: u64, limit: u64 },
    /// A streamed value lies outside `[1, max_value]`
    ValueOutOfDomain { value: u64, max_value: u64 },
    /// A query range is inverted or leaves `[1, span]`
    InvalidRange { lower: u64, upper: u64, span: u64 },
    /// A dyadic coordinate does not name an interval representable in `u64`
    InvalidCoordinate { x: u64, y: u32 },
    /// Counter storage would exceed `limit` bytes
    MemoryLimitExceeded { requested: usize, limit: usize },
}

impl SketchError {
    /// Classify this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            SketchError::InvalidParameter { .. } | SketchError::InvalidMaxValue { .. } => {
                ErrorKind::InvalidParameter
            }
            SketchError::ValueOutOfDomain { .. }
            | SketchError::InvalidRange { .. }
            | SketchError::InvalidCoordinate { .. } => ErrorKind::Domain,
            SketchError::MemoryLimitExceeded { .. } => ErrorKind::Resource,
        }
    }

    pub(crate) fn parameter(name: &'static str, value: f64, expected: &'static str) -> Self {
        SketchError::InvalidParameter {
            name,
            value,
            expected,
        }
    }
}

impl core::fmt::Display for SketchError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            SketchError::InvalidParameter {
                name,
                value,
                expected,
            } => write!(f, "invalid {}: {} (expected {})", name, value, expected),
            SketchError::InvalidMaxValue { max_value, limit } => {
                write!(f, "invalid max_value: {} (expected 1..={})", max_value, limit)
            }
            SketchError::ValueOutOfDomain { value, max_value } => {
                write!(f, "value {} outside domain [1, {}]", value, max_value)
            }
            SketchError::InvalidRange { lower, upper, span } => {
                write!(f, "invalid range [{}, {}] for domain [1, {}]", lower, upper, span)
            }
            SketchError::InvalidCoordinate { x, y } => {
                write!(f, "invalid dyadic coordinate ({}, {})", x, y)
            }
            SketchError::MemoryLimitExceeded { requested, limit } => {
                write!(
                    f,
                    "memory limit exceeded: {} bytes requested, limit is {} bytes",
                    requested, limit
                )
            }
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for SketchError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kinds() {
        assert_eq!(
            SketchError::parameter("epsilon", 0.0, "(0, 1]").kind(),
            ErrorKind::InvalidParameter
        );
        assert_eq!(
            SketchError::InvalidMaxValue {
                max_value: 0,
                limit: 1
            }
            .kind(),
            ErrorKind::InvalidParameter
        );
        assert_eq!(
            SketchError::ValueOutOfDomain {
                value: 17,
                max_value: 16
            }
            .kind(),
            ErrorKind::Domain
        );
        assert_eq!(
            SketchError::InvalidRange {
                lower: 5,
                upper: 4,
                span: 16
            }
            .kind(),
            ErrorKind::Domain
        );
        assert_eq!(
            SketchError::MemoryLimitExceeded {
                requested: 10,
                limit: 1
            }
            .kind(),
            ErrorKind::Resource
        );
    }

    #[test]
    fn test_display() {
        let err = SketchError::InvalidRange {
            lower: 9,
            upper: 3,
            span: 16,
        };
        assert_eq!(err.to_string(), "invalid range [9, 3] for domain [1, 16]");

        let err = SketchError::parameter("delta", 1.5, "(0, 1]");
        assert_eq!(err.to_string(), "invalid delta: 1.5 (expected (0, 1])");
    }
}
