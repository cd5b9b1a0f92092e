// We define a single public Error type that wraps a private ErrorKind. The
// internal crate keeps returning `&'static str`, which we wrap with
// `Error::internal_legacy_adhoc`.
//
// The jiff crate has a whole discussion about error types. It merits further
// review!

/// The error type returned by every fallible operation in this crate
#[derive(Debug)]
pub struct Error {
    kind: ErrorKind,
}

/// The broad class of an [`Error`]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Invalid parameters, options or inputs that conflict with each other
    Configuration,
    /// A derived property was read before anything was accumulated
    State,
    /// Array shapes or lengths that don't line up
    Dimension,
}

/// The underlying internal error type
#[non_exhaustive]
#[derive(Clone, Debug)]
enum ErrorKind {
    /// An argument lies outside of its acceptable range
    Parameter(ParameterError),
    /// A ball radius exceeds what the periodic box can resolve
    BallRadius(BallRadiusError),
    /// A statistic received both query arguments and a neighbor list
    PairSourceConflict,
    /// A neighbor list holds indices that are unsorted or out of bounds
    NeighborList(NeighborListError),
    /// The worker pool couldn't be constructed
    ThreadPool(ThreadPoolError),
    /// A derived property was read while nothing is accumulated
    Uncomputed(UncomputedError),
    /// Shapes or lengths of the inputs are inconsistent
    Shape(ShapeError),
    /// wraps the stringly errors from `pbcstat_internal`
    InternalLegacyAdHoc(InternalLegacyAdHocError),
}

// define constructor methods for Error
impl Error {
    /// produce an error indicating that `name` received an invalid value
    pub(crate) fn parameter(name: &'static str, what: impl Into<String>) -> Self {
        Error {
            kind: ErrorKind::Parameter(ParameterError {
                name,
                what: what.into(),
            }),
        }
    }

    /// produce an error indicating that a ball radius can't be resolved by
    /// the minimum-image convention
    pub(crate) fn ball_radius(r_max: f64, limit: f64) -> Self {
        Error {
            kind: ErrorKind::BallRadius(BallRadiusError { r_max, limit }),
        }
    }

    /// produce an error indicating that query arguments and a neighbor list
    /// were both supplied
    pub(crate) fn pair_source_conflict() -> Self {
        Error {
            kind: ErrorKind::PairSourceConflict,
        }
    }

    /// produce an error describing a malformed neighbor list
    pub(crate) fn neighbor_list(what: impl Into<String>) -> Self {
        Error {
            kind: ErrorKind::NeighborList(NeighborListError(what.into())),
        }
    }

    pub(crate) fn thread_pool(what: impl Into<String>) -> Self {
        Error {
            kind: ErrorKind::ThreadPool(ThreadPoolError(what.into())),
        }
    }

    /// produce an error indicating that `property` was read before any call
    /// to accumulate
    pub(crate) fn uncomputed(property: &'static str) -> Self {
        Error {
            kind: ErrorKind::Uncomputed(UncomputedError { property }),
        }
    }

    /// produce an error indicating that shapes or lengths are inconsistent
    pub(crate) fn shape(what: impl Into<String>) -> Self {
        Error {
            kind: ErrorKind::Shape(ShapeError(what.into())),
        }
    }

    /// wraps a legacy internal error string
    pub(crate) fn internal_legacy_adhoc(message: &'static str) -> Self {
        Error {
            kind: ErrorKind::InternalLegacyAdHoc(InternalLegacyAdHocError(message)),
        }
    }

    /// The broad class that this error belongs to
    pub fn category(&self) -> ErrorCategory {
        match self.kind {
            ErrorKind::Parameter(_)
            | ErrorKind::BallRadius(_)
            | ErrorKind::PairSourceConflict
            | ErrorKind::NeighborList(_)
            | ErrorKind::ThreadPool(_)
            | ErrorKind::InternalLegacyAdHoc(_) => ErrorCategory::Configuration,
            ErrorKind::Uncomputed(_) => ErrorCategory::State,
            ErrorKind::Shape(_) => ErrorCategory::Dimension,
        }
    }
}

impl std::error::Error for Error {}

impl core::fmt::Display for Error {
    fn fmt(&self, f: &mut core::fmt::Formatter) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.kind, f)
    }
}

impl core::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut core::fmt::Formatter) -> core::fmt::Result {
        match *self {
            ErrorKind::Parameter(ref err) => core::fmt::Display::fmt(err, f),
            ErrorKind::BallRadius(ref err) => core::fmt::Display::fmt(err, f),
            ErrorKind::PairSourceConflict => write!(
                f,
                "query arguments and a neighbor list can't both be specified"
            ),
            ErrorKind::NeighborList(ref err) => core::fmt::Display::fmt(err, f),
            ErrorKind::ThreadPool(ref err) => core::fmt::Display::fmt(err, f),
            ErrorKind::Uncomputed(ref err) => core::fmt::Display::fmt(err, f),
            ErrorKind::Shape(ref err) => core::fmt::Display::fmt(err, f),
            ErrorKind::InternalLegacyAdHoc(ref err) => core::fmt::Display::fmt(err, f),
        }
    }
}

#[derive(Clone, Debug)]
struct ParameterError {
    name: &'static str,
    what: String,
}

impl core::fmt::Display for ParameterError {
    fn fmt(&self, f: &mut core::fmt::Formatter) -> core::fmt::Result {
        write!(f, "invalid {}: {}", self.name, self.what)
    }
}

#[derive(Clone, Debug)]
struct BallRadiusError {
    r_max: f64,
    limit: f64,
}

impl core::fmt::Display for BallRadiusError {
    fn fmt(&self, f: &mut core::fmt::Formatter) -> core::fmt::Result {
        write!(
            f,
            "r_max of {} exceeds {}, half of the smallest distance between \
             opposite faces of the periodic box",
            self.r_max, self.limit
        )
    }
}

#[derive(Clone, Debug)]
struct NeighborListError(String);

impl core::fmt::Display for NeighborListError {
    fn fmt(&self, f: &mut core::fmt::Formatter) -> core::fmt::Result {
        write!(f, "malformed neighbor list: {}", self.0)
    }
}

#[derive(Clone, Debug)]
struct ThreadPoolError(String);

impl core::fmt::Display for ThreadPoolError {
    fn fmt(&self, f: &mut core::fmt::Formatter) -> core::fmt::Result {
        write!(f, "unable to build the worker pool: {}", self.0)
    }
}

#[derive(Clone, Debug)]
struct UncomputedError {
    property: &'static str,
}

impl core::fmt::Display for UncomputedError {
    fn fmt(&self, f: &mut core::fmt::Formatter) -> core::fmt::Result {
        write!(
            f,
            "{} can't be read: nothing has been accumulated since the last reset",
            self.property
        )
    }
}

#[derive(Clone, Debug)]
struct ShapeError(String);

impl core::fmt::Display for ShapeError {
    fn fmt(&self, f: &mut core::fmt::Formatter) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.0, f)
    }
}

/// A temporary type that wraps the string errors from `pbcstat_internal`
#[derive(Clone)]
struct InternalLegacyAdHocError(&'static str);

impl core::fmt::Display for InternalLegacyAdHocError {
    fn fmt(&self, f: &mut core::fmt::Formatter) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.0, f)
    }
}

impl core::fmt::Debug for InternalLegacyAdHocError {
    fn fmt(&self, f: &mut core::fmt::Formatter) -> core::fmt::Result {
        core::fmt::Debug::fmt(&self.0, f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn categories() {
        assert_eq!(
            Error::parameter("dr", "must be positive").category(),
            ErrorCategory::Configuration
        );
        assert_eq!(
            Error::ball_radius(5.0, 4.0).category(),
            ErrorCategory::Configuration
        );
        assert_eq!(Error::uncomputed("rdf").category(), ErrorCategory::State);
        assert_eq!(
            Error::shape("values has 3 entries").category(),
            ErrorCategory::Dimension
        );
    }

    #[test]
    fn messages() {
        let err = Error::parameter("dr", "must be positive");
        assert_eq!(err.to_string(), "invalid dr: must be positive");
        let err = Error::uncomputed("rdf");
        assert!(err.to_string().starts_with("rdf can't be read"));
    }
}
