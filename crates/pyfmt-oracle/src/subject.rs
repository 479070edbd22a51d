//! The implementation under test, seen through the bridge.

use pyfmt_bridge::{Bridge, MarshalError, Outcome};

use crate::case::FormatCase;

/// Something that renders a case the way the subject does.
pub trait SubjectFormatter {
    /// Render `case`; rejection is `Ok(Outcome::Failure(..))`.
    fn invoke(&self, case: &FormatCase) -> Result<Outcome, MarshalError>;

    /// Ask only whether the subject rejects `case`.
    fn probe_error(&self, case: &FormatCase) -> Result<bool, MarshalError>;
}

impl SubjectFormatter for Bridge {
    fn invoke(&self, case: &FormatCase) -> Result<Outcome, MarshalError> {
        Bridge::invoke(self, case.entry_point(), &case.template(), &case.value)
    }

    fn probe_error(&self, case: &FormatCase) -> Result<bool, MarshalError> {
        Bridge::probe_error(self, case.entry_point(), &case.template(), &case.value)
    }
}
