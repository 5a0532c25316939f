use std::fmt;

use crate::model::StudentId;

/// Proof of a verified student identity.
///
/// The engine never authorizes operations from a bare numeric id; the
/// authentication collaborator constructs this after checking credentials
/// and passes it into every engine call. Holding one is the authorization.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct AuthenticatedStudent {
    student_id: StudentId,
}

impl AuthenticatedStudent {
    /// Attests that `student_id` has been authenticated.
    ///
    /// Only the auth collaborator should call this, after verifying the
    /// student's credentials.
    #[must_use]
    pub fn attest(student_id: StudentId) -> Self {
        Self { student_id }
    }

    #[must_use]
    pub fn student_id(&self) -> StudentId {
        self.student_id
    }
}

impl fmt::Debug for AuthenticatedStudent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "AuthenticatedStudent({})", self.student_id)
    }
}
