//! Access-control policy: a stateless decision function over the resolved
//! actor, the kind of access, and the target resource.
//!
//! Route handlers perform structural validation first, then call
//! [`authorize`] before any mutation. Missing or invalid tokens never reach
//! this module; the request guards have already rejected them with 401, so
//! every denial here is a 403.

use crate::auth::AuthError;
use crate::models::Role;

/// The authenticated identity making the current request.
#[derive(Debug, Clone, Copy)]
pub struct Actor {
    pub user_id: i32,
    pub role: Role,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    Read,
    Create,
    Update,
    Delete,
}

/// The concrete target of an operation, carrying the ownership facts the
/// policy rules need.
#[derive(Debug, Clone, Copy)]
pub enum Resource {
    /// A user record; `user_id` is the record's owner.
    User { user_id: i32 },
    /// The full user listing.
    UserList,
    /// An existing subject; `professor_id` is its owner.
    Subject { professor_id: i32 },
    /// Attributing a new or updated subject to a professor.
    SubjectAttribution { professor_id: i32 },
    /// Enrollment management for a subject owned by `subject_owner_id`.
    Enrollment { subject_owner_id: i32 },
    /// An existing grade; `professor_id` is the issuing professor.
    Grade { professor_id: i32 },
    /// Issuing a new grade: attributed to `professor_id`, on a subject
    /// owned by `subject_owner_id`.
    GradeIssuance {
        professor_id: i32,
        subject_owner_id: i32,
    },
    /// The grade listing of one student.
    StudentGrades { student_id: i32 },
}

/// Decide whether `actor` may perform `access` on `resource`.
pub fn authorize(actor: &Actor, access: Access, resource: &Resource) -> Result<(), AuthError> {
    // Admins may perform any action on any resource.
    if actor.role == Role::Admin {
        return Ok(());
    }

    let allowed = match *resource {
        // Self-access: a user may read and update their own record. The
        // update payload carries no role or cedula fields, so identity keys
        // cannot be rewritten this way.
        Resource::User { user_id } => {
            actor.user_id == user_id && matches!(access, Access::Read | Access::Update)
        }

        Resource::UserList => false,

        Resource::Subject { professor_id } => {
            actor.role == Role::Professor
                && actor.user_id == professor_id
                && matches!(access, Access::Update | Access::Delete)
        }

        // A professor cannot create a subject attributed to a colleague.
        Resource::SubjectAttribution { professor_id } => {
            actor.role == Role::Professor && actor.user_id == professor_id
        }

        Resource::Enrollment { subject_owner_id } => {
            actor.role == Role::Professor && actor.user_id == subject_owner_id
        }

        Resource::Grade { professor_id } => {
            actor.role == Role::Professor
                && actor.user_id == professor_id
                && matches!(access, Access::Update | Access::Delete)
        }

        // A professor issues grades only in their own name and only for
        // subjects they own.
        Resource::GradeIssuance {
            professor_id,
            subject_owner_id,
        } => {
            actor.role == Role::Professor
                && actor.user_id == professor_id
                && professor_id == subject_owner_id
        }

        // Students see their own grades; professors may consult any
        // student's record.
        Resource::StudentGrades { student_id } => {
            actor.role == Role::Professor || actor.user_id == student_id
        }
    };

    if allowed { Ok(()) } else { Err(AuthError::Forbidden) }
}
