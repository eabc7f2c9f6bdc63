use serde::{Deserialize, Serialize};

use crate::model::Role;

/// These are the request "commands" a client can send to the registry server.
///
/// The first request on a connection must be [`Request::Login`]. Student and faculty
/// requests act on behalf of the logged in user, so they carry no user identifier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Request {
    /// authenticate this connection
    Login {
        /// the role to log in as
        role: Role,
        /// the user identifier
        id: String,
        /// the user's password
        password: String,
    },
    /// end the session, the server closes the connection afterwards
    Logout,

    /// (admin) provision a student account
    AddStudent {
        /// new student identifier
        id: String,
        /// display name
        name: String,
        /// initial password
        password: String,
    },
    /// (admin) provision a faculty account
    AddFaculty {
        /// new faculty identifier
        id: String,
        /// display name
        name: String,
        /// initial password
        password: String,
    },
    /// (admin) allow a student to enroll again
    ActivateStudent {
        /// student identifier
        id: String,
    },
    /// (admin) stop a student from enrolling
    BlockStudent {
        /// student identifier
        id: String,
    },
    /// (admin) rename a student
    UpdateStudent {
        /// student identifier
        id: String,
        /// new display name
        name: String,
    },
    /// (admin) rename a faculty member
    UpdateFaculty {
        /// faculty identifier
        id: String,
        /// new display name
        name: String,
    },
    /// (admin) list every student
    ListStudents,
    /// (admin) list every faculty member
    ListFaculty,

    /// (faculty) offer a new course
    AddCourse {
        /// new course identifier
        id: String,
        /// course name
        name: String,
        /// number of seats
        seats: u32,
    },
    /// (faculty) rename a course or change its seat count
    UpdateCourse {
        /// course identifier
        id: String,
        /// new course name
        name: String,
        /// new number of seats
        seats: u32,
    },
    /// (faculty) remove a course from the catalog
    RemoveCourse {
        /// course identifier
        id: String,
    },
    /// (faculty) list the courses offered by the logged in faculty member
    ListFacultyCourses,
    /// (faculty) list the students enrolled in a course
    ListCourseEnrollments {
        /// course identifier
        course: String,
    },

    /// (student, faculty) list every course
    ListCourses,
    /// (student) enroll in a course
    Enroll {
        /// course identifier
        course: String,
    },
    /// (student) drop a course
    Unenroll {
        /// course identifier
        course: String,
    },
    /// (student) list the courses the logged in student is enrolled in
    ListStudentEnrollments,

    /// (any role) change the logged in user's password
    ChangePassword {
        /// the new password
        password: String,
    },
}

impl Request {
    /// a short name for the request, safe to log since it carries no field values
    pub fn name(&self) -> &'static str {
        match self {
            Request::Login { .. } => "login",
            Request::Logout => "logout",
            Request::AddStudent { .. } => "add-student",
            Request::AddFaculty { .. } => "add-faculty",
            Request::ActivateStudent { .. } => "activate-student",
            Request::BlockStudent { .. } => "block-student",
            Request::UpdateStudent { .. } => "update-student",
            Request::UpdateFaculty { .. } => "update-faculty",
            Request::ListStudents => "list-students",
            Request::ListFaculty => "list-faculty",
            Request::AddCourse { .. } => "add-course",
            Request::UpdateCourse { .. } => "update-course",
            Request::RemoveCourse { .. } => "remove-course",
            Request::ListFacultyCourses => "list-faculty-courses",
            Request::ListCourseEnrollments { .. } => "list-course-enrollments",
            Request::ListCourses => "list-courses",
            Request::Enroll { .. } => "enroll",
            Request::Unenroll { .. } => "unenroll",
            Request::ListStudentEnrollments => "list-student-enrollments",
            Request::ChangePassword { .. } => "change-password",
        }
    }

    /// whether a user logged in as `role` may send this request
    pub fn allowed_for(&self, role: Role) -> bool {
        match self {
            Request::Login { .. } | Request::Logout | Request::ChangePassword { .. } => true,
            Request::AddStudent { .. }
            | Request::AddFaculty { .. }
            | Request::ActivateStudent { .. }
            | Request::BlockStudent { .. }
            | Request::UpdateStudent { .. }
            | Request::UpdateFaculty { .. }
            | Request::ListStudents
            | Request::ListFaculty => role == Role::Admin,
            Request::AddCourse { .. }
            | Request::UpdateCourse { .. }
            | Request::RemoveCourse { .. }
            | Request::ListFacultyCourses
            | Request::ListCourseEnrollments { .. } => role == Role::Faculty,
            Request::ListCourses => role == Role::Faculty || role == Role::Student,
            Request::Enroll { .. } | Request::Unenroll { .. } | Request::ListStudentEnrollments => {
                role == Role::Student
            }
        }
    }
}

/// The response Types that can be returned for any registry [`Request`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Response {
    /// this variant is returned when a request was successful, with a message for the user
    Ok(String),
    /// this variant is returned if an Error occurs while processing the request
    Err {
        /// machine readable error kind
        code: ErrorCode,
        /// description of the error
        message: String,
    },
}

/// Machine readable error kinds carried by [`Response::Err`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorCode {
    /// the entity does not exist
    NotFound,
    /// the course named in an enrollment request does not exist
    CourseNotFound,
    /// the identifier is already taken
    DuplicateKey,
    /// the student is already enrolled in the course
    AlreadyEnrolled,
    /// the student is not enrolled in the course
    NotEnrolled,
    /// the course has no free seat
    CourseFull,
    /// the student has no free enrollment slot
    SlotsFull,
    /// the student is blocked
    Blocked,
    /// the request carried invalid values
    InvalidInput,
    /// a value does not fit its fixed-width field
    FieldTooLong,
    /// the logged in role may not perform the request
    PermissionDenied,
    /// login is required first, or the credentials were wrong
    NotAuthenticated,
    /// stored data could not be decoded
    CorruptRecord,
    /// a data file could not be opened or locked
    StorageUnavailable,
    /// any other server side failure
    Internal,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn requests_are_tagged_json() {
        let json = serde_json::to_string(&Request::Enroll {
            course: "c1".into(),
        })
        .unwrap();
        assert_eq!(json, r#"{"Enroll":{"course":"c1"}}"#);
        let back: Request = serde_json::from_str(&json).unwrap();
        assert_eq!(back.name(), "enroll");
    }

    #[test]
    fn role_table() {
        let enroll = Request::Enroll {
            course: "c1".into(),
        };
        assert!(enroll.allowed_for(Role::Student));
        assert!(!enroll.allowed_for(Role::Faculty));
        assert!(!Request::ListStudents.allowed_for(Role::Student));
        assert!(Request::ListCourses.allowed_for(Role::Faculty));
        assert!(!Request::ListCourses.allowed_for(Role::Admin));
        assert!(Request::ChangePassword {
            password: "x".into()
        }
        .allowed_for(Role::Admin));
    }

    #[test]
    fn error_response_carries_code() {
        let resp = Response::Err {
            code: ErrorCode::CourseFull,
            message: "course c1 is full".into(),
        };
        let json = serde_json::to_string(&resp).unwrap();
        assert_eq!(serde_json::from_str::<Response>(&json).unwrap(), resp);
    }
}
