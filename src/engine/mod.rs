//! This module provides the registry engine: one operation per client command.
//! [`FileRegistry`] is the implementation that keeps everything in four flat files.
use crate::model::{Course, Faculty, Role, Student, User};
use crate::Result;

/// The operations the server dispatches client requests to.
///
/// Implementations are cheap to clone; every clone works on the same underlying store.
pub trait RegistryEngine: Clone + Send + 'static {
    /// Looks up a user by identifier, password and role.
    ///
    /// # Errors
    /// Returns `RegistryError::NotAuthenticated` if no user matches all three.
    fn authenticate(&self, role: Role, id: &str, password: &str) -> Result<User>;

    /// provisions a student login and student record
    fn add_student(&self, id: &str, name: &str, password: &str) -> Result<()>;

    /// provisions a faculty login and faculty record
    fn add_faculty(&self, id: &str, name: &str, password: &str) -> Result<()>;

    /// marks a student as active
    fn activate_student(&self, id: &str) -> Result<()>;

    /// marks a student as blocked, which prevents new enrollments
    fn block_student(&self, id: &str) -> Result<()>;

    /// renames a student
    fn update_student(&self, id: &str, name: &str) -> Result<()>;

    /// renames a faculty member
    fn update_faculty(&self, id: &str, name: &str) -> Result<()>;

    /// adds a course owned by `faculty_id`
    fn add_course(&self, faculty_id: &str, id: &str, name: &str, seats: u32) -> Result<()>;

    /// Renames a course owned by `faculty_id` and sets its seat count.
    ///
    /// Lowering the seats below the enrollment count drops the latest enrollments.
    fn update_course(&self, faculty_id: &str, id: &str, name: &str, seats: u32)
        -> Result<Course>;

    /// removes a course owned by `faculty_id` along with every enrollment in it
    fn remove_course(&self, faculty_id: &str, id: &str) -> Result<()>;

    /// enrolls a student into a course
    fn enroll(&self, student_id: &str, course_id: &str) -> Result<()>;

    /// drops a student from a course
    fn unenroll(&self, student_id: &str, course_id: &str) -> Result<()>;

    /// replaces a user's password
    fn change_password(&self, user_id: &str, password: &str) -> Result<()>;

    /// every student
    fn list_students(&self) -> Result<Vec<Student>>;

    /// every faculty member
    fn list_faculty(&self) -> Result<Vec<Faculty>>;

    /// every course
    fn list_courses(&self) -> Result<Vec<Course>>;

    /// the courses owned by `faculty_id`
    fn list_faculty_courses(&self, faculty_id: &str) -> Result<Vec<Course>>;

    /// the course identifiers a student is enrolled in, in slot order
    fn list_student_enrollments(&self, student_id: &str) -> Result<Vec<String>>;

    /// the student identifiers enrolled in a course, in enrollment order
    fn list_course_enrollments(&self, course_id: &str) -> Result<Vec<String>>;
}

mod registry;

pub use self::registry::FileRegistry;
