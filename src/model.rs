//! The four entity types kept by the registry.
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::config::{MAX_COURSES, MAX_SEATS};
use crate::slots::{DenseList, SlotArray};
use crate::RegistryError;

/// The role a user logs in with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Role {
    /// manages student and faculty accounts
    Admin,
    /// enrolls in courses
    Student,
    /// offers courses
    Faculty,
}

impl Role {
    /// the code stored for this role in a user record
    pub fn code(self) -> u32 {
        match self {
            Role::Admin => 0,
            Role::Student => 1,
            Role::Faculty => 2,
        }
    }

    /// the role for a stored code
    pub fn from_code(code: u32) -> Option<Role> {
        match code {
            0 => Some(Role::Admin),
            1 => Some(Role::Student),
            2 => Some(Role::Faculty),
            _ => None,
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::Admin => write!(f, "admin"),
            Role::Student => write!(f, "student"),
            Role::Faculty => write!(f, "faculty"),
        }
    }
}

impl FromStr for Role {
    type Err = RegistryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "admin" => Ok(Role::Admin),
            "student" => Ok(Role::Student),
            "faculty" | "professor" => Ok(Role::Faculty),
            other => Err(RegistryError::Parsing(format!("unknown role: {}", other))),
        }
    }
}

/// A login account.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    /// unique login identifier
    pub id: String,
    /// the role the account logs in with
    pub role: Role,
    /// opaque password
    pub password: String,
}

impl User {
    /// builds a user record
    pub fn new(id: impl Into<String>, role: Role, password: impl Into<String>) -> Self {
        User {
            id: id.into(),
            role,
            password: password.into(),
        }
    }
}

/// A student and the courses they hold a slot for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Student {
    /// identifier, shared with the student's [`User`]
    pub id: String,
    /// display name
    pub name: String,
    /// blocked students may not enroll
    pub active: bool,
    /// enrolled course identifiers, [`MAX_COURSES`] slots
    pub courses: SlotArray,
}

impl Student {
    /// a new, active student with no enrollments
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Student {
            id: id.into(),
            name: name.into(),
            active: true,
            courses: SlotArray::new(MAX_COURSES),
        }
    }
}

/// A faculty member.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Faculty {
    /// identifier, shared with the faculty member's [`User`]
    pub id: String,
    /// display name
    pub name: String,
}

impl Faculty {
    /// builds a faculty record
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Faculty {
            id: id.into(),
            name: name.into(),
        }
    }
}

/// A course offered by a faculty member.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Course {
    /// unique course identifier
    pub id: String,
    /// course name
    pub name: String,
    /// identifier of the owning faculty member
    pub faculty_id: String,
    /// number of seats, never below the number of enrolled students
    pub total_seats: u32,
    /// enrolled student identifiers, dense, [`MAX_SEATS`] capacity
    pub students: DenseList,
}

impl Course {
    /// a new course with no enrollments
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        faculty_id: impl Into<String>,
        total_seats: u32,
    ) -> Self {
        Course {
            id: id.into(),
            name: name.into(),
            faculty_id: faculty_id.into(),
            total_seats,
            students: DenseList::new(MAX_SEATS),
        }
    }

    /// number of enrolled students
    pub fn enrolled_count(&self) -> u32 {
        self.students.len() as u32
    }

    /// whether every seat is taken
    pub fn is_full(&self) -> bool {
        self.enrolled_count() >= self.total_seats
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_codes_round_trip() {
        for role in [Role::Admin, Role::Student, Role::Faculty] {
            assert_eq!(Role::from_code(role.code()), Some(role));
        }
        assert_eq!(Role::from_code(7), None);
    }

    #[test]
    fn role_parses_from_cli_names() {
        assert_eq!("Admin".parse::<Role>().unwrap(), Role::Admin);
        assert_eq!("professor".parse::<Role>().unwrap(), Role::Faculty);
        assert!("janitor".parse::<Role>().is_err());
    }

    #[test]
    fn course_full_at_seat_count() {
        let mut course = Course::new("c1", "Compilers", "f1", 1);
        assert!(!course.is_full());
        course.students.push("s1").unwrap();
        assert!(course.is_full());
        assert_eq!(course.enrolled_count(), 1);
    }
}
