//! Course removal and the cleanup of student slots that pointed at the removed course.
use tracing::{info, instrument};

use crate::model::{Course, Student};
use crate::storage::Repository;
use crate::{RegistryError, Result};

/// Removes courses and strips the dangling references they leave in student records.
#[derive(Debug, Clone, Copy)]
pub struct Cascade<'a> {
    students: &'a Repository<Student>,
    courses: &'a Repository<Course>,
}

impl<'a> Cascade<'a> {
    /// a maintainer over the given repositories
    pub fn new(students: &'a Repository<Student>, courses: &'a Repository<Course>) -> Self {
        Cascade { students, courses }
    }

    /// Deletes `course_id` from the course file and clears every student slot that refers to
    /// it, holding the students file and then the courses file for the whole removal. The
    /// student pass runs even if the course was already gone. Returns the number of student
    /// records that were rewritten.
    ///
    /// With an `owner`, the course is only removed if that faculty member offers it.
    ///
    /// # Errors
    /// - `PermissionDenied` if the course belongs to someone other than `owner`
    /// - `NotFound` if the course did not exist
    #[instrument(skip(self))]
    pub fn remove_course(&self, course_id: &str, owner: Option<&str>) -> Result<usize> {
        let mut students = self.students.lock_exclusive()?;
        let courses = self.courses.lock_exclusive()?;

        let mut foreign = false;
        let removed = courses.delete_where(|course| {
            if course.id != course_id {
                return false;
            }
            match owner {
                Some(owner) if course.faculty_id != owner => {
                    foreign = true;
                    false
                }
                _ => true,
            }
        })?;
        if let (true, Some(owner)) = (foreign, owner) {
            return Err(RegistryError::PermissionDenied(format!(
                "course {} is not offered by {}",
                course_id, owner
            )));
        }

        let cleaned = students.patch_all(|student| student.courses.clear_value(course_id))?;
        info!(removed, cleaned, "course removal cascaded");

        if removed == 0 {
            return Err(RegistryError::not_found("course", course_id));
        }
        Ok(cleaned)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::LockWait;
    use tempfile::tempdir;

    #[test]
    fn missing_course_still_cleans_dangling_slots() {
        let dir = tempdir().unwrap();
        let students: Repository<Student> =
            Repository::open(dir.path().join("students.dat"), LockWait::Block).unwrap();
        let courses: Repository<Course> =
            Repository::open(dir.path().join("courses.dat"), LockWait::Block).unwrap();

        let mut student = Student::new("s1", "John");
        student.courses.set(4, "gone");
        students.insert(&student).unwrap();
        students.insert(&Student::new("s2", "Jane")).unwrap();

        let cascade = Cascade::new(&students, &courses);
        assert!(matches!(
            cascade.remove_course("gone", None),
            Err(RegistryError::NotFound { .. })
        ));
        assert!(!students.find_by_id("s1").unwrap().courses.contains("gone"));
    }

    #[test]
    fn foreign_course_is_left_untouched() {
        let dir = tempdir().unwrap();
        let students: Repository<Student> =
            Repository::open(dir.path().join("students.dat"), LockWait::Block).unwrap();
        let courses: Repository<Course> =
            Repository::open(dir.path().join("courses.dat"), LockWait::Block).unwrap();

        let mut student = Student::new("s1", "John");
        student.courses.set(0, "c1");
        students.insert(&student).unwrap();
        let mut course = Course::new("c1", "Os", "f1", 5);
        course.students.push("s1").unwrap();
        courses.insert(&course).unwrap();

        let cascade = Cascade::new(&students, &courses);
        assert!(matches!(
            cascade.remove_course("c1", Some("f2")),
            Err(RegistryError::PermissionDenied(_))
        ));
        assert_eq!(courses.find_by_id("c1").unwrap(), course);
        assert!(students.find_by_id("s1").unwrap().courses.contains("c1"));

        assert_eq!(cascade.remove_course("c1", Some("f1")).unwrap(), 1);
        assert!(courses.all().unwrap().is_empty());
        assert!(!students.find_by_id("s1").unwrap().courses.contains("c1"));
    }
}
