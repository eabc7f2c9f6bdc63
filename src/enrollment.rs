//! Enrollment transactions spanning the student and course files.
//!
//! # Lock order
//! Every operation here holds both files for its whole duration, taking the students file
//! first and the courses file second.
use tracing::{debug, info, instrument, warn};

use crate::model::{Course, Student};
use crate::storage::{LockedRecords, Repository};
use crate::{RegistryError, Result};

/// Coordinates updates that must keep student slots and course enrollment lists reciprocal.
#[derive(Debug, Clone, Copy)]
pub struct Enrollment<'a> {
    students: &'a Repository<Student>,
    courses: &'a Repository<Course>,
}

impl<'a> Enrollment<'a> {
    /// a coordinator over the given repositories
    pub fn new(students: &'a Repository<Student>, courses: &'a Repository<Course>) -> Self {
        Enrollment { students, courses }
    }

    /// Enrolls `student_id` into `course_id`. Either both records are updated or neither is.
    ///
    /// # Errors
    /// - `NotFound` if the student does not exist
    /// - `Blocked` if the student is inactive
    /// - `AlreadyEnrolled` if either side already lists the other
    /// - `SlotsFull` if the student has no free slot
    /// - `CourseNotFound` if the course does not exist
    /// - `CourseFull` if every seat is taken
    #[instrument(skip(self))]
    pub fn enroll(&self, student_id: &str, course_id: &str) -> Result<()> {
        let mut students = self.students.lock_exclusive()?;
        let (student_at, mut student) = students
            .find(student_id)?
            .ok_or_else(|| RegistryError::not_found("student", student_id))?;
        if !student.active {
            return Err(RegistryError::Blocked(student.id));
        }
        if student.courses.contains(course_id) {
            return Err(already_enrolled(student_id, course_id));
        }
        let slot = student
            .courses
            .find_empty()
            .ok_or_else(|| RegistryError::SlotsFull(student_id.to_string()))?;

        let mut courses = self.courses.lock_exclusive()?;
        let (course_at, mut course) = courses
            .find(course_id)?
            .ok_or_else(|| RegistryError::CourseNotFound(course_id.to_string()))?;
        if course.is_full() {
            return Err(RegistryError::CourseFull(course.id));
        }
        if course.students.contains(student_id) {
            return Err(already_enrolled(student_id, course_id));
        }

        course
            .students
            .push(student_id)
            .map_err(|_| RegistryError::CourseFull(course_id.to_string()))?;
        student.courses.set(slot, course_id);

        students.write_at(student_at, &student)?;
        if let Err(e) = courses.write_at(course_at, &course) {
            // put the student record back so the pair stays consistent
            student.courses.clear(slot);
            if let Err(undo) = students.write_at(student_at, &student) {
                warn!("could not roll back student {}: {}", student_id, undo);
            }
            return Err(e);
        }

        drop(courses);
        drop(students);
        info!(
            enrolled = course.enrolled_count(),
            seats = course.total_seats,
            "student enrolled"
        );
        Ok(())
    }

    /// Removes `student_id` from `course_id`, clearing the student's slot and compacting the
    /// course list. Both records are checked before either is written.
    ///
    /// A one-sided pair (only the slot or only the list entry present) is cleaned up as well.
    /// If the course no longer exists, only the slot is cleared.
    ///
    /// # Errors
    /// - `NotFound` if the student does not exist
    /// - `NotEnrolled` if neither side refers to the other
    #[instrument(skip(self))]
    pub fn unenroll(&self, student_id: &str, course_id: &str) -> Result<()> {
        let mut students = self.students.lock_exclusive()?;
        let (student_at, mut student) = students
            .find(student_id)?
            .ok_or_else(|| RegistryError::not_found("student", student_id))?;
        let mut courses = self.courses.lock_exclusive()?;
        let mut course = courses.find(course_id)?;

        let original = student.clone();
        let had_slot = student.courses.clear_value(course_id);
        let listed = match course.as_mut() {
            Some((_, course)) => course.students.compact_remove(student_id),
            None => false,
        };
        if !had_slot && !listed {
            return Err(RegistryError::NotEnrolled {
                student: student_id.to_string(),
                course: course_id.to_string(),
            });
        }
        if had_slot != listed {
            warn!(had_slot, listed, "repairing one-sided enrollment");
        }

        if had_slot {
            students.write_at(student_at, &student)?;
        }
        if let (true, Some((course_at, course))) = (listed, &course) {
            if let Err(e) = courses.write_at(*course_at, course) {
                if had_slot {
                    if let Err(undo) = students.write_at(student_at, &original) {
                        warn!("could not roll back student {}: {}", student_id, undo);
                    }
                }
                return Err(e);
            }
            debug!(enrolled = course.enrolled_count(), "removed from course list");
        }

        drop(courses);
        drop(students);
        info!("student unenrolled");
        Ok(())
    }

    /// Applies `update` to a course while holding both files. If the course ends up with fewer
    /// seats than enrolled students, the most recently enrolled students past the new seat
    /// count are dropped from the course and their slots are cleared.
    ///
    /// Returns the updated course.
    ///
    /// # Errors
    /// `NotFound` if the course does not exist, or whatever `update` returns
    #[instrument(skip(self, update))]
    pub fn update_course<F>(&self, course_id: &str, update: F) -> Result<Course>
    where
        F: FnOnce(&mut Course) -> Result<()>,
    {
        let mut students = self.students.lock_exclusive()?;
        let mut courses = self.courses.lock_exclusive()?;
        let (course_at, mut course) = courses
            .find(course_id)?
            .ok_or_else(|| RegistryError::not_found("course", course_id))?;
        update(&mut course)?;

        let dropped = course.students.truncate(course.total_seats as usize);
        let mut patched = Vec::with_capacity(dropped.len());
        for student_id in &dropped {
            match students.find(student_id)? {
                Some((student_at, mut student)) => {
                    let original = student.clone();
                    if student.courses.clear_value(course_id) {
                        patched.push((student_at, student, original));
                    }
                }
                None => warn!("course {} listed unknown student {}", course_id, student_id),
            }
        }

        // students first; any failed write puts the already written students back
        let mut written: Vec<(u64, &Student)> = Vec::with_capacity(patched.len());
        for (student_at, student, original) in &patched {
            if let Err(e) = students.write_at(*student_at, student) {
                restore(&mut students, &written);
                return Err(e);
            }
            written.push((*student_at, original));
        }
        if let Err(e) = courses.write_at(course_at, &course) {
            restore(&mut students, &written);
            return Err(e);
        }
        if !dropped.is_empty() {
            info!(dropped = ?dropped, "seat reduction dropped enrollments");
        }
        Ok(course)
    }
}

/// writes back the `written` students' previous records
fn restore(students: &mut LockedRecords<'_, Student>, written: &[(u64, &Student)]) {
    for (student_at, original) in written {
        if let Err(e) = students.write_at(*student_at, original) {
            warn!("could not restore student {}: {}", original.id, e);
        }
    }
}

fn already_enrolled(student_id: &str, course_id: &str) -> RegistryError {
    RegistryError::AlreadyEnrolled {
        student: student_id.to_string(),
        course: course_id.to_string(),
    }
}
