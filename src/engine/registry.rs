use std::fs;
use std::sync::Arc;

use tracing::{debug, info, instrument, warn};

use super::RegistryEngine;
use crate::cascade::Cascade;
use crate::config::{StoreConfig, COURSES_FILE, FACULTY_FILE, STUDENTS_FILE, USERS_FILE};
use crate::enrollment::Enrollment;
use crate::model::{Course, Faculty, Role, Student, User};
use crate::storage::{Record, Repository};
use crate::{validate, RegistryError, Result};

/// The registry engine backed by four flat files in a data directory.
///
/// `FileRegistry` is a handle: clones share the same repositories, and with them the same
/// per-file gates, so one instance (and its clones) should serve the whole process.
#[derive(Debug, Clone)]
pub struct FileRegistry {
    stores: Arc<Stores>,
}

#[derive(Debug)]
struct Stores {
    users: Repository<User>,
    students: Repository<Student>,
    faculty: Repository<Faculty>,
    courses: Repository<Course>,
}

impl FileRegistry {
    /// Opens the registry in `config.data_dir`, creating the directory and any missing data
    /// file.
    ///
    /// # Errors
    /// `StorageUnavailable` if the directory or a data file cannot be created
    #[instrument(skip(config), fields(data_dir = ?config.data_dir))]
    pub fn open(config: StoreConfig) -> Result<Self> {
        fs::create_dir_all(config.data_dir())
            .map_err(|e| RegistryError::storage(config.data_dir(), e))?;
        let wait = config.lock_wait;
        let stores = Stores {
            users: Repository::open(config.path(USERS_FILE), wait)?,
            students: Repository::open(config.path(STUDENTS_FILE), wait)?,
            faculty: Repository::open(config.path(FACULTY_FILE), wait)?,
            courses: Repository::open(config.path(COURSES_FILE), wait)?,
        };
        info!("registry opened");
        Ok(FileRegistry {
            stores: Arc::new(stores),
        })
    }

    /// Provisions the default accounts if the user file is empty. Returns whether anything
    /// was added.
    pub fn seed_defaults(&self) -> Result<bool> {
        if !self.stores.users.is_empty()? {
            return Ok(false);
        }
        self.stores
            .users
            .insert(&User::new("admin1", Role::Admin, "adminpass"))?;
        self.add_student("s1", "John", "pass1")?;
        self.add_faculty("f1", "Dr. Smith", "pass2")?;
        info!("seeded admin1, student s1 and faculty f1");
        Ok(true)
    }

    /// the user repository
    pub fn users(&self) -> &Repository<User> {
        &self.stores.users
    }

    /// the student repository
    pub fn students(&self) -> &Repository<Student> {
        &self.stores.students
    }

    /// the faculty repository
    pub fn faculty(&self) -> &Repository<Faculty> {
        &self.stores.faculty
    }

    /// the course repository
    pub fn courses(&self) -> &Repository<Course> {
        &self.stores.courses
    }

    fn enrollment(&self) -> Enrollment<'_> {
        Enrollment::new(&self.stores.students, &self.stores.courses)
    }

    fn cascade(&self) -> Cascade<'_> {
        Cascade::new(&self.stores.students, &self.stores.courses)
    }

    /// inserts the login first, then the entity record, removing the login again if the
    /// second insert fails
    fn provision<R: Record>(
        &self,
        user: User,
        repo: &Repository<R>,
        record: R,
    ) -> Result<()> {
        self.stores.users.insert(&user)?;
        if let Err(e) = repo.insert(&record) {
            warn!("{} {} not stored, removing its login: {}", R::ENTITY, user.id, e);
            self.stores
                .users
                .delete_where(|u| u.id == user.id && u.role == user.role)?;
            return Err(e);
        }
        info!(id = %user.id, role = %user.role, "account provisioned");
        Ok(())
    }

    fn set_active(&self, id: &str, active: bool) -> Result<()> {
        validate::id(id)?;
        self.stores.students.update_in_place(id, |student| {
            student.active = active;
            Ok(())
        })?;
        info!(id, active, "student status changed");
        Ok(())
    }
}

impl RegistryEngine for FileRegistry {
    #[instrument(skip(self, password))]
    fn authenticate(&self, role: Role, id: &str, password: &str) -> Result<User> {
        for entry in self.stores.users.scan()? {
            let (_, user) = entry?;
            if user.id == id && user.password == password && user.role == role {
                debug!("login accepted");
                return Ok(user);
            }
        }
        debug!("login rejected");
        Err(RegistryError::NotAuthenticated)
    }

    fn add_student(&self, id: &str, name: &str, password: &str) -> Result<()> {
        validate::id(id)?;
        validate::name(name)?;
        validate::password(password)?;
        self.provision(
            User::new(id, Role::Student, password),
            &self.stores.students,
            Student::new(id, name),
        )
    }

    fn add_faculty(&self, id: &str, name: &str, password: &str) -> Result<()> {
        validate::id(id)?;
        validate::name(name)?;
        validate::password(password)?;
        self.provision(
            User::new(id, Role::Faculty, password),
            &self.stores.faculty,
            Faculty::new(id, name),
        )
    }

    fn activate_student(&self, id: &str) -> Result<()> {
        self.set_active(id, true)
    }

    fn block_student(&self, id: &str) -> Result<()> {
        self.set_active(id, false)
    }

    fn update_student(&self, id: &str, name: &str) -> Result<()> {
        validate::id(id)?;
        validate::name(name)?;
        self.stores.students.update_in_place(id, |student| {
            student.name = name.to_string();
            Ok(())
        })?;
        Ok(())
    }

    fn update_faculty(&self, id: &str, name: &str) -> Result<()> {
        validate::id(id)?;
        validate::name(name)?;
        self.stores.faculty.update_in_place(id, |faculty| {
            faculty.name = name.to_string();
            Ok(())
        })?;
        Ok(())
    }

    #[instrument(skip(self))]
    fn add_course(&self, faculty_id: &str, id: &str, name: &str, seats: u32) -> Result<()> {
        validate::id(id)?;
        validate::name(name)?;
        validate::seats(seats)?;
        self.stores
            .courses
            .insert(&Course::new(id, name, faculty_id, seats))?;
        info!("course added");
        Ok(())
    }

    #[instrument(skip(self))]
    fn update_course(
        &self,
        faculty_id: &str,
        id: &str,
        name: &str,
        seats: u32,
    ) -> Result<Course> {
        validate::id(id)?;
        validate::name(name)?;
        validate::seats(seats)?;
        self.enrollment().update_course(id, |course| {
            if course.faculty_id != faculty_id {
                return Err(not_owner(faculty_id, &course.id));
            }
            course.name = name.to_string();
            course.total_seats = seats;
            Ok(())
        })
    }

    #[instrument(skip(self))]
    fn remove_course(&self, faculty_id: &str, id: &str) -> Result<()> {
        validate::id(id)?;
        self.cascade().remove_course(id, Some(faculty_id))?;
        Ok(())
    }

    fn enroll(&self, student_id: &str, course_id: &str) -> Result<()> {
        validate::id(course_id)?;
        self.enrollment().enroll(student_id, course_id)
    }

    fn unenroll(&self, student_id: &str, course_id: &str) -> Result<()> {
        validate::id(course_id)?;
        self.enrollment().unenroll(student_id, course_id)
    }

    #[instrument(skip(self, password))]
    fn change_password(&self, user_id: &str, password: &str) -> Result<()> {
        validate::password(password)?;
        self.stores.users.update_in_place(user_id, |user| {
            user.password = password.to_string();
            Ok(())
        })?;
        info!("password changed");
        Ok(())
    }

    fn list_students(&self) -> Result<Vec<Student>> {
        self.stores.students.all()
    }

    fn list_faculty(&self) -> Result<Vec<Faculty>> {
        self.stores.faculty.all()
    }

    fn list_courses(&self) -> Result<Vec<Course>> {
        self.stores.courses.all()
    }

    fn list_faculty_courses(&self, faculty_id: &str) -> Result<Vec<Course>> {
        let mut courses = Vec::new();
        for entry in self.stores.courses.scan()? {
            let (_, course) = entry?;
            if course.faculty_id == faculty_id {
                courses.push(course);
            }
        }
        Ok(courses)
    }

    fn list_student_enrollments(&self, student_id: &str) -> Result<Vec<String>> {
        let student = self.stores.students.find_by_id(student_id)?;
        Ok(student.courses.values().map(String::from).collect())
    }

    fn list_course_enrollments(&self, course_id: &str) -> Result<Vec<String>> {
        validate::id(course_id)?;
        let course = self.stores.courses.find_by_id(course_id)?;
        Ok(course.students.iter().map(String::from).collect())
    }
}

fn not_owner(faculty_id: &str, course_id: &str) -> RegistryError {
    RegistryError::PermissionDenied(format!(
        "course {} is not offered by {}",
        course_id, faculty_id
    ))
}
