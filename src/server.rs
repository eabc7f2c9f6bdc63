use std::fmt::Write as _;
use std::io::{BufReader, BufWriter, Write};
use std::net::{TcpListener, TcpStream, ToSocketAddrs};

use serde_json::Deserializer;
use tracing::{debug, error, info, warn};

use crate::command::{Request, Response};
use crate::model::{Course, Faculty, Student, User};
use crate::thread_pool::ThreadPool;
use crate::{RegistryEngine, RegistryError, Result};

/// A TCP socket server over a registry engine.
///
/// It listens for incoming connections on a [`SocketAddr`](std::net::SocketAddr) and hands
/// every connection to the [`ThreadPool`]. A connection is one session: the client logs in
/// with its first [`Request`], then sends requests for its role until it logs out or
/// disconnects.
///
/// Each session receives its own handle to the [`RegistryEngine`].
///
/// # Example
/// ```rust,no_run
/// use academia::{FileRegistry, RegistryServer, StoreConfig};
/// use academia::thread_pool::{ThreadPerConnection, ThreadPool};
/// # fn main() -> academia::Result<()> {
/// let engine = FileRegistry::open(StoreConfig::new("."))?;
/// let server = RegistryServer::new(engine, ThreadPerConnection::new(0)?);
/// server.run("127.0.0.1:8080")?;
/// # Ok(())
/// # }
/// ```
pub struct RegistryServer<E: RegistryEngine, P: ThreadPool> {
    /// the registry engine to use
    engine: E,
    /// a pool of threads that will run the client sessions
    pool: P,
}

impl<E: RegistryEngine, P: ThreadPool> RegistryServer<E, P> {
    /// Create a new `RegistryServer` using the given [`RegistryEngine`] and [`ThreadPool`]
    /// implementation.
    pub fn new(engine: E, pool: P) -> Self {
        RegistryServer { engine, pool }
    }

    /// starts a server listening on the given address.
    ///
    /// # Errors
    /// returns an error if the address could not be bound
    pub fn run<A: ToSocketAddrs>(self, addr: A) -> Result<()> {
        let listener = TcpListener::bind(addr)?;
        self.run_with_listener(listener)
    }

    /// serves every connection accepted by an already bound `listener`
    pub fn run_with_listener(self, listener: TcpListener) -> Result<()> {
        info!("Listening on {}", listener.local_addr()?);
        for stream in listener.incoming() {
            match stream {
                Ok(stream) => {
                    let engine = self.engine.clone();
                    let spawned = self.pool.spawn(move || {
                        if let Err(e) = serve(engine, stream) {
                            error!("Error on serving client: {}", e);
                        }
                    });
                    if let Err(e) = spawned {
                        error!("Could not schedule session: {}", e);
                    }
                }
                Err(e) => error!("Connection failed: {}", e),
            }
        }
        Ok(())
    }
}

/// Reads [`Request`]s from the `tcp` stream, runs them through a [`Session`] and writes one
/// [`Response`] per request back to the client.
fn serve<E: RegistryEngine>(engine: E, tcp: TcpStream) -> Result<()> {
    let peer_addr = tcp.peer_addr()?;
    let stream_reader = BufReader::new(&tcp);
    let mut stream_writer = BufWriter::new(&tcp);
    let req_reader = Deserializer::from_reader(stream_reader).into_iter::<Request>();

    let mut send_resp = move |resp: Response| -> Result<()> {
        serde_json::to_writer(&mut stream_writer, &resp)?;
        stream_writer.write_all(b"\n")?;
        stream_writer.flush()?;
        match &resp {
            Response::Ok(_) => debug!("Response sent to {}: ok", peer_addr),
            Response::Err { code, .. } => debug!("Response sent to {}: {:?}", peer_addr, code),
        }
        Ok(())
    };

    let mut session = Session::new(engine);
    for req in req_reader {
        let req = req?;
        debug!("Receive request from {}: {}", peer_addr, req.name());
        let logout = matches!(req, Request::Logout);

        let resp = match session.handle(req) {
            Ok(message) => Response::Ok(message),
            Err(e) => Response::Err {
                code: e.code(),
                message: e.to_string(),
            },
        };
        send_resp(resp)?;

        if logout {
            break;
        }
    }
    debug!("Session with {} closed", peer_addr);
    Ok(())
}

/// The state of one client connection: anonymous until a successful login.
pub(crate) struct Session<E> {
    engine: E,
    user: Option<User>,
}

impl<E: RegistryEngine> Session<E> {
    pub(crate) fn new(engine: E) -> Self {
        Session { engine, user: None }
    }

    /// checks the request against the session and runs it, returning the text for the client
    pub(crate) fn handle(&mut self, req: Request) -> Result<String> {
        if let Request::Login { role, id, password } = &req {
            let user = match self.engine.authenticate(*role, id, password) {
                Ok(user) => user,
                Err(e) => {
                    warn!("Login failed for user {}", id);
                    return Err(e);
                }
            };
            info!("Login successful for user {} as {}", user.id, user.role);
            let message = format!("Login successful. Welcome, {}.", user.id);
            self.user = Some(user);
            return Ok(message);
        }

        let user = match (&self.user, &req) {
            (None, Request::Logout) => return Ok("Goodbye.".to_string()),
            (None, _) => return Err(RegistryError::NotAuthenticated),
            (Some(user), _) => user.clone(),
        };

        if !req.allowed_for(user.role) {
            return Err(RegistryError::PermissionDenied(format!(
                "{} may not {}",
                user.role,
                req.name()
            )));
        }
        dispatch(&self.engine, &user, req)
    }
}

fn dispatch<E: RegistryEngine>(engine: &E, user: &User, req: Request) -> Result<String> {
    let message = match req {
        Request::Login { .. } => unreachable!("login is handled by the session"),
        Request::Logout => {
            info!("User {} logged out", user.id);
            "Logged out.".to_string()
        }

        Request::AddStudent { id, name, password } => {
            engine.add_student(&id, &name, &password)?;
            "Student added successfully".to_string()
        }
        Request::AddFaculty { id, name, password } => {
            engine.add_faculty(&id, &name, &password)?;
            "Faculty added successfully".to_string()
        }
        Request::ActivateStudent { id } => {
            engine.activate_student(&id)?;
            "Student activated successfully".to_string()
        }
        Request::BlockStudent { id } => {
            engine.block_student(&id)?;
            "Student blocked successfully".to_string()
        }
        Request::UpdateStudent { id, name } => {
            engine.update_student(&id, &name)?;
            "Student details updated successfully".to_string()
        }
        Request::UpdateFaculty { id, name } => {
            engine.update_faculty(&id, &name)?;
            "Faculty details updated successfully".to_string()
        }
        Request::ListStudents => render_students(&engine.list_students()?),
        Request::ListFaculty => render_faculty(&engine.list_faculty()?),

        Request::AddCourse { id, name, seats } => {
            engine.add_course(&user.id, &id, &name, seats)?;
            "Course added successfully".to_string()
        }
        Request::UpdateCourse { id, name, seats } => {
            engine.update_course(&user.id, &id, &name, seats)?;
            "Course updated successfully".to_string()
        }
        Request::RemoveCourse { id } => {
            engine.remove_course(&user.id, &id)?;
            "Course removed successfully".to_string()
        }
        Request::ListFacultyCourses => {
            render_faculty_courses(&user.id, &engine.list_faculty_courses(&user.id)?)
        }
        Request::ListCourseEnrollments { course } => {
            let students = engine.list_course_enrollments(&course)?;
            render_ids(
                &format!("Enrollments for Course {}:", course),
                &students,
                "No students enrolled.",
            )
        }

        Request::ListCourses => render_courses(&engine.list_courses()?),
        Request::Enroll { course } => {
            engine.enroll(&user.id, &course)?;
            "Enrolled successfully".to_string()
        }
        Request::Unenroll { course } => {
            engine.unenroll(&user.id, &course)?;
            "Dropped successfully".to_string()
        }
        Request::ListStudentEnrollments => {
            let courses = engine.list_student_enrollments(&user.id)?;
            render_ids("Enrolled Courses:", &courses, "No courses enrolled.")
        }

        Request::ChangePassword { password } => {
            engine.change_password(&user.id, &password)?;
            "Password changed successfully".to_string()
        }
    };
    Ok(message)
}

fn render_courses(courses: &[Course]) -> String {
    let mut out = String::from("All Available Courses:\n");
    for (n, c) in courses.iter().enumerate() {
        let _ = writeln!(
            out,
            "{}. ID: {}, Name: {}, Faculty ID: {}, Seats: {}, Enrolled: {}",
            n + 1,
            c.id,
            c.name,
            c.faculty_id,
            c.total_seats,
            c.enrolled_count()
        );
    }
    if courses.is_empty() {
        out.push_str("No courses available.\n");
    }
    out
}

fn render_faculty_courses(faculty_id: &str, courses: &[Course]) -> String {
    let mut out = format!("Courses Offered by Faculty {}:\n", faculty_id);
    for (n, c) in courses.iter().enumerate() {
        let _ = writeln!(
            out,
            "{}. ID: {}, Name: {}, Seats: {}, Enrolled: {}",
            n + 1,
            c.id,
            c.name,
            c.total_seats,
            c.enrolled_count()
        );
    }
    if courses.is_empty() {
        out.push_str("No courses offered.\n");
    }
    out
}

fn render_students(students: &[Student]) -> String {
    let mut out = String::from("All Students:\n");
    for (n, s) in students.iter().enumerate() {
        let status = if s.active { "Active" } else { "Blocked" };
        let _ = writeln!(out, "{}. ID: {}, Name: {}, Status: {}", n + 1, s.id, s.name, status);
    }
    if students.is_empty() {
        out.push_str("No students available.\n");
    }
    out
}

fn render_faculty(faculty: &[Faculty]) -> String {
    let mut out = String::from("All Faculty:\n");
    for (n, f) in faculty.iter().enumerate() {
        let _ = writeln!(out, "{}. ID: {}, Name: {}", n + 1, f.id, f.name);
    }
    if faculty.is_empty() {
        out.push_str("No faculty available.\n");
    }
    out
}

fn render_ids(header: &str, ids: &[String], empty: &str) -> String {
    let mut out = format!("{}\n", header);
    for (n, id) in ids.iter().enumerate() {
        let _ = writeln!(out, "{}. {}", n + 1, id);
    }
    if ids.is_empty() {
        let _ = writeln!(out, "{}", empty);
    }
    out
}
