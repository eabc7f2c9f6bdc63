use std::net::{SocketAddr, TcpListener};
use std::thread;

use academia::thread_pool::{SharedQueueThreadPool, ThreadPerConnection, ThreadPool};
use academia::{
    ErrorCode, FileRegistry, RegistryClient, RegistryError, RegistryServer, Request, Role,
    StoreConfig,
};
use tempfile::{tempdir, TempDir};

/// starts a seeded server on an ephemeral port and returns its address
fn start<P: ThreadPool + Send + 'static>(pool: P) -> (SocketAddr, TempDir) {
    let dir = tempdir().unwrap();
    let registry = FileRegistry::open(StoreConfig::new(dir.path())).unwrap();
    registry.seed_defaults().unwrap();

    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    thread::spawn(move || RegistryServer::new(registry, pool).run_with_listener(listener));
    (addr, dir)
}

fn login(addr: SocketAddr, role: Role, id: &str, password: &str) -> RegistryClient {
    let mut client = RegistryClient::connect(addr).unwrap();
    client.login(role, id, password).unwrap();
    client
}

fn code(err: RegistryError) -> ErrorCode {
    match err {
        RegistryError::Server { code, .. } => code,
        other => panic!("expected a server error, got {}", other),
    }
}

#[test]
fn faculty_offers_and_student_enrolls() {
    let (addr, _dir) = start(ThreadPerConnection::new(0).unwrap());

    let mut faculty = login(addr, Role::Faculty, "f1", "pass2");
    faculty
        .request(Request::AddCourse {
            id: "c1".into(),
            name: "Algebra".into(),
            seats: 5,
        })
        .unwrap();

    let mut student = login(addr, Role::Student, "s1", "pass1");
    assert_eq!(
        student
            .request(Request::Enroll {
                course: "c1".into()
            })
            .unwrap(),
        "Enrolled successfully"
    );
    let err = student
        .request(Request::Enroll {
            course: "c1".into(),
        })
        .unwrap_err();
    assert_eq!(code(err), ErrorCode::AlreadyEnrolled);

    assert_eq!(
        faculty
            .request(Request::ListCourseEnrollments {
                course: "c1".into()
            })
            .unwrap(),
        "Enrollments for Course c1:\n1. s1\n"
    );
    assert_eq!(
        faculty.request(Request::ListFacultyCourses).unwrap(),
        "Courses Offered by Faculty f1:\n1. ID: c1, Name: Algebra, Seats: 5, Enrolled: 1\n"
    );

    student.logout().unwrap();
    faculty.logout().unwrap();
}

#[test]
fn requests_outside_the_role_are_denied() {
    let (addr, _dir) = start(SharedQueueThreadPool::new(2).unwrap());

    let mut student = login(addr, Role::Student, "s1", "pass1");
    let err = student
        .request(Request::AddStudent {
            id: "s2".into(),
            name: "Jane".into(),
            password: "pw".into(),
        })
        .unwrap_err();
    assert_eq!(code(err), ErrorCode::PermissionDenied);

    // the session survives a rejected request
    assert!(student.request(Request::ListCourses).is_ok());
}

#[test]
fn bad_login_and_anonymous_requests() {
    let (addr, _dir) = start(ThreadPerConnection::new(0).unwrap());

    let mut client = RegistryClient::connect(addr).unwrap();
    let err = client.login(Role::Admin, "admin1", "wrong").unwrap_err();
    assert_eq!(code(err), ErrorCode::NotAuthenticated);
    let err = client.request(Request::ListStudents).unwrap_err();
    assert_eq!(code(err), ErrorCode::NotAuthenticated);

    client.login(Role::Admin, "admin1", "adminpass").unwrap();
    assert_eq!(
        client.request(Request::ListStudents).unwrap(),
        "All Students:\n1. ID: s1, Name: John, Status: Active\n"
    );
}

#[test]
fn admin_provisions_a_student_who_can_log_in() {
    let (addr, _dir) = start(ThreadPerConnection::new(0).unwrap());

    let mut admin = login(addr, Role::Admin, "admin1", "adminpass");
    admin
        .request(Request::AddStudent {
            id: "s2".into(),
            name: "Jane Doe".into(),
            password: "secret".into(),
        })
        .unwrap();
    let err = admin
        .request(Request::AddStudent {
            id: "s2".into(),
            name: "Jane Doe".into(),
            password: "secret".into(),
        })
        .unwrap_err();
    assert_eq!(code(err), ErrorCode::DuplicateKey);

    let mut student = login(addr, Role::Student, "s2", "secret");
    student
        .request(Request::ChangePassword {
            password: "better".into(),
        })
        .unwrap();
    student.logout().unwrap();

    let mut client = RegistryClient::connect(addr).unwrap();
    assert!(client.login(Role::Student, "s2", "secret").is_err());
    assert!(client.login(Role::Student, "s2", "better").is_ok());
}
