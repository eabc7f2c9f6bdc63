//! The academia-client executable logs in and sends one request per invocation:
//!
//! `academia-client --role <ROLE> --user <ID> --password <PASSWORD> [--addr IP-PORT]
//!     <COMMAND> [ARGS]`
//!
//!     --role is one of admin, faculty or student.
//!     --addr accepts an IP address, either v4 or v6, and a port number, with the format IP:PORT.
//!     If --addr is not specified then connect on 127.0.0.1:8080.
//!     The server's message is printed to stdout. A failed login, a rejected request, or an
//!     IP-PORT that does not parse prints an error and returns a non-zero exit code.
//!
//! Admin commands: add-student, add-faculty, activate-student, block-student, update-student,
//! update-faculty, list-students, list-faculty
//!
//! Faculty commands: add-course, update-course, remove-course, list-faculty-courses,
//! list-course-enrollments, list-courses
//!
//! Student commands: list-courses, enroll, unenroll, list-student-enrollments
//!
//! Any role: change-password
//!
//! `academia-client -V`
//!
//!     Print the version.

use std::net::SocketAddr;
use std::process::exit;

use academia::config::DEFAULT_ADDRESS;
use academia::{RegistryClient, RegistryError, Request, Result, Role};
use clap::{crate_version, App, AppSettings, Arg, ArgMatches, SubCommand};

/// ['Opt'] holds parsed and validated options from the command line
#[derive(Debug)]
struct Opt {
    /// the server's ip:port
    addr: SocketAddr,
    role: Role,
    user: String,
    password: String,
    req: Request,
}

fn main() {
    let id = || Arg::with_name("ID").required(true).index(1);
    let name = || Arg::with_name("NAME").required(true).index(2);
    let password = || Arg::with_name("PASSWORD").required(true).index(3);
    let course = || Arg::with_name("COURSE").required(true).index(1);
    let seats = || Arg::with_name("SEATS").required(true).index(3);

    let matches = App::new("academia-client")
        .version(crate_version!())
        .author("strohs <strohs1@gmail.com>")
        .about("a client for the academia course registration server")
        .setting(AppSettings::SubcommandRequiredElseHelp)
        .subcommands(vec![
            SubCommand::with_name("add-student")
                .about("(admin) Provision a student account")
                .args(&[id(), name(), password()]),
            SubCommand::with_name("add-faculty")
                .about("(admin) Provision a faculty account")
                .args(&[id(), name(), password()]),
            SubCommand::with_name("activate-student")
                .about("(admin) Allow a student to enroll")
                .arg(id()),
            SubCommand::with_name("block-student")
                .about("(admin) Stop a student from enrolling")
                .arg(id()),
            SubCommand::with_name("update-student")
                .about("(admin) Rename a student")
                .args(&[id(), name()]),
            SubCommand::with_name("update-faculty")
                .about("(admin) Rename a faculty member")
                .args(&[id(), name()]),
            SubCommand::with_name("list-students").about("(admin) List every student"),
            SubCommand::with_name("list-faculty").about("(admin) List every faculty member"),
            SubCommand::with_name("add-course")
                .about("(faculty) Offer a new course")
                .args(&[id(), name(), seats()]),
            SubCommand::with_name("update-course")
                .about("(faculty) Rename a course and set its seat count")
                .args(&[id(), name(), seats()]),
            SubCommand::with_name("remove-course")
                .about("(faculty) Remove a course and every enrollment in it")
                .arg(id()),
            SubCommand::with_name("list-faculty-courses")
                .about("(faculty) List the courses you offer"),
            SubCommand::with_name("list-course-enrollments")
                .about("(faculty) List the students enrolled in a course")
                .arg(course()),
            SubCommand::with_name("list-courses").about("(faculty, student) List every course"),
            SubCommand::with_name("enroll")
                .about("(student) Enroll in a course")
                .arg(course()),
            SubCommand::with_name("unenroll")
                .about("(student) Drop a course")
                .arg(course()),
            SubCommand::with_name("list-student-enrollments")
                .about("(student) List the courses you are enrolled in"),
            SubCommand::with_name("change-password")
                .about("Change your password")
                .arg(Arg::with_name("NEW_PASSWORD").required(true).index(1)),
        ])
        .arg(
            Arg::with_name("addr")
                .long("addr")
                .value_name("IP_ADDR:PORT")
                .help("sets the IP_ADDR:PORT of the server to connect to")
                .default_value(DEFAULT_ADDRESS),
        )
        .arg(
            Arg::with_name("role")
                .long("role")
                .value_name("ROLE")
                .help("the role to log in as: admin, faculty or student")
                .possible_values(&["admin", "faculty", "student"])
                .required(true),
        )
        .arg(
            Arg::with_name("user")
                .long("user")
                .value_name("ID")
                .help("the user identifier to log in with")
                .required(true),
        )
        .arg(
            Arg::with_name("password")
                .long("password")
                .value_name("PASSWORD")
                .help("the password to log in with")
                .required(true),
        )
        .get_matches();

    // parse commands into an Opt struct, then run the request
    let result = parse_options(&matches).and_then(run);
    match result {
        Ok(message) => print!("{}", with_newline(message)),
        Err(e) => {
            eprintln!("{}", e);
            exit(1);
        }
    }
}

/// logs in, runs the request from `opt` and logs out again
fn run(opt: Opt) -> Result<String> {
    let mut client = RegistryClient::connect(opt.addr)?;
    client.login(opt.role, &opt.user, &opt.password)?;
    let message = client.request(opt.req)?;
    client.logout()?;
    Ok(message)
}

/// parses the matches from the command line into an [`Opt`] struct
fn parse_options(matches: &ArgMatches) -> Result<Opt> {
    let addr = value(matches, "addr")?;
    let addr: SocketAddr = addr.parse().map_err(|_| {
        RegistryError::Parsing(format!(
            "could not parse {} into an IP address and port",
            &addr
        ))
    })?;
    let role: Role = value(matches, "role")?.parse()?;

    let req = match matches.subcommand() {
        ("add-student", Some(args)) => Request::AddStudent {
            id: value(args, "ID")?,
            name: value(args, "NAME")?,
            password: value(args, "PASSWORD")?,
        },
        ("add-faculty", Some(args)) => Request::AddFaculty {
            id: value(args, "ID")?,
            name: value(args, "NAME")?,
            password: value(args, "PASSWORD")?,
        },
        ("activate-student", Some(args)) => Request::ActivateStudent {
            id: value(args, "ID")?,
        },
        ("block-student", Some(args)) => Request::BlockStudent {
            id: value(args, "ID")?,
        },
        ("update-student", Some(args)) => Request::UpdateStudent {
            id: value(args, "ID")?,
            name: value(args, "NAME")?,
        },
        ("update-faculty", Some(args)) => Request::UpdateFaculty {
            id: value(args, "ID")?,
            name: value(args, "NAME")?,
        },
        ("list-students", _) => Request::ListStudents,
        ("list-faculty", _) => Request::ListFaculty,
        ("add-course", Some(args)) => Request::AddCourse {
            id: value(args, "ID")?,
            name: value(args, "NAME")?,
            seats: seats(args)?,
        },
        ("update-course", Some(args)) => Request::UpdateCourse {
            id: value(args, "ID")?,
            name: value(args, "NAME")?,
            seats: seats(args)?,
        },
        ("remove-course", Some(args)) => Request::RemoveCourse {
            id: value(args, "ID")?,
        },
        ("list-faculty-courses", _) => Request::ListFacultyCourses,
        ("list-course-enrollments", Some(args)) => Request::ListCourseEnrollments {
            course: value(args, "COURSE")?,
        },
        ("list-courses", _) => Request::ListCourses,
        ("enroll", Some(args)) => Request::Enroll {
            course: value(args, "COURSE")?,
        },
        ("unenroll", Some(args)) => Request::Unenroll {
            course: value(args, "COURSE")?,
        },
        ("list-student-enrollments", _) => Request::ListStudentEnrollments,
        ("change-password", Some(args)) => Request::ChangePassword {
            password: value(args, "NEW_PASSWORD")?,
        },
        (other, _) => {
            return Err(RegistryError::Parsing(format!(
                "unknown command received: {}",
                other
            )))
        }
    };

    Ok(Opt {
        addr,
        role,
        user: value(matches, "user")?,
        password: value(matches, "password")?,
        req,
    })
}

fn value(matches: &ArgMatches, name: &str) -> Result<String> {
    matches
        .value_of(name)
        .map(String::from)
        .ok_or_else(|| RegistryError::Parsing(format!("missing argument {}", name)))
}

fn seats(args: &ArgMatches) -> Result<u32> {
    let seats = value(args, "SEATS")?;
    seats
        .parse()
        .map_err(|_| RegistryError::Parsing(format!("{} is not a seat count", seats)))
}

fn with_newline(mut message: String) -> String {
    if !message.ends_with('\n') {
        message.push('\n');
    }
    message
}
