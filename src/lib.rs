#![deny(missing_docs)]
//! A multi-role course registration server whose data lives in four fixed-record flat files.
//!
//! This crate provides the [`FileRegistry`] engine itself, as well as an [`academia-client`]
//! and [`academia-server`] executable that can be used to interact with it.
//! Requests are sent between the client and server using synchronous networking over a
//! custom protocol.
//!
//! ## Roles
//! Every connection logs in as one of three roles (see [`Role`]):
//!
//! - an **admin** provisions students and faculty, blocks or activates students and renames them
//! - a **faculty** member offers, updates and removes their own courses
//! - a **student** enrolls in and drops courses
//!
//! Everyone can change their own password. See the [`RegistryEngine`] trait and the
//! [`Request`] and [`Response`] types for the full list of operations.
//!
//! ## Storage
//! Users, students, faculty and courses are kept in `users.dat`, `students.dat`,
//! `faculty.dat` and `courses.dat` inside the data directory. Each file is a plain
//! concatenation of fixed-size little-endian records with NUL padded strings, see
//! [`storage::Record`]. There is no header and no index: lookups scan the file.
//!
//! Access to a file goes through a [`storage::LockedFile`], which serializes the threads of
//! this process and holds an advisory OS lock (shared for reads, exclusive for writes) so
//! other processes see whole records only. Deletes rewrite the surviving records into a
//! temporary file and rename it over the original.
//!
//! ## Enrollment
//! A student keeps up to 100 course identifiers in a slot array, and a course keeps its
//! enrolled students in a dense list bounded by its seat count. [`Enrollment`] keeps the two
//! sides reciprocal: enroll holds the students file and then the courses file for the whole
//! update, so a course never goes over its seat count. [`Cascade`] removes a course and then
//! clears the slots that pointed at it.
//!
//! ## Client / Server
//! Client and server logic is contained in the [`client`] and [`server`] structs. A request
//! is a [`Request`] encoded as JSON; the server answers every request with a [`Response`]
//! that carries either the text to show the user or an [`ErrorCode`] and message.
//! Sessions are run on a [`thread_pool::ThreadPool`], one thread per connection by default.
//!
//! [`client`]: ./struct.RegistryClient.html
//! [`server`]: ./struct.RegistryServer.html
//! [`academia-server`]: ./academia-server.rs
//! [`academia-client`]: ./academia-client.rs

pub use cascade::Cascade;
pub use client::RegistryClient;
pub use command::{ErrorCode, Request, Response};
pub use config::StoreConfig;
pub use engine::{FileRegistry, RegistryEngine};
pub use enrollment::Enrollment;
pub use error::{RegistryError, Result};
pub use model::{Course, Faculty, Role, Student, User};
pub use server::RegistryServer;
pub use slots::{DenseList, SlotArray};

mod cascade;
mod client;
mod command;
pub mod config;
mod engine;
mod enrollment;
mod error;
mod model;
mod server;
mod slots;
pub mod storage;
pub mod thread_pool;
mod validate;
