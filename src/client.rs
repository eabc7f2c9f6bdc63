use std::io::{BufReader, BufWriter, Write};
use std::net::{TcpStream, ToSocketAddrs};

use serde::Deserialize;
use serde_json::de::IoRead;
use serde_json::Deserializer;

use crate::command::{Request, Response};
use crate::model::Role;
use crate::{RegistryError, Result};

/// `RegistryClient` contains the functionality for communication with a
/// [`RegistryServer`](crate::RegistryServer)
pub struct RegistryClient {
    reader: Deserializer<IoRead<BufReader<TcpStream>>>,
    writer: BufWriter<TcpStream>,
}

impl RegistryClient {
    /// creates a client and establishes a socket connection to the server at the given `addr`
    pub fn connect<A: ToSocketAddrs>(addr: A) -> Result<Self> {
        let tcp_reader = TcpStream::connect(addr)?;
        let tcp_writer = tcp_reader.try_clone()?;

        Ok(RegistryClient {
            reader: Deserializer::from_reader(BufReader::new(tcp_reader)),
            writer: BufWriter::new(tcp_writer),
        })
    }

    /// authenticates this connection, every other request needs a successful login first
    pub fn login(&mut self, role: Role, id: &str, password: &str) -> Result<String> {
        self.request(Request::Login {
            role,
            id: id.to_string(),
            password: password.to_string(),
        })
    }

    /// ends the session; the server closes the connection after answering
    pub fn logout(mut self) -> Result<String> {
        self.request(Request::Logout)
    }

    /// sends `req` to the server and waits for its response
    /// # Returns
    /// the server's message if the request succeeded
    /// # Errors
    /// `RegistryError::Server` carrying the code and message of an error response, or an IO
    /// error if the connection failed
    pub fn request(&mut self, req: Request) -> Result<String> {
        serde_json::to_writer(&mut self.writer, &req)?;
        self.writer.flush()?;

        match Response::deserialize(&mut self.reader)? {
            Response::Ok(message) => Ok(message),
            Response::Err { code, message } => Err(RegistryError::Server { code, message }),
        }
    }
}
