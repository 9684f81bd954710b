use std::fs;
use std::io::{BufRead, BufReader, Read, Write};
use std::os::unix::net::{UnixListener, UnixStream};
use std::path::{Path, PathBuf};
use std::thread::{self, JoinHandle};

use colored::Colorize;
use crossbeam_channel::Sender;

use super::{ApiError, ApiResult, ApiTransport, Command};
use crate::{print_error, print_info};

const SOCKET_FILE_NAME: &str = "gameportd.sock";

/// Largest encoded command accepted from a client.
const MAX_COMMAND_LEN: usize = 1024;

pub(crate) struct UnixSocket {
    socket_path: PathBuf,
}

impl UnixSocket {
    pub fn new<P: AsRef<Path>>(runtime_dir: P) -> Self {
        let socket_path = runtime_dir.as_ref().join(SOCKET_FILE_NAME);

        Self { socket_path }
    }

    pub fn path(&self) -> &Path {
        &self.socket_path
    }

    /// Remove the socket file left by [`listen_events`](ApiTransport::listen_events).
    pub fn remove(&self) {
        if self.socket_path.exists() {
            let _ = fs::remove_file(&self.socket_path);
        }
    }
}

impl UnixSocket {
    fn read_command(stream: &mut UnixStream) -> ApiResult<Command> {
        let mut length_buffer = [0u8; 4];
        stream.read_exact(&mut length_buffer)?;

        let length = u32::from_be_bytes(length_buffer) as usize;
        if length == 0 || length > MAX_COMMAND_LEN {
            return Err(ApiError::Rejected(format!("bad length {length}")));
        }

        let mut data_buffer = vec![0u8; length];
        stream.read_exact(&mut data_buffer)?;

        Ok(bitcode::decode(&data_buffer)?)
    }

    fn handle_connection(mut stream: UnixStream, tx: &Sender<Command>) {
        match Self::read_command(&mut stream) {
            Ok(command) => {
                if tx.send(command).is_ok() {
                    let _ = stream.write_all(b"OK\n");
                } else {
                    let _ = stream.write_all(b"ERR daemon is shutting down\n");
                }
            }
            Err(err) => {
                print_error!("failed to read command: {err}");
                let _ = stream.write_all(format!("ERR {err}\n").as_bytes());
            }
        }
    }
}

impl ApiTransport for UnixSocket {
    fn listen_events(&self, tx: Sender<Command>) -> ApiResult<JoinHandle<()>> {
        let socket_path = self.socket_path.clone();
        if socket_path.exists() {
            fs::remove_file(&socket_path)?;
        }
        let listener = UnixListener::bind(&socket_path)?;
        print_info!("control socket listening at {}", socket_path.display());

        let handle = thread::Builder::new()
            .name("gameportd-socket-api".into())
            .spawn(move || {
                for stream in listener.incoming() {
                    match stream {
                        Ok(stream) => {
                            Self::handle_connection(stream, &tx);
                        }
                        Err(e) => {
                            print_error!("control socket accept error: {}", e);
                            break;
                        }
                    }
                }
            })?;
        Ok(handle)
    }

    fn send_event(&self, event: &Command) -> ApiResult<()> {
        let mut stream = UnixStream::connect(&self.socket_path)?;
        let encoded = bitcode::encode(event);
        let length = encoded.len() as u32;
        stream.write_all(&length.to_be_bytes())?;
        stream.write_all(&encoded)?;
        stream.flush()?;

        let mut reply = String::new();
        BufReader::new(stream).read_line(&mut reply)?;
        match reply.trim_end().strip_prefix("ERR ") {
            Some(reason) => Err(ApiError::Rejected(reason.to_owned())),
            None => Ok(()),
        }
    }
}
