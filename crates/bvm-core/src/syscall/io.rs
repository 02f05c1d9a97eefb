//! Host streams handed to library routines

use std::cell::RefCell;
use std::io::{self, BufRead, Cursor, Write};
use std::rc::Rc;

/// Output and input streams owned by one VM instance
pub struct HostIo {
    pub out: Box<dyn Write>,
    pub input: Box<dyn BufRead>,
}

impl Default for HostIo {
    fn default() -> Self {
        HostIo {
            out: Box::new(io::stdout()),
            input: Box::new(io::BufReader::new(io::stdin())),
        }
    }
}

impl std::fmt::Debug for HostIo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HostIo").finish_non_exhaustive()
    }
}

impl HostIo {
    /// In-memory streams: `input` is read by the program and everything it
    /// writes lands in the returned buffer.
    pub fn capture(input: &str) -> (Self, SharedBuffer) {
        let buffer = SharedBuffer::default();
        let io = HostIo {
            out: Box::new(buffer.clone()),
            input: Box::new(Cursor::new(input.as_bytes().to_vec())),
        };
        (io, buffer)
    }

    /// Next whitespace-delimited word from the input stream, if any.
    pub fn read_word(&mut self) -> io::Result<Option<String>> {
        let mut word = Vec::new();
        loop {
            let (consumed, done) = {
                let buf = self.input.fill_buf()?;
                if buf.is_empty() {
                    break;
                }
                let mut consumed = 0;
                let mut done = false;
                for byte in buf {
                    consumed += 1;
                    if byte.is_ascii_whitespace() {
                        if !word.is_empty() {
                            done = true;
                            break;
                        }
                    } else {
                        word.push(*byte);
                    }
                }
                (consumed, done)
            };
            self.input.consume(consumed);
            if done {
                break;
            }
        }
        if word.is_empty() {
            Ok(None)
        } else {
            Ok(Some(String::from_utf8_lossy(&word).into_owned()))
        }
    }
}

/// Cloneable in-memory writer
#[derive(Debug, Clone, Default)]
pub struct SharedBuffer(Rc<RefCell<Vec<u8>>>);

impl SharedBuffer {
    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.borrow()).into_owned()
    }
}

impl Write for SharedBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.borrow_mut().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}
