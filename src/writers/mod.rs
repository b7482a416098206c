//! Writer backends

pub mod async_writer;
pub mod console;
pub mod file;
pub mod lock_free;
pub mod memory;
pub mod multi;
pub mod rotating_file;
pub mod thread_local;

pub use async_writer::AsyncWriter;
pub use console::{StderrWriter, StdoutWriter};
pub use file::{BufferedFileWriter, FileWriter, DEFAULT_FILE_BUFFER_SIZE};
pub use lock_free::{LockFreeConfig, LockFreeWriter, RingPositions};
pub use memory::MemoryWriter;
pub use multi::MultiWriter;
pub use rotating_file::{RotatingFileWriter, RotationPolicy};
pub use thread_local::{ThreadLocalWriter, THREAD_SLOTS};
