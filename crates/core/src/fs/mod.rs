pub mod atomic_write;

pub use atomic_write::AtomicFile;
