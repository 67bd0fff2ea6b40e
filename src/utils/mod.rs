mod fs;
mod hash;

pub use fs::{BUFFER_SIZE, CopyFailure, copy_buffered, extraction_dir, files_equal, remove_dir_if_exists};
pub use hash::compute_file_hash;
