pub mod porta_http;
pub mod source;
pub mod usage_dump_file;
