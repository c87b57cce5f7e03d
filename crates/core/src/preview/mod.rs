pub mod preview_sink;
pub mod snapshot_writer;
