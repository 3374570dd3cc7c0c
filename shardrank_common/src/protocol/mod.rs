//! Line oriented wire protocol spoken between the master and its workers.
//!
//! Both directions are a sequence of newline terminated, comma separated
//! records followed by a literal [END_MARKER] line:
//! - master to worker: one dataset row per line,
//! - worker to master: `<product id>,<score with two decimals>` per line.
//!
//! A line that cannot be decoded into a record is reported as
//! [Frame::Malformed] so the reader can log it and carry on with the stream.

mod codec;
mod io;
mod record;

pub use codec::LineCodec;
pub use io::{
    io_step, read_frame, receive_records, receive_records_after, send_records, write_frame,
};
pub use record::{ScoreRecord, WireRecord};

/// Terminator line of a transmission.
pub const END_MARKER: &str = "END";

/// Longest line accepted by the codec, in bytes.
pub const MAX_LINE_LENGTH: usize = 64 * 1024;

/// Separator between the fields of a record.
pub const FIELD_SEPARATOR: char = ',';

/// One decoded line.
#[derive(Debug, Clone, PartialEq)]
pub enum Frame<R> {
    Record(R),
    /// A line which is neither a valid record nor the end marker.
    /// Only ever decoded, encoding one is refused.
    Malformed { line: String, reason: String },
    End,
}

impl<R: WireRecord> Frame<R> {
    /// Classify a line received from the peer, without its trailing newline.
    pub fn parse(line: &str) -> Self {
        if line.trim_end() == END_MARKER {
            return Self::End;
        }
        match R::decode(line) {
            Ok(record) => Self::Record(record),
            Err(e) => Self::Malformed {
                line: line.to_owned(),
                reason: e.to_string(),
            },
        }
    }
}
