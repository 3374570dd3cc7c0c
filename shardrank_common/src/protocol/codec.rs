use ::std::marker::PhantomData;

use ::anyhow::anyhow;
use ::bytes::{Bytes, BytesMut};
use ::tokio_util::codec::{AnyDelimiterCodec, Decoder, Encoder};

use super::{Frame, WireRecord, END_MARKER, MAX_LINE_LENGTH};
use crate::error::ShardRankError;

const LINE_DELIMITER: &[u8] = b"\n";

/// Codec turning a byte stream into [Frame]s of records of type `R`.
/// Lines are delimited by `\n`, a trailing `\r` is dropped.
/// Lines are split before any text decoding, so a line which is not utf-8
/// is a [Frame::Malformed] like any other undecodable line.
#[derive(Debug)]
pub struct LineCodec<R> {
    lines: AnyDelimiterCodec,
    record: PhantomData<fn() -> R>,
}

impl<R> LineCodec<R> {
    pub fn new() -> Self {
        Self {
            lines: AnyDelimiterCodec::new_with_max_length(
                LINE_DELIMITER.to_vec(),
                LINE_DELIMITER.to_vec(),
                MAX_LINE_LENGTH,
            ),
            record: PhantomData,
        }
    }
}

impl<R> Default for LineCodec<R> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R: WireRecord> LineCodec<R> {
    fn frame(chunk: Bytes) -> Frame<R> {
        let line = chunk.strip_suffix(b"\r").unwrap_or(&chunk[..]);
        match std::str::from_utf8(line) {
            Ok(line) => Frame::parse(line),
            Err(e) => Frame::Malformed {
                line: String::from_utf8_lossy(line).into_owned(),
                reason: e.to_string(),
            },
        }
    }
}

impl<R: WireRecord> Decoder for LineCodec<R> {
    type Item = Frame<R>;
    type Error = ShardRankError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        Ok(self.lines.decode(src)?.map(Self::frame))
    }

    fn decode_eof(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        Ok(self.lines.decode_eof(src)?.map(Self::frame))
    }
}

impl<R: WireRecord> Encoder<Frame<R>> for LineCodec<R> {
    type Error = ShardRankError;

    fn encode(&mut self, frame: Frame<R>, dst: &mut BytesMut) -> Result<(), Self::Error> {
        let line = match frame {
            Frame::Record(record) => record.encode(),
            Frame::End => END_MARKER.to_owned(),
            Frame::Malformed { line, .. } => {
                return Err(ShardRankError::not_allowed(anyhow!(
                    "refuse to send malformed line {:?}",
                    line
                )))
            }
        };
        Ok(self.lines.encode(line, dst)?)
    }
}
