use anyhow::Context;
use spectracore::stream::DecodedBlock;
use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::Path;

use super::{BlockSource, Received};

/// Decoded blocks serialized one JSON object per line.
pub struct JsonlSource<R: BufRead> {
    reader: R,
    line: Vec<u8>,
    line_number: u64,
}

impl<R: BufRead> JsonlSource<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            line: Vec::new(),
            line_number: 0,
        }
    }
}

/// Opens `path`, or standard input for `None` and `-`.
pub fn open(path: Option<&Path>) -> anyhow::Result<Box<dyn BlockSource>> {
    match path {
        Some(path) if path != Path::new("-") => {
            let file = File::open(path)
                .with_context(|| format!("opening block stream {}", path.display()))?;
            Ok(Box::new(JsonlSource::new(BufReader::new(file))))
        }
        _ => Ok(Box::new(JsonlSource::new(io::stdin().lock()))),
    }
}

impl<R: BufRead> BlockSource for JsonlSource<R> {
    fn receive(&mut self) -> anyhow::Result<Option<Received>> {
        loop {
            self.line.clear();
            let read = self
                .reader
                .read_until(b'\n', &mut self.line)
                .context("reading block stream")?;
            if read == 0 {
                return Ok(None);
            }
            self.line_number += 1;

            if self.line.iter().all(u8::is_ascii_whitespace) {
                continue;
            }
            // Invalid UTF-8 surfaces here as a parse error like any other garbage.
            return Ok(Some(match serde_json::from_slice::<DecodedBlock>(&self.line) {
                Ok(block) => Received::Block(block),
                Err(err) => Received::Unrecognized(format!("line {}: {}", self.line_number, err)),
            }));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use spectracore::stream::{BlockPayload, Timestamp};
    use std::io::Cursor;

    #[test]
    fn parses_blocks_and_flags_garbage() {
        let input = concat!(
            r#"{"stream_id":1,"payload":{"kind":"context","sample_rate":4.0,"center_frequency":100.0}}"#,
            "\n",
            "not json at all\n",
            "\n",
            r#"{"stream_id":1,"payload":{"kind":"data","timestamp":{"seconds":5,"picoseconds":0},"words":[1,65535]}}"#,
            "\n",
        );
        let mut source = JsonlSource::new(Cursor::new(input));

        match source.receive().unwrap() {
            Some(Received::Block(block)) => match block.payload {
                BlockPayload::Context(context) => {
                    assert_eq!(context.sample_rate, 4.0);
                    assert_eq!(context.stream_id, 1);
                }
                other => panic!("expected context, got {other:?}"),
            },
            _ => panic!("expected a block"),
        }

        match source.receive().unwrap() {
            Some(Received::Unrecognized(reason)) => assert!(reason.starts_with("line 2:")),
            _ => panic!("expected an unrecognized packet"),
        }

        match source.receive().unwrap() {
            Some(Received::Block(block)) => match block.payload {
                BlockPayload::Data(data) => {
                    assert_eq!(data.timestamp, Timestamp::new(5, 0));
                    assert_eq!(data.words, vec![1, 65535]);
                    assert!(!data.lost_data);
                }
                other => panic!("expected data, got {other:?}"),
            },
            _ => panic!("expected a block"),
        }

        assert!(source.receive().unwrap().is_none());
    }

    #[test]
    fn invalid_utf8_is_skipped_not_fatal() {
        let mut input = b"\xff\xfe garbage\n".to_vec();
        input.extend_from_slice(
            br#"{"stream_id":1,"payload":{"kind":"context","sample_rate":8.0}}"#,
        );
        input.push(b'\n');
        let mut source = JsonlSource::new(Cursor::new(input));

        match source.receive().unwrap() {
            Some(Received::Unrecognized(reason)) => assert!(reason.starts_with("line 1:")),
            _ => panic!("expected an unrecognized packet"),
        }
        match source.receive().unwrap() {
            Some(Received::Block(block)) => {
                assert!(matches!(block.payload, BlockPayload::Context(_)))
            }
            _ => panic!("expected a block"),
        }
        assert!(source.receive().unwrap().is_none());
    }
}
