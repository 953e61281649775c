use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;

use braid_core::Observer;
use braid_driver::{Action, Event};
use tracing::warn;

use crate::Record;

/// Writes one JSON line per evaluated point.
///
/// Write errors never reach the driver. They are logged and counted, and the
/// run continues without the lost record.
#[derive(Debug)]
pub struct Recorder<W: Write> {
    writer: W,
    written: usize,
    errors: usize,
}

impl Recorder<BufWriter<File>> {
    /// Creates a recorder writing to a new file at `path`.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be created.
    pub fn create(path: impl AsRef<Path>) -> io::Result<Self> {
        Ok(Self::new(BufWriter::new(File::create(path)?)))
    }
}

impl<W: Write> Recorder<W> {
    pub fn new(writer: W) -> Self {
        Self {
            writer,
            written: 0,
            errors: 0,
        }
    }

    /// Returns the number of records written.
    #[must_use]
    pub fn written(&self) -> usize {
        self.written
    }

    /// Returns the number of records lost to write errors.
    #[must_use]
    pub fn errors(&self) -> usize {
        self.errors
    }

    /// Flushes and returns the writer.
    ///
    /// # Errors
    ///
    /// Returns an error if the final flush fails.
    pub fn into_inner(mut self) -> io::Result<W> {
        self.writer.flush()?;
        Ok(self.writer)
    }

    fn write(&mut self, record: &Record) -> io::Result<()> {
        serde_json::to_writer(&mut self.writer, record)?;
        self.writer.write_all(b"\n")
    }
}

impl<'e, W: Write> Observer<Event<'e>, Action> for Recorder<W> {
    fn observe(&mut self, event: &Event<'e>) -> Option<Action> {
        let record = Record::from_event(event)?;
        match self.write(&record) {
            Ok(()) => self.written += 1,
            Err(error) => {
                self.errors += 1;
                warn!(coord = %record.coord, %error, "failed to record evaluation");
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use braid_core::{FunctionDict, Metadata, Point};
    use ndarray::array;

    /// A writer that always fails.
    struct Broken;

    impl Write for Broken {
        fn write(&mut self, _buf: &[u8]) -> io::Result<usize> {
            Err(io::Error::other("disk full"))
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    fn evaluated<O: for<'e> Observer<Event<'e>, Action>>(observer: &mut O, iteration: usize) {
        let mut metadata = Metadata::new("IPOPT");
        metadata.update(iteration);
        let point = Point::from([("x".to_owned(), array![1.0, 2.0])]);
        let values = FunctionDict::from([("f".to_owned(), array![5.0])]);
        observer.observe(&Event::Evaluated {
            metadata: &metadata,
            point: &point,
            values: &values,
        });
    }

    #[test]
    fn writes_one_json_line_per_evaluation() {
        let mut recorder = Recorder::new(Vec::new());
        evaluated(&mut recorder, 1);
        evaluated(&mut recorder, 2);
        assert_eq!(recorder.written(), 2);

        let bytes = recorder.into_inner().unwrap();
        let text = String::from_utf8(bytes).unwrap();
        let records: Vec<Record> = text
            .lines()
            .map(|line| serde_json::from_str(line).unwrap())
            .collect();

        assert_eq!(records.len(), 2);
        assert_eq!(records[1].coord, "IPOPT|2");
        assert_eq!(records[1].point["x"], [1.0, 2.0]);
        assert_eq!(records[1].value("f"), Some(5.0));
    }

    #[test]
    fn write_errors_are_counted_not_raised() {
        let mut recorder = Recorder::new(Broken);
        evaluated(&mut recorder, 1);

        assert_eq!(recorder.written(), 0);
        assert_eq!(recorder.errors(), 1);
    }
}
