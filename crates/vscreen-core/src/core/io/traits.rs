use crate::core::models::molecule::Molecule;
use std::error::Error;
use std::fs::File;
use std::io::{self, BufRead, BufReader, BufWriter, Write};
use std::path::Path;

/// Line-oriented reader with one line of lookahead and a 1-based line counter.
///
/// Multi-record formats (SDF, MOL2, multi-model PDB) need to peek at the
/// next record header without consuming it; every parser in this module
/// reads through this type so that errors can report the offending line.
pub struct LineReader<R> {
    inner: R,
    peeked: Option<String>,
    line: usize,
}

impl<R: BufRead> LineReader<R> {
    pub fn new(inner: R) -> Self {
        Self {
            inner,
            peeked: None,
            line: 0,
        }
    }

    /// Number of the most recently consumed line (0 before the first read).
    pub fn line_number(&self) -> usize {
        self.line
    }

    fn read_raw(&mut self) -> io::Result<Option<String>> {
        let mut buf = String::new();
        if self.inner.read_line(&mut buf)? == 0 {
            return Ok(None);
        }
        while buf.ends_with('\n') || buf.ends_with('\r') {
            buf.pop();
        }
        Ok(Some(buf))
    }

    /// Consumes and returns the next line without its terminator.
    pub fn next_line(&mut self) -> io::Result<Option<String>> {
        let line = match self.peeked.take() {
            Some(line) => Some(line),
            None => self.read_raw()?,
        };
        if line.is_some() {
            self.line += 1;
        }
        Ok(line)
    }

    pub fn peek_line(&mut self) -> io::Result<Option<&str>> {
        if self.peeked.is_none() {
            self.peeked = self.read_raw()?;
        }
        Ok(self.peeked.as_deref())
    }

    /// Skips lines until one whose trimmed content equals `terminator` has been consumed.
    pub fn skip_past(&mut self, terminator: &str) -> io::Result<()> {
        while let Some(line) = self.next_line()? {
            if line.trim() == terminator {
                break;
            }
        }
        Ok(())
    }

    /// Returns `true` when only blank lines remain.
    pub fn at_end(&mut self) -> io::Result<bool> {
        loop {
            match self.peek_line()? {
                None => return Ok(true),
                Some(line) if line.trim().is_empty() => {
                    self.next_line()?;
                }
                Some(_) => return Ok(false),
            }
        }
    }
}

/// Defines the interface for reading and writing molecular file formats.
///
/// Readers are record oriented: `read_next` parses exactly one molecule so
/// that large libraries can be streamed. The returned molecules are raw
/// (not yet perceived); callers decide when to run perception.
pub trait MolecularFile {
    /// The error type for I/O operations.
    type Error: Error + From<io::Error>;

    /// Reads the next molecule, or `Ok(None)` once the input is exhausted.
    ///
    /// # Errors
    ///
    /// Returns an error if parsing fails or I/O operations encounter issues.
    fn read_next<R: BufRead>(reader: &mut LineReader<R>) -> Result<Option<Molecule>, Self::Error>;

    /// Writes a single molecule record to a writer.
    ///
    /// # Errors
    ///
    /// Returns an error if writing fails.
    fn write_to(molecule: &Molecule, writer: &mut impl Write) -> Result<(), Self::Error>;

    /// Reads every molecule from a buffered reader.
    fn read_from(reader: impl BufRead) -> Result<Vec<Molecule>, Self::Error> {
        let mut reader = LineReader::new(reader);
        let mut molecules = Vec::new();
        while let Some(molecule) = Self::read_next(&mut reader)? {
            molecules.push(molecule);
        }
        Ok(molecules)
    }

    /// Reads every molecule from a file path.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be opened or parsing fails.
    fn read_from_path<P: AsRef<Path>>(path: P) -> Result<Vec<Molecule>, Self::Error> {
        let file = File::open(path)?;
        Self::read_from(BufReader::new(file))
    }

    /// Writes molecules one after another to a file path.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be created or writing fails.
    fn write_to_path<P: AsRef<Path>>(molecules: &[Molecule], path: P) -> Result<(), Self::Error> {
        let file = File::create(path)?;
        let mut writer = BufWriter::new(file);
        for molecule in molecules {
            Self::write_to(molecule, &mut writer)?;
        }
        writer.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn line_reader_tracks_line_numbers_and_peeks() {
        let mut reader = LineReader::new(Cursor::new("a\r\nb\nc"));
        assert_eq!(reader.peek_line().unwrap(), Some("a"));
        assert_eq!(reader.line_number(), 0);
        assert_eq!(reader.next_line().unwrap().as_deref(), Some("a"));
        assert_eq!(reader.next_line().unwrap().as_deref(), Some("b"));
        assert_eq!(reader.line_number(), 2);
        assert_eq!(reader.next_line().unwrap().as_deref(), Some("c"));
        assert_eq!(reader.next_line().unwrap(), None);
        assert_eq!(reader.line_number(), 3);
    }

    #[test]
    fn skip_past_consumes_the_terminator() {
        let mut reader = LineReader::new(Cursor::new("x\n$$$$\ny\n"));
        reader.skip_past("$$$$").unwrap();
        assert_eq!(reader.next_line().unwrap().as_deref(), Some("y"));
    }

    #[test]
    fn at_end_ignores_trailing_blank_lines() {
        let mut reader = LineReader::new(Cursor::new("\n  \n"));
        assert!(reader.at_end().unwrap());
        let mut reader = LineReader::new(Cursor::new("\nz\n"));
        assert!(!reader.at_end().unwrap());
        assert_eq!(reader.next_line().unwrap().as_deref(), Some("z"));
    }
}
