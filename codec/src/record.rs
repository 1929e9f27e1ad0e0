//! The contract every format record implements.

use bytestream::{ByteReader, ByteWriter};

use crate::error::CodecResult;
use crate::session::{Checkpoint, ReadSession, WriteSession};

/// A structured record that reads itself from and writes itself to a cursor.
///
/// Positions are relative to the cursor's frame, so a record written into an
/// embedded sub-file needs no knowledge of where that file sits in its parent.
pub trait Record: Sized {
    /// Reads a record at the reader's position.
    fn read(reader: &mut ByteReader<'_>, session: &mut ReadSession) -> CodecResult<Self>;

    /// Writes the record at the writer's position.
    fn write(&self, writer: &mut ByteWriter<'_>, session: &mut WriteSession) -> CodecResult<()>;

    /// Writes the record again at `at`, once a derived field (a size, a count,
    /// an end offset) is known, then returns to where writing left off.
    ///
    /// The default re-runs [`write`](Self::write), which suits records whose
    /// fields are all immediate values.
    fn rewrite(
        &self,
        writer: &mut ByteWriter<'_>,
        session: &mut WriteSession,
        at: Checkpoint,
    ) -> CodecResult<()> {
        session.rewrite_at(writer, at, |w, s| self.write(w, s))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CodecConfig;

    #[derive(Debug, PartialEq)]
    struct Chunk {
        size: u32,
        body: Vec<u8>,
    }

    impl Record for Chunk {
        fn read(reader: &mut ByteReader<'_>, _session: &mut ReadSession) -> CodecResult<Self> {
            let size = reader.read::<u32>()?;
            let body = reader.read_bytes(size as usize - 4)?.to_vec();
            Ok(Self { size, body })
        }

        fn write(&self, writer: &mut ByteWriter<'_>, _session: &mut WriteSession) -> CodecResult<()> {
            writer.write(self.size);
            Ok(())
        }
    }

    #[test]
    fn rewrite_updates_size_in_place() {
        let mut buf = Vec::new();
        let mut writer = ByteWriter::new(&mut buf);
        let mut session = WriteSession::new(CodecConfig::for_testing());

        let mut chunk = Chunk {
            size: 0,
            body: vec![9, 8, 7],
        };
        let at = session.checkpoint(&writer);
        chunk.write(&mut writer, &mut session).unwrap();
        writer.write_bytes(&chunk.body);
        chunk.size = writer.tell() as u32;
        chunk.rewrite(&mut writer, &mut session, at).unwrap();
        session.finish().unwrap();

        let mut reader = ByteReader::new(&buf);
        let mut session = ReadSession::new(CodecConfig::for_testing());
        assert_eq!(Chunk::read(&mut reader, &mut session).unwrap(), chunk);
    }
}
