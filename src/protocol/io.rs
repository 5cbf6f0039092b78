use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::err::ProtError;
use crate::protocol::buffer::PacketBuffer;
use crate::protocol::packets::{parse, Inbound, Outbound};
use crate::protocol::varint::VarInt;
use crate::protocol::{State, Version};

/// Reads framed packets off a socket: `VarInt(size) VarInt(id) body`, where
/// `size` covers the id and the body.
pub(crate) struct PacketReader<R> {
    reader: R,
    max_packet_size: i32,
}

impl<R: AsyncRead + Unpin + Send> PacketReader<R> {
    pub(crate) fn new(reader: R, max_packet_size: i32) -> Self {
        Self {
            reader,
            max_packet_size,
        }
    }

    /// Reads a single packet. Returns `None` for packets the decode table
    /// does not know; their bodies are consumed and discarded so the stream
    /// stays aligned.
    pub(crate) async fn read_packet(
        &mut self,
        state: State,
        version: Version,
    ) -> Result<Option<Inbound>, ProtError> {
        let size = VarInt::read(&mut self.reader).await?;
        if size.value < 0 || size.value > self.max_packet_size {
            return Err(ProtError::PacketTooLarge(size.value));
        }

        let id = VarInt::read(&mut self.reader).await?;
        if (size.value as usize) < id.size() {
            return Err(ProtError::BadPacket(format!(
                "packet size {} smaller than its id",
                size.value
            )));
        }
        let body_len = size.value as usize - id.size();

        let mut buf = PacketBuffer::acquire();
        self.reader.read_exact(buf.body_mut(body_len)).await?;

        parse::decode_packet(state, version, id.value, &mut buf)
    }
}

/// Writes framed packets to a socket. The id and body are staged in a pooled
/// buffer so the length prefix can be computed before anything hits the
/// wire.
pub(crate) struct PacketWriter<W> {
    writer: W,
}

impl<W: AsyncWrite + Unpin + Send> PacketWriter<W> {
    pub(crate) fn new(writer: W) -> Self {
        Self { writer }
    }

    pub(crate) async fn write_packet(
        &mut self,
        pk: &Outbound,
        version: Version,
    ) -> Result<(), ProtError> {
        let mut buf = PacketBuffer::acquire();
        buf.put_varint(pk.packet_id());
        pk.encode(&mut buf, version)?;

        let mut prefix = [0u8; VarInt::MAX_BYTES];
        let n = VarInt::from(buf.len()).encode(&mut prefix);
        self.writer.write_all(&prefix[..n]).await?;
        self.writer.write_all(buf.bytes()).await?;
        self.writer.flush().await?;
        Ok(())
    }

    /// Flushes anything buffered and sends the FIN. Called once, when the
    /// outbound queue has fully drained.
    pub(crate) async fn shutdown(&mut self) {
        let _ = self.writer.shutdown().await;
    }
}

#[cfg(test)]
mod test {
    use tokio::io::{duplex, AsyncWriteExt};

    use super::{PacketReader, PacketWriter};
    use crate::protocol::buffer::PacketBuffer;
    use crate::protocol::packets::{client, Inbound, Outbound};
    use crate::protocol::varint::VarInt;
    use crate::protocol::{State, Version};
    use crate::err::ProtError;

    fn frame(id: i32, body: &[u8]) -> Vec<u8> {
        let mut buf = PacketBuffer::new();
        buf.put_varint(VarInt::from(id));
        buf.put_bytes(body);
        let mut framed = PacketBuffer::new();
        framed.put_varint(VarInt::from(buf.len()));
        framed.put_bytes(buf.bytes());
        framed.bytes().to_vec()
    }

    #[tokio::test]
    async fn reads_a_framed_packet() {
        let (mut client, server) = duplex(1024);
        let mut reader = PacketReader::new(server, 1 << 16);

        let mut body = PacketBuffer::new();
        body.put_i64(1234);
        client.write_all(&frame(0x01, body.bytes())).await.unwrap();

        let pk = reader
            .read_packet(State::Status, Version::V1_8)
            .await
            .unwrap()
            .unwrap();
        match pk {
            Inbound::StatusPing(ping) => assert_eq!(ping.time, 1234),
            other => panic!("expected ping, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn unknown_packet_is_discarded_and_stream_stays_aligned() {
        let (mut client, server) = duplex(1024);
        let mut reader = PacketReader::new(server, 1 << 16);

        client.write_all(&frame(0x55, &[1, 2, 3, 4])).await.unwrap();
        let mut body = PacketBuffer::new();
        body.put_i64(99);
        client.write_all(&frame(0x01, body.bytes())).await.unwrap();

        assert!(reader
            .read_packet(State::Status, Version::V1_8)
            .await
            .unwrap()
            .is_none());
        let pk = reader
            .read_packet(State::Status, Version::V1_8)
            .await
            .unwrap()
            .unwrap();
        assert!(matches!(pk, Inbound::StatusPing(p) if p.time == 99));
    }

    #[tokio::test]
    async fn oversized_packet_is_rejected() {
        let (mut client, server) = duplex(1024);
        let mut reader = PacketReader::new(server, 64);

        let mut framed = PacketBuffer::new();
        framed.put_varint(VarInt::from(65));
        client.write_all(framed.bytes()).await.unwrap();

        assert!(matches!(
            reader.read_packet(State::Play, Version::V1_8).await,
            Err(ProtError::PacketTooLarge(65))
        ));
    }

    #[tokio::test]
    async fn writer_frames_size_id_body() {
        let (client, mut server) = duplex(1024);
        let mut writer = PacketWriter::new(client);

        writer
            .write_packet(
                &Outbound::StatusPong(client::StatusPong::new(77)),
                Version::V1_8,
            )
            .await
            .unwrap();
        drop(writer);

        let size = VarInt::read(&mut server).await.unwrap();
        assert_eq!(size.value, 9); // id byte + long
        let id = VarInt::read(&mut server).await.unwrap();
        assert_eq!(id.value, 0x01);
        let mut body = [0u8; 8];
        tokio::io::AsyncReadExt::read_exact(&mut server, &mut body)
            .await
            .unwrap();
        assert_eq!(i64::from_be_bytes(body), 77);
    }
}
