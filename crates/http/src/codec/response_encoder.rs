use bytes::{BufMut, BytesMut};
use tokio_util::codec::Encoder;
use tracing::trace;

use crate::codec::header::HeaderEncoder;
use crate::protocol::{ResponseMessage, SendError};

/// Interim response sent before reading the body of an `Expect: 100-continue` request.
pub const CONTINUE_RESPONSE: &[u8] = b"HTTP/1.1 100 Continue\r\n\r\n";

/// Writes a complete response: head, then the body unless the message is head-only.
#[derive(Debug, Default)]
pub struct ResponseEncoder {
    header_encoder: HeaderEncoder,
}

impl ResponseEncoder {
    pub fn new() -> Self {
        Default::default()
    }
}

impl Encoder<ResponseMessage> for ResponseEncoder {
    type Error = SendError;

    fn encode(&mut self, item: ResponseMessage, dst: &mut BytesMut) -> Result<(), Self::Error> {
        self.header_encoder.encode(&item, dst)?;

        if !item.head_only {
            dst.put_slice(item.response.body());
        }

        trace!(status = item.status().as_u16(), body = item.body_len(), "encoded response");
        Ok(())
    }
}
