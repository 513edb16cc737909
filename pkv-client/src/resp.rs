//! # RESP2 Encoding and Parsing
//!
//! Purpose: Encode client commands and parse server replies for the sync
//! client, with caller-owned buffers.
//!
//! ## Design Principles
//! 1. **State-Free Parsing**: Replies are parsed top-down with minimal state.
//! 2. **Buffer Reuse**: Caller provides buffers to avoid per-call allocations.
//! 3. **Binary-Safe**: Bulk strings are treated as raw bytes.
//! 4. **Fail Fast**: Invalid framing returns a protocol error naming the defect.

use std::io::{BufRead, Write};

use crate::client::{ClientError, ClientResult};

/// Largest bulk string accepted from a server (Redis `proto-max-bulk-len`).
pub const MAX_BULK_LEN: usize = 512 * 1024 * 1024;

/// RESP reply value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RespValue {
    /// +OK or +PONG style replies.
    Simple(Vec<u8>),
    /// -ERR ... replies.
    Error(Vec<u8>),
    /// :123 replies.
    Integer(i64),
    /// $... bulk strings, with None for null.
    Bulk(Option<Vec<u8>>),
    /// *... arrays.
    Array(Vec<RespValue>),
}

impl RespValue {
    /// Converts an error reply into [`ClientError::Server`].
    pub fn into_reply(self) -> ClientResult<RespValue> {
        match self {
            RespValue::Error(message) => Err(ClientError::Server { message }),
            other => Ok(other),
        }
    }

    /// Accepts any simple-string status reply (`+OK`, `+QUEUED`, ...).
    pub fn into_ok(self) -> ClientResult<()> {
        match self.into_reply()? {
            RespValue::Simple(_) => Ok(()),
            _ => Err(ClientError::UnexpectedResponse),
        }
    }
}

/// Encodes a RESP2 array command into the provided buffer.
pub fn encode_command(args: &[&[u8]], out: &mut Vec<u8>) {
    // Writing into a Vec cannot fail.
    let _ = write!(out, "*{}\r\n", args.len());
    for arg in args {
        let _ = write!(out, "${}\r\n", arg.len());
        out.extend_from_slice(arg);
        out.extend_from_slice(b"\r\n");
    }
}

/// Reads one RESP value from the buffered reader.
pub fn read_response<R: BufRead>(reader: &mut R, line_buf: &mut Vec<u8>) -> ClientResult<RespValue> {
    read_line(reader, line_buf)?;
    let Some((&tag, body)) = line_buf.split_first() else {
        return Err(ClientError::Protocol("empty reply line"));
    };

    match tag {
        b'+' => Ok(RespValue::Simple(body.to_vec())),
        b'-' => Ok(RespValue::Error(body.to_vec())),
        b':' => Ok(RespValue::Integer(parse_i64(body)?)),
        b'$' => {
            let len = parse_i64(body)?;
            read_bulk(reader, len)
        }
        b'*' => {
            let len = parse_i64(body)?;
            read_array(reader, len, line_buf)
        }
        _ => Err(ClientError::Protocol("unknown reply type")),
    }
}

fn read_bulk<R: BufRead>(reader: &mut R, len: i64) -> ClientResult<RespValue> {
    if len < 0 {
        return Ok(RespValue::Bulk(None));
    }
    let len = usize::try_from(len).map_err(|_| ClientError::Protocol("bulk length overflow"))?;
    if len > MAX_BULK_LEN {
        return Err(ClientError::Protocol("bulk string too large"));
    }

    // Payload and trailing CRLF in one read.
    let mut data = vec![0u8; len + 2];
    reader.read_exact(&mut data)?;
    if !data.ends_with(b"\r\n") {
        return Err(ClientError::Protocol("bulk string missing CRLF"));
    }
    data.truncate(len);
    Ok(RespValue::Bulk(Some(data)))
}

fn read_array<R: BufRead>(
    reader: &mut R,
    len: i64,
    line_buf: &mut Vec<u8>,
) -> ClientResult<RespValue> {
    if len <= 0 {
        return Ok(RespValue::Array(Vec::new()));
    }

    let mut items = Vec::with_capacity(len.min(1024) as usize);
    for _ in 0..len {
        items.push(read_response(reader, line_buf)?);
    }
    Ok(RespValue::Array(items))
}

fn read_line<R: BufRead>(reader: &mut R, buf: &mut Vec<u8>) -> ClientResult<()> {
    buf.clear();
    if reader.read_until(b'\n', buf)? == 0 {
        return Err(ClientError::Protocol("connection closed by server"));
    }
    if !buf.ends_with(b"\r\n") {
        return Err(ClientError::Protocol("reply line missing CRLF"));
    }
    buf.truncate(buf.len() - 2);
    Ok(())
}

fn parse_i64(data: &[u8]) -> ClientResult<i64> {
    std::str::from_utf8(data)
        .ok()
        .and_then(|text| text.parse::<i64>().ok())
        .ok_or(ClientError::Protocol("invalid integer"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn parse(input: &[u8]) -> ClientResult<RespValue> {
        let mut reader = Cursor::new(input.to_vec());
        let mut line = Vec::new();
        read_response(&mut reader, &mut line)
    }

    #[test]
    fn encodes_command() {
        let mut buf = Vec::new();
        encode_command(&[b"AUTH", b"s3cret"], &mut buf);
        assert_eq!(&buf, b"*2\r\n$4\r\nAUTH\r\n$6\r\ns3cret\r\n");
    }

    #[test]
    fn encodes_empty_argument() {
        let mut buf = Vec::new();
        encode_command(&[b"SET", b"k", b""], &mut buf);
        assert_eq!(&buf, b"*3\r\n$3\r\nSET\r\n$1\r\nk\r\n$0\r\n\r\n");
    }

    #[test]
    fn parses_scalar_replies() {
        assert_eq!(parse(b"+OK\r\n").unwrap(), RespValue::Simple(b"OK".to_vec()));
        assert_eq!(parse(b"-ERR bad\r\n").unwrap(), RespValue::Error(b"ERR bad".to_vec()));
        assert_eq!(parse(b":-2\r\n").unwrap(), RespValue::Integer(-2));
        assert_eq!(parse(b"$5\r\nhello\r\n").unwrap(), RespValue::Bulk(Some(b"hello".to_vec())));
        assert_eq!(parse(b"$-1\r\n").unwrap(), RespValue::Bulk(None));
    }

    #[test]
    fn parses_nested_array() {
        let resp = parse(b"*2\r\n:1\r\n*1\r\n$1\r\nx\r\n").unwrap();
        assert_eq!(
            resp,
            RespValue::Array(vec![
                RespValue::Integer(1),
                RespValue::Array(vec![RespValue::Bulk(Some(b"x".to_vec()))]),
            ])
        );
    }

    #[test]
    fn rejects_malformed_framing() {
        assert!(matches!(parse(b"+OK\n"), Err(ClientError::Protocol(_))));
        assert!(matches!(parse(b"?what\r\n"), Err(ClientError::Protocol(_))));
        assert!(matches!(parse(b":12a\r\n"), Err(ClientError::Protocol(_))));
        assert!(matches!(parse(b"$3\r\nabcXY"), Err(ClientError::Protocol(_))));
        assert!(matches!(parse(b""), Err(ClientError::Protocol(_))));
    }

    #[test]
    fn rejects_oversized_bulk() {
        let header = format!("${}\r\n", MAX_BULK_LEN + 1);
        assert!(matches!(
            parse(header.as_bytes()),
            Err(ClientError::Protocol("bulk string too large"))
        ));
    }

    #[test]
    fn error_reply_becomes_server_error() {
        let err = RespValue::Error(b"WRONGPASS invalid password".to_vec())
            .into_ok()
            .unwrap_err();
        assert!(matches!(err, ClientError::Server { .. }));
        assert!(RespValue::Integer(1).into_ok().is_err());
        assert!(RespValue::Simple(b"OK".to_vec()).into_ok().is_ok());
    }
}
