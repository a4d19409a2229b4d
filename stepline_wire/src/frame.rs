//! Frame layout and encode/decode.

use std::io::{Read, Write};

use stepline_common::{AXIS_COUNT, AxisCommand, ContentKind, GlobalEnable, MotionCommand};

use crate::error::WireError;

/// Magic bytes opening every frame: `"SLW\0"`.
pub const WIRE_MAGIC: [u8; 4] = *b"SLW\0";

/// Wire schema version. Peers refuse any other value.
pub const WIRE_VERSION: u8 = 1;

/// Frame header length: magic (4) + version (1) + payload length (4).
pub const FRAME_HEADER_LEN: usize = 9;

/// Upper bound on the label, in bytes. A length prefix beyond this is
/// treated as framing corruption rather than an allocation request.
pub const MAX_LABEL_LEN: usize = 1024;

/// Fixed-width portion of the payload: content_kind, all_axes_enable and
/// six axis triples, each a `u32`, plus the label length prefix.
const FIXED_PAYLOAD_LEN: usize = 4 * (2 + AXIS_COUNT * 3) + 4;

const MAX_PAYLOAD_LEN: usize = FIXED_PAYLOAD_LEN + MAX_LABEL_LEN;

// ─── Encode ─────────────────────────────────────────────────────────

/// Encode a command into one self-delimiting frame.
///
/// Field order is fixed: content_kind, label, all_axes_enable, then axis
/// 0..5 each as enabled/direction/period.
pub fn encode(cmd: &MotionCommand) -> Vec<u8> {
    let label = cmd.label.as_bytes();
    let payload_len = FIXED_PAYLOAD_LEN + label.len();

    let mut buf = Vec::with_capacity(FRAME_HEADER_LEN + payload_len);
    buf.extend_from_slice(&WIRE_MAGIC);
    buf.push(WIRE_VERSION);
    buf.extend_from_slice(&(payload_len as u32).to_le_bytes());

    buf.extend_from_slice(&(cmd.content_kind as u32).to_le_bytes());
    buf.extend_from_slice(&(label.len() as u32).to_le_bytes());
    buf.extend_from_slice(label);
    buf.extend_from_slice(&(cmd.all_axes_enable as u32).to_le_bytes());
    for axis in &cmd.axes {
        buf.extend_from_slice(&u32::from(axis.enabled).to_le_bytes());
        buf.extend_from_slice(&u32::from(axis.direction).to_le_bytes());
        buf.extend_from_slice(&axis.period.to_le_bytes());
    }
    buf
}

/// Write one encoded frame to a stream.
pub fn write_message<W: Write>(writer: &mut W, cmd: &MotionCommand) -> Result<(), WireError> {
    writer.write_all(&encode(cmd))?;
    writer.flush()?;
    Ok(())
}

// ─── Decode ─────────────────────────────────────────────────────────

/// Cursor over a payload slice; every shortfall is a framing error.
struct PayloadReader<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> PayloadReader<'a> {
    fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    fn take(&mut self, n: usize, what: &str) -> Result<&'a [u8], WireError> {
        let end = self.pos.checked_add(n).filter(|&e| e <= self.buf.len());
        match end {
            Some(end) => {
                let slice = &self.buf[self.pos..end];
                self.pos = end;
                Ok(slice)
            }
            None => Err(WireError::malformed(format!("payload truncated in {what}"))),
        }
    }

    fn u32(&mut self, what: &str) -> Result<u32, WireError> {
        let bytes = self.take(4, what)?;
        Ok(u32::from_le_bytes(bytes.try_into().unwrap()))
    }

    fn bool(&mut self, what: &str) -> Result<bool, WireError> {
        match self.u32(what)? {
            0 => Ok(false),
            1 => Ok(true),
            v => Err(WireError::malformed(format!("{what} out of range: {v}"))),
        }
    }

    fn remaining(&self) -> usize {
        self.buf.len() - self.pos
    }
}

/// Decode one payload (the bytes following a validated frame header).
///
/// Fails with [`WireError::MalformedMessage`] on truncation, trailing
/// bytes, a non-UTF-8 label or out-of-range field values, and with
/// [`WireError::UnknownContentKind`] on an undefined tag.
pub fn decode(payload: &[u8]) -> Result<MotionCommand, WireError> {
    let mut r = PayloadReader::new(payload);

    let kind_raw = r.u32("content_kind")?;
    let content_kind =
        ContentKind::from_u32(kind_raw).ok_or(WireError::UnknownContentKind { value: kind_raw })?;

    let label_len = r.u32("label length")? as usize;
    if label_len > MAX_LABEL_LEN {
        return Err(WireError::malformed(format!(
            "label length {label_len} exceeds maximum {MAX_LABEL_LEN}"
        )));
    }
    let label = std::str::from_utf8(r.take(label_len, "label")?)
        .map_err(|_| WireError::malformed("label is not valid UTF-8"))?
        .to_string();

    let enable_raw = r.u32("all_axes_enable")?;
    let all_axes_enable = GlobalEnable::from_u32(enable_raw)
        .ok_or_else(|| WireError::malformed(format!("all_axes_enable out of range: {enable_raw}")))?;

    let mut axes = [AxisCommand::default(); AXIS_COUNT];
    for (i, axis) in axes.iter_mut().enumerate() {
        axis.enabled = r.bool(&format!("axis {i} enabled"))?;
        axis.direction = r.bool(&format!("axis {i} direction"))?;
        axis.period = r.u32(&format!("axis {i} period"))?;
    }

    if r.remaining() != 0 {
        return Err(WireError::malformed(format!(
            "{} trailing bytes after last axis",
            r.remaining()
        )));
    }

    Ok(MotionCommand {
        content_kind,
        label,
        all_axes_enable,
        axes,
    })
}

/// Read exactly one framed message from a stream.
///
/// Blocks only inside `reader`. Returns [`WireError::Io`] when the stream
/// fails or closes mid-frame, [`WireError::MalformedMessage`] /
/// [`WireError::UnknownContentKind`] when the frame or its fields are
/// invalid.
pub fn read_message<R: Read>(reader: &mut R) -> Result<MotionCommand, WireError> {
    let mut header = [0u8; FRAME_HEADER_LEN];
    reader.read_exact(&mut header)?;

    if header[0..4] != WIRE_MAGIC {
        return Err(WireError::malformed("bad frame magic"));
    }
    if header[4] != WIRE_VERSION {
        return Err(WireError::malformed(format!(
            "unsupported wire version {}",
            header[4]
        )));
    }
    let payload_len = u32::from_le_bytes(header[5..9].try_into().unwrap()) as usize;
    if payload_len < FIXED_PAYLOAD_LEN || payload_len > MAX_PAYLOAD_LEN {
        return Err(WireError::malformed(format!(
            "implausible payload length {payload_len}"
        )));
    }

    let mut payload = vec![0u8; payload_len];
    reader.read_exact(&mut payload)?;
    decode(&payload)
}
