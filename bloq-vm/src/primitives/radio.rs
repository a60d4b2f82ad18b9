//! Radio primitives: the MakeCode-compatible typed message surface plus
//! raw packet access.

use bloq_types::{ClassId, FaultReason, Value, Word};

use crate::{
    consts::PACKET_LEN,
    machine::Machine,
    radio::RadioHw,
    registry::{ArgRange, Primitive, PrimitiveTable},
};

/// Register the `radio` set.
pub fn register<H: RadioHw>(table: &mut PrimitiveTable<H>) {
    table.register_set(
        "radio",
        &[
            ("sendInteger", send_integer as Primitive<H>),
            ("sendString", send_string),
            ("sendPair", send_pair),
            ("messageReceived", message_received),
            ("receivedInteger", received_integer),
            ("receivedString", received_string),
            ("receivedMessageType", received_message_type),
            ("signalStrength", signal_strength),
            ("setGroup", set_group),
            ("setChannel", set_channel),
            ("setPower", set_power),
            ("packetSend", packet_send),
            ("packetReceive", packet_receive),
        ],
    );
}

fn int_arg<H: RadioHw>(
    m: &Machine<H>,
    args: ArgRange,
    i: usize,
) -> Result<Word, FaultReason> {
    let v = m.arg(args, i);
    if v.is_int() {
        Ok(v.as_int())
    } else {
        Err(FaultReason::NeedsInteger)
    }
}

fn string_arg<H: RadioHw>(
    m: &Machine<H>,
    args: ArgRange,
    i: usize,
) -> Result<alloc::vec::Vec<u8>, FaultReason> {
    let v = m.arg(args, i);
    if m.arena().class_of(v) == Some(ClassId::String) {
        m.arena().string_bytes(v)
    } else {
        Err(FaultReason::NeedsString)
    }
}

/// `sendInteger(n)`.
pub fn send_integer<H: RadioHw>(
    m: &mut Machine<H>,
    args: ArgRange,
) -> Result<Value, FaultReason> {
    let n = int_arg(m, args, 0)?;
    m.radio_mut().send_integer(n);
    Ok(Value::FALSE)
}

/// `sendString(s)`; the payload is capped at 19 bytes on the air.
pub fn send_string<H: RadioHw>(
    m: &mut Machine<H>,
    args: ArgRange,
) -> Result<Value, FaultReason> {
    let text = string_arg(m, args, 0)?;
    m.radio_mut().send_string(&text);
    Ok(Value::FALSE)
}

/// `sendPair(name, value)`.
pub fn send_pair<H: RadioHw>(
    m: &mut Machine<H>,
    args: ArgRange,
) -> Result<Value, FaultReason> {
    let name = string_arg(m, args, 0)?;
    let value = int_arg(m, args, 1)?;
    m.radio_mut().send_pair(&name, value);
    Ok(Value::FALSE)
}

/// `messageReceived()`: dequeue the next typed message, if any.
pub fn message_received<H: RadioHw>(
    m: &mut Machine<H>,
    _args: ArgRange,
) -> Result<Value, FaultReason> {
    Ok(Value::boolean(m.radio_mut().receive_message()))
}

/// `receivedInteger()`.
pub fn received_integer<H: RadioHw>(
    m: &mut Machine<H>,
    _args: ArgRange,
) -> Result<Value, FaultReason> {
    Ok(Value::int(m.radio().received().integer))
}

/// `receivedString()`: the static string slot, refreshed in place.
pub fn received_string<H: RadioHw>(
    m: &mut Machine<H>,
    _args: ArgRange,
) -> Result<Value, FaultReason> {
    m.received_string()
}

/// `receivedMessageType()`: `"number"`, `"string"` or `"pair"`.
pub fn received_message_type<H: RadioHw>(
    m: &mut Machine<H>,
    _args: ArgRange,
) -> Result<Value, FaultReason> {
    m.received_message_type()
}

/// `signalStrength()`: negated dBm of the last reception.
pub fn signal_strength<H: RadioHw>(
    m: &mut Machine<H>,
    _args: ArgRange,
) -> Result<Value, FaultReason> {
    Ok(Value::int(m.radio().signal_strength()))
}

/// `setGroup(0..255)`.
pub fn set_group<H: RadioHw>(
    m: &mut Machine<H>,
    args: ArgRange,
) -> Result<Value, FaultReason> {
    let group = int_arg(m, args, 0)?.clamp(0, 255) as u8;
    m.radio_mut().set_group(group);
    Ok(Value::FALSE)
}

/// `setChannel(0..83)`.
pub fn set_channel<H: RadioHw>(
    m: &mut Machine<H>,
    args: ArgRange,
) -> Result<Value, FaultReason> {
    let channel = int_arg(m, args, 0)?;
    m.radio_mut().set_channel(channel);
    Ok(Value::FALSE)
}

/// `setPower(0..7)`.
pub fn set_power<H: RadioHw>(
    m: &mut Machine<H>,
    args: ArgRange,
) -> Result<Value, FaultReason> {
    let power = int_arg(m, args, 0)?;
    m.radio_mut().set_power(power);
    Ok(Value::FALSE)
}

/// `packetSend(byteArray)`: raw 32-byte send, zero-padded.
pub fn packet_send<H: RadioHw>(
    m: &mut Machine<H>,
    args: ArgRange,
) -> Result<Value, FaultReason> {
    let v = m.arg(args, 0);
    if m.arena().class_of(v) != Some(ClassId::ByteArray) {
        return Err(FaultReason::NeedsIndexable);
    }
    let len = m.arena().byte_array_len(v)?.min(PACKET_LEN);
    let mut packet = [0u8; PACKET_LEN];
    for (i, slot) in packet.iter_mut().enumerate().take(len) {
        *slot = m.arena().byte(v, i)?;
    }
    m.radio_mut().send_packet(&packet);
    Ok(Value::FALSE)
}

/// `packetReceive(byteArray)`: dequeue one raw packet into the argument,
/// which must cover at least 32 bytes; answers whether one arrived.
pub fn packet_receive<H: RadioHw>(
    m: &mut Machine<H>,
    args: ArgRange,
) -> Result<Value, FaultReason> {
    let v = m.arg(args, 0);
    if m.arena().class_of(v) != Some(ClassId::ByteArray) {
        return Err(FaultReason::NeedsIndexable);
    }
    if m.arena().byte_array_len(v)? < PACKET_LEN {
        return Err(FaultReason::ArraySize);
    }
    let mut packet = [0u8; PACKET_LEN];
    if !m.radio_mut().receive_packet(&mut packet) {
        return Ok(Value::FALSE);
    }
    for (i, &b) in packet.iter().enumerate() {
        m.arena_mut().set_byte(v, i, b)?;
    }
    Ok(Value::TRUE)
}
