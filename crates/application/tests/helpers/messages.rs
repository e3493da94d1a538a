use hickory_proto::op::{Message, MessageType, OpCode, Query};
use hickory_proto::rr::{Name, RecordType};

pub fn query_message(id: u16, name: &str, record_type: RecordType) -> Message {
    let mut message = Message::new();
    message
        .set_id(id)
        .set_message_type(MessageType::Query)
        .set_op_code(OpCode::Query)
        .set_recursion_desired(true);
    message.add_query(Query::query(Name::from_ascii(name).unwrap(), record_type));
    message
}

pub fn query_bytes(id: u16, name: &str, record_type: RecordType) -> Vec<u8> {
    query_message(id, name, record_type).to_vec().unwrap()
}

pub fn decode(bytes: &[u8]) -> Message {
    Message::from_vec(bytes).unwrap()
}

/// Walks every question and answer name (CNAME targets included) and
/// reports whether any of them uses a compression pointer.
pub fn has_compression_pointer(bytes: &[u8]) -> bool {
    let message = decode(bytes);
    let mut offset = 12;

    for _ in message.queries() {
        match skip_name(bytes, offset) {
            Some(next) => offset = next + 4,
            None => return true,
        }
    }

    for _ in message.answers() {
        match skip_name(bytes, offset) {
            Some(next) => offset = next,
            None => return true,
        }
        let rtype = u16::from_be_bytes([bytes[offset], bytes[offset + 1]]);
        let rdlength = u16::from_be_bytes([bytes[offset + 8], bytes[offset + 9]]) as usize;
        offset += 10;
        if rtype == u16::from(RecordType::CNAME) && skip_name(bytes, offset).is_none() {
            return true;
        }
        offset += rdlength;
    }

    false
}

/// Offset just past the name at `offset`, `None` if it ends in a pointer.
fn skip_name(bytes: &[u8], mut offset: usize) -> Option<usize> {
    loop {
        let len = bytes[offset];
        if len & 0xC0 == 0xC0 {
            return None;
        }
        offset += 1;
        if len == 0 {
            return Some(offset);
        }
        offset += len as usize;
    }
}
